//! Upload validation and raster normalization ahead of OCR.

mod decode;

pub use decode::{decode_upload, sniff_mime, DecodedImage};
