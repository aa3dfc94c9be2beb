//! Per-request image processing: decode, OCR, then optional summary and
//! storage, for every uploaded image.

mod image_pipeline;
mod types;

pub use image_pipeline::ImagePipeline;
pub use types::{ImageOutcome, PipelineOptions, UploadedImage};
