use std::io::Cursor;

use image::{GenericImageView, ImageReader};
use lopdf::{dictionary, Document, ObjectId, Stream};

use crate::error::ImageError;

/// Longest side kept when embedding; larger images are downscaled first.
const MAX_EMBED_PIXELS: u32 = 2000;

/// An RGB page image to draw above the text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImage {
    pub width: u32,
    pub height: u32,
    rgb: Vec<u8>,
}

impl PageImage {
    /// Decode any raster format the upload path accepts. Alpha is dropped.
    pub fn decode(bytes: &[u8]) -> Result<Self, ImageError> {
        if bytes.is_empty() {
            return Err(ImageError::Empty);
        }

        let format = image::guess_format(bytes).map_err(|_| ImageError::UnsupportedFormat)?;
        let img = ImageReader::with_format(Cursor::new(bytes), format)
            .decode()
            .map_err(|e| ImageError::Decode(e.to_string()))?;

        let (width, height) = img.dimensions();
        let img = if width > MAX_EMBED_PIXELS || height > MAX_EMBED_PIXELS {
            img.resize(
                MAX_EMBED_PIXELS,
                MAX_EMBED_PIXELS,
                image::imageops::FilterType::Triangle,
            )
        } else {
            img
        };

        let rgb = img.to_rgb8();
        Ok(Self {
            width: rgb.width(),
            height: rgb.height(),
            rgb: rgb.into_raw(),
        })
    }

    /// Size in points when drawn at most `max_width` wide and `max_height`
    /// tall, keeping the aspect ratio.
    pub(super) fn fit(&self, max_width: f32, max_height: f32) -> (f32, f32) {
        let width = self.width.max(1) as f32;
        let height = self.height.max(1) as f32;
        let scale = (max_width / width).min(max_height / height);
        (width * scale, height * scale)
    }

    pub(super) fn write(&self, doc: &mut Document) -> ObjectId {
        doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => self.width,
                "Height" => self.height,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
            },
            self.rgb.clone(),
        ))
    }
}
