use std::io::Cursor;

use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader};

use crate::config::OcrConfig;
use crate::error::ImageError;

/// A validated page image, normalized for OCR and re-encoded as PNG.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub source_format: ImageFormat,
}

/// Best-effort MIME type of an upload from its magic bytes.
pub fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    infer::get(bytes).map(|kind| kind.mime_type())
}

/// Validate and decode an uploaded file.
///
/// Steps:
/// 1. Rejects empty bodies and parts declared as a non-image type
/// 2. Detects the raster format from magic bytes and decodes it
/// 3. Rejects images below the configured minimum dimension
/// 4. Shrinks images larger than the page bounding box (aspect preserved)
/// 5. Drops alpha, converts to grayscale and stretches contrast
///
/// The result is PNG bytes ready for any OCR backend.
pub fn decode_upload(
    bytes: &[u8],
    declared_content_type: Option<&str>,
    config: &OcrConfig,
) -> Result<DecodedImage, ImageError> {
    if bytes.is_empty() {
        return Err(ImageError::Empty);
    }

    if let Some(declared) = declared_content_type {
        if !is_acceptable_declared_type(declared) {
            return Err(ImageError::NotAnImage(declared.to_string()));
        }
    }

    if let Some(kind) = infer::get(bytes) {
        if kind.matcher_type() != infer::MatcherType::Image {
            return Err(ImageError::UnsupportedFormat);
        }
    }

    let format = image::guess_format(bytes).map_err(|_| ImageError::UnsupportedFormat)?;

    let img = ImageReader::with_format(Cursor::new(bytes), format)
        .decode()
        .map_err(|e| ImageError::Decode(e.to_string()))?;

    let (width, height) = img.dimensions();
    if width < config.min_image_dimension || height < config.min_image_dimension {
        return Err(ImageError::TooSmall {
            width,
            height,
            min: config.min_image_dimension,
        });
    }

    let img = fit_within(img, config.max_image_width, config.max_image_height);
    let img = enhance_contrast(remove_alpha(img).grayscale());
    let (width, height) = img.dimensions();

    let mut png = Vec::new();
    img.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| ImageError::Encode(e.to_string()))?;

    Ok(DecodedImage {
        png,
        width,
        height,
        source_format: format,
    })
}

fn is_acceptable_declared_type(declared: &str) -> bool {
    let essence = declared
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence.is_empty() || essence.starts_with("image/") || essence == "application/octet-stream"
}

/// Shrink to fit a `max_width` x `max_height` box. Smaller images are untouched.
fn fit_within(img: DynamicImage, max_width: u32, max_height: u32) -> DynamicImage {
    let (width, height) = img.dimensions();
    if width <= max_width && height <= max_height {
        return img;
    }

    // `resize` keeps the aspect ratio and fits inside the given bounds
    img.resize(max_width, max_height, image::imageops::FilterType::Lanczos3)
}

fn remove_alpha(img: DynamicImage) -> DynamicImage {
    match img {
        DynamicImage::ImageRgba8(_)
        | DynamicImage::ImageRgba16(_)
        | DynamicImage::ImageRgba32F(_) => DynamicImage::ImageRgb8(img.to_rgb8()),
        DynamicImage::ImageLumaA8(_) | DynamicImage::ImageLumaA16(_) => {
            DynamicImage::ImageLuma8(img.to_luma8())
        }
        _ => img,
    }
}

fn enhance_contrast(img: DynamicImage) -> DynamicImage {
    DynamicImage::ImageLuma8(stretch_histogram(img.to_luma8()))
}

/// Map the darkest pixel to 0 and the lightest to 255.
fn stretch_histogram(gray: image::GrayImage) -> image::GrayImage {
    let (min_val, max_val) = gray
        .pixels()
        .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p[0]), hi.max(p[0])));

    if max_val <= min_val {
        return gray;
    }

    let range = (max_val - min_val) as f32;
    image::GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let value = gray.get_pixel(x, y)[0];
        let normalized = (value - min_val) as f32 / range;
        image::Luma([(normalized * 255.0) as u8])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OcrBackendKind;

    fn create_test_config() -> OcrConfig {
        OcrConfig {
            backend: OcrBackendKind::Tesseract,
            api_key: None,
            base_url: None,
            model: None,
            tessdata_path: None,
            languages: "kor+eng".to_string(),
            timeout_secs: 60,
            min_image_dimension: 16,
            max_image_width: 2480,
            max_image_height: 3508,
        }
    }

    fn encode(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut output = Vec::new();
        img.write_to(&mut Cursor::new(&mut output), format).unwrap();
        output
    }

    fn create_test_png(width: u32, height: u32) -> Vec<u8> {
        encode(DynamicImage::new_rgb8(width, height), ImageFormat::Png)
    }

    #[test]
    fn test_decode_valid_png() {
        let config = create_test_config();
        let decoded = decode_upload(&create_test_png(100, 80), Some("image/png"), &config)
            .expect("valid png should decode");

        assert_eq!((decoded.width, decoded.height), (100, 80));
        assert_eq!(decoded.source_format, ImageFormat::Png);
        assert_eq!(image::guess_format(&decoded.png).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn test_decode_jpeg() {
        let config = create_test_config();
        let jpeg = encode(DynamicImage::new_rgb8(64, 64), ImageFormat::Jpeg);
        let decoded = decode_upload(&jpeg, None, &config).expect("jpeg should decode");
        assert_eq!(decoded.source_format, ImageFormat::Jpeg);
    }

    #[test]
    fn test_rgba_is_flattened() {
        let config = create_test_config();
        let rgba = encode(DynamicImage::new_rgba8(40, 40), ImageFormat::Png);
        let decoded = decode_upload(&rgba, Some("image/png"), &config).unwrap();
        let reloaded = image::load_from_memory(&decoded.png).unwrap();
        assert!(!reloaded.color().has_alpha());
    }

    #[test]
    fn test_reject_empty() {
        let config = create_test_config();
        assert!(matches!(
            decode_upload(&[], None, &config),
            Err(ImageError::Empty)
        ));
    }

    #[test]
    fn test_reject_garbage_bytes() {
        let config = create_test_config();
        let result = decode_upload(&[0u8, 1, 2, 3, 4, 5], None, &config);
        assert!(matches!(result, Err(ImageError::UnsupportedFormat)));
    }

    #[test]
    fn test_reject_truncated_png() {
        let config = create_test_config();
        let mut png = create_test_png(100, 100);
        png.truncate(png.len() / 2);
        assert!(decode_upload(&png, None, &config).is_err());
    }

    #[test]
    fn test_reject_non_image_declared_type() {
        let config = create_test_config();
        let result = decode_upload(&create_test_png(50, 50), Some("application/pdf"), &config);
        assert!(matches!(result, Err(ImageError::NotAnImage(_))));
    }

    #[test]
    fn test_octet_stream_is_accepted() {
        let config = create_test_config();
        let result = decode_upload(
            &create_test_png(50, 50),
            Some("application/octet-stream"),
            &config,
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_reject_tiny_image() {
        let config = create_test_config();
        let result = decode_upload(&create_test_png(8, 8), None, &config);
        assert!(matches!(result, Err(ImageError::TooSmall { .. })));
        assert!(result.unwrap_err().to_string().contains("too small"));
    }

    #[test]
    fn test_large_image_fits_page_box() {
        let mut config = create_test_config();
        config.max_image_width = 200;
        config.max_image_height = 300;

        let decoded = decode_upload(&create_test_png(800, 600), None, &config).unwrap();
        assert!(decoded.width <= 200);
        assert!(decoded.height <= 300);
        assert_eq!(decoded.width, 200);
        assert_eq!(decoded.height, 150);
    }

    #[test]
    fn test_sniff_mime() {
        assert_eq!(sniff_mime(&create_test_png(20, 20)), Some("image/png"));
        assert_eq!(sniff_mime(b"hello"), None);
    }

    #[test]
    fn test_stretch_histogram_expands_range() {
        let gray = image::GrayImage::from_fn(2, 1, |x, _| image::Luma([100 + x as u8 * 50]));
        let stretched = stretch_histogram(gray);
        assert_eq!(stretched.get_pixel(0, 0)[0], 0);
        assert_eq!(stretched.get_pixel(1, 0)[0], 255);
    }
}
