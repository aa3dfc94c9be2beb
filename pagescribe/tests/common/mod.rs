// Shared fixtures and test doubles for integration tests
#![allow(dead_code)]

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration;

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

use pagescribe::config::{
    Config, LogFormat, LoggingConfig, OcrBackendKind, OcrConfig, PdfConfig, ServerConfig,
    StorageBackendKind, StorageConfig, SummaryConfig, UploadConfig,
};
use pagescribe::error::{OcrError, StorageError, SummaryError};
use pagescribe::ocr::{LanguageHint, OcrEngine};
use pagescribe::storage::{ArtifactKind, ArtifactStore, StoredArtifact};
use pagescribe::summarize::Summarizer;

static INIT: Once = Once::new();

/// Initialize tracing subscriber once for tests
pub fn init_test_logger() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

pub fn ocr_config() -> OcrConfig {
    OcrConfig {
        backend: OcrBackendKind::Tesseract,
        api_key: None,
        base_url: None,
        model: None,
        tessdata_path: None,
        languages: "kor+eng".to_string(),
        timeout_secs: 5,
        min_image_dimension: 16,
        max_image_width: 2480,
        max_image_height: 3508,
    }
}

pub fn summary_config() -> SummaryConfig {
    SummaryConfig {
        model: "gpt-3.5-turbo".to_string(),
        api_key: Some("test-key".to_string()),
        base_url: None,
        timeout_secs: 5,
        max_input_chars: 12_000,
        max_tokens: 256,
        temperature: 0.3,
        prompt: None,
    }
}

pub fn storage_config(backend: StorageBackendKind) -> StorageConfig {
    StorageConfig {
        backend,
        bucket: "ocr-temp-storage".to_string(),
        region: Some("us-east-1".to_string()),
        endpoint_url: None,
        prefix: "ocr".to_string(),
        url_ttl_secs: 3600,
        retention_hours: 24,
        timeout_secs: 5,
        configure_bucket: false,
    }
}

pub fn test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_allowed_origins: vec!["*".to_string()],
            public_base_url: "http://localhost:8000".to_string(),
        },
        upload: UploadConfig {
            max_files: 10,
            max_file_size: 1024 * 1024,
            concurrency: 4,
            summarize_default: true,
            store_default: false,
        },
        ocr: ocr_config(),
        summary: summary_config(),
        storage: storage_config(StorageBackendKind::Memory),
        pdf: PdfConfig {
            max_text_chars: 200_000,
            font_path: None,
        },
        logging: LoggingConfig {
            format: LogFormat::Pretty,
        },
    }
}

/// A blank page image of the given size, PNG encoded.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
    let mut out = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
        .expect("encode png");
    out
}

pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([200, 200, 200]));
    let mut out = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut out), ImageFormat::Jpeg)
        .expect("encode jpeg");
    out
}

fn png_width(png: &[u8]) -> Result<u32, OcrError> {
    image::load_from_memory(png)
        .map(|img| img.width())
        .map_err(|e| OcrError::Engine(e.to_string()))
}

/// Reads the page width back out of the normalized PNG and reports it as
/// text. Narrower pages sleep longer, so completion order is the reverse of
/// upload order for increasing widths.
pub struct WidthOcr {
    pub blank_width: Option<u32>,
    pub fail_width: Option<u32>,
}

impl WidthOcr {
    pub fn new() -> Self {
        Self {
            blank_width: None,
            fail_width: None,
        }
    }
}

#[async_trait]
impl OcrEngine for WidthOcr {
    async fn extract_text(&self, png: &[u8], _language: &LanguageHint) -> Result<String, OcrError> {
        let width = png_width(png)?;
        let delay = 120u64.saturating_sub(u64::from(width));
        tokio::time::sleep(Duration::from_millis(delay)).await;

        if Some(width) == self.fail_width {
            return Err(OcrError::Engine("engine crashed".to_string()));
        }
        if Some(width) == self.blank_width {
            return Ok(String::new());
        }
        Ok(format!("page width {width}"))
    }
}

/// Always returns the same text.
pub struct FixedOcr(pub String);

#[async_trait]
impl OcrEngine for FixedOcr {
    async fn extract_text(&self, _png: &[u8], _language: &LanguageHint) -> Result<String, OcrError> {
        Ok(self.0.clone())
    }
}

#[derive(Default)]
pub struct CountingSummarizer {
    pub calls: AtomicUsize,
}

impl CountingSummarizer {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Summarizer for CountingSummarizer {
    async fn summarize(&self, text: &str) -> Result<String, SummaryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("summary of: {text}"))
    }
}

pub struct FailingSummarizer;

#[async_trait]
impl Summarizer for FailingSummarizer {
    async fn summarize(&self, _text: &str) -> Result<String, SummaryError> {
        Err(SummaryError::RateLimited)
    }
}

pub struct FailingStore;

#[async_trait]
impl ArtifactStore for FailingStore {
    async fn put(
        &self,
        _kind: ArtifactKind,
        _filename: &str,
        _bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<StoredArtifact, StorageError> {
        Err(StorageError::Timeout(5))
    }
}

/// Shorthand for the trait-object handles the pipeline takes.
pub fn ocr(engine: impl OcrEngine + 'static) -> Arc<dyn OcrEngine> {
    Arc::new(engine)
}

pub fn summarizer(s: impl Summarizer + 'static) -> Arc<dyn Summarizer> {
    Arc::new(s)
}
