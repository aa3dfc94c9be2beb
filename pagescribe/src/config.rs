use serde::Deserialize;
use std::env;

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

/// Boolean env vars accept the same spellings as multipart form flags.
fn parse_env_bool(var: &str, default: bool) -> bool {
    match env::var(var) {
        Ok(val) => match parse_flag(&val) {
            Some(parsed) => parsed,
            None => {
                tracing::warn!("Invalid boolean '{}' for {}. Using default.", val, var);
                default
            }
        },
        Err(_) => default,
    }
}

fn env_non_empty(var: &str) -> Option<String> {
    env::var(var).ok().filter(|v| !v.trim().is_empty())
}

/// Parse a loose boolean flag: `true/false`, `1/0`, `yes/no`, `on/off`.
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub upload: UploadConfig,
    pub ocr: OcrConfig,
    pub summary: SummaryConfig,
    pub storage: StorageConfig,
    pub pdf: PdfConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins. A single `*` allows any origin.
    pub cors_allowed_origins: Vec<String>,
    /// Base URL used when the service itself serves artifacts.
    pub public_base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    pub max_files: usize,
    pub max_file_size: usize,
    pub concurrency: usize,
    pub summarize_default: bool,
    pub store_default: bool,
}

impl UploadConfig {
    /// Upper bound for a whole multipart body: every file at its limit plus
    /// room for form fields and part headers.
    pub fn body_limit(&self) -> usize {
        self.max_files
            .saturating_mul(self.max_file_size)
            .saturating_add(1024 * 1024)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub enum OcrBackendKind {
    Tesseract,
    GoogleVision,
    OpenAi,
}

impl std::str::FromStr for OcrBackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tesseract" | "local" | "local/tesseract" => Ok(Self::Tesseract),
            "google-vision" | "google" | "vision" | "gcp" => Ok(Self::GoogleVision),
            "openai" | "openai-vision" => Ok(Self::OpenAi),
            other => Err(format!("unknown OCR backend '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OcrConfig {
    pub backend: OcrBackendKind,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub tessdata_path: Option<String>,
    pub languages: String,
    pub timeout_secs: u64,
    pub min_image_dimension: u32,
    pub max_image_width: u32,
    pub max_image_height: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SummaryConfig {
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    pub max_input_chars: usize,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Overrides the built-in system prompt.
    pub prompt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub enum StorageBackendKind {
    S3,
    Memory,
    Disabled,
}

impl std::str::FromStr for StorageBackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "s3" => Ok(Self::S3),
            "memory" | "mem" => Ok(Self::Memory),
            "none" | "disabled" | "off" => Ok(Self::Disabled),
            other => Err(format!("unknown storage backend '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackendKind,
    pub bucket: String,
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
    pub prefix: String,
    pub url_ttl_secs: u64,
    pub retention_hours: u64,
    pub timeout_secs: u64,
    pub configure_bucket: bool,
}

/// Ten years; longer retention periods are clamped.
pub const MAX_RETENTION_HOURS: u64 = 24 * 365 * 10;

fn clamp_retention_hours(hours: u64) -> u64 {
    if hours > MAX_RETENTION_HOURS {
        tracing::warn!(
            "STORAGE_RETENTION_HOURS {} exceeds {}. Clamping.",
            hours,
            MAX_RETENTION_HOURS
        );
        MAX_RETENTION_HOURS
    } else {
        hours
    }
}

impl StorageConfig {
    pub fn retention(&self) -> chrono::TimeDelta {
        let hours = self.retention_hours.min(MAX_RETENTION_HOURS) as i64;
        chrono::TimeDelta::try_hours(hours).unwrap_or_else(|| chrono::TimeDelta::days(1))
    }

    /// Presigned URLs never outlive the objects they point at.
    pub fn effective_url_ttl_secs(&self) -> u64 {
        self.url_ttl_secs.min(self.retention_hours.saturating_mul(3600))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PdfConfig {
    pub max_text_chars: usize,
    /// TrueType font embedded for non-Latin text; Helvetica when unset.
    pub font_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub format: LogFormat,
}

impl LoggingConfig {
    /// Loaded ahead of `Config` so tracing is initialized while it parses.
    pub fn from_env() -> Self {
        let format = match env::var("LOG_FORMAT") {
            Ok(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };
        Self { format }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: env::var("PAGESCRIBE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env_or("PAGESCRIBE_PORT", 8000),
                cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                    .map(|origins| {
                        origins
                            .split(',')
                            .map(|s| s.trim().to_string())
                            .filter(|s| !s.is_empty())
                            .collect()
                    })
                    .unwrap_or_else(|_| vec!["*".to_string()]),
                public_base_url: env::var("PUBLIC_BASE_URL")
                    .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            },
            upload: UploadConfig {
                max_files: parse_env_or("MAX_FILES", 10),
                max_file_size: parse_env_or("MAX_FILE_SIZE", 10 * 1024 * 1024),
                concurrency: parse_env_or("PIPELINE_CONCURRENCY", 4),
                summarize_default: parse_env_bool("SUMMARIZE_DEFAULT", true),
                store_default: parse_env_bool("STORE_UPLOADS_DEFAULT", false),
            },
            ocr: OcrConfig {
                backend: parse_env_or("OCR_BACKEND", OcrBackendKind::Tesseract),
                api_key: env_non_empty("OCR_API_KEY"),
                base_url: env_non_empty("OCR_BASE_URL"),
                model: env_non_empty("OCR_MODEL"),
                tessdata_path: env_non_empty("OCR_TESSDATA_PATH"),
                languages: env::var("OCR_LANGUAGES").unwrap_or_else(|_| "kor+eng".to_string()),
                timeout_secs: parse_env_or("OCR_TIMEOUT", 60),
                min_image_dimension: parse_env_or("OCR_MIN_DIMENSION", 16),
                max_image_width: parse_env_or("OCR_MAX_WIDTH", 2480),
                max_image_height: parse_env_or("OCR_MAX_HEIGHT", 3508),
            },
            summary: SummaryConfig {
                model: env::var("SUMMARY_MODEL").unwrap_or_else(|_| "gpt-3.5-turbo".to_string()),
                api_key: env_non_empty("SUMMARY_API_KEY").or_else(|| env_non_empty("OPENAI_API_KEY")),
                base_url: env_non_empty("SUMMARY_BASE_URL"),
                timeout_secs: parse_env_or("SUMMARY_TIMEOUT", 30),
                max_input_chars: parse_env_or("SUMMARY_MAX_INPUT_CHARS", 12_000),
                max_tokens: parse_env_or("SUMMARY_MAX_TOKENS", 512),
                temperature: parse_env_or("SUMMARY_TEMPERATURE", 0.3),
                prompt: env_non_empty("SUMMARY_PROMPT"),
            },
            storage: StorageConfig {
                backend: parse_env_or("STORAGE_BACKEND", StorageBackendKind::S3),
                bucket: env::var("S3_BUCKET").unwrap_or_else(|_| "ocr-temp-storage".to_string()),
                region: env_non_empty("AWS_REGION"),
                endpoint_url: env_non_empty("S3_ENDPOINT"),
                prefix: env::var("S3_PREFIX").unwrap_or_else(|_| "ocr".to_string()),
                url_ttl_secs: parse_env_or("STORAGE_URL_TTL", 3600),
                retention_hours: clamp_retention_hours(parse_env_or(
                    "STORAGE_RETENTION_HOURS",
                    24,
                )),
                timeout_secs: parse_env_or("STORAGE_TIMEOUT", 30),
                configure_bucket: parse_env_bool("STORAGE_CONFIGURE_BUCKET", false),
            },
            pdf: PdfConfig {
                max_text_chars: parse_env_or("PDF_MAX_TEXT_CHARS", 200_000),
                font_path: env_non_empty("PDF_FONT_PATH"),
            },
            logging: LoggingConfig::from_env(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }
}
