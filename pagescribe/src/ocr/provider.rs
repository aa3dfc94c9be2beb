use std::time::Duration;

use async_trait::async_trait;
use leptess::LepTess;
use tracing::{debug, info, warn};

use crate::config::{OcrBackendKind, OcrConfig};
use crate::error::OcrError;

use super::api::{GoogleVisionClient, OpenAiVisionClient};
use super::engine_cache::EngineCache;
use super::{LanguageHint, OcrEngine};

/// Idle Tesseract engines kept across requests, one per language set.
const MAX_IDLE_ENGINES: usize = 4;

#[derive(Clone)]
enum OcrBackend {
    Local {
        engines: EngineCache<LepTess>,
        tessdata_path: Option<String>,
    },
    GoogleVision(GoogleVisionClient),
    OpenAi(OpenAiVisionClient),
    Unavailable {
        reason: String,
    },
}

#[derive(Clone)]
pub struct OcrProvider {
    backend: OcrBackend,
    timeout_secs: u64,
}

fn create_tesseract(tessdata_path: Option<&str>, languages: &str) -> Result<LepTess, String> {
    LepTess::new(tessdata_path, languages).map_err(|e| e.to_string())
}

impl OcrProvider {
    pub fn new(config: &OcrConfig) -> Self {
        let backend = match config.backend {
            OcrBackendKind::GoogleVision => match GoogleVisionClient::new(config) {
                Ok(client) => {
                    info!("Google Cloud Vision OCR backend initialized");
                    OcrBackend::GoogleVision(client)
                }
                Err(e) => {
                    let reason = format!("Google Cloud Vision backend unavailable: {e}");
                    warn!("{}", reason);
                    OcrBackend::Unavailable { reason }
                }
            },
            OcrBackendKind::OpenAi => match OpenAiVisionClient::new(config) {
                Ok(client) => {
                    info!("OpenAI Vision OCR backend initialized");
                    OcrBackend::OpenAi(client)
                }
                Err(e) => {
                    let reason = format!("OpenAI Vision OCR backend unavailable: {e}");
                    warn!("{}", reason);
                    OcrBackend::Unavailable { reason }
                }
            },
            OcrBackendKind::Tesseract => Self::init_tesseract(config),
        };

        Self {
            backend,
            timeout_secs: config.timeout_secs,
        }
    }

    /// Warm the engine for the default language set so a missing Tesseract
    /// install is reported at startup instead of on the first request.
    fn init_tesseract(config: &OcrConfig) -> OcrBackend {
        let default_codes = config
            .languages
            .parse::<LanguageHint>()
            .unwrap_or_default()
            .tesseract_codes();

        match create_tesseract(config.tessdata_path.as_deref(), &default_codes) {
            Ok(lt) => {
                info!(languages = %default_codes, "Tesseract OCR initialized");
                let engines = EngineCache::new(MAX_IDLE_ENGINES);
                engines.checkin(default_codes, lt);
                OcrBackend::Local {
                    engines,
                    tessdata_path: config.tessdata_path.clone(),
                }
            }
            Err(e) => {
                let reason = format!("Tesseract not available: {e}");
                warn!("{}", reason);
                OcrBackend::Unavailable { reason }
            }
        }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self.backend, OcrBackend::Unavailable { .. })
    }

    pub fn backend_name(&self) -> &'static str {
        match self.backend {
            OcrBackend::Local { .. } => "tesseract",
            OcrBackend::GoogleVision(_) => "google-vision",
            OcrBackend::OpenAi(_) => "openai",
            OcrBackend::Unavailable { .. } => "unavailable",
        }
    }

    async fn ocr_internal(&self, png: &[u8], language: &LanguageHint) -> Result<String, OcrError> {
        match &self.backend {
            OcrBackend::Local {
                engines,
                tessdata_path,
            } => {
                let bytes = png.to_vec();
                let engines = engines.clone();
                let tessdata_path = tessdata_path.clone();
                let codes = language.tesseract_codes();

                tokio::task::spawn_blocking(move || {
                    let mut lt = engines.checkout(&codes, || {
                        debug!(languages = %codes, "Creating Tesseract engine");
                        create_tesseract(tessdata_path.as_deref(), &codes).map_err(|e| {
                            OcrError::Unavailable(format!("Tesseract languages '{codes}': {e}"))
                        })
                    })?;

                    let result = lt
                        .set_image_from_mem(&bytes)
                        .map_err(|e| OcrError::Engine(format!("Failed to set image: {e}")))
                        .and_then(|()| {
                            lt.get_utf8_text().map_err(|e| {
                                OcrError::Engine(format!("Failed to extract text: {e}"))
                            })
                        });

                    engines.checkin(codes, lt);
                    debug!(idle = engines.len(), "Tesseract engine returned");
                    result
                })
                .await
                .map_err(|e| OcrError::Engine(format!("OCR task panicked: {e}")))?
            }
            OcrBackend::GoogleVision(client) => client.ocr(png, language).await,
            OcrBackend::OpenAi(client) => client.ocr(png, language).await,
            OcrBackend::Unavailable { reason } => Err(OcrError::Unavailable(reason.clone())),
        }
    }
}

#[async_trait]
impl OcrEngine for OcrProvider {
    async fn extract_text(&self, png: &[u8], language: &LanguageHint) -> Result<String, OcrError> {
        let timeout_duration = Duration::from_secs(self.timeout_secs);

        match tokio::time::timeout(timeout_duration, self.ocr_internal(png, language)).await {
            Ok(result) => result.map(|text| text.trim().to_string()),
            Err(_) => Err(OcrError::Timeout(self.timeout_secs)),
        }
    }
}
