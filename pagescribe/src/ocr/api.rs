use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::OcrConfig;
use crate::error::OcrError;

use super::LanguageHint;

const GOOGLE_VISION_BASE_URL: &str = "https://vision.googleapis.com/v1";
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const OPENAI_VISION_MODEL: &str = "gpt-4o-mini";

fn build_http_client(timeout_secs: u64) -> Result<Client, OcrError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| OcrError::Unavailable(format!("Failed to create HTTP client: {e}")))
}

fn map_transport_error(error: reqwest::Error, timeout_secs: u64) -> OcrError {
    if error.is_timeout() {
        OcrError::Timeout(timeout_secs)
    } else {
        OcrError::Request(error.to_string())
    }
}

/// Google Cloud Vision `images:annotate` client (API-key auth).
#[derive(Clone, Debug)]
pub struct GoogleVisionClient {
    client: Client,
    api_key: String,
    base_url: String,
    timeout_secs: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateRequest<'a> {
    requests: Vec<AnnotateImageRequest<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageRequest<'a> {
    image: VisionImage,
    features: Vec<VisionFeature>,
    image_context: ImageContext<'a>,
}

#[derive(Debug, Serialize)]
struct VisionImage {
    content: String,
}

#[derive(Debug, Serialize)]
struct VisionFeature {
    #[serde(rename = "type")]
    feature_type: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageContext<'a> {
    language_hints: Vec<&'a str>,
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<AnnotateImageResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageResponse {
    #[serde(default)]
    text_annotations: Vec<EntityAnnotation>,
    full_text_annotation: Option<TextAnnotation>,
    error: Option<VisionStatus>,
}

#[derive(Debug, Deserialize)]
struct EntityAnnotation {
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct TextAnnotation {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct VisionStatus {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

impl GoogleVisionClient {
    pub fn new(config: &OcrConfig) -> Result<Self, OcrError> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            OcrError::Unavailable("API key required for Google Cloud Vision".to_string())
        })?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| GOOGLE_VISION_BASE_URL.to_string());

        Ok(Self {
            client: build_http_client(config.timeout_secs)?,
            api_key,
            base_url,
            timeout_secs: config.timeout_secs,
        })
    }

    pub async fn ocr(&self, image_bytes: &[u8], language: &LanguageHint) -> Result<String, OcrError> {
        let request = AnnotateRequest {
            requests: vec![AnnotateImageRequest {
                image: VisionImage {
                    content: STANDARD.encode(image_bytes),
                },
                features: vec![VisionFeature {
                    feature_type: "TEXT_DETECTION",
                }],
                image_context: ImageContext {
                    language_hints: language.iso_codes(),
                },
            }],
        };

        let response = self
            .client
            .post(format!("{}/images:annotate", self.base_url))
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| map_transport_error(e, self.timeout_secs))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OcrError::Request(format!(
                "Vision API request failed: {status} - {body}"
            )));
        }

        let parsed: AnnotateResponse = response
            .json()
            .await
            .map_err(|e| OcrError::MalformedResponse(e.to_string()))?;

        let first = parsed
            .responses
            .into_iter()
            .next()
            .ok_or_else(|| OcrError::MalformedResponse("empty responses array".to_string()))?;

        if let Some(status) = first.error {
            return Err(OcrError::Engine(format!(
                "Vision API error {}: {}",
                status.code, status.message
            )));
        }

        let text = first
            .full_text_annotation
            .map(|a| a.text)
            .filter(|t| !t.is_empty())
            .or_else(|| first.text_annotations.into_iter().next().map(|a| a.description))
            .unwrap_or_default();

        Ok(text)
    }
}

/// OpenAI-compatible vision model used as an OCR engine.
#[derive(Clone, Debug)]
pub struct OpenAiVisionClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    timeout_secs: u64,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: Vec<ContentPart>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiVisionClient {
    pub fn new(config: &OcrConfig) -> Result<Self, OcrError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| OcrError::Unavailable("API key required for OpenAI Vision".to_string()))?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| OPENAI_BASE_URL.to_string());

        Ok(Self {
            client: build_http_client(config.timeout_secs)?,
            api_key,
            base_url,
            model: config
                .model
                .clone()
                .unwrap_or_else(|| OPENAI_VISION_MODEL.to_string()),
            timeout_secs: config.timeout_secs,
        })
    }

    pub async fn ocr(&self, image_bytes: &[u8], language: &LanguageHint) -> Result<String, OcrError> {
        let data_url = format!("data:image/png;base64,{}", STANDARD.encode(image_bytes));

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: vec![
                    ContentPart::Text {
                        text: format!(
                            "Extract all text from this book page. The page is written in: {}. \
                             Preserve line breaks. Return only the extracted text without any \
                             explanations or formatting.",
                            language.iso_codes().join(", ")
                        ),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl { url: data_url },
                    },
                ],
            }],
            max_tokens: 4096,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| map_transport_error(e, self.timeout_secs))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OcrError::Request(format!(
                "API request failed: {status} - {body}"
            )));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| OcrError::MalformedResponse(e.to_string()))?;

        chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.unwrap_or_default())
            .ok_or_else(|| OcrError::MalformedResponse("no choices in response".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OcrBackendKind;

    fn create_test_config() -> OcrConfig {
        OcrConfig {
            backend: OcrBackendKind::GoogleVision,
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

    #[test]
    fn test_vision_client_requires_api_key() {
        let result = GoogleVisionClient::new(&create_test_config());
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key required"));
    }

    #[test]
    fn test_openai_vision_client_requires_api_key() {
        let result = OpenAiVisionClient::new(&create_test_config());
        assert!(result.unwrap_err().to_string().contains("API key required"));
    }

    #[test]
    fn test_default_base_urls() {
        let mut config = create_test_config();
        config.api_key = Some("test-key".to_string());

        let vision = GoogleVisionClient::new(&config).unwrap();
        assert!(vision.base_url.contains("vision.googleapis.com"));

        let openai = OpenAiVisionClient::new(&config).unwrap();
        assert!(openai.base_url.contains("openai"));
        assert_eq!(openai.model, OPENAI_VISION_MODEL);
    }

    #[test]
    fn test_annotate_request_shape() {
        let hint = LanguageHint::default();
        let request = AnnotateRequest {
            requests: vec![AnnotateImageRequest {
                image: VisionImage {
                    content: STANDARD.encode([0xFF, 0xD8, 0xFF, 0xE0]),
                },
                features: vec![VisionFeature {
                    feature_type: "TEXT_DETECTION",
                }],
                image_context: ImageContext {
                    language_hints: hint.iso_codes(),
                },
            }],
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["requests"][0]["image"]["content"], "/9j/4A==");
        assert_eq!(json["requests"][0]["features"][0]["type"], "TEXT_DETECTION");
        assert_eq!(
            json["requests"][0]["imageContext"]["languageHints"],
            serde_json::json!(["ko", "en"])
        );
    }

    #[test]
    fn test_annotate_response_without_text_parses() {
        let parsed: AnnotateResponse = serde_json::from_str(r#"{"responses":[{}]}"#).unwrap();
        assert!(parsed.responses[0].full_text_annotation.is_none());
        assert!(parsed.responses[0].text_annotations.is_empty());
    }
}
