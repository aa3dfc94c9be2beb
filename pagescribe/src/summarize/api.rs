use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    error::{ApiError, OpenAIError},
    types::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequest, CreateChatCompletionRequestArgs, CreateChatCompletionResponse,
    },
    Client,
};
use async_trait::async_trait;
use tracing::debug;

use crate::config::SummaryConfig;
use crate::error::SummaryError;

use super::prompts::{page_summary_message, DEFAULT_SYSTEM_PROMPT};
use super::{truncate_input, Summarizer};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Clone)]
pub struct OpenAiSummarizer {
    client: Client<OpenAIConfig>,
    model: String,
    system_prompt: String,
    timeout_secs: u64,
    max_input_chars: usize,
    max_tokens: u32,
    temperature: f32,
}

impl OpenAiSummarizer {
    pub fn new(config: &SummaryConfig) -> Result<Self, SummaryError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| SummaryError::Unavailable("API key required".to_string()))?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| OPENAI_BASE_URL.to_string());

        let openai_config = OpenAIConfig::new()
            .with_api_base(base_url)
            .with_api_key(api_key);

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| {
                SummaryError::Unavailable(format!("Failed to create HTTP client: {error}"))
            })?;

        // async-openai retries 429 and 5xx internally; a zero max elapsed time
        // turns every failure into a single attempt.
        let backoff = backoff::ExponentialBackoff {
            max_elapsed_time: Some(Duration::ZERO),
            ..Default::default()
        };

        let client = Client::with_config(openai_config)
            .with_http_client(http_client)
            .with_backoff(backoff);

        Ok(Self {
            client,
            model: config.model.clone(),
            system_prompt: config
                .prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            timeout_secs: config.timeout_secs,
            max_input_chars: config.max_input_chars,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    fn build_request(&self, text: &str) -> Result<CreateChatCompletionRequest, SummaryError> {
        let (input, truncated) = truncate_input(text, self.max_input_chars);
        if truncated {
            debug!(
                original_chars = text.chars().count(),
                kept_chars = input.chars().count(),
                "Summary input truncated"
            );
        }

        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(self.system_prompt.as_str())
                .build()
                .map_err(|error| SummaryError::Request(format!("Invalid system prompt: {error}")))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(page_summary_message(input, truncated))
                .build()
                .map_err(|error| SummaryError::Request(format!("Invalid user prompt: {error}")))?
                .into(),
        ];

        CreateChatCompletionRequestArgs::default()
            .model(self.model.clone())
            .messages(messages)
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
            .build()
            .map_err(|error| SummaryError::Request(format!("Invalid completion request: {error}")))
    }

    fn extract_content(response: CreateChatCompletionResponse) -> Result<String, SummaryError> {
        let message = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| {
                SummaryError::MalformedResponse("response contained no choices".to_string())
            })?
            .message
            .content
            .unwrap_or_default();

        if message.trim().is_empty() {
            return Err(SummaryError::MalformedResponse(
                "response contained empty content".to_string(),
            ));
        }

        Ok(message.trim().to_string())
    }

    fn map_openai_error(&self, error: OpenAIError) -> SummaryError {
        match error {
            OpenAIError::Reqwest(reqwest_error) => {
                if reqwest_error.is_timeout() {
                    SummaryError::Timeout(self.timeout_secs)
                } else if reqwest_error.status() == Some(reqwest::StatusCode::TOO_MANY_REQUESTS) {
                    SummaryError::RateLimited
                } else if reqwest_error.status() == Some(reqwest::StatusCode::UNAUTHORIZED)
                    || reqwest_error.status() == Some(reqwest::StatusCode::FORBIDDEN)
                {
                    SummaryError::Auth(reqwest_error.to_string())
                } else {
                    SummaryError::Request(reqwest_error.to_string())
                }
            }
            OpenAIError::ApiError(api_error) if is_rate_limit_api_error(&api_error) => {
                SummaryError::RateLimited
            }
            OpenAIError::ApiError(api_error) if is_auth_api_error(&api_error) => {
                SummaryError::Auth(api_error.to_string())
            }
            OpenAIError::ApiError(api_error) => {
                SummaryError::Request(format!("API error: {api_error}"))
            }
            OpenAIError::JSONDeserialize(err) => SummaryError::MalformedResponse(err.to_string()),
            other => SummaryError::Request(other.to_string()),
        }
    }
}

fn is_rate_limit_api_error(api_error: &ApiError) -> bool {
    let message = api_error.message.to_lowercase();
    let error_type = api_error.r#type.clone().unwrap_or_default().to_lowercase();
    let code = api_error.code.clone().unwrap_or_default().to_lowercase();

    message.contains("rate limit")
        || message.contains("too many requests")
        || error_type.contains("rate_limit")
        || code.contains("rate_limit")
        || code == "insufficient_quota"
}

fn is_auth_api_error(api_error: &ApiError) -> bool {
    let message = api_error.message.to_lowercase();
    let error_type = api_error.r#type.clone().unwrap_or_default().to_lowercase();
    let code = api_error.code.clone().unwrap_or_default().to_lowercase();

    message.contains("unauthorized")
        || message.contains("authentication")
        || message.contains("invalid api key")
        || code.contains("invalid_api_key")
        || error_type.contains("authentication")
}

#[async_trait]
impl Summarizer for OpenAiSummarizer {
    async fn summarize(&self, text: &str) -> Result<String, SummaryError> {
        let request = self.build_request(text)?;

        let chat = self.client.chat();
        let call = chat.create(request);
        match tokio::time::timeout(Duration::from_secs(self.timeout_secs), call).await {
            Ok(Ok(response)) => Self::extract_content(response),
            Ok(Err(error)) => Err(self.map_openai_error(error)),
            Err(_) => Err(SummaryError::Timeout(self.timeout_secs)),
        }
    }
}
