mod common;

use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use pagescribe::config::SummaryConfig;
use pagescribe::error::SummaryError;
use pagescribe::summarize::{SummaryProvider, Summarizer};

use common::summary_config;

fn config_for(server: &MockServer) -> SummaryConfig {
    SummaryConfig {
        base_url: Some(format!("{}/v1", server.uri())),
        ..summary_config()
    }
}

fn completion_body(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "created": 1,
        "model": "gpt-3.5-turbo",
        "choices": [
            {
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": content
                },
                "finish_reason": "stop"
            }
        ],
        "usage": {
            "prompt_tokens": 1,
            "completion_tokens": 1,
            "total_tokens": 2
        }
    })
}

fn api_error_body(message: &str, error_type: &str, code: &str) -> serde_json::Value {
    json!({
        "error": {
            "message": message,
            "type": error_type,
            "param": serde_json::Value::Null,
            "code": code
        }
    })
}

/// Text of the user message in a captured chat completion request.
fn user_message(body: &serde_json::Value) -> String {
    body["messages"]
        .as_array()
        .unwrap()
        .iter()
        .find(|m| m["role"] == "user")
        .and_then(|m| m["content"].as_str())
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn test_summary_returns_trimmed_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(completion_body("  A short summary.\n")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let provider = SummaryProvider::new(&config_for(&server));
    assert!(provider.is_available());

    let summary = provider.summarize("Once upon a time.").await.unwrap();
    assert_eq!(summary, "A short summary.");

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["model"], "gpt-3.5-turbo");
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(user_message(&body), "Once upon a time.");
}

#[tokio::test]
async fn test_long_input_is_truncated_before_sending() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("ok")))
        .mount(&server)
        .await;

    let config = SummaryConfig {
        max_input_chars: 10,
        ..config_for(&server)
    };
    let provider = SummaryProvider::new(&config);

    let text = format!("{}{}", "가".repeat(10), "TAIL-MARKER");
    provider.summarize(&text).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let message = user_message(&body);
    assert!(message.starts_with(&"가".repeat(10)));
    assert!(!message.contains("TAIL-MARKER"));
    assert!(message.contains("cut short"));
}

#[tokio::test]
async fn test_rate_limit_is_reported_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_json(api_error_body(
            "Rate limit reached for requests",
            "requests",
            "rate_limit_exceeded",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let provider = SummaryProvider::new(&config_for(&server));
    let result = provider.summarize("text").await;

    assert!(matches!(result, Err(SummaryError::RateLimited)));
}

#[tokio::test]
async fn test_bad_key_is_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(api_error_body(
            "Incorrect API key provided",
            "invalid_request_error",
            "invalid_api_key",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let provider = SummaryProvider::new(&config_for(&server));
    let result = provider.summarize("text").await;

    assert!(matches!(result, Err(SummaryError::Auth(_))));
}

#[tokio::test]
async fn test_empty_completion_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("   ")))
        .mount(&server)
        .await;

    let provider = SummaryProvider::new(&config_for(&server));
    let result = provider.summarize("text").await;

    assert!(matches!(result, Err(SummaryError::MalformedResponse(_))));
}

#[tokio::test]
async fn test_missing_key_is_unavailable() {
    let config = SummaryConfig {
        api_key: None,
        ..summary_config()
    };
    let provider = SummaryProvider::new(&config);

    assert!(!provider.is_available());
    assert!(matches!(
        provider.summarize("text").await,
        Err(SummaryError::Unavailable(_))
    ));
}
