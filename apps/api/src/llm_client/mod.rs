//! LLM client: the only place that talks to the Anthropic Messages API.
//!
//! The job writer and the judge both wrap an `LlmClient`; nothing else sends
//! HTTP requests to the model provider. Every call carries an explicit sampling
//! temperature because candidate diversity is driven by it.
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// Model used for generation and judging.
pub const MODEL: &str = "claude-sonnet-4-5";
const MAX_TOKENS: u32 = 4096;
/// Upper bound for one HTTP exchange. Pipeline stages apply their own, shorter limits.
const HTTP_TIMEOUT: Duration = Duration::from_secs(120);
const MAX_ATTEMPTS: u32 = 3;
const BACKOFF_BASE: Duration = Duration::from_millis(1000);

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Gave up after {attempts} attempts")]
    Exhausted { attempts: u32 },

    #[error("LLM returned no text content")]
    EmptyContent,
}

// ────────────────────────────────────────────────────────────────────────────
// Wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    temperature: f64,
    messages: [UserTurn<'a>; 1],
}

#[derive(Debug, Serialize)]
struct UserTurn<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Text of one model reply plus token accounting.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub usage: Usage,
}

impl MessagesResponse {
    fn into_completion(self) -> Result<Completion, LlmError> {
        let text = self
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .find_map(|block| block.text)
            .filter(|text| !text.trim().is_empty())
            .ok_or(LlmError::EmptyContent)?;
        Ok(Completion {
            text,
            usage: self.usage,
        })
    }
}

/// 429 and 5xx are worth another attempt; every other failure status is final.
fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Exponential backoff: 1s, 2s, 4s, ...
fn backoff(attempt: u32) -> Duration {
    BACKOFF_BASE * 2u32.saturating_pow(attempt.saturating_sub(1))
}

// ────────────────────────────────────────────────────────────────────────────
// Client
// ────────────────────────────────────────────────────────────────────────────

/// Wraps the Anthropic Messages API with retry logic and a JSON helper.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
}

impl LlmClient {
    pub fn new(api_key: String) -> Result<Self, LlmError> {
        let client = Client::builder().timeout(HTTP_TIMEOUT).build()?;
        Ok(Self { client, api_key })
    }

    /// One completion. Transport errors, 429 and 5xx are retried with backoff.
    /// `temperature` is clamped to `[0, 1]`.
    pub async fn call(
        &self,
        prompt: &str,
        system: &str,
        temperature: f64,
    ) -> Result<Completion, LlmError> {
        let request = MessagesRequest {
            model: MODEL,
            max_tokens: MAX_TOKENS,
            system,
            temperature: temperature.clamp(0.0, 1.0),
            messages: [UserTurn {
                role: "user",
                content: prompt,
            }],
        };

        let mut last_error = None;
        for attempt in 0..MAX_ATTEMPTS {
            if attempt > 0 {
                let delay = backoff(attempt);
                warn!(
                    "LLM attempt {attempt} failed ({}), retrying in {}ms",
                    last_error
                        .as_ref()
                        .map(ToString::to_string)
                        .unwrap_or_default(),
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            match self.send(&request).await {
                Ok(completion) => {
                    debug!(
                        "LLM call ok at temperature {:.2}: input_tokens={}, output_tokens={}",
                        request.temperature,
                        completion.usage.input_tokens,
                        completion.usage.output_tokens
                    );
                    return Ok(completion);
                }
                Err(Attempt::Retry(e)) => last_error = Some(e),
                Err(Attempt::Fatal(e)) => return Err(e),
            }
        }

        Err(last_error.unwrap_or(LlmError::Exhausted {
            attempts: MAX_ATTEMPTS,
        }))
    }

    async fn send(&self, request: &MessagesRequest<'_>) -> Result<Completion, Attempt> {
        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(request)
            .send()
            .await
            .map_err(|e| Attempt::Retry(LlmError::Http(e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            let error = LlmError::Api {
                status: status.as_u16(),
                message,
            };
            return Err(if is_retryable(status) {
                Attempt::Retry(error)
            } else {
                Attempt::Fatal(error)
            });
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| Attempt::Fatal(LlmError::Http(e)))?;
        parsed.into_completion().map_err(Attempt::Fatal)
    }

    /// Calls the model and deserializes the reply as JSON.
    /// The prompt must instruct the model to return a single JSON object.
    pub async fn call_json<T: DeserializeOwned>(
        &self,
        prompt: &str,
        system: &str,
        temperature: f64,
    ) -> Result<T, LlmError> {
        let completion = self.call(prompt, system, temperature).await?;
        serde_json::from_str(extract_json(&completion.text)).map_err(LlmError::Parse)
    }
}

enum Attempt {
    Retry(LlmError),
    Fatal(LlmError),
}

/// The outermost `{...}` of a reply. Code fences and chatter around it are dropped.
fn extract_json(text: &str) -> &str {
    let text = text.trim();
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_drops_fences() {
        let input = "```json\n{\"scores\": [0.8]}\n```";
        assert_eq!(extract_json(input), "{\"scores\": [0.8]}");
    }

    #[test]
    fn test_extract_json_drops_surrounding_prose() {
        let input = "Here you go:\n{\"a\": {\"b\": 1}}\nHope that helps.";
        assert_eq!(extract_json(input), "{\"a\": {\"b\": 1}}");
    }

    #[test]
    fn test_extract_json_leaves_non_objects_alone() {
        assert_eq!(extract_json("  [1, 2] "), "[1, 2]");
    }

    #[test]
    fn test_request_serializes_temperature() {
        let request = MessagesRequest {
            model: MODEL,
            max_tokens: MAX_TOKENS,
            system: "sys",
            temperature: 0.35,
            messages: [UserTurn {
                role: "user",
                content: "hi",
            }],
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["temperature"], 0.35);
        assert_eq!(value["messages"][0]["role"], "user");
    }

    #[test]
    fn test_completion_takes_first_non_empty_text_block() {
        let response: MessagesResponse = serde_json::from_str(
            r#"{"content":[{"type":"tool_use"},{"type":"text","text":"{}"}],
                "usage":{"input_tokens":1,"output_tokens":2}}"#,
        )
        .unwrap();
        let completion = response.into_completion().unwrap();
        assert_eq!(completion.text, "{}");
        assert_eq!(completion.usage.output_tokens, 2);
    }

    #[test]
    fn test_blank_reply_is_empty_content() {
        let response: MessagesResponse = serde_json::from_str(
            r#"{"content":[{"type":"text","text":"  "}],"usage":{"input_tokens":1,"output_tokens":0}}"#,
        )
        .unwrap();
        assert!(matches!(response.into_completion(), Err(LlmError::EmptyContent)));
    }

    #[test]
    fn test_only_rate_limits_and_server_errors_retry() {
        assert!(is_retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable(StatusCode::BAD_GATEWAY));
        assert!(!is_retryable(StatusCode::BAD_REQUEST));
        assert!(!is_retryable(StatusCode::UNAUTHORIZED));
    }

    #[test]
    fn test_backoff_doubles() {
        assert_eq!(backoff(1), Duration::from_secs(1));
        assert_eq!(backoff(2), Duration::from_secs(2));
        assert_eq!(backoff(3), Duration::from_secs(4));
    }
}
