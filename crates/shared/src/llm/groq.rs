use std::env;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::warn;

use super::gateway::{
    ChatMessage, LlmGateway, LlmGatewayError, LlmGatewayFuture, LlmGatewayResponse, LlmTokenUsage,
};

const DEFAULT_CHAT_COMPLETIONS_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
const DEFAULT_MODEL: &str = "openai/gpt-oss-20b";
const DEFAULT_TIMEOUT_MS: u64 = 30_000;

#[derive(Debug, Clone)]
pub struct GroqGatewayConfig {
    pub chat_completions_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout_ms: u64,
}

impl GroqGatewayConfig {
    pub fn from_env() -> Result<Self, GroqConfigError> {
        let api_key = require_non_empty_env("GROQ_API_KEY")?;
        let chat_completions_url = optional_trimmed_env("GROQ_CHAT_COMPLETIONS_URL")
            .unwrap_or_else(|| DEFAULT_CHAT_COMPLETIONS_URL.to_string());
        if !chat_completions_url.starts_with("http://")
            && !chat_completions_url.starts_with("https://")
        {
            return Err(GroqConfigError::InvalidConfiguration(
                "GROQ_CHAT_COMPLETIONS_URL must start with http:// or https://".to_string(),
            ));
        }

        Ok(Self {
            chat_completions_url,
            api_key,
            model: optional_trimmed_env("GROQ_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            timeout_ms: parse_u64_env("GROQ_TIMEOUT_MS", DEFAULT_TIMEOUT_MS)?,
        })
    }
}

#[derive(Debug, Error)]
pub enum GroqConfigError {
    #[error("missing required env var {0}")]
    MissingVar(String),
    #[error("invalid integer in env var {key}: {value}")]
    ParseInt { key: String, value: String },
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("failed to build Groq http client: {0}")]
    HttpClient(String),
}

/// One-shot chat-completions client. A failed request surfaces to the caller
/// unrecovered: no retry, no fallback model.
#[derive(Clone)]
pub struct GroqGateway {
    client: reqwest::Client,
    config: GroqGatewayConfig,
}

impl GroqGateway {
    pub fn new(config: GroqGatewayConfig) -> Result<Self, GroqConfigError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|err| GroqConfigError::HttpClient(err.to_string()))?;

        Ok(Self { client, config })
    }

    async fn send_once(
        &self,
        messages: &[ChatMessage],
    ) -> Result<LlmGatewayResponse, LlmGatewayError> {
        let request_body = json!({
            "model": self.config.model,
            "messages": messages,
        });

        let response = self
            .client
            .post(&self.config.chat_completions_url)
            .bearer_auth(&self.config.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    LlmGatewayError::Timeout
                } else {
                    LlmGatewayError::ProviderFailure("request_unavailable".to_string())
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|_| {
            LlmGatewayError::InvalidProviderPayload("response_body_read_failed".to_string())
        })?;

        if !status.is_success() {
            let provider_code = parse_provider_error_code(&body);
            warn!("groq chat completion failed: status={status} code={provider_code}");
            return Err(LlmGatewayError::ProviderFailure(format!(
                "status={} code={provider_code}",
                status.as_u16()
            )));
        }

        let parsed: GroqSuccessResponse = serde_json::from_str(&body).map_err(|_| {
            LlmGatewayError::InvalidProviderPayload("response_json_parse_failed".to_string())
        })?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmGatewayError::InvalidProviderPayload("missing_choice".to_string()))?;

        Ok(LlmGatewayResponse {
            model: parsed.model,
            content: choice.message.content,
            usage: parsed.usage,
        })
    }
}

impl LlmGateway for GroqGateway {
    fn generate<'a>(&'a self, messages: Vec<ChatMessage>) -> LlmGatewayFuture<'a> {
        Box::pin(async move { self.send_once(&messages).await })
    }
}

#[derive(Debug, Deserialize)]
struct GroqSuccessResponse {
    model: String,
    choices: Vec<GroqChoice>,
    usage: Option<LlmTokenUsage>,
}

#[derive(Debug, Deserialize)]
struct GroqChoice {
    message: GroqChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct GroqChoiceMessage {
    content: String,
}

fn parse_provider_error_code(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("error")
                .and_then(|error| error.get("code"))
                .and_then(Value::as_str)
                .map(ToString::to_string)
        })
        .unwrap_or_else(|| "unknown".to_string())
}

fn require_non_empty_env(key: &str) -> Result<String, GroqConfigError> {
    optional_trimmed_env(key).ok_or_else(|| GroqConfigError::MissingVar(key.to_string()))
}

fn optional_trimmed_env(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn parse_u64_env(key: &str, default: u64) -> Result<u64, GroqConfigError> {
    match optional_trimmed_env(key) {
        Some(raw) => raw.parse::<u64>().map_err(|_| GroqConfigError::ParseInt {
            key: key.to_string(),
            value: raw,
        }),
        None => Ok(default),
    }
}
