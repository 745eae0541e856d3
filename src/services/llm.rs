use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub total_tokens: i64,
}

/// A chat model that answers a single user message.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> AppResult<Completion>;
}

/// Approximate: 1 token ≈ 4 characters
pub fn estimate_tokens(text: &str) -> i64 {
    (text.chars().count() as f64 / 4.0).ceil() as i64
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiChatModel {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    total_tokens: Option<i64>,
}

impl OpenAiChatModel {
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.llm_timeout_secs))
            .build()?;

        if config.openai_api_key.is_empty() {
            warn!("OPENAI_API_KEY is not set");
        }

        Ok(Self {
            client,
            base_url: config.openai_api_base_url.trim_end_matches('/').to_string(),
            api_key: config.openai_api_key.clone(),
            model: config.llm_model.clone(),
            temperature: config.llm_temperature,
            max_tokens: config.llm_max_tokens,
        })
    }

    fn into_completion(prompt: &str, response: CompletionResponse) -> AppResult<Completion> {
        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .ok_or_else(|| {
                AppError::ExternalServiceError("Failed to generate response".to_string())
            })?;

        let total_tokens = response
            .usage
            .and_then(|u| u.total_tokens)
            .unwrap_or_else(|| estimate_tokens(prompt) + estimate_tokens(&text));

        Ok(Completion { text, total_tokens })
    }
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    async fn complete(&self, prompt: &str) -> AppResult<Completion> {
        let url = format!("{}/chat/completions", self.base_url);
        let payload = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });

        debug!("Completion request - URL: {}, model: {}", url, self.model);

        let mut request_builder = self.client.post(&url).json(&payload);
        if !self.api_key.is_empty() {
            request_builder =
                request_builder.header("Authorization", format!("Bearer {}", self.api_key));
        }

        let response = request_builder.send().await.map_err(|e| {
            error!("Completion request failed: {}", e);
            AppError::ExternalServiceError("Failed to generate response".to_string())
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Completion API returned {}: {}", status, body);
            return Err(AppError::ExternalServiceError(
                "Failed to generate response".to_string(),
            ));
        }

        let body = response.json::<CompletionResponse>().await.map_err(|e| {
            error!("Invalid completion response: {}", e);
            AppError::ExternalServiceError("Failed to generate response".to_string())
        })?;

        Self::into_completion(prompt, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
        // counted in characters, not bytes
        assert_eq!(estimate_tokens("åäöå"), 1);
    }

    #[test]
    fn test_completion_uses_reported_usage() {
        let response: CompletionResponse = serde_json::from_value(json!({
            "choices": [{ "message": { "role": "assistant", "content": "Hej!" } }],
            "usage": { "prompt_tokens": 40, "completion_tokens": 2, "total_tokens": 42 }
        }))
        .unwrap();

        let completion = OpenAiChatModel::into_completion("prompt", response).unwrap();
        assert_eq!(completion.text, "Hej!");
        assert_eq!(completion.total_tokens, 42);
    }

    #[test]
    fn test_completion_estimates_missing_usage() {
        let response: CompletionResponse = serde_json::from_value(json!({
            "choices": [{ "message": { "content": "12345678" } }]
        }))
        .unwrap();

        let completion = OpenAiChatModel::into_completion("abcd", response).unwrap();
        assert_eq!(completion.total_tokens, 3);
    }

    #[test]
    fn test_empty_choices_is_an_error() {
        let response: CompletionResponse =
            serde_json::from_value(json!({ "choices": [] })).unwrap();
        assert!(matches!(
            OpenAiChatModel::into_completion("p", response),
            Err(AppError::ExternalServiceError(_))
        ));
    }
}
