//! HTTP API連携モジュール
//!
//! Anthropic Messages API と OpenAI互換 Chat Completions API（Groq等）に対応。

use super::CompletionBackend;
use crate::ai_provider::AiProvider;
use crate::config::Config;
use crate::error::{Result, ScorerError};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiFlavor {
    Anthropic,
    OpenAiCompatible,
}

/// API呼び出し設定
#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub flavor: ApiFlavor,
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl ApiSettings {
    pub fn from_config(provider: AiProvider, config: &Config) -> Result<Self> {
        let flavor = match provider {
            AiProvider::AnthropicApi => ApiFlavor::Anthropic,
            AiProvider::GroqApi => ApiFlavor::OpenAiCompatible,
            other => {
                return Err(ScorerError::Config(format!("{:?} はAPIプロバイダではありません", other)))
            }
        };

        Ok(Self {
            flavor,
            endpoint: config.endpoint_for(provider)?,
            api_key: config.get_api_key(provider)?,
            model: config.model_for(provider),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout: Duration::from_secs(config.timeout_seconds),
        })
    }
}

pub struct HttpBackend {
    client: Client,
    settings: ApiSettings,
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Message,
}

impl HttpBackend {
    pub fn new(settings: ApiSettings) -> Result<Self> {
        let client = Client::builder().timeout(settings.timeout).build()?;
        Ok(Self { client, settings })
    }

    fn request_body(&self, prompt: &str) -> CompletionRequest<'_> {
        CompletionRequest {
            model: &self.settings.model,
            max_tokens: self.settings.max_tokens,
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: self.settings.temperature,
        }
    }
}

impl CompletionBackend for HttpBackend {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = self
            .client
            .post(&self.settings.endpoint)
            .header("Content-Type", "application/json")
            .json(&self.request_body(prompt));

        let request = match self.settings.flavor {
            ApiFlavor::Anthropic => request
                .header("x-api-key", &self.settings.api_key)
                .header("anthropic-version", "2023-06-01"),
            ApiFlavor::OpenAiCompatible => request.bearer_auth(&self.settings.api_key),
        };

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ScorerError::ApiCall(format!("API returned {}: {}", status, body)));
        }

        match self.settings.flavor {
            ApiFlavor::Anthropic => {
                let body: AnthropicResponse = response.json().await?;
                body.content
                    .into_iter()
                    .find_map(|block| (block.content_type == "text").then_some(block.text).flatten())
                    .ok_or_else(|| ScorerError::ApiCall("No text content in response".to_string()))
            }
            ApiFlavor::OpenAiCompatible => {
                let body: ChatResponse = response.json().await?;
                body.choices
                    .into_iter()
                    .next()
                    .map(|choice| choice.message.content)
                    .ok_or_else(|| ScorerError::ApiCall("No choices in response".to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(flavor: ApiFlavor) -> ApiSettings {
        ApiSettings {
            flavor,
            endpoint: "http://127.0.0.1:9/v1".to_string(),
            api_key: "test-key".to_string(),
            model: "test-model".to_string(),
            temperature: 0.0,
            max_tokens: 64,
            timeout: Duration::from_secs(2),
        }
    }

    #[test]
    fn test_request_body_uses_zero_temperature() {
        let backend = HttpBackend::new(settings(ApiFlavor::Anthropic)).unwrap();
        let body = serde_json::to_value(backend.request_body("score this")).unwrap();
        assert_eq!(body["temperature"], 0.0);
        assert_eq!(body["model"], "test-model");
        assert_eq!(body["messages"][0]["content"], "score this");
    }

    #[test]
    fn test_settings_require_api_provider() {
        let config = Config {
            api_key: Some("k".into()),
            ..Config::default()
        };
        assert!(ApiSettings::from_config(AiProvider::Claude, &config).is_err());
        let groq = ApiSettings::from_config(AiProvider::GroqApi, &config).unwrap();
        assert_eq!(groq.flavor, ApiFlavor::OpenAiCompatible);
    }

    #[test]
    fn test_chat_response_shape() {
        let body: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"{\"quality_score\": 1}"}}]}"#,
        )
        .unwrap();
        assert_eq!(body.choices[0].message.content, "{\"quality_score\": 1}");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_error() {
        let backend = HttpBackend::new(settings(ApiFlavor::OpenAiCompatible)).unwrap();
        assert!(backend.complete("hi").await.is_err());
    }
}
