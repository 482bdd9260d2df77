use super::LlmClient;
use crate::errors::GenerationError;
use crate::model::LlmResponse;
use async_trait::async_trait;
use serde_json::json;

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_MODEL: &str = "openai/gpt-oss-120b:free";
pub const API_KEY_VAR: &str = "OPENROUTER_API_KEY";

pub struct OpenRouterClient {
    pub model: String,
    pub api_key: String,
    pub base_url: String,
    pub client: reqwest::Client,
}

impl OpenRouterClient {
    pub fn new(model: String, api_key: String) -> Self {
        Self {
            model,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl LlmClient for OpenRouterClient {
    async fn complete(
        &self,
        prompt: &str,
        system: Option<&str>,
    ) -> Result<LlmResponse, GenerationError> {
        if self.api_key.is_empty() {
            return Err(GenerationError::NotConfigured { var: API_KEY_VAR });
        }

        let mut messages = Vec::new();
        if let Some(system) = system {
            messages.push(json!({
                "role": "system",
                "content": system
            }));
        }
        messages.push(json!({
            "role": "user",
            "content": prompt
        }));

        let body = json!({
            "model": self.model,
            "messages": messages,
        });

        let resp = self
            .client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            // Prefer the provider's own message; fall back to the status line.
            let err_body: serde_json::Value = resp.json().await.unwrap_or_default();
            let message = err_body
                .pointer("/error/message")
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| format!("OpenRouter {}", status.as_u16()));
            tracing::warn!(
                event = "generation_upstream_error",
                status = status.as_u16(),
                message = %message
            );
            return Err(GenerationError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let json: serde_json::Value = resp.json().await?;

        // choices[0].message.content; anything else reads as empty text
        let text = json
            .pointer("/choices/0/message/content")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        Ok(LlmResponse {
            text,
            provider: "openrouter".to_string(),
            model: self.model.clone(),
        })
    }

    fn provider_name(&self) -> &'static str {
        "openrouter"
    }
}
