use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::config::ReasoningConfig;
use crate::error::{AgentError, ReasoningError};
use crate::gateway::{preview, CompletionRequest, ReasoningService};

/// Chat-completions client for OpenRouter (or any OpenAI-compatible endpoint).
pub struct OpenRouterClient {
    client: Client,
    config: ReasoningConfig,
}

impl OpenRouterClient {
    pub fn new(config: ReasoningConfig) -> Result<Self, AgentError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AgentError::InvalidConfig(format!("http client: {e}")))?;
        Ok(Self { client, config })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url)
    }

    fn request_body(&self, request: &CompletionRequest) -> Value {
        let messages: Vec<Value> = request
            .messages
            .iter()
            .map(|m| json!({ "role": m.role.as_str(), "content": m.content }))
            .collect();

        json!({
            "model": self.config.model,
            "messages": messages,
            "temperature": request.temperature,
            "top_p": request.top_p,
            "max_tokens": request.max_tokens,
        })
    }
}

#[async_trait]
impl ReasoningService for OpenRouterClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ReasoningError> {
        info!(model = %self.config.model, "calling reasoning service");

        let response = self
            .client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .header("HTTP-Referer", &self.config.http_referer)
            .header("X-Title", &self.config.app_title)
            .json(&self.request_body(request))
            .send()
            .await
            .map_err(|e| ReasoningError::Network(e.to_string()))?;

        let status = response.status();
        info!(status = status.as_u16(), "reasoning service responded");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), body = %preview(&body, 800), "reasoning service error");
            return Err(ReasoningError::Transport {
                status: status.as_u16(),
                body: body.chars().take(500).collect(),
            });
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| ReasoningError::InvalidResponse(e.to_string()))?;

        message_content(&data)
    }
}

fn message_content(data: &Value) -> Result<String, ReasoningError> {
    data["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ReasoningError::InvalidResponse("missing choices[0].message.content".into()))
}
