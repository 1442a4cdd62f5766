//! Reasoning-service interface and the retrying JSON gateway.
//!
//! Providers implement [`ReasoningService`] and only move text. The
//! [`ModelGateway`] owns the resilience policy:
//!
//! - extract/repair a JSON object from each reply ([`ModelReply`]),
//! - treat transport errors and unparsable replies alike,
//! - retry with exponential backoff, attempt `i` sleeping `min(base * 2^i, cap)`,
//! - give up with [`AgentError::MalformedModelResponse`] after the ceiling.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{AgentError, ReasoningError};
use crate::json_repair::{JsonObject, ModelReply};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

impl CompletionRequest {
    /// Deterministic sampling (`temperature = 0`, `top_p = 0.95`).
    pub fn new(system: &str, user: &str, max_tokens: u32) -> Self {
        Self {
            messages: vec![
                Message {
                    role: Role::System,
                    content: system.to_string(),
                },
                Message {
                    role: Role::User,
                    content: user.to_string(),
                },
            ],
            max_tokens,
            temperature: 0.0,
            top_p: 0.95,
        }
    }

    pub fn system(&self) -> Option<&str> {
        self.content_of(Role::System)
    }

    pub fn user(&self) -> Option<&str> {
        self.content_of(Role::User)
    }

    fn content_of(&self, role: Role) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == role)
            .map(|m| m.content.as_str())
    }
}

/// A hosted language model that turns a prompt pair into text.
#[async_trait]
pub trait ReasoningService: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ReasoningError>;
}

#[async_trait]
impl<T: ReasoningService + ?Sized> ReasoningService for Arc<T> {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ReasoningError> {
        (**self).complete(request).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Always at least 1.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(20),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
        }
    }

    /// Retries without sleeping in between.
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO, Duration::ZERO)
    }

    /// Delay after the failed attempt with zero-based index `attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

pub struct ModelGateway {
    service: Box<dyn ReasoningService>,
    retry: RetryPolicy,
}

impl ModelGateway {
    pub fn new(service: Box<dyn ReasoningService>, retry: RetryPolicy) -> Self {
        Self { service, retry }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Ask for a JSON object, retrying until one can be extracted.
    pub async fn request_object(
        &self,
        system: &str,
        user: &str,
        max_tokens: u32,
    ) -> Result<JsonObject, AgentError> {
        let request = CompletionRequest::new(system, user, max_tokens);
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt: u32 = 0;

        loop {
            match self.attempt(&request).await {
                Ok(obj) => return Ok(obj),
                Err(last) => {
                    attempt += 1;
                    if attempt >= max_attempts {
                        return Err(AgentError::MalformedModelResponse {
                            attempts: attempt,
                            last,
                        });
                    }
                    let delay = self.retry.delay_for(attempt - 1);
                    warn!(
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %last,
                        "reasoning call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn attempt(&self, request: &CompletionRequest) -> Result<JsonObject, ReasoningError> {
        if let Some(user) = request.user() {
            debug!(user_preview = %preview(user, 120), "reasoning call");
        }
        let content = self.service.complete(request).await?;
        debug!(content_preview = %preview(&content, 200), "reasoning reply");

        match ModelReply::parse(&content) {
            ModelReply::Object(obj) => {
                debug!(?obj, "normalized reply object");
                Ok(obj)
            }
            ModelReply::Malformed(raw) => Err(ReasoningError::Malformed {
                raw: preview(&raw, 300),
            }),
        }
    }
}

/// First `max_chars` characters with newlines flattened.
pub(crate) fn preview(text: &str, max_chars: usize) -> String {
    text.chars()
        .take(max_chars)
        .map(|c| if c == '\n' { ' ' } else { c })
        .collect()
}
