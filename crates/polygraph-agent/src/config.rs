//! Environment-driven configuration.
//!
//! Resolved once at startup. Missing credentials fail fast with
//! [`AgentError::MissingCredential`] before any claim is processed.

use std::time::Duration;

use crate::error::AgentError;
use crate::gateway::RetryPolicy;

pub const OPENROUTER_API_KEY_ENV: &str = "OPENROUTER_API_KEY";
pub const OR_MODEL_ENV: &str = "OR_MODEL";
pub const OR_BASE_URL_ENV: &str = "OR_BASE_URL";
pub const OR_HTTP_REFERER_ENV: &str = "OR_HTTP_REFERER";
pub const OR_APP_TITLE_ENV: &str = "OR_APP_TITLE";
pub const TAVILY_API_KEY_ENV: &str = "TAVILY_API_KEY";
pub const TAVILY_BASE_URL_ENV: &str = "TAVILY_BASE_URL";
pub const POLYGRAPH_LLM_TIMEOUT_SECS_ENV: &str = "POLYGRAPH_LLM_TIMEOUT_SECS";
pub const POLYGRAPH_LLM_MAX_ATTEMPTS_ENV: &str = "POLYGRAPH_LLM_MAX_ATTEMPTS";
pub const POLYGRAPH_LLM_BACKOFF_CAP_SECS_ENV: &str = "POLYGRAPH_LLM_BACKOFF_CAP_SECS";

pub const DEFAULT_MODEL: &str = "mistralai/mistral-7b-instruct";
pub const DEFAULT_OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_HTTP_REFERER: &str = "http://localhost";
pub const DEFAULT_APP_TITLE: &str = "polygraph-agent";
pub const DEFAULT_TAVILY_BASE_URL: &str = "https://api.tavily.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_MAX_ATTEMPTS: u64 = 6;
pub const DEFAULT_BACKOFF_CAP_SECS: u64 = 20;

#[derive(Debug, Clone)]
pub struct ReasoningConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub http_referer: String,
    pub app_title: String,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub reasoning: ReasoningConfig,
    pub search: SearchConfig,
}

impl AgentConfig {
    pub fn from_env() -> Result<Self, AgentError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source (the process env in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AgentError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let reasoning_key = required(&lookup, OPENROUTER_API_KEY_ENV)?;
        let search_key = required(&lookup, TAVILY_API_KEY_ENV)?;

        let timeout_secs = env_u64(
            &lookup,
            POLYGRAPH_LLM_TIMEOUT_SECS_ENV,
            DEFAULT_TIMEOUT_SECS,
            0,
            3_600,
        )?;
        if timeout_secs == 0 {
            return Err(AgentError::InvalidConfig(format!(
                "{POLYGRAPH_LLM_TIMEOUT_SECS_ENV}=0 is not a usable timeout"
            )));
        }
        let max_attempts = env_u64(
            &lookup,
            POLYGRAPH_LLM_MAX_ATTEMPTS_ENV,
            DEFAULT_MAX_ATTEMPTS,
            1,
            20,
        )?;
        let backoff_cap_secs = env_u64(
            &lookup,
            POLYGRAPH_LLM_BACKOFF_CAP_SECS_ENV,
            DEFAULT_BACKOFF_CAP_SECS,
            0,
            600,
        )?;
        let timeout = Duration::from_secs(timeout_secs);

        Ok(Self {
            reasoning: ReasoningConfig {
                api_key: reasoning_key,
                model: optional(&lookup, OR_MODEL_ENV, DEFAULT_MODEL),
                base_url: normalize_base_url(&optional(
                    &lookup,
                    OR_BASE_URL_ENV,
                    DEFAULT_OPENROUTER_BASE_URL,
                )),
                http_referer: optional(&lookup, OR_HTTP_REFERER_ENV, DEFAULT_HTTP_REFERER),
                app_title: optional(&lookup, OR_APP_TITLE_ENV, DEFAULT_APP_TITLE),
                timeout,
                retry: RetryPolicy::new(
                    max_attempts as u32,
                    Duration::from_secs(1),
                    Duration::from_secs(backoff_cap_secs),
                ),
            },
            search: SearchConfig {
                api_key: search_key,
                base_url: normalize_base_url(&optional(
                    &lookup,
                    TAVILY_BASE_URL_ENV,
                    DEFAULT_TAVILY_BASE_URL,
                )),
                timeout,
            },
        })
    }
}

fn required<F>(lookup: &F, name: &'static str) -> Result<String, AgentError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(AgentError::MissingCredential { var: name })
}

fn optional<F>(lookup: &F, name: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_u64<F>(lookup: &F, name: &str, default: u64, min: u64, max: u64) -> Result<u64, AgentError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(name) else {
        return Ok(default);
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(default);
    }
    let parsed = raw
        .parse::<u64>()
        .map_err(|_| AgentError::InvalidConfig(format!("invalid {name}={raw:?} (expected integer)")))?;
    Ok(parsed.clamp(min, max))
}

fn normalize_base_url(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}
