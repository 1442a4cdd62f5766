use thiserror::Error;

use crate::state::Stage;

/// A single failed attempt against the reasoning service.
#[derive(Debug, Clone, Error)]
pub enum ReasoningError {
    /// Non-2xx status from the provider.
    #[error("reasoning service error {status}: {body}")]
    Transport { status: u16, body: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The reply contained no extractable JSON object.
    #[error("could not parse JSON from model output: {raw}")]
    Malformed { raw: String },
}

#[derive(Debug, Clone, Error)]
pub enum SearchError {
    #[error("search provider error {status}: {body}")]
    Transport { status: u16, body: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Failures that abort processing of one claim (or startup, for config).
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("{var} is not set (export it in your env; do not hardcode secrets in scripts)")]
    MissingCredential { var: &'static str },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Retries exhausted; `last` is the final attempt's failure.
    #[error("reasoning service failed after {attempts} attempts: {last}")]
    MalformedModelResponse {
        attempts: u32,
        #[source]
        last: ReasoningError,
    },

    #[error("math claim could not be evaluated: {0}")]
    InvalidExpression(#[from] polygraph_calc::InvalidExpression),

    #[error("evidence search failed: {0}")]
    Search(#[from] SearchError),

    #[error("illegal pipeline transition {from:?} -> {to:?}")]
    InvalidTransition { from: Stage, to: Stage },
}
