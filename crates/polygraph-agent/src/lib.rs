//! Polygraph Agent: claim routing, evidence gathering and verdicts
//!
//! Given a natural-language claim, the agent decides whether it is arithmetic
//! or a general factual statement, resolves it with the matching method, and
//! produces a boolean verdict.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────────────┐
//! │                          CLAIM PIPELINE                                │
//! ├────────────────────────────────────────────────────────────────────────┤
//! │                                                                        │
//! │   claim ──► Classifier ──┬── calc ──► Evaluator (polygraph-calc) ──┐   │
//! │               (LLM +     │                                         │   │
//! │             heuristic)   └── web ───► Rewriter ──► Search ─────────┤   │
//! │                                        (LLM)      (≤ 7 hits)       │   │
//! │                                                                    ▼   │
//! │                                                  Judge ──► verdict     │
//! │                                      (pass-through / LLM)              │
//! └────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The reasoning service is **untrusted**: every reply goes through JSON
//! extraction/repair (`json_repair`) and field-by-field validation with an
//! explicit default for each stage. Transport and parse failures are retried
//! with exponential backoff by the [`ModelGateway`]; exhausting the attempts
//! aborts that claim only.
//!
//! A [`Pipeline`] owns its collaborators and holds no per-claim state, so one
//! instance can serve many claims concurrently behind an `Arc`.

pub mod classifier;
pub mod config;
pub mod error;
pub mod gateway;
pub mod json_repair;
pub mod judge;
pub mod pipeline;
pub mod prompts;
pub mod providers;
pub mod rewriter;
pub mod search;
pub mod state;

pub use classifier::{fallback_route, Classification, RouteSource};
pub use config::{AgentConfig, ReasoningConfig, SearchConfig};
pub use error::{AgentError, ReasoningError, SearchError};
pub use gateway::{CompletionRequest, Message, ModelGateway, ReasoningService, RetryPolicy, Role};
pub use json_repair::{JsonObject, ModelReply};
pub use pipeline::{route_decision, Pipeline};
pub use search::{SearchProvider, MAX_SEARCH_RESULTS};
pub use state::{Claim, EvidenceItem, PipelineState, Route, Stage};
