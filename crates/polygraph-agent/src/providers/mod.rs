//! Concrete collaborators for the pipeline.
//!
//! - `openrouter`: OpenAI-compatible chat completions (feature `openrouter`)
//! - `tavily`: web search (feature `tavily`)
//! - `mock`: scripted doubles for offline runs and tests

#[cfg(feature = "openrouter")]
pub mod openrouter;

#[cfg(feature = "tavily")]
pub mod tavily;

pub mod mock;

#[cfg(feature = "openrouter")]
pub use openrouter::OpenRouterClient;

#[cfg(feature = "tavily")]
pub use tavily::TavilyClient;

pub use mock::{ScriptedReasoner, StagedReasoner, StaticSearch};
