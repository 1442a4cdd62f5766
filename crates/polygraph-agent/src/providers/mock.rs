//! Offline collaborators.
//!
//! Used by the test suites and by drivers that want to exercise the pipeline
//! without credentials.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{ReasoningError, SearchError};
use crate::gateway::{CompletionRequest, ReasoningService};
use crate::prompts;
use crate::search::SearchProvider;
use crate::state::EvidenceItem;

/// Replays a fixed list of replies in order, cycling when exhausted, and
/// records every request it receives.
pub struct ScriptedReasoner {
    responses: Vec<Result<String, ReasoningError>>,
    response_idx: AtomicUsize,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedReasoner {
    pub fn new(responses: Vec<String>) -> Self {
        Self::with_results(responses.into_iter().map(Ok).collect())
    }

    pub fn with_results(responses: Vec<Result<String, ReasoningError>>) -> Self {
        Self {
            responses,
            response_idx: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn always(response: &str) -> Self {
        Self::new(vec![response.to_string()])
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl ReasoningService for ScriptedReasoner {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ReasoningError> {
        self.requests.lock().push(request.clone());
        if self.responses.is_empty() {
            return Err(ReasoningError::InvalidResponse("no scripted reply".into()));
        }
        let idx = self.response_idx.fetch_add(1, Ordering::SeqCst);
        self.responses[idx % self.responses.len()].clone()
    }
}

/// Answers by pipeline stage, keyed on the system prompt, so replies stay
/// correct when many claims interleave on one instance.
#[derive(Default)]
pub struct StagedReasoner {
    router: Option<String>,
    rewriter: Option<String>,
    judge: Option<String>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl StagedReasoner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_router(mut self, reply: &str) -> Self {
        self.router = Some(reply.to_string());
        self
    }

    pub fn with_rewriter(mut self, reply: &str) -> Self {
        self.rewriter = Some(reply.to_string());
        self
    }

    pub fn with_judge(mut self, reply: &str) -> Self {
        self.judge = Some(reply.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl ReasoningService for StagedReasoner {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ReasoningError> {
        self.requests.lock().push(request.clone());
        let reply = match request.system() {
            Some(prompts::ROUTER_SYSTEM) => &self.router,
            Some(prompts::REWRITE_SYSTEM) => &self.rewriter,
            Some(prompts::JUDGE_SYSTEM) => &self.judge,
            _ => &None,
        };
        reply
            .clone()
            .ok_or_else(|| ReasoningError::InvalidResponse("no reply staged for this prompt".into()))
    }
}

/// Returns the same evidence for every query.
pub struct StaticSearch {
    items: Vec<EvidenceItem>,
    failure: Option<SearchError>,
    queries: Mutex<Vec<(String, usize)>>,
}

impl StaticSearch {
    pub fn new(items: Vec<EvidenceItem>) -> Self {
        Self {
            items,
            failure: None,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Fails every search with a 503.
    pub fn unavailable() -> Self {
        Self {
            items: Vec::new(),
            failure: Some(SearchError::Transport {
                status: 503,
                body: "search unavailable".into(),
            }),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Each `(query, max_results)` pair received, in order.
    pub fn queries(&self) -> Vec<(String, usize)> {
        self.queries.lock().clone()
    }
}

#[async_trait]
impl SearchProvider for StaticSearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<EvidenceItem>, SearchError> {
        self.queries.lock().push((query.to_string(), max_results));
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        Ok(self.items.iter().take(max_results).cloned().collect())
    }
}
