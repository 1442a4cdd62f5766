//! The claim pipeline.
//!
//! ```text
//! Start ─► Classified ─┬─► MathEvaluated ───────────────────────┬─► Adjudicated
//!                      └─► QueryRewritten ─► EvidenceGathered ──┘
//! ```
//!
//! One linear run per claim, no loops and no retries at this level. The math
//! branch evaluates the original claim text, never the model's suggested
//! expression, so a claim routed to math that is not itself arithmetic aborts
//! with [`AgentError::InvalidExpression`].

use polygraph_calc::{check_equality, DEFAULT_EPSILON};
use tracing::{info, info_span, Instrument};

use crate::classifier;
use crate::error::AgentError;
use crate::gateway::ModelGateway;
use crate::judge;
use crate::rewriter;
use crate::search::{SearchProvider, MAX_SEARCH_RESULTS};
use crate::state::{Claim, PipelineState, Route};

/// Owns the collaborators; holds no per-claim state.
pub struct Pipeline {
    gateway: ModelGateway,
    search: Box<dyn SearchProvider>,
}

/// Branch selection. `Math` only for an explicit math route.
pub fn route_decision(state: &PipelineState) -> Route {
    match state.route() {
        Some(Route::Math) => Route::Math,
        _ => Route::Factual,
    }
}

impl Pipeline {
    pub fn new(gateway: ModelGateway, search: Box<dyn SearchProvider>) -> Self {
        Self { gateway, search }
    }

    /// OpenRouter reasoning plus Tavily search.
    #[cfg(all(feature = "openrouter", feature = "tavily"))]
    pub fn from_config(config: &crate::config::AgentConfig) -> Result<Self, AgentError> {
        use crate::providers::{OpenRouterClient, TavilyClient};

        let reasoner = OpenRouterClient::new(config.reasoning.clone())?;
        let search = TavilyClient::new(config.search.clone())?;
        Ok(Self::new(
            ModelGateway::new(Box::new(reasoner), config.reasoning.retry),
            Box::new(search),
        ))
    }

    /// Run one claim to its verdict.
    pub async fn run(&self, claim: impl Into<Claim>) -> Result<PipelineState, AgentError> {
        let mut state = PipelineState::new(claim.into());
        let span = info_span!("claim", run_id = %state.run_id());
        async {
            self.classify(&mut state).await?;
            match route_decision(&state) {
                Route::Math => self.evaluate_math(&mut state)?,
                Route::Factual => {
                    self.rewrite_query(&mut state).await?;
                    self.gather_evidence(&mut state).await?;
                }
            }
            let verdict = judge::adjudicate(&self.gateway, &state).await?;
            state.record_verdict(verdict)?;
            Ok::<_, AgentError>(state)
        }
        .instrument(span)
        .await
    }

    async fn classify(&self, state: &mut PipelineState) -> Result<(), AgentError> {
        let classification = classifier::classify(&self.gateway, state.claim()).await?;
        state.record_classification(classification.route, classification.math_expression)
    }

    fn evaluate_math(&self, state: &mut PipelineState) -> Result<(), AgentError> {
        let text = state.claim().as_str().to_string();
        let verdict = check_equality(&text, DEFAULT_EPSILON)?;
        info!(expression = %text, verdict, "math claim evaluated");
        state.record_math_verdict(verdict)
    }

    async fn rewrite_query(&self, state: &mut PipelineState) -> Result<(), AgentError> {
        let query = rewriter::rewrite(&self.gateway, state.claim()).await?;
        state.record_search_query(query)
    }

    async fn gather_evidence(&self, state: &mut PipelineState) -> Result<(), AgentError> {
        let query = match state.search_query() {
            Some(q) if !q.trim().is_empty() => q.to_string(),
            _ => state.claim().as_str().to_string(),
        };
        let mut evidence = self.search.search(&query, MAX_SEARCH_RESULTS).await?;
        evidence.truncate(MAX_SEARCH_RESULTS);
        info!(count = evidence.len(), "evidence gathered");
        state.record_evidence(evidence)
    }
}
