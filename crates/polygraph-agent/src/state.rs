//! Per-claim pipeline state.
//!
//! A [`PipelineState`] is created for one claim, owned by that run, and moved
//! forward through [`Stage`]s by the orchestrator. Each transition is checked,
//! so the math and factual branches can never both be populated and the
//! verdict is set exactly once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::AgentError;

/// The user-supplied statement to verify. Read-only once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Claim(String);

impl Claim {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Claim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Claim {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for Claim {
    fn from(text: String) -> Self {
        Self(text)
    }
}

/// Which resolution method a claim takes. Wire names match the router prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Route {
    #[serde(rename = "calc")]
    Math,
    #[serde(rename = "web")]
    Factual,
}

impl Route {
    /// Exact match on the wire names `"calc"` / `"web"`.
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "calc" => Some(Route::Math),
            "web" => Some(Route::Factual),
            _ => None,
        }
    }

    pub fn wire_name(self) -> &'static str {
        match self {
            Route::Math => "calc",
            Route::Factual => "web",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Math => f.write_str("math"),
            Route::Factual => f.write_str("factual"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Start,
    Classified,
    MathEvaluated,
    QueryRewritten,
    EvidenceGathered,
    Adjudicated,
}

/// One search hit. Opaque to the pipeline beyond serialization into the
/// judge prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub title: Option<String>,
    pub url: Option<String>,
    pub snippet: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineState {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    claim: Claim,
    route: Option<Route>,
    /// Produced by the classifier; the math branch never reads it.
    math_expression: Option<String>,
    math_verdict: Option<bool>,
    search_query: Option<String>,
    evidence: Vec<EvidenceItem>,
    verdict: Option<bool>,
    stages: Vec<Stage>,
}

impl PipelineState {
    pub fn new(claim: Claim) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            claim,
            route: None,
            math_expression: None,
            math_verdict: None,
            search_query: None,
            evidence: Vec::new(),
            verdict: None,
            stages: vec![Stage::Start],
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn claim(&self) -> &Claim {
        &self.claim
    }

    pub fn route(&self) -> Option<Route> {
        self.route
    }

    pub fn math_expression(&self) -> Option<&str> {
        self.math_expression.as_deref()
    }

    pub fn math_verdict(&self) -> Option<bool> {
        self.math_verdict
    }

    pub fn search_query(&self) -> Option<&str> {
        self.search_query.as_deref()
    }

    pub fn evidence(&self) -> &[EvidenceItem] {
        &self.evidence
    }

    pub fn verdict(&self) -> Option<bool> {
        self.verdict
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// The most recent stage reached.
    pub fn stage(&self) -> Stage {
        self.stages.last().copied().unwrap_or(Stage::Start)
    }

    pub fn is_terminal(&self) -> bool {
        self.stage() == Stage::Adjudicated
    }

    fn advance(&mut self, to: Stage) -> Result<(), AgentError> {
        let from = self.stage();
        let allowed = match (from, to) {
            (Stage::Start, Stage::Classified) => true,
            (Stage::Classified, Stage::MathEvaluated) => self.route == Some(Route::Math),
            (Stage::Classified, Stage::QueryRewritten) => self.route != Some(Route::Math),
            (Stage::QueryRewritten, Stage::EvidenceGathered) => true,
            (Stage::MathEvaluated, Stage::Adjudicated)
            | (Stage::EvidenceGathered, Stage::Adjudicated) => true,
            _ => false,
        };
        if !allowed {
            return Err(AgentError::InvalidTransition { from, to });
        }
        self.stages.push(to);
        Ok(())
    }

    /// `Start -> Classified`.
    pub fn record_classification(
        &mut self,
        route: Route,
        math_expression: Option<String>,
    ) -> Result<(), AgentError> {
        self.advance(Stage::Classified)?;
        self.route = Some(route);
        self.math_expression = math_expression;
        Ok(())
    }

    /// `Classified -> MathEvaluated`.
    pub fn record_math_verdict(&mut self, verdict: bool) -> Result<(), AgentError> {
        self.advance(Stage::MathEvaluated)?;
        self.math_verdict = Some(verdict);
        Ok(())
    }

    /// `Classified -> QueryRewritten`.
    pub fn record_search_query(&mut self, query: String) -> Result<(), AgentError> {
        self.advance(Stage::QueryRewritten)?;
        self.search_query = Some(query);
        Ok(())
    }

    /// `QueryRewritten -> EvidenceGathered`.
    pub fn record_evidence(&mut self, evidence: Vec<EvidenceItem>) -> Result<(), AgentError> {
        self.advance(Stage::EvidenceGathered)?;
        self.evidence = evidence;
        Ok(())
    }

    /// `MathEvaluated | EvidenceGathered -> Adjudicated`. Terminal.
    pub fn record_verdict(&mut self, verdict: bool) -> Result<(), AgentError> {
        self.advance(Stage::Adjudicated)?;
        self.verdict = Some(verdict);
        Ok(())
    }
}
