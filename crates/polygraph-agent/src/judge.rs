//! Final adjudication.
//!
//! The math branch passes the evaluator's verdict through. The factual branch
//! asks the model once, with the evidence list serialized as JSON, and accepts
//! only a proper boolean `verdict`; anything else is `false`.

use serde_json::Value;
use tracing::{info, warn};

use crate::error::AgentError;
use crate::gateway::ModelGateway;
use crate::json_repair::JsonObject;
use crate::prompts;
use crate::state::{EvidenceItem, PipelineState, Route};

pub const JUDGE_MAX_TOKENS: u32 = 250;

/// An absent math verdict counts as `false`.
pub fn adjudicate_math(math_verdict: Option<bool>) -> bool {
    math_verdict.unwrap_or(false)
}

pub fn verdict_from_reply(reply: &JsonObject) -> bool {
    match reply.get("verdict") {
        Some(Value::Bool(verdict)) => *verdict,
        other => {
            warn!(reply_verdict = ?other, "judge reply had no boolean verdict, defaulting to false");
            false
        }
    }
}

pub async fn adjudicate_factual(
    gateway: &ModelGateway,
    claim: &str,
    evidence: &[EvidenceItem],
) -> Result<bool, AgentError> {
    let evidence_json = serde_json::to_string(evidence).unwrap_or_else(|_| "[]".to_string());
    let reply = gateway
        .request_object(
            prompts::JUDGE_SYSTEM,
            &prompts::judge_user(claim, &evidence_json),
            JUDGE_MAX_TOKENS,
        )
        .await?;
    Ok(verdict_from_reply(&reply))
}

/// Produce the verdict for a state whose branch has completed.
pub async fn adjudicate(gateway: &ModelGateway, state: &PipelineState) -> Result<bool, AgentError> {
    let verdict = match state.route() {
        Some(Route::Math) => adjudicate_math(state.math_verdict()),
        _ => adjudicate_factual(gateway, state.claim().as_str(), state.evidence()).await?,
    };
    info!(verdict, "claim adjudicated");
    Ok(verdict)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::RetryPolicy;
    use crate::providers::mock::ScriptedReasoner;
    use crate::state::Claim;
    use proptest::prelude::*;
    use serde_json::json;
    use std::sync::Arc;

    fn obj(value: Value) -> JsonObject {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn math_verdict_passes_through() {
        assert!(adjudicate_math(Some(true)));
        assert!(!adjudicate_math(Some(false)));
        assert!(!adjudicate_math(None));
    }

    #[test]
    fn only_proper_booleans_count() {
        assert!(verdict_from_reply(&obj(json!({"verdict": true}))));
        assert!(!verdict_from_reply(&obj(json!({"verdict": false}))));
        for reply in [
            json!({}),
            json!({"verdict": "true"}),
            json!({"verdict": 1}),
            json!({"verdict": null}),
            json!({"verdict": [true]}),
            json!({"Verdict": true}),
        ] {
            assert!(!verdict_from_reply(&obj(reply.clone())), "{reply}");
        }
    }

    #[tokio::test]
    async fn empty_evidence_still_asks_the_model() {
        let reasoner = Arc::new(ScriptedReasoner::always(r#"{"verdict": false}"#));
        let gateway = ModelGateway::new(Box::new(reasoner.clone()), RetryPolicy::immediate(1));

        let verdict = adjudicate_factual(&gateway, "Atlantis exists", &[]).await.unwrap();
        assert!(!verdict);

        let requests = reasoner.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].system(), Some(prompts::JUDGE_SYSTEM));
        assert!(requests[0].user().unwrap().contains("[]"));
        assert_eq!(requests[0].max_tokens, JUDGE_MAX_TOKENS);
    }

    #[tokio::test]
    async fn evidence_is_serialized_into_the_prompt() {
        let reasoner = Arc::new(ScriptedReasoner::always(r#"{"verdict": true}"#));
        let gateway = ModelGateway::new(Box::new(reasoner.clone()), RetryPolicy::immediate(1));
        let evidence = vec![EvidenceItem {
            title: Some("Paris".into()),
            url: Some("https://en.wikipedia.org/wiki/Paris".into()),
            snippet: Some("Paris is the capital of France.".into()),
        }];

        assert!(adjudicate_factual(&gateway, "Paris is the capital of France", &evidence)
            .await
            .unwrap());
        let user = reasoner.requests()[0].user().unwrap().to_string();
        assert!(user.contains("\"snippet\":\"Paris is the capital of France.\""));
    }

    #[tokio::test]
    async fn math_state_makes_no_model_call() {
        let reasoner = Arc::new(ScriptedReasoner::always(r#"{"verdict": false}"#));
        let gateway = ModelGateway::new(Box::new(reasoner.clone()), RetryPolicy::immediate(1));
        let mut state = PipelineState::new(Claim::from("1 + 1 = 2"));
        state.record_classification(Route::Math, None).unwrap();
        state.record_math_verdict(true).unwrap();

        assert!(adjudicate(&gateway, &state).await.unwrap());
        assert_eq!(reasoner.calls(), 0);
    }

    fn arbitrary_json() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(|n| json!(n)),
            ".{0,12}".prop_map(Value::String),
        ];
        leaf.prop_recursive(2, 8, 4, |inner| {
            prop::collection::vec(inner, 0..4).prop_map(Value::Array)
        })
    }

    proptest! {
        #[test]
        fn judge_never_raises(verdict in arbitrary_json()) {
            let expected = matches!(verdict, Value::Bool(true));
            let reply = obj(json!({ "verdict": verdict }));
            prop_assert_eq!(verdict_from_reply(&reply), expected);
        }
    }
}
