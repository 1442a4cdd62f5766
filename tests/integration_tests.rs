//! Integration tests for the complete Polygraph pipeline
//!
//! These tests drive claims end to end through the public API with offline
//! collaborators:
//! - Classifier → Evaluator → Judge (math branch)
//! - Classifier → Rewriter → Search → Judge (factual branch)
//! - failure and fallback behavior across crate boundaries
//!
//! Run with: cargo test --test integration_tests

use std::sync::Arc;

use polygraph_agent::providers::mock::{ScriptedReasoner, StagedReasoner, StaticSearch};
use polygraph_agent::{
    AgentError, EvidenceItem, ModelGateway, Pipeline, ReasoningService, RetryPolicy, Route,
    SearchProvider, Stage,
};

fn pipeline_with(
    reasoner: impl ReasoningService + 'static,
    search: impl SearchProvider + 'static,
) -> Pipeline {
    Pipeline::new(
        ModelGateway::new(Box::new(reasoner), RetryPolicy::immediate(3)),
        Box::new(search),
    )
}

fn paris_evidence() -> Vec<EvidenceItem> {
    vec![EvidenceItem {
        title: Some("Paris - Wikipedia".into()),
        url: Some("https://en.wikipedia.org/wiki/Paris".into()),
        snippet: Some("Paris is the capital and largest city of France.".into()),
    }]
}

// ============================================================================
// Math branch
// ============================================================================

#[tokio::test]
async fn test_math_claim_end_to_end() {
    let reasoner = Arc::new(ScriptedReasoner::always(
        r#"{"route": "calc", "calc_expression": "2*3=6"}"#,
    ));
    let search = Arc::new(StaticSearch::empty());
    let pipeline = pipeline_with(reasoner.clone(), search.clone());

    let state = pipeline.run("2 * 3 = 6").await.expect("math claim should resolve");

    assert_eq!(state.route(), Some(Route::Math));
    assert_eq!(state.math_verdict(), Some(true));
    assert_eq!(state.verdict(), Some(true));
    assert_eq!(
        state.stages(),
        &[Stage::Start, Stage::Classified, Stage::MathEvaluated, Stage::Adjudicated]
    );
    // router only; the judge passes the math verdict through
    assert_eq!(reasoner.calls(), 1);
    assert!(search.queries().is_empty());
}

#[tokio::test]
async fn test_math_claims_use_degree_trig_and_equality_rules() {
    let pipeline = pipeline_with(
        StagedReasoner::new().with_router(r#"{"route": "calc"}"#),
        StaticSearch::empty(),
    );

    for (claim, expected) in [
        ("2+2=4", true),
        ("2+2=5", false),
        ("sin(90)=1", true),
        ("cos(60) = 0.5", true),
        ("3", true),
        ("0", false),
        ("2 − 3 = −1", true),
    ] {
        let state = pipeline.run(claim).await.expect(claim);
        assert_eq!(state.verdict(), Some(expected), "{claim}");
    }
}

#[tokio::test]
async fn test_math_path_ignores_model_expression() {
    // The suggested expression is wrong on purpose; the claim text decides.
    let pipeline = pipeline_with(
        StagedReasoner::new().with_router(r#"{"route": "calc", "calc_expression": "1 = 2"}"#),
        StaticSearch::empty(),
    );

    let state = pipeline.run("10 / 4 = 2.5").await.unwrap();
    assert_eq!(state.math_expression(), Some("1 = 2"));
    assert_eq!(state.verdict(), Some(true));
}

#[tokio::test]
async fn test_word_form_math_claim_aborts_instead_of_false() {
    // Known fragility: a claim routed to math is evaluated verbatim, so
    // prose arithmetic fails rather than yielding a graceful `false`.
    let pipeline = pipeline_with(
        StagedReasoner::new().with_router(r#"{"route": "calc", "calc_expression": "2+2=4"}"#),
        StaticSearch::empty(),
    );

    let err = pipeline
        .run("two plus two equals four")
        .await
        .expect_err("word-form math is not an arithmetic string");
    assert!(matches!(err, AgentError::InvalidExpression(_)), "{err}");
}

#[tokio::test]
async fn test_division_by_zero_is_a_failure_not_a_verdict() {
    let pipeline = pipeline_with(
        StagedReasoner::new().with_router(r#"{"route": "calc"}"#),
        StaticSearch::empty(),
    );

    let err = pipeline.run("1 / 0 = 0").await.unwrap_err();
    match err {
        AgentError::InvalidExpression(inner) => {
            assert_eq!(inner.kind(), polygraph_calc::InvalidExpressionKind::DivisionByZero)
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_deeply_nested_claim_fails_without_taking_down_the_pipeline() {
    let pipeline = pipeline_with(
        StagedReasoner::new().with_router(r#"{"route": "calc"}"#),
        StaticSearch::empty(),
    );

    let hostile = format!("{}1{} = 1", "(".repeat(5_000), ")".repeat(5_000));
    let err = pipeline.run(hostile).await.unwrap_err();
    match err {
        AgentError::InvalidExpression(inner) => {
            assert_eq!(inner.kind(), polygraph_calc::InvalidExpressionKind::Syntax)
        }
        other => panic!("unexpected error: {other}"),
    }

    let state = pipeline.run("(2 + 3) * 4 = 20").await.unwrap();
    assert_eq!(state.verdict(), Some(true));
}

// ============================================================================
// Factual branch
// ============================================================================

#[tokio::test]
async fn test_factual_claim_end_to_end() {
    let reasoner = Arc::new(ScriptedReasoner::new(vec![
        r#"{"route": "web", "calc_expression": null}"#.to_string(),
        r#"{"query": "capital of France"}"#.to_string(),
        r#"{"verdict": true}"#.to_string(),
    ]));
    let search = Arc::new(StaticSearch::new(paris_evidence()));
    let pipeline = pipeline_with(reasoner.clone(), search.clone());

    let state = pipeline
        .run("Paris is the capital of France")
        .await
        .expect("factual claim should resolve");

    assert_eq!(state.route(), Some(Route::Factual));
    assert_eq!(state.search_query(), Some("capital of France"));
    assert_eq!(state.evidence(), paris_evidence().as_slice());
    assert_eq!(state.verdict(), Some(true));
    assert!(state.math_verdict().is_none());
    assert_eq!(search.queries(), vec![("capital of France".to_string(), 7)]);

    let requests = reasoner.requests();
    assert_eq!(requests.len(), 3);
    let judge_prompt = requests[2].user().unwrap();
    assert!(judge_prompt.contains("Paris is the capital of France"));
    assert!(judge_prompt.contains("largest city of France"));
}

#[tokio::test]
async fn test_wrapped_and_quoted_model_output_is_repaired() {
    let reasoner = ScriptedReasoner::new(vec![
        "Sure, here it is:\n```json\n{\"\\\"route\\\"\": \"web\"}\n```".to_string(),
        "\"{\\\"query\\\": \\\"Everest height\\\"}\"".to_string(),
        r#"{"result": "{\"verdict\": false}"}"#.to_string(),
    ]);
    let pipeline = pipeline_with(reasoner, StaticSearch::empty());

    let state = pipeline.run("Everest is 9000 m tall").await.unwrap();
    assert_eq!(state.route(), Some(Route::Factual));
    assert_eq!(state.search_query(), Some("Everest height"));
    assert_eq!(state.verdict(), Some(false));
}

#[tokio::test]
async fn test_unusable_rewrite_and_judge_replies_degrade() {
    let reasoner = Arc::new(ScriptedReasoner::new(vec![
        r#"{"route": "web"}"#.to_string(),
        r#"{"query": ""}"#.to_string(),
        r#"{"verdict": "true"}"#.to_string(),
    ]));
    let search = Arc::new(StaticSearch::empty());
    let pipeline = pipeline_with(reasoner, search.clone());

    let state = pipeline.run("The Moon is made of cheese").await.unwrap();
    assert_eq!(state.search_query(), Some("The Moon is made of cheese"));
    assert!(state.evidence().is_empty());
    assert_eq!(state.verdict(), Some(false));
    assert_eq!(search.queries()[0].0, "The Moon is made of cheese");
}

// ============================================================================
// Routing fallback and failure policy
// ============================================================================

#[tokio::test]
async fn test_garbage_route_falls_back_to_heuristic() {
    let math = pipeline_with(
        StagedReasoner::new().with_router(r#"{"route": "arithmetic"}"#),
        StaticSearch::empty(),
    );
    let state = math.run("7 * 6 = 42").await.unwrap();
    assert_eq!(state.route(), Some(Route::Math));
    assert_eq!(state.verdict(), Some(true));

    let factual = pipeline_with(
        StagedReasoner::new()
            .with_router(r#"{"route": null}"#)
            .with_rewriter(r#"{"query": "Berlin Germany"}"#)
            .with_judge(r#"{"verdict": true}"#),
        StaticSearch::empty(),
    );
    let state = factual.run("Berlin is in Germany").await.unwrap();
    assert_eq!(state.route(), Some(Route::Factual));
    assert_eq!(state.verdict(), Some(true));
}

#[tokio::test]
async fn test_empty_claim_reaches_terminal_state() {
    let pipeline = pipeline_with(
        StagedReasoner::new()
            .with_router("{}")
            .with_rewriter("{}")
            .with_judge("{}"),
        StaticSearch::empty(),
    );

    let state = pipeline.run("").await.unwrap();
    assert!(state.is_terminal());
    assert_eq!(state.route(), Some(Route::Factual));
    assert_eq!(state.verdict(), Some(false));
}

#[tokio::test]
async fn test_exhausted_retries_abort_only_that_claim() {
    let reasoner = Arc::new(ScriptedReasoner::new(vec![
        r#"{"route": "web"}"#.to_string(),
        "no json here".to_string(),
        "still none".to_string(),
        "{broken".to_string(),
        r#"{"route": "calc"}"#.to_string(),
    ]));
    let pipeline = pipeline_with(reasoner.clone(), StaticSearch::empty());

    let err = pipeline.run("Rome is in Italy").await.unwrap_err();
    assert!(matches!(
        err,
        AgentError::MalformedModelResponse { attempts: 3, .. }
    ));
    assert_eq!(reasoner.calls(), 4);

    // The same pipeline keeps serving other claims.
    let state = pipeline.run("1 + 1 = 2").await.unwrap();
    assert_eq!(state.route(), Some(Route::Math));
    assert_eq!(state.verdict(), Some(true));
}

#[tokio::test]
async fn test_concurrent_claims_are_isolated() {
    let pipeline = Arc::new(pipeline_with(
        StagedReasoner::new().with_router(r#"{"route": "calc"}"#),
        StaticSearch::empty(),
    ));

    let mut handles = Vec::new();
    for n in 0..16u32 {
        let pipeline = pipeline.clone();
        handles.push(tokio::spawn(async move {
            let claim = format!("{n} + {n} = {}", n * 2 + n % 2);
            (n, pipeline.run(claim).await)
        }));
    }

    for handle in handles {
        let (n, result) = handle.await.unwrap();
        let state = result.unwrap();
        assert_eq!(state.verdict(), Some(n % 2 == 0), "claim {n}");
    }
}
