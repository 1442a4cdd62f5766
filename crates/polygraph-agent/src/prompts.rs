//! Prompt templates for the three model-backed stages.
//!
//! Every prompt asks for a single JSON object; replies are still treated as
//! untrusted text by the gateway.

pub const ROUTER_SYSTEM: &str = "You are a routing component of a fact-checking agent. \
Decide how a claim should be verified. Use \"calc\" when the claim is an arithmetic \
equality or expression that can be checked by computation (numbers, + - * / ^, \
parentheses, sin, cos in degrees). Use \"web\" for every other factual statement. \
Answer with a single JSON object and nothing else: \
{\"route\": \"web\" | \"calc\", \"calc_expression\": string | null}";

pub const REWRITE_SYSTEM: &str = "You turn a claim into a concise web search query that \
would retrieve evidence confirming or refuting it. Keep names, dates and numbers. \
Answer with a single JSON object and nothing else: {\"query\": string}";

pub const JUDGE_SYSTEM: &str = "You are the judge of a fact-checking agent. Decide whether \
the claim is true using only the supplied evidence and well-established knowledge. \
If the evidence contradicts the claim or is insufficient to support it, the verdict is false. \
Answer with a single JSON object and nothing else: {\"verdict\": true | false}";

pub fn router_user(claim: &str) -> String {
    format!("Claim:\n{claim}\n\nReturn the JSON object.")
}

pub fn rewrite_user(claim: &str) -> String {
    format!("Claim:\n{claim}\n\nReturn the JSON object with the search query.")
}

/// `evidence_json` is the serialized evidence list (possibly `[]`).
pub fn judge_user(claim: &str, evidence_json: &str) -> String {
    format!("Claim:\n{claim}\n\nEvidence (JSON):\n{evidence_json}\n\nReturn the JSON object with the verdict.")
}
