use serde_json::Value;
use tracing::{info, warn};

use crate::error::AgentError;
use crate::gateway::ModelGateway;
use crate::json_repair::JsonObject;
use crate::prompts;
use crate::state::Claim;

pub const REWRITER_MAX_TOKENS: u32 = 200;

/// The `query` field when it is a non-blank string, else the claim text.
pub fn query_from_reply(claim: &str, reply: &JsonObject) -> String {
    match reply.get("query").and_then(Value::as_str) {
        Some(query) if !query.trim().is_empty() => query.to_string(),
        _ => {
            warn!(reply_query = ?reply.get("query"), "rewriter gave no usable query, searching the claim");
            claim.to_string()
        }
    }
}

/// Turn a factual claim into a search query.
pub async fn rewrite(gateway: &ModelGateway, claim: &Claim) -> Result<String, AgentError> {
    let reply = gateway
        .request_object(
            prompts::REWRITE_SYSTEM,
            &prompts::rewrite_user(claim.as_str()),
            REWRITER_MAX_TOKENS,
        )
        .await?;
    let query = query_from_reply(claim.as_str(), &reply);
    info!(query = %query, "search query rewritten");
    Ok(query)
}
