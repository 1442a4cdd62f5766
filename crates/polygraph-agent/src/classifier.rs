//! Claim routing: one model call, validated against the route enum, with a
//! pure heuristic when the model's answer is unusable.

use serde_json::Value;
use tracing::{info, warn};

use crate::error::AgentError;
use crate::gateway::ModelGateway;
use crate::json_repair::JsonObject;
use crate::prompts;
use crate::state::{Claim, Route};

pub const CLASSIFIER_MAX_TOKENS: u32 = 200;

const MATH_CHARS: &[char] = &['+', '-', '*', '/', '=', '(', ')'];

/// Where the route came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteSource {
    Model,
    Heuristic,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub route: Route,
    /// The model's suggested expression. Carried along, never evaluated.
    pub math_expression: Option<String>,
    pub source: RouteSource,
}

impl Classification {
    /// Validate a router reply. A missing or unknown `route` falls back to
    /// [`fallback_route`] on the claim text.
    pub fn from_reply(claim: &str, reply: &JsonObject) -> Self {
        let math_expression = reply
            .get("calc_expression")
            .and_then(Value::as_str)
            .map(str::to_string);

        match reply.get("route").and_then(Value::as_str).and_then(Route::from_wire) {
            Some(route) => Self {
                route,
                math_expression,
                source: RouteSource::Model,
            },
            None => {
                let route = fallback_route(claim);
                warn!(
                    reply_route = ?reply.get("route"),
                    fallback = %route,
                    "router reply had no valid route, using heuristic"
                );
                Self {
                    route,
                    math_expression,
                    source: RouteSource::Heuristic,
                }
            }
        }
    }
}

/// Deterministic routing used when the model gives no valid route.
///
/// `Math` when the text has any of `+-*/=()`, any Unicode digit, or contains
/// `sin`/`cos` in any case; `Factual` otherwise. Total.
pub fn fallback_route(text: &str) -> Route {
    let lowered = text.to_lowercase();
    let mathy = text.contains(MATH_CHARS)
        || text.chars().any(char::is_numeric)
        || lowered.contains("sin")
        || lowered.contains("cos");
    if mathy {
        Route::Math
    } else {
        Route::Factual
    }
}

pub async fn classify(gateway: &ModelGateway, claim: &Claim) -> Result<Classification, AgentError> {
    let reply = gateway
        .request_object(
            prompts::ROUTER_SYSTEM,
            &prompts::router_user(claim.as_str()),
            CLASSIFIER_MAX_TOKENS,
        )
        .await?;
    let classification = Classification::from_reply(claim.as_str(), &reply);
    info!(route = %classification.route, source = ?classification.source, "claim classified");
    Ok(classification)
}
