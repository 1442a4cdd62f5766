use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error};

use crate::config::SearchConfig;
use crate::error::{AgentError, SearchError};
use crate::gateway::preview;
use crate::search::SearchProvider;
use crate::state::EvidenceItem;

pub struct TavilyClient {
    client: Client,
    config: SearchConfig,
}

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchHit {
    title: Option<String>,
    url: Option<String>,
    content: Option<String>,
    snippet: Option<String>,
}

impl From<SearchHit> for EvidenceItem {
    fn from(hit: SearchHit) -> Self {
        let snippet = hit.content.filter(|c| !c.is_empty()).or(hit.snippet);
        EvidenceItem {
            title: hit.title,
            url: hit.url,
            snippet,
        }
    }
}

impl TavilyClient {
    pub fn new(config: SearchConfig) -> Result<Self, AgentError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AgentError::InvalidConfig(format!("http client: {e}")))?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl SearchProvider for TavilyClient {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<EvidenceItem>, SearchError> {
        debug!(query = %preview(query, 120), max_results, "web search");

        let response = self
            .client
            .post(format!("{}/search", self.config.base_url))
            .json(&json!({
                "api_key": self.config.api_key,
                "query": query,
                "max_results": max_results,
            }))
            .send()
            .await
            .map_err(|e| SearchError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), body = %preview(&body, 800), "search provider error");
            return Err(SearchError::Transport {
                status: status.as_u16(),
                body: body.chars().take(500).collect(),
            });
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| SearchError::InvalidResponse(e.to_string()))?;

        Ok(parsed
            .results
            .into_iter()
            .take(max_results)
            .map(EvidenceItem::from)
            .collect())
    }
}
