use async_trait::async_trait;
use std::sync::Arc;

use crate::error::SearchError;
use crate::state::EvidenceItem;

/// Upper bound on search hits gathered for one claim.
pub const MAX_SEARCH_RESULTS: usize = 7;

/// A web search backend.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<EvidenceItem>, SearchError>;
}

#[async_trait]
impl<T: SearchProvider + ?Sized> SearchProvider for Arc<T> {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<EvidenceItem>, SearchError> {
        (**self).search(query, max_results).await
    }
}
