use quoteit_core::{CoreError, Item};
use reddit_client::RedditApi;
use std::sync::Arc;
use tracing::debug;

/// Pulls recent comments mentioning the trigger from the search service.
pub struct Fetcher {
    api: Arc<dyn RedditApi>,
    query: String,
    limit: u32,
}

impl Fetcher {
    pub fn new(api: Arc<dyn RedditApi>, query: impl Into<String>, limit: u32) -> Self {
        Self {
            api,
            query: query.into(),
            limit,
        }
    }

    /// One page of results, newest first as the search service returns them.
    /// The same comment may show up on consecutive calls.
    pub async fn fetch(&self) -> Result<Vec<Item>, CoreError> {
        let items = self.api.search_comments(&self.query, self.limit).await?;
        debug!("Fetched {} comments for {}", items.len(), self.query);
        Ok(items)
    }
}
