use crate::api::ThingData;
use quoteit_core::{CoreError, Item, RedditApiError};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error};

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub data: Vec<ThingData>,
}

/// Full-text comment search outside the Reddit API (Pushshift-compatible).
#[derive(Debug, Clone)]
pub struct SearchClient {
    http_client: Client,
    search_url: String,
}

impl SearchClient {
    pub fn new(search_url: String, user_agent: &str) -> Result<Self, CoreError> {
        let http_client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http_client,
            search_url,
        })
    }

    /// One page of results; no cursor handling.
    pub async fn search(&self, query: &str, limit: u32) -> Result<Vec<Item>, CoreError> {
        let limit_str = limit.to_string();
        let response = self
            .http_client
            .get(&self.search_url)
            .query(&[("q", query), ("limit", limit_str.as_str())])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CoreError::RedditApi(RedditApiError::RequestTimeout)
                } else {
                    CoreError::Network(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            error!("Search failed with status {}", status);
            return Err(match status.as_u16() {
                429 => CoreError::RedditApi(RedditApiError::RateLimitExceeded { retry_after: 60 }),
                code => CoreError::RedditApi(RedditApiError::ServerError { status_code: code }),
            });
        }

        let body: SearchResponse = response.json().await.map_err(|e| {
            error!("Failed to parse search results: {}", e);
            CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: "Failed to parse search results".to_string(),
            })
        })?;

        debug!("Search for {} returned {} items", query, body.data.len());
        Ok(body.data.into_iter().map(Item::from).collect())
    }
}
