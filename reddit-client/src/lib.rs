pub mod api;
pub mod auth;
pub mod rate_limiter;
pub mod retry;
pub mod search;


use async_trait::async_trait;
use quoteit_core::{AppConfig, CoreError, Item, Message, RedditApiError};
use tracing::warn;

pub use api::RedditApiClient;
pub use auth::{RedditAuthenticator, RedditToken};
pub use retry::retry_once_after_cooldown;
pub use search::SearchClient;

/// The remote operations the bot needs. Every call may fail with a rate limit
/// (`RedditApiError::RateLimitExceeded`) or a transient network error.
#[async_trait]
pub trait RedditApi: Send + Sync {
    async fn search_comments(&self, query: &str, limit: u32) -> Result<Vec<Item>, CoreError>;

    async fn reply(&self, parent: &Item, text: &str) -> Result<(), CoreError>;

    async fn submit_text_post(&self, board: &str, title: &str, body: &str)
        -> Result<(), CoreError>;

    async fn get_item(&self, fullname: &str) -> Result<Item, CoreError>;

    async fn user_comments(&self, username: &str, limit: u32) -> Result<Vec<Item>, CoreError>;

    async fn unread_messages(&self) -> Result<Vec<Message>, CoreError>;

    async fn mark_read(&self, message: &Message) -> Result<(), CoreError>;
}

/// Authenticated Reddit access plus the external search service.
#[derive(Debug)]
pub struct RedditClient {
    auth: RedditAuthenticator,
    api: RedditApiClient,
    search: SearchClient,
}

impl RedditClient {
    pub fn new(config: &AppConfig) -> Result<Self, CoreError> {
        let user_agent = config.reddit.user_agent.clone();
        Ok(Self {
            auth: RedditAuthenticator::new(&config.reddit)?,
            search: SearchClient::new(config.bot.search_url.clone(), &user_agent)?,
            api: RedditApiClient::new(user_agent)?,
        })
    }

    pub async fn authenticate(&self) -> Result<(), CoreError> {
        self.auth.access_token().await.map(|_| ())
    }

    async fn token(&self) -> Result<String, CoreError> {
        self.auth.access_token().await
    }

    /// A rejected token is dropped so the next call logs in again.
    async fn check_token<T>(&self, result: Result<T, CoreError>) -> Result<T, CoreError> {
        if let Err(CoreError::RedditApi(RedditApiError::InvalidToken)) = &result {
            warn!("Access token rejected, will log in again");
            self.auth.invalidate().await;
        }
        result
    }
}

#[async_trait]
impl RedditApi for RedditClient {
    async fn search_comments(&self, query: &str, limit: u32) -> Result<Vec<Item>, CoreError> {
        self.search.search(query, limit).await
    }

    async fn reply(&self, parent: &Item, text: &str) -> Result<(), CoreError> {
        let token = self.token().await?;
        let result = self.api.reply(&token, &parent.fullname(), text).await;
        self.check_token(result).await
    }

    async fn submit_text_post(
        &self,
        board: &str,
        title: &str,
        body: &str,
    ) -> Result<(), CoreError> {
        let token = self.token().await?;
        let result = self.api.submit_self_post(&token, board, title, body).await;
        self.check_token(result).await
    }

    async fn get_item(&self, fullname: &str) -> Result<Item, CoreError> {
        let token = self.token().await?;
        let result = self.api.get_info(&token, fullname).await;
        self.check_token(result).await
    }

    async fn user_comments(&self, username: &str, limit: u32) -> Result<Vec<Item>, CoreError> {
        let token = self.token().await?;
        let result = self.api.get_user_comments(&token, username, limit).await;
        self.check_token(result).await
    }

    async fn unread_messages(&self) -> Result<Vec<Message>, CoreError> {
        let token = self.token().await?;
        let result = self.api.get_unread_messages(&token).await;
        self.check_token(result).await
    }

    async fn mark_read(&self, message: &Message) -> Result<(), CoreError> {
        let token = self.token().await?;
        let result = self.api.mark_message_read(&token, &message.name).await;
        self.check_token(result).await
    }
}
