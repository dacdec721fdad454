use oauth2::basic::BasicClient;
use oauth2::reqwest::async_http_client;
use oauth2::{
    AuthType, AuthUrl, ClientId, ClientSecret, ResourceOwnerPassword, ResourceOwnerUsername,
    Scope, TokenResponse, TokenUrl,
};
use quoteit_core::{CoreError, RedditApiError, RedditConfig};
use std::time::{Duration, SystemTime};
use tokio::sync::Mutex;
use tracing::{debug, info};

const REDDIT_AUTH_URL: &str = "https://www.reddit.com/api/v1/authorize";
const REDDIT_TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";

/// Refresh this long before the token actually expires.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct RedditToken {
    pub access_token: String,
    pub expires_at: SystemTime,
}

impl RedditToken {
    pub fn is_expired(&self) -> bool {
        SystemTime::now() + EXPIRY_MARGIN >= self.expires_at
    }
}

/// Password-grant login for a Reddit "script" app.
#[derive(Debug)]
pub struct RedditAuthenticator {
    oauth_client: BasicClient,
    username: String,
    password: String,
    token: Mutex<Option<RedditToken>>,
}

impl RedditAuthenticator {
    pub fn new(config: &RedditConfig) -> Result<Self, CoreError> {
        let auth_url = AuthUrl::new(REDDIT_AUTH_URL.to_string()).map_err(|e| {
            CoreError::RedditApi(RedditApiError::AuthenticationFailed {
                reason: e.to_string(),
            })
        })?;
        let token_url = TokenUrl::new(REDDIT_TOKEN_URL.to_string()).map_err(|e| {
            CoreError::RedditApi(RedditApiError::AuthenticationFailed {
                reason: e.to_string(),
            })
        })?;

        let oauth_client = BasicClient::new(
            ClientId::new(config.client_id.clone()),
            Some(ClientSecret::new(config.client_secret.clone())),
            auth_url,
            Some(token_url),
        )
        .set_auth_type(AuthType::BasicAuth);

        Ok(Self {
            oauth_client,
            username: config.username.clone(),
            password: config.password.clone(),
            token: Mutex::new(None),
        })
    }

    pub fn get_required_scopes() -> Vec<&'static str> {
        vec!["identity", "read", "submit", "privatemessages", "history"]
    }

    /// Returns a valid access token, logging in again when the cached one expired.
    pub async fn access_token(&self) -> Result<String, CoreError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if !token.is_expired() {
                return Ok(token.access_token.clone());
            }
            debug!("Access token expired, requesting a new one");
        }

        let token = self.request_token().await?;
        let access_token = token.access_token.clone();
        *cached = Some(token);
        Ok(access_token)
    }

    /// Drops the cached token so the next request logs in again.
    pub async fn invalidate(&self) {
        *self.token.lock().await = None;
    }

    pub async fn set_token(&self, token: RedditToken) {
        *self.token.lock().await = Some(token);
    }

    async fn request_token(&self) -> Result<RedditToken, CoreError> {
        let scopes = Self::get_required_scopes()
            .into_iter()
            .map(|s| Scope::new(s.to_string()));

        let response = self
            .oauth_client
            .exchange_password(
                &ResourceOwnerUsername::new(self.username.clone()),
                &ResourceOwnerPassword::new(self.password.clone()),
            )
            .add_scopes(scopes)
            .request_async(async_http_client)
            .await
            .map_err(|e| {
                CoreError::RedditApi(RedditApiError::AuthenticationFailed {
                    reason: e.to_string(),
                })
            })?;

        let expires_in = response
            .expires_in()
            .unwrap_or_else(|| Duration::from_secs(3600));

        info!("Logged in to Reddit as {}", self.username);
        Ok(RedditToken {
            access_token: response.access_token().secret().clone(),
            expires_at: SystemTime::now() + expires_in,
        })
    }
}
