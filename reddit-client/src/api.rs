use crate::rate_limiter::{RateLimitConfig, RateLimiter};
use quoteit_core::{CoreError, Item, Message, RedditApiError};
use regex::Regex;
use reqwest::header::HeaderMap;
use reqwest::{Client, Method, Request, Response, StatusCode};
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::OnceLock;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

const REDDIT_API_BASE: &str = "https://oauth.reddit.com";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListing<T> {
    pub kind: String,
    pub data: RedditListingData<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingData<T> {
    pub children: Vec<RedditListingChild<T>>,
    pub after: Option<String>,
    pub before: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingChild<T> {
    pub kind: String,
    pub data: T,
}

/// Fields shared by comments (t1), posts (t3) and messages (t4).
/// Every field is optional on the wire; missing or null ones take their default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ThingData {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    pub author: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub body: String,
    #[serde(deserialize_with = "null_as_default")]
    pub selftext: String,
    #[serde(deserialize_with = "null_as_default")]
    pub subject: String,
    #[serde(deserialize_with = "null_as_default")]
    pub parent_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub link_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub link_title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub score: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub subreddit: String,
    #[serde(deserialize_with = "null_as_default")]
    pub subreddit_id: String,
    /// Things carry `over_18`; subreddits from `/api/info` carry `over18`.
    #[serde(alias = "over18", deserialize_with = "null_as_default")]
    pub over_18: bool,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Body of a `api_type=json` write response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JsonEnvelope {
    #[serde(default)]
    pub json: JsonResult,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct JsonResult {
    /// Triples of `[code, message, field]`.
    pub errors: Vec<Vec<serde_json::Value>>,
    pub ratelimit: Option<f64>,
}

#[derive(Debug)]
pub struct RedditApiClient {
    http_client: Client,
    rate_limiter: RateLimiter,
}

impl RedditApiClient {
    pub fn new(user_agent: String) -> Result<Self, CoreError> {
        let http_client = Client::builder()
            .user_agent(&user_agent)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http_client,
            rate_limiter: RateLimiter::new(RateLimitConfig::reddit_oauth()),
        })
    }

    /// Builds an authenticated request against the OAuth host. GETs ask for
    /// `raw_json=1` so bodies come back without HTML entity escaping.
    pub fn build_request(
        &self,
        method: Method,
        endpoint: &str,
        access_token: &str,
        query_params: Option<&[(&str, &str)]>,
        form: Option<&[(&str, &str)]>,
    ) -> Result<Request, CoreError> {
        let url = format!("{}{}", REDDIT_API_BASE, endpoint);
        let mut request_builder = self
            .http_client
            .request(method.clone(), &url)
            .bearer_auth(access_token);

        if let Some(params) = query_params {
            request_builder = request_builder.query(params);
        }
        if method == Method::GET {
            request_builder = request_builder.query(&[("raw_json", "1")]);
        }
        if let Some(fields) = form {
            request_builder = request_builder.form(fields);
        }

        Ok(request_builder.build()?)
    }

    pub async fn make_request(
        &self,
        method: Method,
        endpoint: &str,
        access_token: &str,
        query_params: Option<&[(&str, &str)]>,
        form: Option<&[(&str, &str)]>,
    ) -> Result<Response, CoreError> {
        let request =
            self.build_request(method.clone(), endpoint, access_token, query_params, form)?;
        let start_time = Instant::now();

        let waited = self.rate_limiter.acquire_permit().await;
        debug!(
            "Acquired rate limit permit for {} {} after {:?}",
            method, endpoint, waited
        );

        debug!("Making Reddit API request: {} {}", method, endpoint);
        let response = match self.http_client.execute(request).await {
            Ok(response) => response,
            Err(e) => {
                error!("Network error for {} {}: {}", method, endpoint, e);
                if e.is_timeout() {
                    return Err(CoreError::RedditApi(RedditApiError::RequestTimeout));
                }
                return Err(CoreError::Network(e));
            }
        };

        if let Some((remaining, reset_in)) = server_budget(response.headers()) {
            self.rate_limiter
                .record_server_budget(remaining, reset_in)
                .await;
        }

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, response.headers(), endpoint));
        }

        debug!(
            "Request successful: {} {} in {:?}",
            status,
            endpoint,
            start_time.elapsed()
        );
        Ok(response)
    }

    pub async fn reply(
        &self,
        access_token: &str,
        thing_id: &str,
        text: &str,
    ) -> Result<(), CoreError> {
        let form = [("api_type", "json"), ("thing_id", thing_id), ("text", text)];
        let response = self
            .make_request(Method::POST, "/api/comment", access_token, None, Some(&form[..]))
            .await?;

        let envelope: JsonEnvelope = parse_json(response, "comment response").await?;
        check_json_errors(&envelope.json, thing_id)?;

        info!("Replied to {}", thing_id);
        Ok(())
    }

    pub async fn submit_self_post(
        &self,
        access_token: &str,
        subreddit: &str,
        title: &str,
        text: &str,
    ) -> Result<(), CoreError> {
        let form = [
            ("api_type", "json"),
            ("kind", "self"),
            ("sr", subreddit),
            ("title", title),
            ("text", text),
        ];
        let response = self
            .make_request(Method::POST, "/api/submit", access_token, None, Some(&form[..]))
            .await?;

        let envelope: JsonEnvelope = parse_json(response, "submit response").await?;
        check_json_errors(&envelope.json, subreddit)?;

        info!("Submitted post to r/{}: {}", subreddit, title);
        Ok(())
    }

    pub async fn get_info(&self, access_token: &str, fullname: &str) -> Result<Item, CoreError> {
        let params = [("id", fullname)];
        let response = self
            .make_request(Method::GET, "/api/info", access_token, Some(&params[..]), None)
            .await?;

        let listing: RedditListing<ThingData> = parse_json(response, "info listing").await?;
        listing
            .data
            .children
            .into_iter()
            .next()
            .map(|child| Item::from(child.data))
            .ok_or_else(|| {
                CoreError::RedditApi(RedditApiError::ThingNotFound {
                    thing_id: fullname.to_string(),
                })
            })
    }

    pub async fn get_user_comments(
        &self,
        access_token: &str,
        username: &str,
        limit: u32,
    ) -> Result<Vec<Item>, CoreError> {
        let endpoint = format!("/user/{}/comments", username);
        let limit_str = limit.to_string();
        let params = [("limit", limit_str.as_str())];

        let response = self
            .make_request(Method::GET, &endpoint, access_token, Some(&params[..]), None)
            .await?;

        let listing: RedditListing<ThingData> = parse_json(response, "user comments").await?;
        debug!(
            "Retrieved {} comments of /u/{}",
            listing.data.children.len(),
            username
        );
        Ok(listing
            .data
            .children
            .into_iter()
            .map(|child| Item::from(child.data))
            .collect())
    }

    pub async fn get_unread_messages(&self, access_token: &str) -> Result<Vec<Message>, CoreError> {
        let params = [("limit", "100")];
        let response = self
            .make_request(Method::GET, "/message/unread", access_token, Some(&params[..]), None)
            .await?;

        let listing: RedditListing<ThingData> = parse_json(response, "unread messages").await?;
        Ok(listing
            .data
            .children
            .into_iter()
            .filter(|child| child.kind == "t4")
            .map(|child| Message::from(child.data))
            .collect())
    }

    pub async fn mark_message_read(
        &self,
        access_token: &str,
        fullname: &str,
    ) -> Result<(), CoreError> {
        let form = [("id", fullname)];
        self.make_request(
            Method::POST,
            "/api/read_message",
            access_token,
            None,
            Some(&form[..]),
        )
        .await?;
        debug!("Marked {} as read", fullname);
        Ok(())
    }
}

async fn parse_json<T: serde::de::DeserializeOwned>(
    response: Response,
    what: &str,
) -> Result<T, CoreError> {
    response.json().await.map_err(|e| {
        error!("Failed to parse {}: {}", what, e);
        CoreError::RedditApi(RedditApiError::InvalidResponse {
            details: format!("Failed to parse {}", what),
        })
    })
}

/// Turns the error list of a write response into a typed error.
pub fn check_json_errors(result: &JsonResult, target: &str) -> Result<(), CoreError> {
    let Some(first) = result.errors.first() else {
        return Ok(());
    };

    let code = first
        .first()
        .and_then(|v| v.as_str())
        .unwrap_or("UNKNOWN")
        .to_string();
    let message = first
        .get(1)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    let error = match code.as_str() {
        "RATELIMIT" => {
            let retry_after = result
                .ratelimit
                .map(|secs| secs.ceil() as u64)
                .or_else(|| parse_ratelimit_message(&message))
                .unwrap_or(60);
            RedditApiError::RateLimitExceeded { retry_after }
        }
        "DELETED_COMMENT" | "DELETED_LINK" | "NO_THING_ID" => RedditApiError::ThingNotFound {
            thing_id: target.to_string(),
        },
        _ => RedditApiError::Rejected { code, message },
    };
    Err(CoreError::RedditApi(error))
}

/// Extracts the wait from messages like "try again in 9 minutes".
pub fn parse_ratelimit_message(message: &str) -> Option<u64> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(r"(?i)(\d+)\s*(second|minute|hour)s?").expect("valid ratelimit pattern")
    });

    let captures = pattern.captures(message)?;
    let amount: u64 = captures[1].parse().ok()?;
    let unit = captures[2].to_ascii_lowercase();
    Some(match unit.as_str() {
        "hour" => amount * 3600,
        "minute" => amount * 60,
        _ => amount,
    })
}

/// Maps a non-2xx status to a typed error. A missing thing is routine
/// (deleted comments), so only unexpected statuses log at error level.
pub fn status_error(status: StatusCode, headers: &HeaderMap, endpoint: &str) -> CoreError {
    match status.as_u16() {
        429 => {
            let retry_after = retry_after_header(headers).unwrap_or(60);
            warn!("Rate limited on {}, retry after {} seconds", endpoint, retry_after);
            CoreError::RedditApi(RedditApiError::RateLimitExceeded { retry_after })
        }
        404 => {
            debug!("Nothing found at {}", endpoint);
            CoreError::RedditApi(RedditApiError::ThingNotFound {
                thing_id: endpoint.to_string(),
            })
        }
        401 => {
            warn!("Access token rejected for {}", endpoint);
            CoreError::RedditApi(RedditApiError::InvalidToken)
        }
        403 => {
            warn!("Forbidden: {}", endpoint);
            CoreError::RedditApi(RedditApiError::Forbidden {
                resource: endpoint.to_string(),
            })
        }
        code => {
            error!("Request failed with status: {} for {}", status, endpoint);
            CoreError::RedditApi(RedditApiError::ServerError { status_code: code })
        }
    }
}

fn retry_after_header(headers: &HeaderMap) -> Option<u64> {
    headers
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .or_else(|| {
            headers
                .get("x-ratelimit-reset")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<f64>().ok())
                .map(|secs| secs.ceil() as u64)
        })
}

fn server_budget(headers: &HeaderMap) -> Option<(f64, Duration)> {
    let remaining = headers
        .get("x-ratelimit-remaining")?
        .to_str()
        .ok()?
        .trim()
        .parse::<f64>()
        .ok()?;
    let reset = headers
        .get("x-ratelimit-reset")?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()?;
    Some((remaining, Duration::from_secs(reset)))
}

impl From<ThingData> for Item {
    fn from(data: ThingData) -> Self {
        Self {
            id: data.id,
            author: data.author.unwrap_or_else(|| "[deleted]".to_string()),
            body: if data.body.is_empty() {
                data.selftext
            } else {
                data.body
            },
            parent_id: data.parent_id,
            link_id: data.link_id,
            link_title: if data.link_title.is_empty() {
                data.title
            } else {
                data.link_title
            },
            score: data.score,
            subreddit: data.subreddit,
            subreddit_id: data.subreddit_id,
            over_18: data.over_18,
        }
    }
}

impl From<ThingData> for Message {
    fn from(data: ThingData) -> Self {
        Self {
            name: if data.name.is_empty() {
                format!("t4_{}", data.id)
            } else {
                data.name
            },
            id: data.id,
            author: data.author,
            subject: data.subject,
            body: data.body,
        }
    }
}
