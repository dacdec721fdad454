use database::Ledger;
use quoteit_core::CoreError;
use reddit_client::RedditApi;
use std::sync::Arc;
use tracing::{debug, info};

const BLACKLIST_SUBJECT: &str = "blacklist";

/// Applies blacklist requests the admin sends by private message.
pub struct Moderator {
    api: Arc<dyn RedditApi>,
    ledger: Arc<dyn Ledger>,
    admin: String,
}

impl Moderator {
    pub fn new(api: Arc<dyn RedditApi>, ledger: Arc<dyn Ledger>, admin: impl Into<String>) -> Self {
        Self {
            api,
            ledger,
            admin: admin.into(),
        }
    }

    /// Processes unread mail; returns the number of usernames blacklisted.
    ///
    /// A message is marked read only after all of its usernames are stored.
    /// Messages from anyone else, or with another subject, stay unread.
    pub async fn check_mail(&self) -> Result<usize, CoreError> {
        let messages = self.api.unread_messages().await?;
        let mut added = 0;

        for message in &messages {
            let from_admin = message
                .author
                .as_deref()
                .is_some_and(|author| author.eq_ignore_ascii_case(&self.admin));
            if !from_admin || !message.subject.trim().eq_ignore_ascii_case(BLACKLIST_SUBJECT) {
                debug!("Ignoring message {}", message.name);
                continue;
            }

            for username in message.body.split_whitespace() {
                self.ledger.blacklist_user(username).await?;
                info!("Blacklisted {}", username);
                added += 1;
            }

            self.api.mark_read(message).await?;
        }

        Ok(added)
    }
}
