use crate::templates::format_reply;
use database::Ledger;
use quoteit_core::{Candidate, CoreError, ErrorRecovery, LedgerCategory, RecoveryStrategy};
use reddit_client::{retry_once_after_cooldown, RedditApi};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyOutcome {
    Posted,
    /// Already replied to in an earlier iteration.
    Skipped,
    /// The attempt failed; the item is still recorded and never retried.
    Failed,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplyStats {
    pub posted: usize,
    pub skipped: usize,
    pub failed: usize,
}

pub struct Responder {
    api: Arc<dyn RedditApi>,
    ledger: Arc<dyn Ledger>,
    transient_backoff: Duration,
}

impl Responder {
    pub fn new(
        api: Arc<dyn RedditApi>,
        ledger: Arc<dyn Ledger>,
        transient_backoff: Duration,
    ) -> Self {
        Self {
            api,
            ledger,
            transient_backoff,
        }
    }

    /// Replies to one candidate and records the attempt.
    ///
    /// The item is recorded as replied exactly once whatever the outcome, so it
    /// is never attempted again. Errors that make the rest of the iteration
    /// pointless (credentials, storage) are returned after recording.
    pub async fn reply(&self, candidate: &Candidate) -> Result<ReplyOutcome, CoreError> {
        let item = &candidate.item;
        if self.ledger.has(LedgerCategory::Replied, &item.id).await? {
            debug!("Already replied to {}", item.id);
            return Ok(ReplyOutcome::Skipped);
        }

        let text = format_reply(&candidate.user, &candidate.quote);
        debug!(
            "Replying to {} in /r/{} quoting {}",
            item.author, item.subreddit, candidate.user
        );

        let result = retry_once_after_cooldown("reply", || self.api.reply(item, &text)).await;

        let (outcome, fatal) = match result {
            Ok(()) => {
                info!("Replied to {}", item.id);
                (ReplyOutcome::Posted, None)
            }
            Err(error) => match ErrorRecovery::determine_strategy(&error) {
                RecoveryStrategy::RetryOnceAfter(_) => {
                    warn!("Still rate limited replying to {}, giving up on it", item.id);
                    (ReplyOutcome::Failed, None)
                }
                RecoveryStrategy::BackOff => {
                    warn!(
                        "Reply to {} failed: {}; backing off for {:?}",
                        item.id, error, self.transient_backoff
                    );
                    sleep(self.transient_backoff).await;
                    (ReplyOutcome::Failed, None)
                }
                RecoveryStrategy::Skip => {
                    warn!("Comment {} was deleted or cannot be replied to: {}", item.id, error);
                    (ReplyOutcome::Failed, None)
                }
                RecoveryStrategy::Abort => (ReplyOutcome::Failed, Some(error)),
            },
        };

        self.ledger.add(LedgerCategory::Replied, &item.id).await?;

        match fatal {
            Some(error) => Err(error),
            None => Ok(outcome),
        }
    }

    pub async fn reply_all(&self, candidates: &[Candidate]) -> Result<ReplyStats, CoreError> {
        let mut stats = ReplyStats::default();
        for candidate in candidates {
            match self.reply(candidate).await? {
                ReplyOutcome::Posted => stats.posted += 1,
                ReplyOutcome::Skipped => stats.skipped += 1,
                ReplyOutcome::Failed => stats.failed += 1,
            }
        }
        Ok(stats)
    }
}
