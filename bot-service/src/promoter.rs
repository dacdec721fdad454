use crate::matcher::Matcher;
use crate::templates::{about_link, format_promotion_body, format_title};
use database::Ledger;
use quoteit_core::{CoreError, ErrorRecovery, Item, LedgerCategory, RecoveryStrategy};
use reddit_client::{retry_once_after_cooldown, RedditApi};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// How many of the bot's own recent comments are scanned per iteration.
pub const SCAN_LIMIT: u32 = 100;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PromotionStats {
    pub examined: usize,
    pub promoted: usize,
}

/// Reposts well-received quote replies to the quotes board.
pub struct Promoter {
    api: Arc<dyn RedditApi>,
    ledger: Arc<dyn Ledger>,
    matcher: Arc<Matcher>,
    bot_username: String,
    board: String,
    upvote_threshold: i64,
}

impl Promoter {
    pub fn new(
        api: Arc<dyn RedditApi>,
        ledger: Arc<dyn Ledger>,
        matcher: Arc<Matcher>,
        bot_username: impl Into<String>,
        board: impl Into<String>,
        upvote_threshold: i64,
    ) -> Self {
        Self {
            api,
            ledger,
            matcher,
            bot_username: bot_username.into(),
            board: board.into(),
            upvote_threshold,
        }
    }

    pub async fn scan_and_promote(&self) -> Result<PromotionStats, CoreError> {
        let comments = self
            .api
            .user_comments(&self.bot_username, SCAN_LIMIT)
            .await?;

        let mut stats = PromotionStats::default();
        for comment in &comments {
            stats.examined += 1;

            if self.ledger.has(LedgerCategory::Promoted, &comment.id).await? {
                continue;
            }
            // Strictly above the threshold
            if comment.score <= self.upvote_threshold {
                continue;
            }

            if self.promote(comment).await? {
                stats.promoted += 1;
            }
        }

        Ok(stats)
    }

    /// Returns whether a post was submitted. Comments that will never be
    /// promotable are recorded so they are not looked at again.
    async fn promote(&self, comment: &Item) -> Result<bool, CoreError> {
        let Some(block) = self.matcher.extract_quote_block(&comment.body) else {
            debug!("Comment {} is not a quote reply", comment.id);
            self.ledger.add(LedgerCategory::Promoted, &comment.id).await?;
            return Ok(false);
        };

        let parent_author = self.parent_author(comment).await?;
        let sensitive = self
            .is_sensitive(comment, &block.user, parent_author.as_deref())
            .await?;

        let title = format_title(&block.quote, &block.user);
        let body = format_promotion_body(comment, about_link(sensitive));

        let result = retry_once_after_cooldown("submit", || {
            self.api.submit_text_post(&self.board, &title, &body)
        })
        .await;

        match result {
            Ok(()) => {
                info!("Promoted {} to /r/{}", comment.id, self.board);
                self.ledger.add(LedgerCategory::Promoted, &comment.id).await?;
                Ok(true)
            }
            Err(error) => match ErrorRecovery::determine_strategy(&error) {
                RecoveryStrategy::Skip => {
                    warn!("Submission for {} was refused: {}", comment.id, error);
                    self.ledger.add(LedgerCategory::Promoted, &comment.id).await?;
                    Ok(false)
                }
                RecoveryStrategy::RetryOnceAfter(_) | RecoveryStrategy::BackOff => {
                    warn!(
                        "Could not promote {} ({}); will try again next iteration",
                        comment.id, error
                    );
                    Ok(false)
                }
                RecoveryStrategy::Abort => Err(error),
            },
        }
    }

    /// Author of the comment the bot replied to. A deleted parent has none.
    async fn parent_author(&self, comment: &Item) -> Result<Option<String>, CoreError> {
        if comment.parent_id.is_empty() {
            return Ok(None);
        }

        match self.api.get_item(&comment.parent_id).await {
            Ok(parent) => Ok(Some(parent.author)),
            Err(error) if ErrorRecovery::determine_strategy(&error) == RecoveryStrategy::Skip => {
                debug!("Parent {} is gone: {}", comment.parent_id, error);
                Ok(None)
            }
            Err(error) => Err(error),
        }
    }

    async fn is_sensitive(
        &self,
        comment: &Item,
        quoted_user: &str,
        parent_author: Option<&str>,
    ) -> Result<bool, CoreError> {
        if self.board_is_adult(comment).await? {
            return Ok(true);
        }
        if self.ledger.is_blacklisted(quoted_user).await? {
            return Ok(true);
        }
        match parent_author {
            Some(author) => self.ledger.is_blacklisted(author).await,
            None => Ok(false),
        }
    }

    /// Looks up the subreddit the reply lives in. Without a subreddit id only
    /// the thread's own NSFW flag is known.
    async fn board_is_adult(&self, comment: &Item) -> Result<bool, CoreError> {
        if comment.subreddit_id.is_empty() {
            return Ok(comment.over_18);
        }

        match self.api.get_item(&comment.subreddit_id).await {
            Ok(board) => Ok(board.over_18),
            Err(error) if ErrorRecovery::determine_strategy(&error) == RecoveryStrategy::Skip => {
                debug!("Subreddit {} is unavailable: {}", comment.subreddit_id, error);
                Ok(false)
            }
            Err(error) => Err(error),
        }
    }
}
