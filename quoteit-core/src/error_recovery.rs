//! Error recovery strategies for the polling pipeline.
//!
//! Every failure the bot sees is mapped to one of a small set of strategies.
//! The pipeline never retries more than once per rate-limit event and never
//! lets a failure escape the current iteration.

use crate::{CoreError, ErrorExt, RedditApiError};
use std::time::Duration;

/// Recovery strategy for handling errors
#[derive(Debug, Clone, PartialEq)]
pub enum RecoveryStrategy {
    /// Sleep for the server cooldown, then try exactly once more
    RetryOnceAfter(Duration),
    /// Sleep for the fixed transient back-off and give up on the current item
    BackOff,
    /// Give up on the current item without sleeping
    Skip,
    /// Abandon the whole iteration
    Abort,
}

/// Error recovery handler that provides strategies for different error types
pub struct ErrorRecovery;

impl ErrorRecovery {
    /// Determine the appropriate recovery strategy for a given error
    pub fn determine_strategy(error: &CoreError) -> RecoveryStrategy {
        if let Some(cooldown) = error.retry_after() {
            return RecoveryStrategy::RetryOnceAfter(cooldown);
        }

        match error {
            // Deleted comments, locked threads and the like will not get better
            CoreError::RedditApi(RedditApiError::ThingNotFound { .. })
            | CoreError::RedditApi(RedditApiError::Rejected { .. })
            | CoreError::RedditApi(RedditApiError::Forbidden { .. }) => RecoveryStrategy::Skip,

            // Persistence problems invalidate the dedup guarantee for this round
            CoreError::Database(_) => RecoveryStrategy::Abort,

            // Credentials need a fresh token or an operator
            CoreError::RedditApi(RedditApiError::AuthenticationFailed { .. })
            | CoreError::RedditApi(RedditApiError::InvalidToken)
            | CoreError::Config(_) => RecoveryStrategy::Abort,

            _ if error.is_retryable() => RecoveryStrategy::BackOff,

            _ => RecoveryStrategy::Abort,
        }
    }
}
