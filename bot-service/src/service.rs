use crate::fetcher::Fetcher;
use crate::matcher::Matcher;
use crate::moderator::Moderator;
use crate::promoter::Promoter;
use crate::responder::Responder;
use database::Ledger;
use futures::FutureExt;
use quoteit_core::{
    BotSettings, CoreError, ErrorExt, ErrorRecovery, ErrorReporter, RecoveryStrategy,
};
use reddit_client::RedditApi;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info};

/// What one pass of the pipeline did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IterationReport {
    pub blacklisted: usize,
    pub fetched: usize,
    pub candidates: usize,
    pub replied: usize,
    pub failed_replies: usize,
    pub promoted: usize,
}

/// The polling loop: check mail, fetch, match, respond, promote, sleep.
pub struct QuoteBot {
    ledger: Arc<dyn Ledger>,
    moderator: Moderator,
    fetcher: Fetcher,
    matcher: Arc<Matcher>,
    responder: Responder,
    promoter: Promoter,
    poll_interval: Duration,
    reporter: ErrorReporter,
}

impl QuoteBot {
    pub fn new(
        api: Arc<dyn RedditApi>,
        ledger: Arc<dyn Ledger>,
        settings: &BotSettings,
        bot_username: &str,
    ) -> Self {
        let matcher = Arc::new(Matcher::new());

        Self {
            moderator: Moderator::new(api.clone(), ledger.clone(), settings.admin.clone()),
            fetcher: Fetcher::new(
                api.clone(),
                settings.search_query.clone(),
                settings.search_limit,
            ),
            responder: Responder::new(api.clone(), ledger.clone(), settings.transient_backoff()),
            promoter: Promoter::new(
                api,
                ledger.clone(),
                matcher.clone(),
                bot_username,
                settings.quotes_board.clone(),
                settings.upvote_threshold,
            ),
            matcher,
            ledger,
            poll_interval: settings.poll_interval(),
            reporter: ErrorReporter::new(),
        }
    }

    pub async fn run_iteration(&self) -> Result<IterationReport, CoreError> {
        let mut report = IterationReport {
            blacklisted: self.moderator.check_mail().await?,
            ..Default::default()
        };

        let items = self.fetcher.fetch().await?;
        report.fetched = items.len();

        let candidates = self
            .matcher
            .select_candidates(items, self.ledger.as_ref())
            .await?;
        report.candidates = candidates.len();

        let replies = self.responder.reply_all(&candidates).await?;
        report.replied = replies.posted;
        report.failed_replies = replies.failed;

        report.promoted = self.promoter.scan_and_promote().await?.promoted;

        Ok(report)
    }

    /// Runs iterations forever. Errors and panics end only the iteration they
    /// happen in.
    pub async fn run(&self) {
        info!("Polling every {:?}", self.poll_interval);

        loop {
            match AssertUnwindSafe(self.run_iteration()).catch_unwind().await {
                Ok(Ok(report)) => debug!("Iteration finished: {:?}", report),
                Ok(Err(e)) => self.report(&e),
                Err(panic) => {
                    let reason = panic
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_string());
                    error!("Iteration panicked: {}", reason);
                }
            }

            debug!("Sleeping for {:?}", self.poll_interval);
            sleep(self.poll_interval).await;
        }
    }

    /// Runs until `shutdown` completes.
    pub async fn run_until<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            _ = self.run() => {}
            _ = shutdown => info!("Shutdown requested, stopping bot"),
        }
    }

    fn report(&self, error: &CoreError) {
        let strategy = ErrorRecovery::determine_strategy(error);
        match strategy {
            RecoveryStrategy::Abort => self.reporter.report_error(error),
            _ => self.reporter.report_warning(error),
        }
        info!(
            "Iteration ended early ({:?}, retryable: {})",
            strategy,
            error.is_retryable()
        );
    }
}
