use anyhow::Context;
use bot_service::QuoteBot;
use database::Database;
use quoteit_core::{AppConfig, LedgerCategory};
use reddit_client::RedditClient;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "quoteit=debug,bot_service=debug,reddit_client=info,database=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("Starting QuoteIt! bot");

    let config = AppConfig::load().context("failed to load configuration")?;

    let mut database = Database::new(config.database.url.clone());
    database
        .connect()
        .await
        .context("failed to open ledger database")?;
    database
        .run_migrations()
        .await
        .context("failed to migrate ledger database")?;

    tracing::info!(
        "Ledger holds {} replied, {} promoted, {} blacklisted",
        database.count(LedgerCategory::Replied).await?,
        database.count(LedgerCategory::Promoted).await?,
        database.blacklist_size().await?
    );
    let database = Arc::new(database);

    let client = RedditClient::new(&config).context("failed to build Reddit client")?;
    match client.authenticate().await {
        Ok(()) => tracing::info!("Logged in as /u/{}", config.reddit.username),
        Err(e) => tracing::warn!("Initial login failed, retrying on the first iteration: {}", e),
    }

    let bot = QuoteBot::new(
        Arc::new(client),
        database.clone(),
        &config.bot,
        &config.reddit.username,
    );
    bot.run_until(shutdown_signal()).await;

    database.close().await;
    tracing::info!("Goodbye");
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!("Cannot listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
