mod support;

use bot_service::QuoteBot;
use database::Ledger;
use quoteit_core::{CoreError, DatabaseError, LedgerCategory};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use support::{comment, message, server_error, settings, MemoryLedger, MockApi, ADMIN, BOT};

const TRIGGER_BODY: &str = r#"QuoteIt! "Life is short" /u/alice"#;

fn setup() -> (Arc<MockApi>, Arc<MemoryLedger>, QuoteBot) {
    let api = Arc::new(MockApi::new());
    let ledger = Arc::new(MemoryLedger::new());
    let bot = QuoteBot::new(api.clone(), ledger.clone(), &settings(), BOT);
    (api, ledger, bot)
}

#[tokio::test]
async fn test_iteration_replies_to_new_trigger() {
    let (api, ledger, bot) = setup();
    api.queue_search(Ok(vec![comment("c1", "bob", TRIGGER_BODY)]));

    let report = bot.run_iteration().await.unwrap();

    assert_eq!(report.fetched, 1);
    assert_eq!(report.candidates, 1);
    assert_eq!(report.replied, 1);
    let replies = api.replies();
    assert_eq!(replies.len(), 1);
    assert!(replies[0].1.starts_with("Quoting /u/alice: \"Life is short\"\n\n"));
    assert!(ledger.contains(LedgerCategory::Replied, "c1"));
}

#[tokio::test]
async fn test_duplicates_in_and_across_batches_get_one_reply() {
    let (api, _ledger, bot) = setup();
    api.queue_search(Ok(vec![
        comment("c1", "bob", TRIGGER_BODY),
        comment("c1", "bob", TRIGGER_BODY),
    ]));
    api.queue_search(Ok(vec![comment("c1", "bob", TRIGGER_BODY)]));

    let first = bot.run_iteration().await.unwrap();
    let second = bot.run_iteration().await.unwrap();

    assert_eq!(first.candidates, 1);
    assert_eq!(second.candidates, 0);
    assert_eq!(api.reply_attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_non_matching_items_are_ignored() {
    let (api, ledger, bot) = setup();
    api.queue_search(Ok(vec![
        comment("c1", "bob", "QuoteIt!"),
        comment("c2", "bob", "I love QuoteIt! bots"),
    ]));

    let report = bot.run_iteration().await.unwrap();

    assert_eq!(report.fetched, 2);
    assert_eq!(report.candidates, 0);
    assert!(api.replies().is_empty());
    assert!(!ledger.contains(LedgerCategory::Replied, "c1"));
}

#[tokio::test]
async fn test_mail_is_checked_before_promotion() {
    let (api, ledger, bot) = setup();
    api.deliver(message("m1", ADMIN, "Blacklist", "alice"));
    api.set_own_comments(vec![support::bot_reply(
        "r1",
        "c1",
        &bot_service::templates::format_reply("alice", "Life is short"),
        11,
    )]);

    let report = bot.run_iteration().await.unwrap();

    assert_eq!(report.blacklisted, 1);
    assert_eq!(report.promoted, 1);
    assert!(ledger.is_blacklisted("alice").await.unwrap());
    assert!(api.submissions()[0]
        .body
        .contains(bot_service::templates::SPAM_LINK));
}

#[tokio::test]
async fn test_storage_failure_aborts_iteration() {
    let (api, ledger, bot) = setup();
    api.queue_search(Ok(vec![comment("c1", "bob", TRIGGER_BODY)]));
    ledger.fail_storage.store(true, Ordering::SeqCst);

    let result = bot.run_iteration().await;

    assert!(matches!(
        result,
        Err(CoreError::Database(DatabaseError::ConnectionFailed { .. }))
    ));
    assert_eq!(api.reply_attempts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_fetch_failure_aborts_iteration() {
    let (api, _ledger, bot) = setup();
    api.queue_search(Err(server_error()));

    assert!(bot.run_iteration().await.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_loop_survives_errors_and_panics() {
    let (api, ledger, bot) = setup();
    api.panic_on_next_search.store(true, Ordering::SeqCst);
    api.queue_search(Err(server_error()));
    api.queue_search(Ok(vec![comment("c1", "bob", TRIGGER_BODY)]));

    // 60 s poll interval: iterations at 0, 60, 120, ...
    bot.run_until(tokio::time::sleep(Duration::from_secs(10 * 60)))
        .await;

    assert!(api.search_calls.load(Ordering::SeqCst) >= 10);
    assert_eq!(api.replies().len(), 1);
    assert!(ledger.contains(LedgerCategory::Replied, "c1"));
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_loop() {
    let (api, _ledger, bot) = setup();

    bot.run_until(async {}).await;

    assert!(api.search_calls.load(Ordering::SeqCst) <= 1);
}
