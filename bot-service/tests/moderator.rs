mod support;

use bot_service::Moderator;
use database::Ledger;
use std::sync::Arc;
use support::{message, MemoryLedger, MockApi, ADMIN};

fn setup() -> (Arc<MockApi>, Arc<MemoryLedger>, Moderator) {
    let api = Arc::new(MockApi::new());
    let ledger = Arc::new(MemoryLedger::new());
    let moderator = Moderator::new(api.clone(), ledger.clone(), ADMIN);
    (api, ledger, moderator)
}

#[tokio::test]
async fn test_admin_blacklist_message() {
    let (api, ledger, moderator) = setup();
    api.deliver(message("m1", ADMIN, "Blacklist", "alice bob"));

    let added = moderator.check_mail().await.unwrap();

    assert_eq!(added, 2);
    assert!(ledger.is_blacklisted("alice").await.unwrap());
    assert!(ledger.is_blacklisted("bob").await.unwrap());
    assert_eq!(api.marked_read(), vec!["t4_m1".to_string()]);
}

#[tokio::test]
async fn test_sender_and_subject_are_case_insensitive() {
    let (api, ledger, moderator) = setup();
    api.deliver(message("m1", "CameronGagnon", "BLACKLIST", "carol\n\tdave  "));

    moderator.check_mail().await.unwrap();

    assert!(ledger.is_blacklisted("carol").await.unwrap());
    assert!(ledger.is_blacklisted("dave").await.unwrap());
    assert_eq!(api.marked_read().len(), 1);
}

#[tokio::test]
async fn test_other_messages_stay_unread() {
    let (api, ledger, moderator) = setup();
    api.deliver(message("m1", "mallory", "Blacklist", "camerongagnon"));
    api.deliver(message("m2", ADMIN, "hello", "alice"));

    let added = moderator.check_mail().await.unwrap();

    assert_eq!(added, 0);
    assert!(!ledger.is_blacklisted("camerongagnon").await.unwrap());
    assert!(!ledger.is_blacklisted("alice").await.unwrap());
    assert!(api.marked_read().is_empty());
}

#[tokio::test]
async fn test_empty_inbox() {
    let (_api, _ledger, moderator) = setup();
    assert_eq!(moderator.check_mail().await.unwrap(), 0);
}
