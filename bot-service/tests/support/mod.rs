#![allow(dead_code)]

use async_trait::async_trait;
use database::Ledger;
use quoteit_core::{
    BotSettings, CoreError, DatabaseError, Item, LedgerCategory, Message, RedditApiError,
};
use reddit_client::RedditApi;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

pub const BOT: &str = "QuoteItBot";
pub const ADMIN: &str = "camerongagnon";

pub fn settings() -> BotSettings {
    BotSettings::default()
}

pub fn comment(id: &str, author: &str, body: &str) -> Item {
    Item {
        id: id.to_string(),
        author: author.to_string(),
        body: body.to_string(),
        parent_id: "t3_p1".to_string(),
        link_id: "t3_p1".to_string(),
        link_title: "Daily thread".to_string(),
        score: 1,
        subreddit: "test".to_string(),
        subreddit_id: "t5_test".to_string(),
        over_18: false,
    }
}

/// One of the bot's own replies, answering comment `parent`.
pub fn bot_reply(id: &str, parent: &str, body: &str, score: i64) -> Item {
    Item {
        parent_id: format!("t1_{}", parent),
        score,
        ..comment(id, BOT, body)
    }
}

pub fn message(id: &str, author: &str, subject: &str, body: &str) -> Message {
    Message {
        id: id.to_string(),
        name: format!("t4_{}", id),
        author: Some(author.to_string()),
        subject: subject.to_string(),
        body: body.to_string(),
    }
}

pub fn rate_limited(seconds: u64) -> CoreError {
    CoreError::RedditApi(RedditApiError::RateLimitExceeded {
        retry_after: seconds,
    })
}

pub fn server_error() -> CoreError {
    CoreError::RedditApi(RedditApiError::ServerError { status_code: 503 })
}

pub fn deleted(thing_id: &str) -> CoreError {
    CoreError::RedditApi(RedditApiError::ThingNotFound {
        thing_id: thing_id.to_string(),
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub board: String,
    pub title: String,
    pub body: String,
}

/// Scripted stand-in for Reddit. Queued results are consumed one per call;
/// an empty queue means success.
#[derive(Default)]
pub struct MockApi {
    pub search_results: Mutex<VecDeque<Result<Vec<Item>, CoreError>>>,
    pub reply_results: Mutex<VecDeque<Result<(), CoreError>>>,
    pub submit_results: Mutex<VecDeque<Result<(), CoreError>>>,
    pub items: Mutex<HashMap<String, Item>>,
    pub own_comments: Mutex<Vec<Item>>,
    pub inbox: Mutex<Vec<Message>>,

    pub replies: Mutex<Vec<(String, String)>>,
    pub reply_attempts: AtomicUsize,
    pub submissions: Mutex<Vec<Submission>>,
    pub submit_attempts: AtomicUsize,
    pub marked_read: Mutex<Vec<String>>,
    pub search_calls: AtomicUsize,
    pub panic_on_next_search: AtomicBool,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_search(&self, result: Result<Vec<Item>, CoreError>) {
        self.search_results.lock().unwrap().push_back(result);
    }

    pub fn queue_reply(&self, result: Result<(), CoreError>) {
        self.reply_results.lock().unwrap().push_back(result);
    }

    pub fn queue_submit(&self, result: Result<(), CoreError>) {
        self.submit_results.lock().unwrap().push_back(result);
    }

    pub fn add_item(&self, fullname: &str, item: Item) {
        self.items.lock().unwrap().insert(fullname.to_string(), item);
    }

    pub fn set_own_comments(&self, comments: Vec<Item>) {
        *self.own_comments.lock().unwrap() = comments;
    }

    pub fn deliver(&self, message: Message) {
        self.inbox.lock().unwrap().push(message);
    }

    pub fn replies(&self) -> Vec<(String, String)> {
        self.replies.lock().unwrap().clone()
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn marked_read(&self) -> Vec<String> {
        self.marked_read.lock().unwrap().clone()
    }
}

#[async_trait]
impl RedditApi for MockApi {
    async fn search_comments(&self, _query: &str, _limit: u32) -> Result<Vec<Item>, CoreError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        if self.panic_on_next_search.swap(false, Ordering::SeqCst) {
            panic!("search blew up");
        }
        self.search_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn reply(&self, parent: &Item, text: &str) -> Result<(), CoreError> {
        self.reply_attempts.fetch_add(1, Ordering::SeqCst);
        let result = self.reply_results.lock().unwrap().pop_front().unwrap_or(Ok(()));
        if result.is_ok() {
            self.replies
                .lock()
                .unwrap()
                .push((parent.id.clone(), text.to_string()));
        }
        result
    }

    async fn submit_text_post(
        &self,
        board: &str,
        title: &str,
        body: &str,
    ) -> Result<(), CoreError> {
        self.submit_attempts.fetch_add(1, Ordering::SeqCst);
        let result = self.submit_results.lock().unwrap().pop_front().unwrap_or(Ok(()));
        if result.is_ok() {
            self.submissions.lock().unwrap().push(Submission {
                board: board.to_string(),
                title: title.to_string(),
                body: body.to_string(),
            });
        }
        result
    }

    async fn get_item(&self, fullname: &str) -> Result<Item, CoreError> {
        self.items
            .lock()
            .unwrap()
            .get(fullname)
            .cloned()
            .ok_or_else(|| deleted(fullname))
    }

    async fn user_comments(&self, username: &str, _limit: u32) -> Result<Vec<Item>, CoreError> {
        assert_eq!(username, BOT);
        Ok(self.own_comments.lock().unwrap().clone())
    }

    async fn unread_messages(&self) -> Result<Vec<Message>, CoreError> {
        let read = self.marked_read.lock().unwrap().clone();
        Ok(self
            .inbox
            .lock()
            .unwrap()
            .iter()
            .filter(|m| !read.contains(&m.name))
            .cloned()
            .collect())
    }

    async fn mark_read(&self, message: &Message) -> Result<(), CoreError> {
        self.marked_read.lock().unwrap().push(message.name.clone());
        Ok(())
    }
}

/// In-memory ledger that also logs every `add` call.
#[derive(Default)]
pub struct MemoryLedger {
    records: Mutex<HashSet<(LedgerCategory, String)>>,
    blacklist: Mutex<HashSet<String>>,
    pub add_calls: Mutex<Vec<(LedgerCategory, String)>>,
    pub fail_storage: AtomicBool,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_count(&self, category: LedgerCategory, item_id: &str) -> usize {
        self.add_calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, id)| *c == category && id == item_id)
            .count()
    }

    pub fn contains(&self, category: LedgerCategory, item_id: &str) -> bool {
        self.records
            .lock()
            .unwrap()
            .contains(&(category, item_id.to_string()))
    }

    fn check_storage(&self) -> Result<(), CoreError> {
        if self.fail_storage.load(Ordering::SeqCst) {
            return Err(CoreError::Database(DatabaseError::ConnectionFailed {
                reason: "disk I/O error".to_string(),
            }));
        }
        Ok(())
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn has(&self, category: LedgerCategory, item_id: &str) -> Result<bool, CoreError> {
        self.check_storage()?;
        Ok(self.contains(category, item_id))
    }

    async fn add(&self, category: LedgerCategory, item_id: &str) -> Result<(), CoreError> {
        self.check_storage()?;
        self.add_calls
            .lock()
            .unwrap()
            .push((category, item_id.to_string()));
        self.records
            .lock()
            .unwrap()
            .insert((category, item_id.to_string()));
        Ok(())
    }

    async fn blacklist_user(&self, username: &str) -> Result<(), CoreError> {
        self.check_storage()?;
        self.blacklist.lock().unwrap().insert(username.to_lowercase());
        Ok(())
    }

    async fn is_blacklisted(&self, username: &str) -> Result<bool, CoreError> {
        self.check_storage()?;
        Ok(self.blacklist.lock().unwrap().contains(&username.to_lowercase()))
    }
}
