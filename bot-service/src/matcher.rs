//! Trigger grammar for summoning comments, and the inverse parser for the
//! bot's own replies.

use database::Ledger;
use quoteit_core::{Candidate, CoreError, Item, LedgerCategory};
use regex::Regex;
use std::collections::HashSet;
use tracing::debug;

/// Quote and attributed user pulled out of a piece of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteRequest {
    pub quote: String,
    pub user: String,
}

pub struct Matcher {
    trigger: Regex,
    reply_block: Regex,
}

impl Matcher {
    pub fn new() -> Self {
        // `QuoteIt! "quote" - /u/user`; quote marks may be double or single and
        // the passage runs to the last one on the line.
        let trigger = Regex::new(r#"(?i)quoteit!\s*(["'].*["'])?[\s-]*((?:/?u/)?[\w' -]*)"#)
            .expect("trigger pattern is valid");
        // Greedy on the quote so it runs to the last '"' in the reply; the
        // footer never contains one.
        let reply_block = Regex::new(r#"(?is)Quoting\s+(?:/?u/)?(.+?):\s"(.*)""#)
            .expect("reply pattern is valid");

        Self {
            trigger,
            reply_block,
        }
    }

    /// First trigger occurrence in `text`, if it names both a quote and a user.
    pub fn extract(&self, text: &str) -> Option<QuoteRequest> {
        let captures = self.trigger.captures(text)?;

        let quoted = captures.get(1)?.as_str();
        // Both ends are ASCII quote characters
        let quote = &quoted[1..quoted.len() - 1];

        let user = captures.get(2).map(|m| m.as_str()).unwrap_or_default();
        let user = strip_user_marker(user.trim())
            .trim_matches(|c: char| c == '-' || c.is_whitespace());

        if quote.is_empty() || user.is_empty() {
            return None;
        }

        Some(QuoteRequest {
            quote: quote.to_string(),
            user: user.to_string(),
        })
    }

    pub fn candidate(&self, item: Item) -> Option<Candidate> {
        let request = self.extract(&item.body)?;
        Some(Candidate {
            item,
            quote: request.quote,
            user: request.user,
        })
    }

    /// Candidates among `items`, skipping ids seen earlier in the batch and
    /// ids the ledger already records as replied to.
    pub async fn select_candidates(
        &self,
        items: Vec<Item>,
        ledger: &dyn Ledger,
    ) -> Result<Vec<Candidate>, CoreError> {
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();

        for item in items {
            if !seen.insert(item.id.clone()) {
                continue;
            }
            if ledger.has(LedgerCategory::Replied, &item.id).await? {
                debug!("Already replied to {}", item.id);
                continue;
            }
            match self.candidate(item) {
                Some(candidate) => candidates.push(candidate),
                None => debug!("No usable trigger in search result"),
            }
        }

        Ok(candidates)
    }

    /// Inverse of the reply template: the quote block at the start of one of
    /// the bot's replies.
    pub fn extract_quote_block(&self, reply: &str) -> Option<QuoteRequest> {
        let captures = self.reply_block.captures(reply)?;
        let user = captures.get(1)?.as_str().trim();
        let quote = captures.get(2)?.as_str();

        if user.is_empty() || quote.is_empty() {
            return None;
        }

        Some(QuoteRequest {
            quote: quote.to_string(),
            user: user.to_string(),
        })
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::new()
    }
}

fn strip_user_marker(user: &str) -> &str {
    let lower = user.to_ascii_lowercase();
    if lower.starts_with("/u/") {
        &user[3..]
    } else if lower.starts_with("u/") {
        &user[2..]
    } else {
        user
    }
}
