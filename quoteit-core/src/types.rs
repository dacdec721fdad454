use std::fmt;

/// A comment or post as returned by Reddit or by the search service.
/// Snapshots are never mutated once fetched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Item {
    pub id: String,
    pub author: String,
    pub body: String,
    pub parent_id: String,
    pub link_id: String,
    pub link_title: String,
    pub score: i64,
    pub subreddit: String,
    pub subreddit_id: String,
    pub over_18: bool,
}

impl Item {
    /// Fullname of the item as a comment (`t1_<id>`), used as a reply target.
    pub fn fullname(&self) -> String {
        if self.id.starts_with("t1_") {
            self.id.clone()
        } else {
            format!("t1_{}", self.id)
        }
    }
}

/// A private message from the bot's inbox.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Message {
    pub id: String,
    pub name: String,
    pub author: Option<String>,
    pub subject: String,
    pub body: String,
}

/// An item whose body matched the trigger grammar.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub item: Item,
    pub quote: String,
    pub user: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LedgerCategory {
    /// A reply was attempted for the source comment, whatever the outcome.
    Replied,
    /// The bot's reply was promoted, or judged not promotable.
    Promoted,
}

impl LedgerCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerCategory::Replied => "replied",
            LedgerCategory::Promoted => "promoted",
        }
    }
}

impl fmt::Display for LedgerCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strips a Reddit kind prefix such as `t1_` or `t3_` from a fullname.
pub fn strip_kind_prefix(fullname: &str) -> &str {
    match fullname.split_once('_') {
        Some((kind, id)) if kind.len() == 2 && kind.starts_with('t') => id,
        _ => fullname,
    }
}
