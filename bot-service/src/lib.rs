//! The QuoteIt! bot pipeline: mail moderation, search, matching, replies and
//! promotion of popular quotes, driven by [`QuoteBot`].

pub mod fetcher;
pub mod matcher;
pub mod moderator;
pub mod promoter;
pub mod responder;
pub mod service;
pub mod templates;

pub use fetcher::Fetcher;
pub use matcher::{Matcher, QuoteRequest};
pub use moderator::Moderator;
pub use promoter::{Promoter, PromotionStats};
pub use responder::{ReplyOutcome, ReplyStats, Responder};
pub use service::{IterationReport, QuoteBot};
