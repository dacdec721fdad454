//! Text the bot posts: the quote reply, the promoted post and their footer.

use quoteit_core::{strip_kind_prefix, Item};
use url::Url;

/// "About me" link used when a promoted quote touches a sensitive source.
pub const SPAM_LINK: &str = "http://bit.ly/1VvgsUB";
pub const NON_SPAM_LINK: &str = "https://reddit.com/r/quotesFAQ";

const REDDIT_BASE: &str = "https://reddit.com";

pub fn footer(about_link: &str) -> String {
    format!(
        "\n\n___\n\n\
         ^If ^this ^post ^receives ^enough ^upvotes, ^it ^will \
         ^be ^submitted ^to ^/r/Quotes! \
         ^| [^Code](https://github.com/cameron-gagnon/quoteitbot) \
         ^| [^About ^me]({about_link})"
    )
}

/// Reply posted under a summoning comment. Spam classification happens at
/// promotion time, so replies always carry the regular link.
pub fn format_reply(user: &str, quote: &str) -> String {
    format!(
        "Quoting /u/{user}: \"{quote}\"\n\n{}",
        footer(NON_SPAM_LINK)
    )
}

pub fn format_title(quote: &str, user: &str) -> String {
    format!("[QuoteItBot] {quote} - {user}")
}

pub fn about_link(sensitive: bool) -> &'static str {
    if sensitive {
        SPAM_LINK
    } else {
        NON_SPAM_LINK
    }
}

/// Link to the comment that was quoted, built from the bot reply's thread data.
pub fn permalink(reply: &Item) -> String {
    let mut url = match Url::parse(REDDIT_BASE) {
        Ok(url) => url,
        Err(_) => return REDDIT_BASE.to_string(),
    };

    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().extend([
            "r",
            reply.subreddit.as_str(),
            "comments",
            strip_kind_prefix(&reply.link_id),
            reply.link_title.as_str(),
            strip_kind_prefix(&reply.parent_id),
        ]);
    }
    url.to_string()
}

pub fn format_promotion_body(reply: &Item, about_link: &str) -> String {
    format!(
        "[Original quote source]({}).{}",
        permalink(reply),
        footer(about_link)
    )
}
