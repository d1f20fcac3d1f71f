//! Pure text rewriting for relays

use crate::model::Item;

/// Character budget for a relay
pub const RELAY_BUDGET: usize = 140;

/// Decode the HTML entities the search API escapes in post text
pub fn unescape(text: &str) -> String {
    let text = text
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"");
    // &amp; must decode last
    text.replace("&amp;", "&")
}

/// Shorten `text` to `budget` characters without losing a URL
///
/// Everything from the first `http` onward is preserved verbatim and only the
/// prefix before it is trimmed, so a link is never cut off.
pub fn truncate_to_budget(text: &str, budget: usize) -> String {
    if text.chars().count() <= budget {
        return text.to_string();
    }

    match text.find("http") {
        None => {
            let prefix: String = text.chars().take(budget.saturating_sub(3)).collect();
            format!("{prefix}...")
        }
        Some(url_start) => {
            let suffix = &text[url_start..];
            let keep = budget.saturating_sub(suffix.chars().count() + 4);
            let prefix: String = text.chars().take(keep).collect();
            format!("{prefix}... {suffix}")
        }
    }
}

/// Rewrite an item into its relay form: `RT @<handle> <text>`
///
/// The search API delivers the text with a leading self-mention; that prefix
/// is stripped before re-prepending the attribution. Results over `budget`
/// characters are shortened via [`truncate_to_budget`].
pub fn format_relay(item: &Item, budget: usize) -> String {
    let mention = format!("@{} ", item.author_handle);
    let body = item.text.strip_prefix(&mention).unwrap_or(&item.text);

    let relay = format!("RT @{} {}", item.author_handle, unescape(body));
    if relay.chars().count() > budget {
        truncate_to_budget(&relay, budget)
    } else {
        relay
    }
}
