//! Domain models and value objects

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use time::OffsetDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

/// Timestamp format used by the search API, e.g. `Mon, 05 Dec 2011 18:30:00 +0000`
pub const WIRE_TIME_FORMAT: &[BorrowedFormatItem<'static>] = format_description!(
    "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] [offset_hour sign:mandatory][offset_minute]"
);

/// A post fetched from the search collaborator
///
/// Immutable once fetched. Serde names follow the search API's wire format,
/// which is also the shape stored in the history file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Platform-assigned identifier (numeric-sortable string)
    #[serde(rename = "id_str")]
    pub id: String,
    /// Author's user identifier
    #[serde(rename = "from_user_id")]
    pub author_id: String,
    /// Author's handle, without the leading `@`
    #[serde(rename = "from_user")]
    pub author_handle: String,
    /// Raw post text, possibly containing HTML entities
    pub text: String,
    /// Origination timestamp in the wire format (UTC offset +0000)
    pub created_at: String,
}

impl Item {
    /// Parse the origination timestamp into an absolute instant
    pub fn created_instant(&self) -> Result<OffsetDateTime, time::error::Parse> {
        OffsetDateTime::parse(&self.created_at, WIRE_TIME_FORMAT)
    }
}

/// Durable record of what the bot has seen and sent
///
/// Loaded at run start, mutated during the publish loop (one insertion per
/// successful publish), and rewritten to durable storage once at run end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Timestamp of the most recent completed run, empty before the first run
    #[serde(rename = "lastUpdate", default)]
    pub last_update: String,
    /// Numerically-highest item identifier ever remembered, `"1"` when none
    #[serde(rename = "sinceId", default = "default_since_id")]
    pub since_id: String,
    /// All remembered items, keyed by identifier
    #[serde(rename = "tweets", default)]
    pub items: HashMap<String, Item>,
}

impl Default for HistoryRecord {
    fn default() -> Self {
        Self {
            last_update: String::new(),
            since_id: default_since_id(),
            items: HashMap::new(),
        }
    }
}

fn default_since_id() -> String {
    "1".to_string()
}

impl HistoryRecord {
    /// Insert an item keyed by its identifier; overwrites if already present
    pub fn remember(&mut self, item: Item) {
        self.items.insert(item.id.clone(), item);
    }

    /// Whether an item identifier has already been remembered
    pub fn contains(&self, id: &str) -> bool {
        self.items.contains_key(id)
    }

    /// Numeric maximum of all remembered identifiers, or `"1"` when empty
    ///
    /// This is the value persisted as the cursor and the lower bound for the
    /// next run's searches.
    pub fn compute_since_id(&self) -> String {
        self.items
            .keys()
            .filter_map(|id| id.parse::<u64>().ok())
            .max()
            .map(|id| id.to_string())
            .unwrap_or_else(default_since_id)
    }

    /// Stamp `last_update` with the given instant in the wire format
    pub fn touch(&mut self, now: OffsetDateTime) {
        self.last_update = now.format(WIRE_TIME_FORMAT).unwrap_or_default();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Provider-assigned identity of a successfully published relay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedPost {
    pub id: String,
    pub created_at: String,
}

/// Classification of one run's aggregated search results
///
/// `accepted` is sorted ascending by origination time; the counts are for
/// observability only and never drive control flow.
#[derive(Debug, Clone, Default)]
pub struct Partition {
    /// Items to relay, oldest first
    pub accepted: Vec<Item>,
    /// Items authored by the bot itself
    pub self_authored: usize,
    /// Items already remembered, or repeated within this batch
    pub duplicates: usize,
}

impl Partition {
    pub fn fresh(&self) -> usize {
        self.accepted.len()
    }
}

/// Summary of one completed relay run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Items returned by the search aggregation, before filtering
    pub fetched: usize,
    /// Keywords whose search failed and was skipped
    pub failed_keywords: usize,
    /// Items accepted for relaying
    pub fresh: usize,
    /// Items discarded as self-authored
    pub self_authored: usize,
    /// Items discarded as duplicates
    pub duplicates: usize,
    /// Items successfully relayed
    pub relayed: usize,
    /// Items skipped on a recoverable publish rejection
    pub skipped: usize,
}
