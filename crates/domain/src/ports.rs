//! Port definitions (traits) for external collaborators
//!
//! These traits define the boundaries between the domain and external systems.
//! Adapters implement these traits to connect to real infrastructure.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use time::OffsetDateTime;

use crate::model::{HistoryRecord, Item, PublishedPost};

/// Error type for search operations
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("API error: {0}")]
    Api(String),
    #[error("Rate limited, retry after: {0:?}")]
    RateLimited(Option<Duration>),
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("Network error: {0}")]
    Network(String),
}

/// Requested ordering of search results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultType {
    #[default]
    Recent,
    Popular,
    Mixed,
}

impl ResultType {
    pub fn as_str(self) -> &'static str {
        match self {
            ResultType::Recent => "recent",
            ResultType::Popular => "popular",
            ResultType::Mixed => "mixed",
        }
    }
}

/// One keyword query against the search collaborator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub keyword: String,
    /// Lower-bound item identifier (exclusive)
    pub since_id: String,
    pub page_size: u32,
    pub result_type: ResultType,
}

/// Opaque continuation token carried by the last page of a query response
///
/// The collaborator must accept it back verbatim to fetch the next page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageToken(String);

impl PageToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One page of search results
#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    pub items: Vec<Item>,
    /// Present only when more pages remain
    pub next_page: Option<PageToken>,
}

/// Port for querying the search collaborator
#[async_trait]
pub trait PostSearch: Send + Sync {
    /// Issue a fresh keyword query
    async fn search(&self, request: &SearchRequest) -> Result<SearchPage, SearchError>;

    /// Re-issue a query from a continuation token
    async fn fetch_next(&self, token: &PageToken) -> Result<SearchPage, SearchError>;
}

/// Error type for publish operations
///
/// The taxonomy is exhaustive: every rejection the collaborator can produce
/// maps to exactly one variant, and [`PublishError::is_recoverable`] encodes
/// which ones let the run continue with the next item.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Content rejected as a duplicate")]
    DuplicateContent,
    #[error("Content rejected for encoding: {0}")]
    Encoding(String),
    #[error("Rate limited")]
    RateLimited,
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("API error: {0}")]
    Api(String),
}

impl PublishError {
    /// Recoverable rejections are logged and skipped; anything else aborts
    /// the remaining publish loop for the run.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, PublishError::DuplicateContent | PublishError::Encoding(_))
    }
}

/// Port for publishing relays under the bot's identity
#[async_trait]
pub trait RelayPublisher: Send + Sync {
    async fn publish(&self, text: &str) -> Result<PublishedPost, PublishError>;
}

/// Error type for the durable history resource
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed history: {0}")]
    Malformed(String),
}

/// Port for loading and saving the durable history record
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Load the record; a missing resource is a fresh empty record
    ///
    /// A malformed or unreadable resource is an error the caller recovers
    /// from by starting over with an empty record.
    async fn load(&self) -> Result<HistoryRecord, HistoryError>;

    /// Persist the record, recomputing the cursor and fully replacing the
    /// previous contents
    async fn save(&self, record: &HistoryRecord) -> Result<(), HistoryError>;
}

/// Port for time operations (enables deterministic testing)
pub trait Clock: Send + Sync {
    fn now(&self) -> OffsetDateTime;
}

/// Real clock implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Port for the inter-publish pause (enables deterministic testing)
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real sleeper backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
