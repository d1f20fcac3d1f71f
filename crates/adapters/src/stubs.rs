//! Scripted collaborator implementations for tests

use async_trait::async_trait;
use keyword_relay_domain::{
    PageToken, PostSearch, PublishError, PublishedPost, RelayPublisher, SearchError, SearchPage,
    SearchRequest,
};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// Stub search collaborator with scripted pages
#[derive(Default)]
pub struct StubPostSearch {
    first_pages: HashMap<String, SearchPage>,
    next_pages: HashMap<String, SearchPage>,
    failing_keywords: Vec<String>,
}

impl StubPostSearch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the first page returned for a keyword
    pub fn page_for(mut self, keyword: &str, page: SearchPage) -> Self {
        self.first_pages.insert(keyword.to_string(), page);
        self
    }

    /// Script the page returned for a continuation token
    pub fn next_page_for(mut self, token: &str, page: SearchPage) -> Self {
        self.next_pages.insert(token.to_string(), page);
        self
    }

    /// Script a keyword whose search always fails
    pub fn failing_keyword(mut self, keyword: &str) -> Self {
        self.failing_keywords.push(keyword.to_string());
        self
    }
}

#[async_trait]
impl PostSearch for StubPostSearch {
    async fn search(&self, request: &SearchRequest) -> Result<SearchPage, SearchError> {
        if self.failing_keywords.contains(&request.keyword) {
            return Err(SearchError::Api("stub failure".to_string()));
        }

        Ok(self
            .first_pages
            .get(&request.keyword)
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_next(&self, token: &PageToken) -> Result<SearchPage, SearchError> {
        self.next_pages
            .get(token.as_str())
            .cloned()
            .ok_or_else(|| SearchError::Api(format!("Unknown token: {}", token.as_str())))
    }
}

/// Stub publisher that records published texts
///
/// Publishes succeed unless an error is scripted for the call, in order.
#[derive(Default)]
pub struct StubRelayPublisher {
    scripted: Mutex<VecDeque<Option<PublishError>>>,
    published: Mutex<Vec<String>>,
}

impl StubRelayPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_outcomes(outcomes: Vec<Option<PublishError>>) -> Self {
        Self {
            scripted: Mutex::new(outcomes.into()),
            published: Mutex::new(vec![]),
        }
    }

    /// All texts that were published
    pub fn published(&self) -> Vec<String> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl RelayPublisher for StubRelayPublisher {
    async fn publish(&self, text: &str) -> Result<PublishedPost, PublishError> {
        if let Some(Some(error)) = self.scripted.lock().unwrap().pop_front() {
            return Err(error);
        }

        let mut published = self.published.lock().unwrap();
        published.push(text.to_string());

        Ok(PublishedPost {
            id: format!("stub_{}", published.len()),
            created_at: "Mon, 05 Dec 2011 20:00:00 +0000".to_string(),
        })
    }
}
