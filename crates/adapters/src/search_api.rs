//! HTTP search adapter for fetching keyword matches

use async_trait::async_trait;
use keyword_relay_domain::{
    Item, PageToken, PostSearch, SearchError, SearchPage, SearchRequest,
};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use time::OffsetDateTime;
use url::form_urlencoded;

/// HTTP implementation of the search collaborator
pub struct HttpPostSearch {
    client: Client,
    bearer_token: SecretString,
    base_url: String,
}

impl HttpPostSearch {
    pub fn new(bearer_token: SecretString) -> Self {
        Self::with_base_url(bearer_token, "https://search.twitter.com".to_string())
    }

    pub fn with_base_url(bearer_token: SecretString, base_url: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            bearer_token,
            base_url,
        }
    }

    async fn execute(&self, params: &[(String, String)]) -> Result<SearchPage, SearchError> {
        let url = format!("{}/search.json", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(params)
            .header(
                "Authorization",
                format!("Bearer {}", self.bearer_token.expose_secret()),
            )
            .send()
            .await
            .map_err(|e| SearchError::Network(e.to_string()))?;

        if response.status() == 401 {
            return Err(SearchError::Auth("Invalid bearer token".to_string()));
        }

        if response.status() == 429 {
            let retry_after = response
                .headers()
                .get("x-rate-limit-reset")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .map(|ts| {
                    let now = OffsetDateTime::now_utc().unix_timestamp() as u64;
                    Duration::from_secs(ts.saturating_sub(now))
                });
            return Err(SearchError::RateLimited(retry_after));
        }

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Api(format!("Search failed: {}", body)));
        }

        let search_response: SearchResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Api(e.to_string()))?;

        Ok(SearchPage {
            items: search_response.results,
            next_page: search_response.next_page.map(PageToken::new),
        })
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<Item>,
    next_page: Option<String>,
}

#[async_trait]
impl PostSearch for HttpPostSearch {
    async fn search(&self, request: &SearchRequest) -> Result<SearchPage, SearchError> {
        let params = vec![
            ("q".to_string(), request.keyword.clone()),
            ("since_id".to_string(), request.since_id.clone()),
            ("rpp".to_string(), request.page_size.to_string()),
            (
                "result_type".to_string(),
                request.result_type.as_str().to_string(),
            ),
        ];

        self.execute(&params).await
    }

    async fn fetch_next(&self, token: &PageToken) -> Result<SearchPage, SearchError> {
        // The token is the next page's query string, re-issued verbatim
        let raw = token.as_str().trim_start_matches('?');
        let params: Vec<(String, String)> = form_urlencoded::parse(raw.as_bytes())
            .into_owned()
            .collect();

        self.execute(&params).await
    }
}
