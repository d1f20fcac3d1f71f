//! HTTP publish adapter for posting relays

use async_trait::async_trait;
use keyword_relay_domain::{PublishError, PublishedPost, RelayPublisher};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// HTTP implementation of the publish collaborator
pub struct HttpRelayPublisher {
    client: Client,
    user_token: SecretString,
    base_url: String,
}

impl HttpRelayPublisher {
    pub fn new(user_token: SecretString) -> Self {
        Self::with_base_url(user_token, "https://api.twitter.com/1.1".to_string())
    }

    pub fn with_base_url(user_token: SecretString, base_url: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            user_token,
            base_url,
        }
    }
}

#[derive(Serialize)]
struct UpdateRequest<'a> {
    status: &'a str,
}

#[derive(Deserialize)]
struct UpdateResponse {
    id_str: String,
    created_at: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Map a rejection body onto the publish error taxonomy
fn classify_rejection(status: reqwest::StatusCode, body: &str) -> PublishError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .map(|e| e.error)
        .unwrap_or_else(|_| body.to_string());

    let lowered = message.to_lowercase();
    if lowered.contains("duplicate") {
        PublishError::DuplicateContent
    } else if lowered.contains("encod") {
        PublishError::Encoding(message)
    } else {
        PublishError::Api(format!("Publish rejected ({}): {}", status, message))
    }
}

#[async_trait]
impl RelayPublisher for HttpRelayPublisher {
    async fn publish(&self, text: &str) -> Result<PublishedPost, PublishError> {
        let url = format!("{}/statuses/update.json", self.base_url);

        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.user_token.expose_secret()),
            )
            .json(&UpdateRequest { status: text })
            .send()
            .await
            .map_err(|e| PublishError::Network(e.to_string()))?;

        let status = response.status();

        if status == 401 {
            return Err(PublishError::Auth("Invalid user token".to_string()));
        }

        if status == 429 {
            return Err(PublishError::RateLimited);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_rejection(status, &body));
        }

        let update: UpdateResponse = response
            .json()
            .await
            .map_err(|e| PublishError::Api(e.to_string()))?;

        Ok(PublishedPost {
            id: update.id_str,
            created_at: update.created_at,
        })
    }
}
