use common::NewsConfig;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::{Article, SearchQuery};
use crate::error::SearchError;

/// Client for the news API `everything` endpoint, restricted to a fixed set of
/// source domains.
pub struct ArticleFetcher {
    client: Client,
    api_url: String,
    api_key: String,
    domains: String,
    language: String,
}

#[derive(Debug, Deserialize)]
struct NewsResponse {
    status: Option<String>,
    message: Option<String>,
    #[serde(default)]
    articles: Vec<Article>,
}

impl ArticleFetcher {
    pub fn new(
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        domains: impl Into<String>,
        language: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SearchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("Newswire/0.1.0")
            .build()
            .map_err(|e| SearchError::Connection(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_url: api_url.into(),
            api_key: api_key.into(),
            domains: domains.into(),
            language: language.into(),
        })
    }

    pub fn from_config(config: &NewsConfig, api_key: &str) -> Result<Self, SearchError> {
        Self::new(
            &config.api_url,
            api_key,
            &config.domains,
            &config.language,
            config.timeout(),
        )
    }

    /// Issue one GET for `query` and classify the reply. An empty article list
    /// is a successful, empty result.
    pub async fn fetch(&self, query: &SearchQuery) -> Result<Vec<Article>, SearchError> {
        let mut params: Vec<(&str, String)> = vec![
            ("domains", self.domains.clone()),
            ("language", self.language.clone()),
            ("apiKey", self.api_key.clone()),
        ];
        if let Some(keyword) = &query.keyword {
            params.push(("q", keyword.clone()));
        }
        if let Some(from) = query.from {
            params.push(("from", from.format("%Y-%m-%d").to_string()));
        }
        if let Some(to) = query.to {
            params.push(("to", to.format("%Y-%m-%d").to_string()));
        }

        debug!(url = %self.api_url, keyword = ?query.keyword, "fetching articles");
        let response = self
            .client
            .get(&self.api_url)
            .query(&params)
            .send()
            .await
            .map_err(SearchError::from_transport)?;

        let status = response.status();
        match status {
            StatusCode::OK => {}
            StatusCode::UNAUTHORIZED => return Err(SearchError::RemoteAuth),
            StatusCode::TOO_MANY_REQUESTS => return Err(SearchError::RemoteRateLimited),
            StatusCode::UPGRADE_REQUIRED => return Err(SearchError::UpgradeRequired),
            other => {
                warn!(status = other.as_u16(), "news API returned an error status");
                return Err(SearchError::Http {
                    status: other.as_u16(),
                    reason: other.canonical_reason().unwrap_or("Unknown").to_string(),
                });
            }
        }

        let body = response.text().await.map_err(SearchError::from_transport)?;
        let parsed: NewsResponse =
            serde_json::from_str(&body).map_err(|e| SearchError::Parse(e.to_string()))?;

        if parsed.status.as_deref() != Some("ok") {
            return Err(SearchError::Api {
                message: parsed
                    .message
                    .unwrap_or_else(|| "Unknown API error".to_string()),
            });
        }

        Ok(parsed.articles)
    }
}
