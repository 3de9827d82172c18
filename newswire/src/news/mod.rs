use chrono::NaiveDate;
use common::Config;
use serde::Deserialize;
use tracing::{debug, info};

use crate::auth::TokenAuthority;
use crate::cache::{self, ResponseCache};
use crate::error::{QueryError, SearchError};
use crate::rate_limit::RateLimiter;

pub mod fetcher;
pub mod format;

pub use fetcher::ArticleFetcher;

/// Placeholder for fields the news API omitted or sent as null.
pub const NOT_AVAILABLE: &str = "N/A";

/// One article as returned by the news API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawArticle")]
pub struct Article {
    pub title: String,
    pub description: String,
    pub url: String,
    pub published_at: String,
    pub source_name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawArticle {
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    published_at: Option<String>,
    source: Option<RawSource>,
}

#[derive(Deserialize)]
struct RawSource {
    name: Option<String>,
}

impl From<RawArticle> for Article {
    fn from(raw: RawArticle) -> Self {
        let or_na = |v: Option<String>| v.unwrap_or_else(|| NOT_AVAILABLE.to_string());
        Article {
            title: or_na(raw.title),
            description: or_na(raw.description),
            url: or_na(raw.url),
            published_at: or_na(raw.published_at),
            source_name: or_na(raw.source.and_then(|s| s.name)),
        }
    }
}

/// Validated search parameters. Dates are kept as calendar dates and rendered as
/// YYYY-MM-DD for the API.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    pub keyword: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl SearchQuery {
    /// Parse raw prompt input. Blank fields are absent; dates use DD-MM-YYYY.
    pub fn parse(keyword: &str, from: &str, to: &str) -> Result<Self, QueryError> {
        let keyword = Some(keyword.trim())
            .filter(|k| !k.is_empty())
            .map(str::to_string);
        let from = parse_user_date("from", from)?;
        let to = parse_user_date("to", to)?;

        if let (Some(f), Some(t)) = (from, to) {
            if f > t {
                return Err(QueryError::InvertedRange);
            }
        }

        Ok(Self { keyword, from, to })
    }

    pub fn cache_key(&self) -> String {
        cache::key_for(self.keyword.as_deref(), self.from, self.to)
    }
}

fn parse_user_date(field: &'static str, value: &str) -> Result<Option<NaiveDate>, QueryError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(value, "%d-%m-%Y")
        .map(Some)
        .map_err(|_| QueryError::BadDate {
            field,
            value: value.to_string(),
        })
}

/// Where a search result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultSource {
    Cache,
    Remote,
}

#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub articles: Vec<Article>,
    pub source: ResultSource,
    /// Requests left for this user in the current rate window.
    pub remaining: usize,
}

/// Everything an authenticated search needs, owned in one place and borrowed
/// mutably per search.
pub struct SearchContext {
    tokens: TokenAuthority,
    limiter: RateLimiter,
    cache: ResponseCache<Vec<Article>>,
    fetcher: ArticleFetcher,
}

impl SearchContext {
    pub fn new(
        tokens: TokenAuthority,
        limiter: RateLimiter,
        cache: ResponseCache<Vec<Article>>,
        fetcher: ArticleFetcher,
    ) -> Self {
        Self {
            tokens,
            limiter,
            cache,
            fetcher,
        }
    }

    pub fn from_config(config: &Config, api_key: &str) -> Result<Self, SearchError> {
        Ok(Self::new(
            TokenAuthority::from_config(&config.auth),
            RateLimiter::new(config.rate_limit.max_requests, config.rate_limit.window_seconds),
            ResponseCache::new(config.cache.ttl_seconds),
            ArticleFetcher::from_config(&config.news, api_key)?,
        ))
    }

    pub fn tokens(&self) -> &TokenAuthority {
        &self.tokens
    }

    /// Run one search: verify the token, admit against the user's window, then
    /// serve from cache or fetch and cache. A rejected token consumes nothing.
    pub async fn search(
        &mut self,
        token: &str,
        query: &SearchQuery,
    ) -> Result<SearchOutcome, SearchError> {
        let user_id = self.tokens.verify(token)?.user_id;

        if !self.limiter.admit(&user_id) {
            return Err(SearchError::RateLimited {
                retry_after: self.limiter.retry_after(&user_id),
            });
        }

        let key = query.cache_key();
        if let Some(articles) = self.cache.get(&key) {
            debug!(user = %user_id, key = %key, "serving search from cache");
            return Ok(SearchOutcome {
                articles,
                source: ResultSource::Cache,
                remaining: self.limiter.remaining(&user_id),
            });
        }

        let articles = self.fetcher.fetch(query).await?;
        if !articles.is_empty() {
            self.cache.put(key, articles.clone());
        }

        let remaining = self.limiter.remaining(&user_id);
        info!(user = %user_id, count = articles.len(), remaining, "fetched fresh articles");

        Ok(SearchOutcome {
            articles,
            source: ResultSource::Remote,
            remaining,
        })
    }
}
