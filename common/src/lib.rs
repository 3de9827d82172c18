/*!
common/src/lib.rs

Shared configuration types and helpers for newswire.

This file provides:
- Config data structures (deserialized from TOML), every section optional
- An async loader that layers an override file on top of a default file
- Validation of endpoints and limits, and env-var based secret lookup
*/

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Document export service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Base URL of the export API (e.g. "https://coda.io/apis/v1")
    pub api_base: String,
    /// Name of the env var holding the bearer token
    pub api_token_env: String,
    pub doc_id: Option<String>,
    pub page_id: Option<String>,
    pub output_format: String,
    /// Where the downloaded artifact is written
    pub output_path: String,
    pub poll_interval_seconds: u64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            api_base: "https://coda.io/apis/v1".to_string(),
            api_token_env: "CODA_API_TOKEN".to_string(),
            doc_id: None,
            page_id: None,
            output_format: "html".to_string(),
            output_path: "exported_page.html".to_string(),
            poll_interval_seconds: 2,
        }
    }
}

impl ExportConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }
}

/// News aggregation API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsConfig {
    pub api_url: String,
    /// Name of the env var holding the API key
    pub api_key_env: String,
    /// Comma-separated source domains passed as the `domains` filter
    pub domains: String,
    pub language: String,
    pub timeout_seconds: u64,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            api_url: "https://newsapi.org/v2/everything".to_string(),
            api_key_env: "NEWSAPI_KEY".to_string(),
            domains: "bbc.co.uk".to_string(),
            language: "en".to_string(),
            timeout_seconds: 10,
        }
    }
}

impl NewsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Token signing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Name of the env var holding the HMAC signing secret
    pub secret_env: String,
    pub token_ttl_hours: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret_env: "JWT_SECRET".to_string(),
            token_ttl_hours: 24,
        }
    }
}

/// Per-user sliding window limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub max_requests: usize,
    pub window_seconds: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_seconds: 300 }
    }
}

/// Top-level application configuration (deserialized from newswire.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub news: NewsConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

impl Config {
    /// Load configuration with an optional default file and an optional override file.
    /// If both are present, they are merged (override takes precedence). Missing files
    /// are skipped, so with neither present the built-in defaults are returned.
    pub async fn load_with_defaults(
        default_path: Option<&Path>,
        override_path: Option<&Path>,
    ) -> Result<Self> {
        let mut config_value = toml::Value::Table(toml::map::Map::new());

        for path in [default_path, override_path].into_iter().flatten() {
            if !path.exists() {
                continue;
            }
            let data = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            let val: toml::Value = toml::from_str(&data)
                .with_context(|| format!("Failed to parse configuration: {}", path.display()))?;
            merge_toml(&mut config_value, val);
        }

        let cfg: Config = config_value
            .try_into()
            .context("Failed to parse merged configuration")?;
        Ok(cfg)
    }

    /// Reject endpoints that do not parse and limits that would disable a component.
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.export.api_base)
            .with_context(|| format!("export.api_base is not a valid URL: {}", self.export.api_base))?;
        url::Url::parse(&self.news.api_url)
            .with_context(|| format!("news.api_url is not a valid URL: {}", self.news.api_url))?;

        if self.export.poll_interval_seconds == 0 {
            bail!("export.poll_interval_seconds must be greater than zero");
        }
        if self.news.timeout_seconds == 0 {
            bail!("news.timeout_seconds must be greater than zero");
        }
        if self.rate_limit.max_requests == 0 || self.rate_limit.window_seconds == 0 {
            bail!("rate_limit.max_requests and rate_limit.window_seconds must be greater than zero");
        }
        if self.cache.ttl_seconds == 0 {
            bail!("cache.ttl_seconds must be greater than zero");
        }
        if self.auth.token_ttl_hours <= 0 {
            bail!("auth.token_ttl_hours must be greater than zero");
        }
        Ok(())
    }
}

fn merge_toml(a: &mut toml::Value, b: toml::Value) {
    match (a, b) {
        (toml::Value::Table(a_map), toml::Value::Table(b_map)) => {
            for (k, v) in b_map {
                if let Some(a_val) = a_map.get_mut(&k) {
                    merge_toml(a_val, v);
                } else {
                    a_map.insert(k, v);
                }
            }
        }
        (a_val, b_val) => *a_val = b_val,
    }
}

/// Read a secret from the named env var. Unset and blank values are both `None`.
pub fn secret_from_env(var: &str) -> Option<String> {
    std::env::var(var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
