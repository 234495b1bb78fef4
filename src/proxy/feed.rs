//! Source feed for fetching fresh proxy candidates
//!
//! The feed is a proxyscrape-style endpoint returning a plaintext list
//! of `ip:port` lines, filtered by protocol, country, SSL support and
//! anonymity level.

use crate::Result;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{info, warn};

/// Default proxy-list provider
pub const DEFAULT_FEED_URL: &str = "https://api.proxyscrape.com/v2/";

/// Default timeout for the feed request in seconds
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Filters forwarded to the proxy-list provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedFilters {
    pub protocol: String,
    /// Provider-side timeout in milliseconds
    pub timeout: u32,
    pub country: String,
    pub ssl: String,
    pub anonymity: String,
}

impl Default for FeedFilters {
    fn default() -> Self {
        Self {
            protocol: "all".to_string(),
            timeout: 10000,
            country: "all".to_string(),
            ssl: "all".to_string(),
            anonymity: "all".to_string(),
        }
    }
}

impl FeedFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_protocol(mut self, protocol: String) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn with_timeout(mut self, timeout: u32) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_country(mut self, country: String) -> Self {
        self.country = country;
        self
    }

    pub fn with_ssl(mut self, ssl: String) -> Self {
        self.ssl = ssl;
        self
    }

    pub fn with_anonymity(mut self, anonymity: String) -> Self {
        self.anonymity = anonymity;
        self
    }

    fn query(&self) -> [(&'static str, String); 6] {
        [
            ("request", "displayproxies".to_string()),
            ("protocol", self.protocol.clone()),
            ("timeout", self.timeout.to_string()),
            ("country", self.country.clone()),
            ("ssl", self.ssl.clone()),
            ("anonymity", self.anonymity.clone()),
        ]
    }
}

/// Client for the proxy-list provider
#[derive(Debug, Clone)]
pub struct SourceFeed {
    client: Client,
    url: String,
}

impl SourceFeed {
    pub fn new(url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    /// Fetch candidate `ip:port` strings.
    ///
    /// A non-200 response yields an empty list; transport failures are
    /// returned as errors.
    pub async fn fetch(&self, filters: &FeedFilters) -> Result<Vec<String>> {
        let response = self
            .client
            .get(&self.url)
            .query(&filters.query())
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            warn!(status = %response.status(), "proxy feed returned no list");
            return Ok(Vec::new());
        }

        let content = response.text().await?;
        let candidates = Self::parse_list(&content);
        info!(count = candidates.len(), "fetched proxies");
        Ok(candidates)
    }

    /// Split a plaintext list into non-empty lines
    pub fn parse_list(content: &str) -> Vec<String> {
        content
            .trim()
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect()
    }
}
