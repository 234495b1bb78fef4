//! Proxy Keeper - Validated Proxy Store
//!
//! Keeps a store of proxy endpoints annotated with connect latency and
//! geographic origin. Candidates come from a proxy-list feed and are
//! validated concurrently before they are persisted.

pub mod proxy;
pub mod service;
pub mod store;

pub use proxy::*;
pub use service::ProxyService;
pub use store::{JsonFileStore, ProxyStore};

use std::path::PathBuf;

/// Application result type
pub type Result<T> = anyhow::Result<T>;

/// Default location of the JSON store
pub const DEFAULT_STORE_PATH: &str = "proxies.json";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// JSON store file path
    pub store_path: PathBuf,
    /// Base URL of the proxy-list feed
    pub feed_url: String,
    /// Validation pipeline settings
    pub checker: CheckerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            feed_url: proxy::feed::DEFAULT_FEED_URL.to_string(),
            checker: CheckerConfig::default(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_store_path(mut self, path: PathBuf) -> Self {
        self.store_path = path;
        self
    }

    pub fn with_feed_url(mut self, url: String) -> Self {
        self.feed_url = url;
        self
    }

    pub fn with_checker(mut self, checker: CheckerConfig) -> Self {
        self.checker = checker;
        self
    }
}
