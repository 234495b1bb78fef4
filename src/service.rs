//! Entry points for refreshing, fetching and exporting the proxy store
//!
//! Each operation reads the store once, runs one batch, and writes the
//! store once. Invocations are not serialized against each other.

use crate::proxy::{BatchCoordinator, FeedFilters, ProxyRecord, SourceFeed};
use crate::store::{JsonFileStore, ProxyStore};
use crate::{Config, Result};
use tracing::info;

/// Proxy store operations over an injected [`ProxyStore`]
pub struct ProxyService<S: ProxyStore> {
    store: S,
    coordinator: BatchCoordinator,
    feed: SourceFeed,
}

impl ProxyService<JsonFileStore> {
    /// Build a service backed by the JSON file store named in `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            JsonFileStore::new(&config.store_path),
            BatchCoordinator::with_config(&config.checker)?,
            SourceFeed::new(&config.feed_url)?,
        ))
    }
}

impl<S: ProxyStore> ProxyService<S> {
    pub fn new(store: S, coordinator: BatchCoordinator, feed: SourceFeed) -> Self {
        Self {
            store,
            coordinator,
            feed,
        }
    }

    #[cfg(test)]
    fn store(&self) -> &S {
        &self.store
    }

    /// Current store contents, without any validation
    pub fn list(&self) -> Result<Vec<ProxyRecord>> {
        self.store.load()
    }

    /// Re-probe every stored proxy and save the re-scored records
    pub async fn refresh(&self) -> Result<Vec<ProxyRecord>> {
        let records = self.store.load()?;
        let refreshed = self.coordinator.refresh_existing(records).await;
        self.store.save(&refreshed)?;
        Ok(refreshed)
    }

    /// Replace the store with validated candidates from the feed
    pub async fn fetch_new(&self, filters: &FeedFilters) -> Result<Vec<ProxyRecord>> {
        let candidates = self.feed.fetch(filters).await?;
        info!(count = candidates.len(), ?filters, "fetched candidates");

        let accepted = self.coordinator.ingest_new(candidates).await;
        self.store.save(&accepted)?;
        Ok(accepted)
    }

    /// Stored identifiers as plaintext, one `ip:port` per line
    pub fn export(&self) -> Result<String> {
        let records = self.store.load()?;
        Ok(records
            .iter()
            .map(|record| record.ip.as_str())
            .collect::<Vec<_>>()
            .join("\n"))
    }
}
