//! Batch coordinator for validating many proxies on a bounded worker pool

use crate::proxy::geo::{GeoLocator, DEFAULT_GEO_TIMEOUT_SECS, DEFAULT_GEO_URL};
use crate::proxy::models::{ProxyRecord, Speed};
use crate::proxy::prober::{ReachabilityProber, DEFAULT_PROBE_TIMEOUT_SECS};
use crate::proxy::validator::EndpointValidator;
use crate::Result;
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::HashSet;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

/// Default number of concurrent checks
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Configuration for the validation pipeline
#[derive(Debug, Clone)]
pub struct CheckerConfig {
    /// Number of units in flight at once
    pub concurrency: usize,
    /// TCP connect timeout for each probe
    pub probe_timeout: Duration,
    /// Timeout for each geolocation request
    pub geo_timeout: Duration,
    /// Base URL of the geolocation service
    pub geo_url: String,
    /// Path to MMDB file, used instead of the geolocation service when set
    pub mmdb_path: Option<PathBuf>,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            probe_timeout: Duration::from_secs(DEFAULT_PROBE_TIMEOUT_SECS),
            geo_timeout: Duration::from_secs(DEFAULT_GEO_TIMEOUT_SECS),
            geo_url: DEFAULT_GEO_URL.to_string(),
            mmdb_path: None,
        }
    }
}

impl CheckerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn with_geo_timeout(mut self, timeout: Duration) -> Self {
        self.geo_timeout = timeout;
        self
    }

    pub fn with_geo_url(mut self, url: String) -> Self {
        self.geo_url = url;
        self
    }

    pub fn with_mmdb_path(mut self, path: PathBuf) -> Self {
        self.mmdb_path = Some(path);
        self
    }

    /// Build the geolocation backend described by this configuration
    pub fn geo_locator(&self) -> Result<GeoLocator> {
        match &self.mmdb_path {
            Some(path) => GeoLocator::from_path(path),
            None => GeoLocator::http(&self.geo_url, self.geo_timeout),
        }
    }
}

/// Run `unit` over every item with at most `width` units in flight.
///
/// Each unit is spawned as its own task. Results are returned in
/// completion order once every unit has finished; a unit that panics is
/// logged and contributes no value.
pub async fn run_bounded<I, T, F, Fut>(items: Vec<I>, width: usize, unit: F) -> Vec<T>
where
    I: Send + 'static,
    T: Send + 'static,
    F: Fn(I) -> Fut,
    Fut: Future<Output = T> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(width.max(1)));

    let mut pending: FuturesUnordered<_> = items
        .into_iter()
        .map(|item| {
            let sem = Arc::clone(&semaphore);
            let work = unit(item);
            tokio::spawn(async move {
                // The semaphore is never closed; the permit lives until the unit returns
                let _permit = sem.acquire_owned().await;
                work.await
            })
        })
        .collect();

    let mut results = Vec::with_capacity(pending.len());
    while let Some(joined) = pending.next().await {
        match joined {
            Ok(value) => results.push(value),
            Err(e) => error!(error = %e, "validation unit did not complete"),
        }
    }

    results
}

/// Validates batches of stored records or fresh candidates
#[derive(Debug, Clone)]
pub struct BatchCoordinator {
    validator: EndpointValidator,
    concurrency: usize,
}

impl BatchCoordinator {
    pub fn new(validator: EndpointValidator, concurrency: usize) -> Self {
        Self {
            validator,
            concurrency,
        }
    }

    /// Create a coordinator from configuration
    pub fn with_config(config: &CheckerConfig) -> Result<Self> {
        let geo = config.geo_locator()?;
        let prober = ReachabilityProber::new(config.probe_timeout);
        Ok(Self::new(
            EndpointValidator::new(geo, prober),
            config.concurrency,
        ))
    }

    /// Re-probe every stored record.
    ///
    /// Returns exactly one record per input with location untouched and
    /// the speed replaced by a fresh latency or `"fail"`.
    pub async fn refresh_existing(&self, records: Vec<ProxyRecord>) -> Vec<ProxyRecord> {
        let total = records.len();
        info!(total, concurrency = self.concurrency, "refreshing stored proxies");

        let indexed: Vec<(usize, ProxyRecord)> = records.into_iter().enumerate().collect();
        let originals = indexed.clone();

        let validator = self.validator.clone();
        let results = run_bounded(indexed, self.concurrency, move |(index, record)| {
            let validator = validator.clone();
            async move { (index, validator.reprobe(&record).await) }
        })
        .await;

        let seen: HashSet<usize> = results.iter().map(|(index, _)| *index).collect();
        let mut refreshed: Vec<ProxyRecord> = results.into_iter().map(|(_, record)| record).collect();

        for (index, record) in originals {
            if !seen.contains(&index) {
                warn!(ip = %record.ip, "no result for stored proxy, marking as failed");
                refreshed.push(record.with_speed(Speed::Fail));
            }
        }

        let failed = refreshed.iter().filter(|r| r.speed.is_fail()).count();
        info!(total, failed, "refresh complete");
        refreshed
    }

    /// Fully validate fresh candidates, keeping only accepted ones
    pub async fn ingest_new(&self, candidates: Vec<String>) -> Vec<ProxyRecord> {
        let total = candidates.len();
        info!(total, concurrency = self.concurrency, "validating new proxies");

        let validator = self.validator.clone();
        let outcomes = run_bounded(candidates, self.concurrency, move |candidate| {
            let validator = validator.clone();
            async move { validator.validate(&candidate).await }
        })
        .await;

        let accepted: Vec<ProxyRecord> = outcomes
            .into_iter()
            .filter_map(|outcome| outcome.into_verdict())
            .map(|verdict| verdict.into_record())
            .collect();

        info!(total, accepted = accepted.len(), "processed proxies with speed checks");
        accepted
    }
}
