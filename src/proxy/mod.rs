//! Proxy validation pipeline
//!
//! This module provides functionality for:
//! - Parsing `ip:port` endpoints and the persisted record format
//! - Resolving endpoint geolocation through an HTTP service or MMDB file
//! - Probing TCP reachability and measuring connect latency
//! - Validating batches of endpoints on a bounded worker pool
//! - Fetching fresh candidates from a proxy-list feed

pub mod checker;
pub mod feed;
pub mod geo;
pub mod models;
pub mod prober;
pub mod validator;

pub use checker::{run_bounded, BatchCoordinator, CheckerConfig};
pub use feed::{FeedFilters, SourceFeed};
pub use geo::{GeoLocation, GeoLocator};
pub use models::{Endpoint, Outcome, ProxyRecord, Rejection, Speed, Verdict};
pub use prober::{ProbeFailure, ReachabilityProber};
pub use validator::EndpointValidator;
