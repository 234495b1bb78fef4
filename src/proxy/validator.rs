//! Per-endpoint validation: geolocation first, then reachability

use crate::proxy::geo::GeoLocator;
use crate::proxy::models::{Endpoint, Outcome, ProxyRecord, Rejection, Speed, Verdict};
use crate::proxy::prober::ReachabilityProber;
use tracing::{debug, info};

/// Combines a [`GeoLocator`] and a [`ReachabilityProber`] into one verdict
#[derive(Debug, Clone)]
pub struct EndpointValidator {
    geo: GeoLocator,
    prober: ReachabilityProber,
}

impl EndpointValidator {
    pub fn new(geo: GeoLocator, prober: ReachabilityProber) -> Self {
        Self { geo, prober }
    }

    /// Validate a raw `ip:port` candidate.
    ///
    /// Endpoints whose country or city cannot be resolved are rejected
    /// without being probed.
    pub async fn validate(&self, candidate: &str) -> Outcome {
        let endpoint: Endpoint = match candidate.parse() {
            Ok(endpoint) => endpoint,
            Err(reason) => {
                debug!(candidate, %reason, "rejecting malformed candidate");
                return Outcome::Rejected(Rejection::Malformed(reason));
            }
        };

        let location = self.geo.locate(&endpoint.ip).await;
        if !location.is_known() {
            debug!(%endpoint, "location check failed");
            return Outcome::Rejected(Rejection::UnknownLocation);
        }

        match self.prober.probe(&endpoint.ip, endpoint.port).await {
            Ok(elapsed) => {
                let speed = elapsed.as_secs_f64();
                info!(%endpoint, speed, %location, "proxy responded");
                Outcome::Accepted(Verdict {
                    identifier: candidate.trim().to_string(),
                    country: location.country,
                    city: location.city,
                    speed,
                })
            }
            Err(failure) => {
                debug!(%endpoint, %failure, "proxy did not respond");
                Outcome::Rejected(Rejection::Unreachable(failure.to_string()))
            }
        }
    }

    /// Re-score an existing record by reachability alone.
    ///
    /// Location is carried forward unchanged; any failure, including an
    /// unparseable identifier, yields the `"fail"` marker.
    pub async fn reprobe(&self, record: &ProxyRecord) -> ProxyRecord {
        let endpoint: Endpoint = match record.ip.parse() {
            Ok(endpoint) => endpoint,
            Err(reason) => {
                debug!(ip = %record.ip, %reason, "stored identifier is malformed");
                return record.with_speed(Speed::Fail);
            }
        };

        match self.prober.probe(&endpoint.ip, endpoint.port).await {
            Ok(elapsed) => record.with_speed(Speed::Seconds(elapsed.as_secs_f64())),
            Err(failure) => {
                debug!(%endpoint, %failure, "stored proxy did not respond");
                record.with_speed(Speed::Fail)
            }
        }
    }
}
