//! Geolocation module for resolving the country and city of a proxy IP
//!
//! Two backends are available: an ipinfo-style HTTP service (the default)
//! and an offline MMDB database. Every lookup fault degrades to
//! [`GeoLocation::unknown`]; nothing here returns an error to the caller
//! once the locator has been built.

use crate::proxy::models::UNKNOWN;
use crate::Result;
use maxminddb::{geoip2, Reader};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Default geolocation service
pub const DEFAULT_GEO_URL: &str = "https://ipinfo.io";

/// Default timeout for a single geolocation request in seconds
pub const DEFAULT_GEO_TIMEOUT_SECS: u64 = 5;

/// Country and city of an IP address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub country: String,
    pub city: String,
}

impl GeoLocation {
    pub fn new(country: String, city: String) -> Self {
        Self { country, city }
    }

    /// Location used whenever a lookup fails
    pub fn unknown() -> Self {
        Self::new(UNKNOWN.to_string(), UNKNOWN.to_string())
    }

    /// True only when both country and city were resolved
    pub fn is_known(&self) -> bool {
        self.country != UNKNOWN && self.city != UNKNOWN
    }
}

impl Default for GeoLocation {
    fn default() -> Self {
        Self::unknown()
    }
}

impl std::fmt::Display for GeoLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}", self.city, self.country)
    }
}

/// Subset of the ipinfo JSON payload we care about
#[derive(Debug, Deserialize)]
struct IpInfo {
    country: Option<String>,
    city: Option<String>,
}

impl From<IpInfo> for GeoLocation {
    fn from(info: IpInfo) -> Self {
        Self::new(
            info.country.unwrap_or_else(|| UNKNOWN.to_string()),
            info.city.unwrap_or_else(|| UNKNOWN.to_string()),
        )
    }
}

#[derive(Clone)]
enum Backend {
    Http { client: Client, base_url: String },
    Mmdb(Arc<Reader<Vec<u8>>>),
}

/// Resolves IP addresses to a [`GeoLocation`]
#[derive(Clone)]
pub struct GeoLocator {
    backend: Backend,
}

impl GeoLocator {
    /// Create a locator backed by an ipinfo-style HTTP service
    pub fn http(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            backend: Backend::Http {
                client,
                base_url: base_url.trim_end_matches('/').to_string(),
            },
        })
    }

    /// Create a locator from an MMDB file path
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = Reader::open_readfile(path)?;
        Ok(Self {
            backend: Backend::Mmdb(Arc::new(reader)),
        })
    }

    /// Look up the location of an IP address string
    pub async fn locate(&self, ip: &str) -> GeoLocation {
        debug!(ip, "resolving location");
        match &self.backend {
            Backend::Http { client, base_url } => Self::locate_http(client, base_url, ip).await,
            Backend::Mmdb(reader) => match Self::locate_mmdb(reader, ip) {
                Ok(location) => location,
                Err(e) => {
                    warn!(ip, error = %e, "mmdb lookup failed");
                    GeoLocation::unknown()
                }
            },
        }
    }

    async fn locate_http(client: &Client, base_url: &str, ip: &str) -> GeoLocation {
        let url = format!("{}/{}/json", base_url, ip);
        let response = match client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(ip, error = %e, "geolocation request failed");
                return GeoLocation::unknown();
            }
        };

        if response.status() != StatusCode::OK {
            warn!(ip, status = %response.status(), "geolocation service refused lookup");
            return GeoLocation::unknown();
        }

        match response.json::<IpInfo>().await {
            Ok(info) => GeoLocation::from(info),
            Err(e) => {
                warn!(ip, error = %e, "geolocation payload unreadable");
                GeoLocation::unknown()
            }
        }
    }

    fn locate_mmdb(reader: &Reader<Vec<u8>>, ip: &str) -> Result<GeoLocation> {
        let ip: IpAddr = ip.parse()?;
        let lookup_result = reader.lookup(ip)?;

        let city: Option<geoip2::City> = lookup_result.decode()?;
        let Some(city) = city else {
            return Ok(GeoLocation::unknown());
        };

        let country = city
            .country
            .iso_code
            .map(String::from)
            .unwrap_or_else(|| UNKNOWN.to_string());
        let city_name = city
            .city
            .names
            .english
            .map(String::from)
            .unwrap_or_else(|| UNKNOWN.to_string());

        Ok(GeoLocation::new(country, city_name))
    }
}

impl std::fmt::Debug for GeoLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.backend {
            Backend::Http { base_url, .. } => write!(f, "GeoLocator(http: {})", base_url),
            Backend::Mmdb(_) => write!(f, "GeoLocator(mmdb)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn locator(server: &MockServer) -> GeoLocator {
        GeoLocator::http(&server.uri(), Duration::from_secs(DEFAULT_GEO_TIMEOUT_SECS)).unwrap()
    }

    #[test]
    fn test_geo_location_unknown() {
        let loc = GeoLocation::default();
        assert!(!loc.is_known());
        assert_eq!(loc.country, "Unknown");
        assert_eq!(loc.city, "Unknown");
    }

    #[test]
    fn test_geo_location_partially_known() {
        let loc = GeoLocation::new("US".to_string(), UNKNOWN.to_string());
        assert!(!loc.is_known());
        let loc = GeoLocation::new(UNKNOWN.to_string(), "Berlin".to_string());
        assert!(!loc.is_known());
        let loc = GeoLocation::new("DE".to_string(), "Berlin".to_string());
        assert!(loc.is_known());
        assert_eq!(loc.to_string(), "Berlin, DE");
    }

    #[tokio::test]
    async fn test_locate_http_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/5.6.7.8/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ip": "5.6.7.8",
                "country": "US",
                "city": "Ashburn",
                "region": "Virginia"
            })))
            .mount(&server)
            .await;

        let loc = locator(&server).locate("5.6.7.8").await;
        assert_eq!(loc, GeoLocation::new("US".to_string(), "Ashburn".to_string()));
    }

    #[tokio::test]
    async fn test_locate_http_missing_fields() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/1.2.3.4/json"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"country": "FR"})),
            )
            .mount(&server)
            .await;

        let loc = locator(&server).locate("1.2.3.4").await;
        assert_eq!(loc.country, "FR");
        assert_eq!(loc.city, "Unknown");
        assert!(!loc.is_known());
    }

    #[tokio::test]
    async fn test_locate_http_non_ok_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let loc = locator(&server).locate("1.2.3.4").await;
        assert_eq!(loc, GeoLocation::unknown());
    }

    #[tokio::test]
    async fn test_locate_http_bad_payload() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let loc = locator(&server).locate("1.2.3.4").await;
        assert_eq!(loc, GeoLocation::unknown());
    }

    #[tokio::test]
    async fn test_locate_http_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"country": "US", "city": "Ashburn"}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let geo = GeoLocator::http(&server.uri(), Duration::from_millis(50)).unwrap();
        assert_eq!(geo.locate("5.6.7.8").await, GeoLocation::unknown());
    }

    #[tokio::test]
    async fn test_locate_http_unreachable_service() {
        let geo = GeoLocator::http("http://127.0.0.1:1", Duration::from_secs(1)).unwrap();
        assert_eq!(geo.locate("5.6.7.8").await, GeoLocation::unknown());
    }

    #[test]
    fn test_from_path_missing_file() {
        assert!(GeoLocator::from_path("/nonexistent/GeoLite2-City.mmdb").is_err());
    }
}
