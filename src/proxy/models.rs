//! Proxy data models

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Literal stored in place of a latency when a probe fails
pub const FAIL_MARKER: &str = "fail";

/// Placeholder used when a location field cannot be resolved
pub const UNKNOWN: &str = "Unknown";

/// A proxy endpoint in `ip:port` form
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub ip: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(ip: String, port: u16) -> Self {
        Self { ip, port }
    }
}

impl FromStr for Endpoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (ip, port) = s
            .split_once(':')
            .ok_or_else(|| format!("missing port in {:?}", s))?;

        if ip.is_empty() {
            return Err(format!("missing host in {:?}", s));
        }
        if port.contains(':') {
            return Err(format!("too many separators in {:?}", s));
        }

        let port: u16 = port
            .parse()
            .map_err(|e| format!("invalid port in {:?}: {}", s, e))?;
        if port == 0 {
            return Err(format!("port zero in {:?}", s));
        }

        Ok(Self::new(ip.to_string(), port))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}

/// Measured connect latency, or the failure marker
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Speed {
    /// Connect-phase duration in seconds
    Seconds(f64),
    Fail,
}

impl Speed {
    pub fn is_fail(&self) -> bool {
        matches!(self, Speed::Fail)
    }

    pub fn seconds(&self) -> Option<f64> {
        match self {
            Speed::Seconds(s) => Some(*s),
            Speed::Fail => None,
        }
    }
}

impl fmt::Display for Speed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Speed::Seconds(s) => write!(f, "{:.3}s", s),
            Speed::Fail => write!(f, "{}", FAIL_MARKER),
        }
    }
}

impl Serialize for Speed {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Speed::Seconds(s) => serializer.serialize_f64(*s),
            Speed::Fail => serializer.serialize_str(FAIL_MARKER),
        }
    }
}

impl<'de> Deserialize<'de> for Speed {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SpeedVisitor;

        impl<'de> Visitor<'de> for SpeedVisitor {
            type Value = Speed;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "a latency in seconds or the string {:?}", FAIL_MARKER)
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Speed, E> {
                Ok(Speed::Seconds(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Speed, E> {
                Ok(Speed::Seconds(v as f64))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Speed, E> {
                Ok(Speed::Seconds(v as f64))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Speed, E> {
                if v == FAIL_MARKER {
                    Ok(Speed::Fail)
                } else {
                    Err(E::invalid_value(de::Unexpected::Str(v), &self))
                }
            }
        }

        deserializer.deserialize_any(SpeedVisitor)
    }
}

/// Persisted form of a validated endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProxyRecord {
    /// Endpoint identifier in `ip:port` form
    pub ip: String,
    pub country: String,
    pub city: String,
    pub speed: Speed,
}

impl ProxyRecord {
    /// Copy of this record carrying a new speed; identity and location are kept
    pub fn with_speed(&self, speed: Speed) -> Self {
        Self {
            speed,
            ..self.clone()
        }
    }
}

/// Successful validation of one endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    /// Original `ip:port` string
    pub identifier: String,
    pub country: String,
    pub city: String,
    /// Connect latency in seconds
    pub speed: f64,
}

impl Verdict {
    pub fn into_record(self) -> ProxyRecord {
        ProxyRecord {
            ip: self.identifier,
            country: self.country,
            city: self.city,
            speed: Speed::Seconds(self.speed),
        }
    }
}

/// Why an endpoint was rejected
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    Malformed(String),
    UnknownLocation,
    Unreachable(String),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Malformed(reason) => write!(f, "malformed endpoint: {}", reason),
            Rejection::UnknownLocation => write!(f, "location unknown"),
            Rejection::Unreachable(reason) => write!(f, "unreachable: {}", reason),
        }
    }
}

/// Result of validating one endpoint
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Accepted(Verdict),
    Rejected(Rejection),
}

impl Outcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Outcome::Accepted(_))
    }

    /// Collapse to the verdict, dropping the rejection reason
    pub fn into_verdict(self) -> Option<Verdict> {
        match self {
            Outcome::Accepted(verdict) => Some(verdict),
            Outcome::Rejected(_) => None,
        }
    }
}
