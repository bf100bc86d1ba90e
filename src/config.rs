use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{invalid_config_error, Error};

pub const DEFAULT_GEOCODING_API_BASE: &str = "https://photon.komoot.io";
pub const DEFAULT_ROUTING_API_BASE: &str = "https://router.project-osrm.org";
pub const DEFAULT_TRAFFIC_API_BASE: &str = "https://api.tomtom.com";

#[derive(Clone, Debug)]
pub struct Config {
    pub geocoding_api_base: String,
    pub routing_api_base: String,
    pub traffic_api_base: String,
    /// `None` disables traffic annotation.
    pub traffic_api_key: Option<String>,
    pub traffic_sample_stride: usize,
    /// Upper bound on traffic requests in flight across all routes.
    pub traffic_max_inflight: usize,
    pub traffic_requests_per_second: u32,
    pub suggestion_limit: usize,
    pub suggest_quiet_period: Duration,
    pub http_timeout: Duration,
    pub listen_addr: SocketAddr,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            geocoding_api_base: DEFAULT_GEOCODING_API_BASE.into(),
            routing_api_base: DEFAULT_ROUTING_API_BASE.into(),
            traffic_api_base: DEFAULT_TRAFFIC_API_BASE.into(),
            traffic_api_key: None,
            traffic_sample_stride: 5,
            traffic_max_inflight: 4,
            traffic_requests_per_second: 5,
            suggestion_limit: 5,
            suggest_quiet_period: Duration::from_millis(300),
            http_timeout: Duration::from_secs(15),
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let traffic_sample_stride =
            parse_or(&lookup, "TRAFFIC_SAMPLE_STRIDE", defaults.traffic_sample_stride)?;
        if traffic_sample_stride == 0 {
            return Err(invalid_config_error(
                "TRAFFIC_SAMPLE_STRIDE must be at least 1".into(),
            ));
        }

        let traffic_max_inflight =
            parse_or(&lookup, "TRAFFIC_MAX_INFLIGHT", defaults.traffic_max_inflight)?;
        if traffic_max_inflight == 0 {
            return Err(invalid_config_error(
                "TRAFFIC_MAX_INFLIGHT must be at least 1".into(),
            ));
        }

        let traffic_requests_per_second = parse_or(
            &lookup,
            "TRAFFIC_REQUESTS_PER_SECOND",
            defaults.traffic_requests_per_second,
        )?;
        if traffic_requests_per_second == 0 {
            return Err(invalid_config_error(
                "TRAFFIC_REQUESTS_PER_SECOND must be at least 1".into(),
            ));
        }

        let quiet_ms: u64 = parse_or(
            &lookup,
            "SUGGEST_QUIET_PERIOD_MS",
            defaults.suggest_quiet_period.as_millis() as u64,
        )?;
        let timeout_secs: u64 =
            parse_or(&lookup, "HTTP_TIMEOUT_SECS", defaults.http_timeout.as_secs())?;

        let listen_addr = match lookup("LISTEN_ADDR") {
            Some(addr) => addr.parse::<SocketAddr>()?,
            None => defaults.listen_addr,
        };

        Ok(Self {
            geocoding_api_base: lookup("GEOCODING_API_BASE").unwrap_or(defaults.geocoding_api_base),
            routing_api_base: lookup("ROUTING_API_BASE").unwrap_or(defaults.routing_api_base),
            traffic_api_base: lookup("TRAFFIC_API_BASE").unwrap_or(defaults.traffic_api_base),
            traffic_api_key: lookup("TRAFFIC_API_KEY").filter(|key| !key.trim().is_empty()),
            traffic_sample_stride,
            traffic_max_inflight,
            traffic_requests_per_second,
            suggestion_limit: parse_or(&lookup, "SUGGESTION_LIMIT", defaults.suggestion_limit)?,
            suggest_quiet_period: Duration::from_millis(quiet_ms),
            http_timeout: Duration::from_secs(timeout_secs),
            listen_addr,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, Error>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| invalid_config_error(format!("{} is not a valid number", key))),
        None => Ok(default),
    }
}

#[cfg(test)]
fn lookup_from(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
    move |key| {
        pairs
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.to_string())
    }
}

#[test]
fn defaults_without_env() {
    let config = Config::from_lookup(lookup_from(&[])).unwrap();

    assert_eq!(config.routing_api_base, DEFAULT_ROUTING_API_BASE);
    assert_eq!(config.traffic_sample_stride, 5);
    assert_eq!(config.traffic_max_inflight, 4);
    assert_eq!(config.traffic_requests_per_second, 5);
    assert_eq!(config.suggestion_limit, 5);
    assert!(config.traffic_api_key.is_none());
}

#[test]
fn blank_traffic_key_disables_traffic() {
    let config = Config::from_lookup(lookup_from(&[("TRAFFIC_API_KEY", "  ")])).unwrap();
    assert!(config.traffic_api_key.is_none());

    let config = Config::from_lookup(lookup_from(&[("TRAFFIC_API_KEY", "abc")])).unwrap();
    assert_eq!(config.traffic_api_key.as_deref(), Some("abc"));
}

#[test]
fn rejects_bad_numbers() {
    let result = Config::from_lookup(lookup_from(&[("TRAFFIC_SAMPLE_STRIDE", "0")]));
    assert_eq!(result.unwrap_err().code, 2);

    let result = Config::from_lookup(lookup_from(&[("TRAFFIC_MAX_INFLIGHT", "0")]));
    assert_eq!(result.unwrap_err().code, 2);

    let result = Config::from_lookup(lookup_from(&[("TRAFFIC_REQUESTS_PER_SECOND", "0")]));
    assert_eq!(result.unwrap_err().code, 2);

    let result = Config::from_lookup(lookup_from(&[("SUGGESTION_LIMIT", "five")]));
    assert_eq!(result.unwrap_err().code, 2);

    let result = Config::from_lookup(lookup_from(&[("LISTEN_ADDR", "nowhere")]));
    assert_eq!(result.unwrap_err().code, 2);
}

#[test]
fn overrides_from_env() {
    let config = Config::from_lookup(lookup_from(&[
        ("TRAFFIC_SAMPLE_STRIDE", "3"),
        ("TRAFFIC_MAX_INFLIGHT", "16"),
        ("SUGGEST_QUIET_PERIOD_MS", "0"),
        ("LISTEN_ADDR", "0.0.0.0:8080"),
    ]))
    .unwrap();

    assert_eq!(config.traffic_sample_stride, 3);
    assert_eq!(config.traffic_max_inflight, 16);
    assert_eq!(config.suggest_quiet_period, Duration::ZERO);
    assert_eq!(config.listen_addr.port(), 8080);
}
