mod geocode_api;
mod route_api;
mod traffic_api;

#[cfg(test)]
pub(crate) mod testing;

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};

use crate::{
    api::{RouteSession, API},
    config::Config,
    debounce::Debouncer,
    error::{invalid_config_error, Error},
    external::{
        http_client, osrm::Osrm, per_second_limiter, photon::Photon, tomtom::TomTom,
        GeocodeProvider, RouteProvider, TrafficFlowProvider,
    },
};

#[derive(Clone, Debug)]
pub struct EngineOptions {
    pub sample_stride: usize,
    pub traffic_max_inflight: usize,
    pub suggestion_limit: usize,
    pub suggest_quiet_period: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            sample_stride: 5,
            traffic_max_inflight: 4,
            suggestion_limit: 5,
            suggest_quiet_period: Duration::ZERO,
        }
    }
}

impl From<&Config> for EngineOptions {
    fn from(config: &Config) -> Self {
        Self {
            sample_stride: config.traffic_sample_stride,
            traffic_max_inflight: config.traffic_max_inflight,
            suggestion_limit: config.suggestion_limit,
            suggest_quiet_period: config.suggest_quiet_period,
        }
    }
}

/// The route list for the active source/destination pair.
#[derive(Debug, Default)]
struct Session {
    /// Bumped whenever a load starts. A load whose
    /// generation is no longer current when it finishes is discarded.
    generation: u64,
    current: RouteSession,
}

pub struct Engine {
    geocoder: Arc<dyn GeocodeProvider>,
    router: Arc<dyn RouteProvider>,
    traffic: Option<Arc<dyn TrafficFlowProvider>>,
    /// Shared by every annotation, so concurrent loads stay under one cap.
    traffic_permits: Semaphore,
    options: EngineOptions,
    debouncer: Debouncer,
    session: Mutex<Session>,
}

impl Engine {
    pub fn new(
        geocoder: Arc<dyn GeocodeProvider>,
        router: Arc<dyn RouteProvider>,
        traffic: Option<Arc<dyn TrafficFlowProvider>>,
        options: EngineOptions,
    ) -> Self {
        Self {
            geocoder,
            router,
            traffic,
            traffic_permits: Semaphore::new(options.traffic_max_inflight.max(1)),
            debouncer: Debouncer::new(options.suggest_quiet_period),
            options,
            session: Mutex::new(Session::default()),
        }
    }

    #[tracing::instrument(name = "Engine::from_config", skip_all)]
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let client = http_client(config.http_timeout)?;

        let geocoder = Arc::new(Photon::new(client.clone(), &config.geocoding_api_base));
        let router = Arc::new(Osrm::new(client.clone(), &config.routing_api_base));

        let traffic: Option<Arc<dyn TrafficFlowProvider>> = match &config.traffic_api_key {
            Some(key) => {
                let per_second = NonZeroU32::new(config.traffic_requests_per_second)
                    .ok_or_else(|| {
                        invalid_config_error("TRAFFIC_REQUESTS_PER_SECOND must be at least 1".into())
                    })?;

                Some(Arc::new(TomTom::new(
                    client,
                    &config.traffic_api_base,
                    key.clone(),
                    per_second_limiter(per_second),
                )))
            }
            None => {
                tracing::warn!("TRAFFIC_API_KEY not set, traffic annotation disabled");
                None
            }
        };

        Ok(Self::new(geocoder, router, traffic, config.into()))
    }
}

impl API for Engine {}

#[test]
fn from_config_without_traffic_key() {
    let engine = Engine::from_config(&Config::default()).unwrap();
    assert!(engine.traffic.is_none());
    assert_eq!(engine.options.sample_stride, 5);
}

#[test]
fn from_config_with_traffic_key() {
    let config = Config {
        traffic_api_key: Some("key".into()),
        traffic_sample_stride: 3,
        ..Config::default()
    };
    let engine = Engine::from_config(&config).unwrap();

    assert!(engine.traffic.is_some());
    assert_eq!(engine.options.sample_stride, 3);
    assert_eq!(engine.traffic_permits.available_permits(), 4);
}
