pub mod osrm;
pub mod photon;
pub mod tomtom;

use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use crate::{
    entities::{Coordinate, FetchedRoute, FlowSample, PlaceCandidate},
    error::Error,
};

#[async_trait]
pub trait GeocodeProvider: Send + Sync {
    /// Candidates in the upstream's relevance order.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<PlaceCandidate>, Error>;
    async fn reverse(&self, coordinate: Coordinate) -> Result<String, Error>;
}

#[async_trait]
pub trait RouteProvider: Send + Sync {
    /// Routes in the upstream's ranking, alternatives included.
    async fn fetch_routes(
        &self,
        source: Coordinate,
        destination: Coordinate,
    ) -> Result<Vec<FetchedRoute>, Error>;
}

#[async_trait]
pub trait TrafficFlowProvider: Send + Sync {
    async fn flow_at(&self, point: Coordinate) -> Result<FlowSample, Error>;
}

pub fn http_client(timeout: Duration) -> Result<reqwest::Client, Error> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("waypoint/", env!("CARGO_PKG_VERSION")))
        .build()?;

    Ok(client)
}

pub type Limiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

pub fn per_second_limiter(requests: NonZeroU32) -> Limiter {
    Arc::new(RateLimiter::direct(Quota::per_second(requests)))
}
