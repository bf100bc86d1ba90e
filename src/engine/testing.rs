use async_trait::async_trait;
use futures::channel::oneshot;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::{Engine, EngineOptions};
use crate::{
    entities::{Coordinate, FetchedRoute, FlowSample, PlaceCandidate, RouteMetrics, RoutePolyline},
    error::{geocode_failed_error, traffic_sample_failed_error, Error},
    external::{GeocodeProvider, RouteProvider, TrafficFlowProvider},
};

pub fn coord(lat: f64, lng: f64) -> Coordinate {
    Coordinate::new(lat, lng).unwrap()
}

/// Straight line of `n` points from `from` towards the north-east.
pub fn route(from: Coordinate, n: usize, distance: f64, duration: f64) -> FetchedRoute {
    let points = (0..n)
        .map(|i| coord(from.lat + i as f64 * 0.001, from.lng + i as f64 * 0.001))
        .collect();

    FetchedRoute {
        polyline: RoutePolyline::new(points).unwrap(),
        metrics: RouteMetrics {
            distance_meters: distance,
            duration_seconds: duration,
        },
    }
}

pub fn free_flow() -> FlowSample {
    FlowSample {
        current_speed: 50.0,
        free_flow_speed: 50.0,
        current_travel_time: 60.0,
        free_flow_travel_time: 60.0,
        road_closure: false,
    }
}

#[derive(Default)]
pub struct FakeGeocoder {
    pub calls: AtomicUsize,
    pub fail: bool,
}

#[async_trait]
impl GeocodeProvider for FakeGeocoder {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<PlaceCandidate>, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.fail {
            return Err(geocode_failed_error());
        }

        Ok((0..limit.min(2))
            .map(|i| PlaceCandidate {
                display_name: format!("{} {}", query, i),
                coordinate: coord(16.3 + i as f64, 80.4),
            })
            .collect())
    }

    async fn reverse(&self, _coordinate: Coordinate) -> Result<String, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.fail {
            return Err(geocode_failed_error());
        }

        Ok("Guntur, Andhra Pradesh, India".into())
    }
}

/// Answers each call with the next queued response. A call may first
/// wait on a gate keyed by its source coordinate.
#[derive(Default)]
pub struct FakeRouter {
    pub responses: Mutex<VecDeque<Result<Vec<FetchedRoute>, Error>>>,
    pub gates: Mutex<Vec<(Coordinate, oneshot::Receiver<()>)>>,
    pub calls: AtomicUsize,
}

impl FakeRouter {
    pub fn with(responses: Vec<Result<Vec<FetchedRoute>, Error>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            ..Self::default()
        }
    }

    pub fn gate(&self, source: Coordinate) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().push((source, rx));
        tx
    }
}

#[async_trait]
impl RouteProvider for FakeRouter {
    async fn fetch_routes(
        &self,
        source: Coordinate,
        _destination: Coordinate,
    ) -> Result<Vec<FetchedRoute>, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let gate = {
            let mut gates = self.gates.lock().unwrap();
            gates
                .iter()
                .position(|(c, _)| *c == source)
                .map(|i| gates.remove(i).1)
        };
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(vec![]))
    }
}

/// Responds per point through `f`; `None` is a failed sample. Records the
/// most requests it ever saw in flight at once.
pub struct FakeTraffic<F> {
    pub f: F,
    pub calls: AtomicUsize,
    pub inflight: AtomicUsize,
    pub peak: AtomicUsize,
}

impl<F> FakeTraffic<F>
where
    F: Fn(Coordinate) -> Option<FlowSample> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self {
            f,
            calls: AtomicUsize::new(0),
            inflight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl<F> TrafficFlowProvider for FakeTraffic<F>
where
    F: Fn(Coordinate) -> Option<FlowSample> + Send + Sync,
{
    async fn flow_at(&self, point: Coordinate) -> Result<FlowSample, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.inflight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        tokio::task::yield_now().await;

        self.inflight.fetch_sub(1, Ordering::SeqCst);
        (self.f)(point).ok_or_else(traffic_sample_failed_error)
    }
}

pub fn engine(
    geocoder: Arc<FakeGeocoder>,
    router: Arc<FakeRouter>,
    traffic: Option<Arc<dyn TrafficFlowProvider>>,
) -> Engine {
    Engine::new(geocoder, router, traffic, EngineOptions::default())
}
