use super::Engine;

use async_trait::async_trait;
use futures::future::join_all;

use crate::{
    api::TrafficAPI,
    entities::{RoutePolyline, TrafficSummary},
    error::traffic_sample_failed_error,
};

#[async_trait]
impl TrafficAPI for Engine {
    #[tracing::instrument(skip_all, fields(points = polyline.len()))]
    async fn annotate(&self, polyline: &RoutePolyline) -> TrafficSummary {
        let provider = match &self.traffic {
            Some(provider) => provider,
            None => return TrafficSummary::default(),
        };

        let points = polyline.sample(self.options.sample_stride);
        let sampled = points.len();

        // all samples settle before aggregation; order follows the route
        let results = join_all(points.into_iter().map(|point| async move {
            let result = match self.traffic_permits.acquire().await {
                Ok(_permit) => provider.flow_at(point).await,
                Err(_) => Err(traffic_sample_failed_error()),
            };
            if let Err(err) = &result {
                tracing::warn!("traffic sample at {} failed: {}", point.lat_lng_param(), err);
            }
            (point, result)
        }))
        .await;

        let failed = results.iter().filter(|(_, r)| r.is_err()).count();
        if failed == sampled {
            tracing::info!("no traffic data for any of {} samples", sampled);
        }

        TrafficSummary::from_samples(results)
    }
}

#[cfg(test)]
fn annotate_with<F>(stride: usize, n: usize, f: F) -> (TrafficSummary, usize, RoutePolyline)
where
    F: Fn(crate::entities::Coordinate) -> Option<crate::entities::FlowSample> + Send + Sync + 'static,
{
    use super::testing::*;
    use super::EngineOptions;
    use crate::external::TrafficFlowProvider;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    let traffic = Arc::new(FakeTraffic::new(f));
    let engine = Engine::new(
        Arc::new(FakeGeocoder::default()),
        Arc::new(FakeRouter::default()),
        Some(traffic.clone() as Arc<dyn TrafficFlowProvider>),
        EngineOptions {
            sample_stride: stride,
            ..EngineOptions::default()
        },
    );
    let polyline = route(coord(16.3142, 80.435), n, 8000.0, 1200.0).polyline;

    let summary = tokio_test::block_on(engine.annotate(&polyline));
    (summary, traffic.calls.load(Ordering::SeqCst), polyline)
}

#[test]
fn samples_every_nth_point() {
    use super::testing::free_flow;

    let (summary, calls, _) = annotate_with(5, 23, |_| Some(free_flow()));

    assert_eq!(calls, 5);
    assert_eq!(summary, TrafficSummary::default());
}

#[test]
fn flags_congested_samples_in_route_order() {
    use crate::entities::{FlowSample, Severity};

    let origin_lat = 16.3142;
    let (summary, calls, polyline) = annotate_with(2, 6, move |point| {
        // points 2 and 4 are slow
        let index = ((point.lat - origin_lat) / 0.001).round() as usize;
        let slow = index == 2 || index == 4;

        Some(FlowSample {
            current_speed: if slow { 25.0 } else { 50.0 },
            free_flow_speed: 50.0,
            current_travel_time: if slow { 100.0 } else { 60.0 },
            free_flow_travel_time: 60.0,
            road_closure: false,
        })
    });

    assert_eq!(calls, 3);
    assert!(summary.has_traffic);
    assert_eq!(
        summary.flagged_segments,
        vec![polyline.points()[2], polyline.points()[4]]
    );
    assert_eq!(summary.aggregate_delay_seconds, 80.0);
    assert_eq!(summary.severity, Severity::Medium);
}

#[test]
fn closure_forces_high_severity() {
    use super::testing::free_flow;
    use crate::entities::{Severity, CLOSURE_PENALTY_SECONDS};

    let (summary, _, polyline) = annotate_with(1, 3, {
        let closed_lat = 16.3142 + 0.001;
        move |point| {
            let mut sample = free_flow();
            sample.road_closure = (point.lat - closed_lat).abs() < 1e-9;
            Some(sample)
        }
    });

    assert!(summary.has_traffic);
    assert_eq!(summary.severity, Severity::High);
    assert_eq!(summary.flagged_segments, vec![polyline.points()[1]]);
    assert_eq!(summary.aggregate_delay_seconds, CLOSURE_PENALTY_SECONDS);
}

#[test]
fn failed_samples_do_not_abort() {
    use crate::entities::FlowSample;

    let (summary, calls, polyline) = annotate_with(1, 4, |point| {
        if point.lat > 16.3142 + 0.0025 {
            Some(FlowSample {
                current_speed: 10.0,
                free_flow_speed: 50.0,
                current_travel_time: 300.0,
                free_flow_travel_time: 60.0,
                road_closure: false,
            })
        } else {
            None
        }
    });

    assert_eq!(calls, 4);
    assert!(summary.has_traffic);
    assert_eq!(summary.flagged_segments, vec![polyline.points()[3]]);
    assert_eq!(summary.aggregate_delay_seconds, 240.0);
}

#[test]
fn all_samples_failing_is_no_traffic() {
    let (summary, calls, _) = annotate_with(5, 11, |_| None);

    assert_eq!(calls, 3);
    assert_eq!(summary, TrafficSummary::default());
}

#[test]
fn in_flight_samples_are_capped() {
    use super::testing::*;
    use super::EngineOptions;
    use crate::external::TrafficFlowProvider;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    let traffic = Arc::new(FakeTraffic::new(|_| Some(free_flow())));
    let engine = Engine::new(
        Arc::new(FakeGeocoder::default()),
        Arc::new(FakeRouter::default()),
        Some(traffic.clone() as Arc<dyn TrafficFlowProvider>),
        EngineOptions {
            sample_stride: 5,
            traffic_max_inflight: 3,
            ..EngineOptions::default()
        },
    );
    let long = route(coord(10.0, 70.0), 5000, 80000.0, 7200.0).polyline;
    let short = route(coord(16.3142, 80.435), 50, 8000.0, 1200.0).polyline;

    let (long_summary, short_summary) = tokio_test::block_on(async {
        futures::join!(engine.annotate(&long), engine.annotate(&short))
    });

    assert_eq!(traffic.calls.load(Ordering::SeqCst), 1000 + 10);
    assert!(traffic.peak.load(Ordering::SeqCst) <= 3);
    assert_eq!(long_summary, TrafficSummary::default());
    assert_eq!(short_summary, TrafficSummary::default());
}

#[test]
fn missing_traffic_provider_is_no_traffic() {
    use super::testing::*;
    use std::sync::Arc;

    let engine = engine(
        Arc::new(FakeGeocoder::default()),
        Arc::new(FakeRouter::default()),
        None,
    );
    let polyline = route(coord(16.3142, 80.435), 10, 8000.0, 1200.0).polyline;

    assert_eq!(
        tokio_test::block_on(engine.annotate(&polyline)),
        TrafficSummary::default()
    );
}
