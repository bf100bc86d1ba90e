use super::Engine;

use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;

use crate::{
    api::{RouteAPI, RouteSession, TrafficAPI},
    entities::{Coordinate, RouteCandidate},
    error::{selection_out_of_range_error, superseded_error, Error},
};

#[async_trait]
impl RouteAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn load_routes(
        &self,
        source: Coordinate,
        destination: Coordinate,
    ) -> Result<RouteSession, Error> {
        let generation = {
            let mut session = self.session.lock().await;
            session.generation += 1;
            session.generation
        };

        // one attempt; a failure leaves the current list in place
        let fetched = self.router.fetch_routes(source, destination).await?;

        let summaries = join_all(fetched.iter().map(|route| self.annotate(&route.polyline))).await;

        let mut routes: Vec<RouteCandidate> = fetched
            .into_iter()
            .zip(summaries)
            .map(|(route, traffic)| RouteCandidate::new(route, traffic))
            .collect();
        if let Some(first) = routes.first_mut() {
            first.is_selected = true;
        }

        let mut session = self.session.lock().await;

        if session.generation != generation {
            tracing::info!(
                "discarding routes for generation {}, current is {}",
                generation,
                session.generation
            );
            return Err(superseded_error());
        }

        session.current = RouteSession {
            source: Some(source),
            destination: Some(destination),
            routes,
            loaded_at: Some(Utc::now()),
        };

        tracing::info!("loaded {} routes", session.current.routes.len());

        Ok(session.current.clone())
    }

    #[tracing::instrument(skip(self))]
    async fn select_route(&self, index: usize) -> Result<RouteSession, Error> {
        let mut session = self.session.lock().await;
        let len = session.current.routes.len();

        if index >= len {
            return Err(selection_out_of_range_error(index, len));
        }

        for (i, route) in session.current.routes.iter_mut().enumerate() {
            route.is_selected = i == index;
        }

        Ok(session.current.clone())
    }

    async fn current_routes(&self) -> RouteSession {
        self.session.lock().await.current.clone()
    }
}

#[cfg(test)]
fn guntur() -> Coordinate {
    super::testing::coord(16.3142, 80.4350)
}

#[cfg(test)]
fn nambur() -> Coordinate {
    super::testing::coord(16.3626, 80.5017)
}

#[cfg(test)]
fn selected_flags(session: &RouteSession) -> Vec<bool> {
    session.routes.iter().map(|r| r.is_selected).collect()
}

#[test]
fn load_selects_first_route_and_preserves_order() {
    use super::testing::*;
    use std::sync::Arc;

    let router = Arc::new(FakeRouter::with(vec![Ok(vec![
        route(guntur(), 6, 8000.0, 1200.0),
        route(guntur(), 9, 9500.0, 1500.0),
    ])]));
    let engine = engine(Arc::new(FakeGeocoder::default()), router, None);

    let session = tokio_test::block_on(engine.load_routes(guntur(), nambur())).unwrap();

    assert_eq!(session.routes.len(), 2);
    assert_eq!(selected_flags(&session), vec![true, false]);
    assert_eq!(session.routes[0].metrics.duration_seconds, 1200.0);
    assert_eq!(session.routes[0].metrics.distance_meters, 8000.0);
    assert_eq!(session.routes[1].metrics.duration_seconds, 1500.0);
    assert_eq!(session.routes[1].metrics.distance_meters, 9500.0);
    assert_eq!(session.routes[1].polyline.len(), 9);
    assert_eq!(session.source, Some(guntur()));
    assert_eq!(session.destination, Some(nambur()));
    assert!(session.loaded_at.is_some());

    assert_eq!(tokio_test::block_on(engine.current_routes()), session);
}

#[test]
fn load_annotates_each_route() {
    use super::testing::*;
    use crate::entities::Severity;
    use crate::external::TrafficFlowProvider;
    use std::sync::Arc;

    let router = Arc::new(FakeRouter::with(vec![Ok(vec![
        route(guntur(), 6, 8000.0, 1200.0),
        route(nambur(), 6, 9500.0, 1500.0),
    ])]));
    // congestion only near the destination
    let traffic = Arc::new(FakeTraffic::new(|point: Coordinate| {
        let mut sample = free_flow();
        if point.lat > 16.35 {
            sample.current_speed = 15.0;
            sample.current_travel_time = 200.0;
        }
        Some(sample)
    }));
    let engine = engine(
        Arc::new(FakeGeocoder::default()),
        router,
        Some(traffic as Arc<dyn TrafficFlowProvider>),
    );

    let session = tokio_test::block_on(engine.load_routes(guntur(), nambur())).unwrap();

    assert!(!session.routes[0].traffic.has_traffic);
    assert_eq!(session.routes[0].traffic.severity, Severity::Low);
    assert!(session.routes[1].traffic.has_traffic);
    assert_eq!(session.routes[1].traffic.severity, Severity::High);
    assert_eq!(session.routes[1].traffic.flagged_segments.len(), 2);
    assert_eq!(session.routes[1].traffic.aggregate_delay_seconds, 280.0);
}

#[test]
fn select_moves_the_single_selection() {
    use super::testing::*;
    use std::sync::Arc;

    let router = Arc::new(FakeRouter::with(vec![Ok(vec![
        route(guntur(), 3, 8000.0, 1200.0),
        route(guntur(), 3, 9000.0, 1300.0),
        route(guntur(), 3, 9500.0, 1500.0),
    ])]));
    let engine = engine(Arc::new(FakeGeocoder::default()), router, None);

    tokio_test::block_on(async {
        engine.load_routes(guntur(), nambur()).await.unwrap();

        let session = engine.select_route(2).await.unwrap();
        assert_eq!(selected_flags(&session), vec![false, false, true]);
        assert_eq!(session.selected_index(), Some(2));

        let session = engine.select_route(1).await.unwrap();
        assert_eq!(selected_flags(&session), vec![false, true, false]);
        assert_eq!(session.selected().unwrap().metrics.distance_meters, 9000.0);
    });
}

#[test]
fn select_out_of_range_leaves_list_unchanged() {
    use super::testing::*;
    use crate::error::SELECTION_OUT_OF_RANGE;
    use std::sync::Arc;

    let router = Arc::new(FakeRouter::with(vec![Ok(vec![
        route(guntur(), 3, 8000.0, 1200.0),
        route(guntur(), 3, 9500.0, 1500.0),
    ])]));
    let engine = engine(Arc::new(FakeGeocoder::default()), router.clone(), None);

    tokio_test::block_on(async {
        let before = engine.load_routes(guntur(), nambur()).await.unwrap();

        let err = engine.select_route(2).await.unwrap_err();
        assert_eq!(err.code, SELECTION_OUT_OF_RANGE);
        assert_eq!(engine.current_routes().await, before);
    });

    // selection never goes back to the router
    assert_eq!(router.calls.load(std::sync::atomic::Ordering::SeqCst), 1);
}

#[test]
fn select_on_empty_session_fails() {
    use super::testing::*;
    use std::sync::Arc;

    let engine = engine(
        Arc::new(FakeGeocoder::default()),
        Arc::new(FakeRouter::default()),
        None,
    );

    assert!(tokio_test::block_on(engine.select_route(0)).is_err());
}

#[test]
fn fetch_failure_keeps_previous_routes() {
    use super::testing::*;
    use crate::error::{route_fetch_failed_error, route_not_found_error, ROUTE_FETCH_FAILED, ROUTE_NOT_FOUND};
    use std::sync::Arc;

    let router = Arc::new(FakeRouter::with(vec![
        Ok(vec![route(guntur(), 3, 8000.0, 1200.0)]),
        Err(route_fetch_failed_error()),
        Err(route_not_found_error()),
    ]));
    let engine = engine(Arc::new(FakeGeocoder::default()), router, None);

    tokio_test::block_on(async {
        let before = engine.load_routes(guntur(), nambur()).await.unwrap();

        let err = engine.load_routes(nambur(), guntur()).await.unwrap_err();
        assert_eq!(err.code, ROUTE_FETCH_FAILED);
        assert!(err.is_retryable());
        assert_eq!(engine.current_routes().await, before);

        let err = engine.load_routes(nambur(), guntur()).await.unwrap_err();
        assert_eq!(err.code, ROUTE_NOT_FOUND);
        assert_eq!(engine.current_routes().await, before);
    });
}

#[test]
fn stale_load_is_discarded() {
    use super::testing::*;
    use crate::error::SUPERSEDED;
    use std::sync::Arc;

    let slow_source = guntur();
    let fast_source = coord(16.3067, 80.4365);

    // responses are handed out in completion order
    let router = Arc::new(FakeRouter::with(vec![
        Ok(vec![route(fast_source, 4, 2000.0, 200.0)]),
        Ok(vec![route(slow_source, 4, 1000.0, 100.0)]),
    ]));
    let gate = router.gate(slow_source);
    let engine = engine(Arc::new(FakeGeocoder::default()), router, None);

    let (slow, fast) = tokio_test::block_on(async {
        futures::join!(engine.load_routes(slow_source, nambur()), async {
            let fast = engine.load_routes(fast_source, nambur()).await;
            let _ = gate.send(());
            fast
        })
    });

    assert_eq!(slow.unwrap_err().code, SUPERSEDED);

    let fast = fast.unwrap();
    let current = tokio_test::block_on(engine.current_routes());
    assert_eq!(current, fast);
    assert_eq!(current.source, Some(fast_source));
    assert_eq!(current.routes[0].metrics.distance_meters, 2000.0);
}
