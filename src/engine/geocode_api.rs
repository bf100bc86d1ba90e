use super::Engine;

use async_trait::async_trait;

use crate::{
    api::GeocodeAPI,
    entities::{Coordinate, PlaceCandidate},
    error::Error,
};

const MIN_QUERY_CHARS: usize = 3;

#[async_trait]
impl GeocodeAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn suggest(&self, input: &str, query: String) -> Result<Vec<PlaceCandidate>, Error> {
        let query = query.trim().to_string();

        if query.chars().count() < MIN_QUERY_CHARS {
            return Ok(vec![]);
        }

        let query = match self.debouncer.settle(input, query).await {
            Some(query) => query,
            None => {
                tracing::debug!("suggestion query on {:?} superseded", input);
                return Ok(vec![]);
            }
        };

        match self
            .geocoder
            .search(&query, self.options.suggestion_limit)
            .await
        {
            Ok(places) => Ok(places),
            Err(err) => {
                tracing::warn!("suggestions for {:?} failed: {}", query, err);
                Ok(vec![])
            }
        }
    }

    #[tracing::instrument(skip(self))]
    async fn reverse_geocode(&self, coordinate: Coordinate) -> String {
        match self.geocoder.reverse(coordinate).await {
            Ok(name) => name,
            Err(err) => {
                tracing::warn!("reverse geocoding failed: {}", err);
                coordinate.fallback_label()
            }
        }
    }
}

#[test]
fn short_queries_skip_the_geocoder() {
    use super::testing::*;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    let geocoder = Arc::new(FakeGeocoder::default());
    let engine = engine(geocoder.clone(), Arc::new(FakeRouter::default()), None);

    tokio_test::block_on(async {
        assert!(engine.suggest("source", "".into()).await.unwrap().is_empty());
        assert!(engine.suggest("source", "gu".into()).await.unwrap().is_empty());
        assert!(engine.suggest("source", "  gu  ".into()).await.unwrap().is_empty());
    });

    assert_eq!(geocoder.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn suggestions_pass_through_in_order() {
    use super::testing::*;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    let geocoder = Arc::new(FakeGeocoder::default());
    let engine = engine(geocoder.clone(), Arc::new(FakeRouter::default()), None);

    let places = tokio_test::block_on(engine.suggest("source", "gun".into())).unwrap();

    assert_eq!(geocoder.calls.load(Ordering::SeqCst), 1);
    assert_eq!(places.len(), 2);
    assert_eq!(places[0].display_name, "gun 0");
    assert_eq!(places[1].display_name, "gun 1");
}

#[test]
fn geocoder_failure_yields_empty_list() {
    use super::testing::*;
    use std::sync::Arc;

    let geocoder = Arc::new(FakeGeocoder {
        fail: true,
        ..FakeGeocoder::default()
    });
    let engine = engine(geocoder, Arc::new(FakeRouter::default()), None);

    let places = tokio_test::block_on(engine.suggest("source", "Guntur".into())).unwrap();
    assert!(places.is_empty());
}

#[test]
fn superseded_suggestion_skips_the_geocoder() {
    use super::testing::*;
    use super::EngineOptions;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use std::time::Duration;

    let geocoder = Arc::new(FakeGeocoder::default());
    let options = EngineOptions {
        suggest_quiet_period: Duration::from_millis(30),
        ..EngineOptions::default()
    };
    let engine = Engine::new(
        geocoder.clone(),
        Arc::new(FakeRouter::default()),
        None,
        options,
    );

    let (first, second) = tokio_test::block_on(async {
        futures::join!(
            engine.suggest("source", "Gunt".into()),
            engine.suggest("source", "Guntur".into())
        )
    });

    assert!(first.unwrap().is_empty());
    assert_eq!(second.unwrap()[0].display_name, "Guntur 0");
    assert_eq!(geocoder.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn reverse_geocode_falls_back_to_coordinates() {
    use super::testing::*;
    use std::sync::Arc;

    let point = coord(16.3142, 80.435);

    let ok = engine(
        Arc::new(FakeGeocoder::default()),
        Arc::new(FakeRouter::default()),
        None,
    );
    assert_eq!(
        tokio_test::block_on(ok.reverse_geocode(point)),
        "Guntur, Andhra Pradesh, India"
    );

    let failing = engine(
        Arc::new(FakeGeocoder {
            fail: true,
            ..FakeGeocoder::default()
        }),
        Arc::new(FakeRouter::default()),
        None,
    );
    assert_eq!(
        tokio_test::block_on(failing.reverse_geocode(point)),
        "16.314200, 80.435000"
    );
}

#[test]
fn separate_inputs_do_not_supersede_each_other() {
    use super::testing::*;
    use super::EngineOptions;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use std::time::Duration;

    let geocoder = Arc::new(FakeGeocoder::default());
    let options = EngineOptions {
        suggest_quiet_period: Duration::from_millis(30),
        ..EngineOptions::default()
    };
    let engine = Engine::new(
        geocoder.clone(),
        Arc::new(FakeRouter::default()),
        None,
        options,
    );

    let (source, destination) = tokio_test::block_on(async {
        futures::join!(engine.suggest("source", "Guntur".into()), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            engine.suggest("destination", "Nambur".into()).await
        })
    });

    assert_eq!(source.unwrap()[0].display_name, "Guntur 0");
    assert_eq!(destination.unwrap()[0].display_name, "Nambur 0");
    assert_eq!(geocoder.calls.load(Ordering::SeqCst), 2);
}
