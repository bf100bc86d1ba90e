use async_trait::async_trait;
use serde::Deserialize;

use super::GeocodeProvider;
use crate::{
    entities::{AddressProperties, Coordinate, PlaceCandidate, UNKNOWN_LOCATION},
    error::{geocode_failed_error, Error},
};

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(default)]
    properties: AddressProperties,
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    coordinates: [f64; 2],
}

/// Client for a Photon geocoder.
#[derive(Clone, Debug)]
pub struct Photon {
    client: reqwest::Client,
    api_base: String,
}

impl Photon {
    pub fn new(client: reqwest::Client, api_base: impl Into<String>) -> Self {
        Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<FeatureCollection, Error> {
        let url = format!("{}{}", self.api_base, path);

        let res = self
            .client
            .get(url)
            .header("Accept-Language", "en")
            .query(query)
            .send()
            .await
            .map_err(|err| {
                tracing::warn!("geocoder request failed: {}", err);
                geocode_failed_error()
            })?;

        if !res.status().is_success() {
            tracing::warn!("geocoder responded with {}", res.status());
            return Err(geocode_failed_error());
        }

        let text = res.text().await.map_err(|_| geocode_failed_error())?;

        serde_json::from_str(&text).map_err(|err| {
            tracing::warn!("unparseable geocoder response: {}", err);
            geocode_failed_error()
        })
    }
}

#[async_trait]
impl GeocodeProvider for Photon {
    #[tracing::instrument(skip(self))]
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<PlaceCandidate>, Error> {
        let collection = self
            .get(
                "/api/",
                &[("q", query.to_string()), ("limit", limit.to_string())],
            )
            .await?;

        Ok(candidates(collection))
    }

    #[tracing::instrument(skip(self))]
    async fn reverse(&self, coordinate: Coordinate) -> Result<String, Error> {
        let collection = self
            .get(
                "/reverse",
                &[
                    ("lon", coordinate.lng.to_string()),
                    ("lat", coordinate.lat.to_string()),
                ],
            )
            .await?;

        Ok(first_display_name(collection))
    }
}

fn candidates(collection: FeatureCollection) -> Vec<PlaceCandidate> {
    collection
        .features
        .into_iter()
        .filter_map(|feature| {
            let coordinate = Coordinate::from_lng_lat(feature.geometry.coordinates).ok()?;

            Some(PlaceCandidate {
                display_name: feature.properties.display_name(),
                coordinate,
            })
        })
        .collect()
}

fn first_display_name(collection: FeatureCollection) -> String {
    collection
        .features
        .first()
        .map(|f| f.properties.display_name())
        .unwrap_or_else(|| UNKNOWN_LOCATION.into())
}

#[cfg(test)]
const SEARCH_FIXTURE: &str = r#"{
    "type": "FeatureCollection",
    "features": [
        {
            "type": "Feature",
            "geometry": {"type": "Point", "coordinates": [80.4365, 16.3067]},
            "properties": {"name": "Guntur", "state": "Andhra Pradesh", "country": "India", "osm_id": 1}
        },
        {
            "type": "Feature",
            "geometry": {"type": "Point", "coordinates": [80.5017, 16.3626]},
            "properties": {"street": "Temple Road", "housenumber": "7", "village": "Nambur", "country": "India"}
        },
        {
            "type": "Feature",
            "geometry": {"type": "Point", "coordinates": [80.0, 95.0]},
            "properties": {"name": "Broken"}
        }
    ]
}"#;

#[test]
fn parses_candidates_in_upstream_order() {
    let collection: FeatureCollection = serde_json::from_str(SEARCH_FIXTURE).unwrap();
    let places = candidates(collection);

    assert_eq!(places.len(), 2);
    assert_eq!(places[0].display_name, "Guntur, Andhra Pradesh, India");
    assert_eq!(places[0].coordinate.lat, 16.3067);
    assert_eq!(places[0].coordinate.lng, 80.4365);
    assert_eq!(places[1].display_name, "Temple Road 7, Nambur, India");
}

#[test]
fn reverse_takes_first_feature() {
    let collection: FeatureCollection = serde_json::from_str(SEARCH_FIXTURE).unwrap();
    assert_eq!(first_display_name(collection), "Guntur, Andhra Pradesh, India");

    let empty: FeatureCollection = serde_json::from_str(r#"{"features": []}"#).unwrap();
    assert_eq!(first_display_name(empty), UNKNOWN_LOCATION);
}

#[test]
fn unreachable_geocoder_fails_as_geocode_failed() {
    use crate::error::GEOCODE_FAILED;
    use std::time::Duration;

    let client = super::http_client(Duration::from_millis(500)).unwrap();
    let photon = Photon::new(client, "http://127.0.0.1:9");

    let err = tokio_test::block_on(photon.search("Guntur", 5)).unwrap_err();
    assert_eq!(err.code, GEOCODE_FAILED);
}
