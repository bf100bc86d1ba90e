use async_trait::async_trait;
use serde::Deserialize;

use super::RouteProvider;
use crate::{
    entities::{Coordinate, FetchedRoute, RouteMetrics, RoutePolyline},
    error::{route_fetch_failed_error, route_not_found_error, Error},
};

#[derive(Debug, Deserialize)]
struct RouteResponse {
    code: String,
    #[serde(default)]
    routes: Vec<Route>,
}

#[derive(Debug, Deserialize)]
struct Route {
    geometry: Geometry,
    distance: f64,
    duration: f64,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    coordinates: Vec<[f64; 2]>,
}

/// Client for an OSRM driving-route service.
#[derive(Clone, Debug)]
pub struct Osrm {
    client: reqwest::Client,
    api_base: String,
}

impl Osrm {
    pub fn new(client: reqwest::Client, api_base: impl Into<String>) -> Self {
        Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    fn route_url(&self, source: Coordinate, destination: Coordinate) -> String {
        format!(
            "{}/route/v1/driving/{};{}",
            self.api_base,
            source.lng_lat_param(),
            destination.lng_lat_param()
        )
    }
}

#[async_trait]
impl RouteProvider for Osrm {
    #[tracing::instrument(skip(self))]
    async fn fetch_routes(
        &self,
        source: Coordinate,
        destination: Coordinate,
    ) -> Result<Vec<FetchedRoute>, Error> {
        let url = self.route_url(source, destination);

        let res = self
            .client
            .get(&url)
            .query(&[
                ("alternatives", "true"),
                ("overview", "full"),
                ("geometries", "geojson"),
                ("steps", "true"),
            ])
            .send()
            .await
            .map_err(|err| {
                tracing::error!("route request to {} failed: {}", url, err);
                route_fetch_failed_error()
            })?;

        let status = res.status();
        let text = res.text().await.map_err(|_| route_fetch_failed_error())?;

        // OSRM reports unroutable pairs with a 400 and a JSON body
        let data: RouteResponse = match serde_json::from_str(&text) {
            Ok(data) => data,
            Err(err) => {
                tracing::error!("unparseable route response ({}): {}", status, err);
                return Err(route_fetch_failed_error());
            }
        };

        routes_from_response(data)
    }
}

fn routes_from_response(data: RouteResponse) -> Result<Vec<FetchedRoute>, Error> {
    match data.code.as_str() {
        "Ok" => {}
        "NoRoute" | "NoSegment" => return Err(route_not_found_error()),
        other => {
            tracing::error!("routing service returned code {}", other);
            return Err(route_fetch_failed_error());
        }
    }

    let routes: Vec<FetchedRoute> = data
        .routes
        .into_iter()
        .filter_map(|route| match fetched_route(route) {
            Ok(route) => Some(route),
            Err(_) => {
                tracing::warn!("skipping route with unusable geometry");
                None
            }
        })
        .collect();

    if routes.is_empty() {
        return Err(route_not_found_error());
    }

    Ok(routes)
}

fn fetched_route(route: Route) -> Result<FetchedRoute, Error> {
    let points = route
        .geometry
        .coordinates
        .into_iter()
        .map(Coordinate::from_lng_lat)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(FetchedRoute {
        polyline: RoutePolyline::new(points)?,
        metrics: RouteMetrics {
            distance_meters: route.distance.max(0.0),
            duration_seconds: route.duration.max(0.0),
        },
    })
}

#[cfg(test)]
fn parse(body: &str) -> Result<Vec<FetchedRoute>, Error> {
    routes_from_response(serde_json::from_str(body).unwrap())
}

#[test]
fn route_url_puts_longitude_first() {
    let osrm = Osrm::new(reqwest::Client::new(), "https://router.example/");
    let source = Coordinate::new(16.3142, 80.4350).unwrap();
    let destination = Coordinate::new(16.3626, 80.5017).unwrap();

    assert_eq!(
        osrm.route_url(source, destination),
        "https://router.example/route/v1/driving/80.435,16.3142;80.5017,16.3626"
    );
}

#[test]
fn parses_alternatives_latitude_first() {
    let routes = parse(
        r#"{
            "code": "Ok",
            "routes": [
                {"geometry": {"coordinates": [[80.4350, 16.3142], [80.4700, 16.3400], [80.5017, 16.3626]]}, "distance": 8000, "duration": 1200, "weight": 1200},
                {"geometry": {"coordinates": [[80.4350, 16.3142], [80.5017, 16.3626]]}, "distance": 9500, "duration": 1500}
            ],
            "waypoints": []
        }"#,
    )
    .unwrap();

    assert_eq!(routes.len(), 2);
    assert_eq!(routes[0].metrics.distance_meters, 8000.0);
    assert_eq!(routes[0].metrics.duration_seconds, 1200.0);
    assert_eq!(routes[1].metrics.duration_seconds, 1500.0);

    let first = routes[0].polyline.points()[0];
    assert_eq!(first.lat, 16.3142);
    assert_eq!(first.lng, 80.4350);
}

#[test]
fn no_route_is_route_not_found() {
    use crate::error::ROUTE_NOT_FOUND;

    let err = parse(r#"{"code": "NoRoute", "message": "Impossible route"}"#).unwrap_err();
    assert_eq!(err.code, ROUTE_NOT_FOUND);

    let err = parse(r#"{"code": "Ok", "routes": []}"#).unwrap_err();
    assert_eq!(err.code, ROUTE_NOT_FOUND);
}

#[test]
fn degenerate_geometry_is_skipped() {
    let routes = parse(
        r#"{
            "code": "Ok",
            "routes": [
                {"geometry": {"coordinates": [[80.4350, 16.3142]]}, "distance": 0, "duration": 0},
                {"geometry": {"coordinates": [[80.4350, 16.3142], [80.5017, 16.3626]]}, "distance": 9500, "duration": 1500}
            ]
        }"#,
    )
    .unwrap();

    assert_eq!(routes.len(), 1);
    assert_eq!(routes[0].metrics.distance_meters, 9500.0);
}

#[test]
fn upstream_error_code_is_fetch_failure() {
    use crate::error::ROUTE_FETCH_FAILED;

    let err = parse(r#"{"code": "TooBig"}"#).unwrap_err();
    assert_eq!(err.code, ROUTE_FETCH_FAILED);
}

#[test]
fn unreachable_router_fails_as_fetch_failure() {
    use crate::error::ROUTE_FETCH_FAILED;
    use std::time::Duration;

    let client = super::http_client(Duration::from_millis(500)).unwrap();
    let osrm = Osrm::new(client, "http://127.0.0.1:9");
    let a = Coordinate::new(16.3142, 80.4350).unwrap();
    let b = Coordinate::new(16.3626, 80.5017).unwrap();

    let err = tokio_test::block_on(osrm.fetch_routes(a, b)).unwrap_err();
    assert_eq!(err.code, ROUTE_FETCH_FAILED);
}
