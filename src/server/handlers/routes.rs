use axum::extract::{Extension, Json, Path};
use chrono::{DateTime, Utc};
use geo::{BoundingRect, LineString, MultiPoint, Point};
use serde::{Deserialize, Serialize};

use crate::{
    api::{DynAPI, RouteSession},
    entities::{Coordinate, RouteCandidate},
    error::Error,
    format::{format_distance, format_duration, route_label},
};

#[derive(Serialize, Deserialize)]
pub struct LoadParams {
    source: Coordinate,
    destination: Coordinate,
}

#[derive(Debug, Serialize)]
pub struct RouteView {
    #[serde(flatten)]
    route: RouteCandidate,
    label: String,
    distance_text: String,
    duration_text: String,
    delay_text: Option<String>,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct Bounds {
    south: f64,
    west: f64,
    north: f64,
    east: f64,
}

#[derive(Debug, Serialize)]
pub struct RouteListView {
    source: Option<Coordinate>,
    destination: Option<Coordinate>,
    selected_index: Option<usize>,
    /// The selected route is congested and another candidate is delayed less.
    suggest_alternative: bool,
    bounds: Option<Bounds>,
    loaded_at: Option<DateTime<Utc>>,
    routes: Vec<RouteView>,
}

impl From<RouteSession> for RouteListView {
    fn from(session: RouteSession) -> Self {
        let bounds = viewport(&session);
        let selected_index = session.selected_index();
        let suggest_alternative = less_delayed_alternative(&session);

        let routes = session
            .routes
            .into_iter()
            .enumerate()
            .map(|(i, route)| RouteView {
                label: route_label(i),
                distance_text: format_distance(route.metrics.distance_meters),
                duration_text: format_duration(route.metrics.duration_seconds),
                delay_text: route
                    .traffic
                    .has_traffic
                    .then(|| format_duration(route.traffic.aggregate_delay_seconds)),
                route,
            })
            .collect();

        Self {
            source: session.source,
            destination: session.destination,
            selected_index,
            suggest_alternative,
            bounds,
            loaded_at: session.loaded_at,
            routes,
        }
    }
}

/// Covers source, destination and the selected route.
fn viewport(session: &RouteSession) -> Option<Bounds> {
    let mut points: Vec<Point<f64>> = session
        .source
        .into_iter()
        .chain(session.destination)
        .map(Point::from)
        .collect();

    if let Some(selected) = session.selected() {
        points.extend(LineString::from(&selected.polyline).points());
    }

    MultiPoint::new(points).bounding_rect().map(|rect| Bounds {
        south: rect.min().y,
        west: rect.min().x,
        north: rect.max().y,
        east: rect.max().x,
    })
}

fn less_delayed_alternative(session: &RouteSession) -> bool {
    match session.selected() {
        Some(selected) if selected.traffic.has_traffic => session.routes.iter().any(|route| {
            !route.is_selected
                && route.traffic.aggregate_delay_seconds < selected.traffic.aggregate_delay_seconds
        }),
        _ => false,
    }
}

#[axum_macros::debug_handler]
pub async fn load(
    Extension(api): Extension<DynAPI>,
    Json(params): Json<LoadParams>,
) -> Result<Json<RouteListView>, Error> {
    let session = api.load_routes(params.source, params.destination).await?;

    Ok(Json(session.into()))
}

pub async fn current(Extension(api): Extension<DynAPI>) -> Json<RouteListView> {
    Json(api.current_routes().await.into())
}

#[axum_macros::debug_handler]
pub async fn select(
    Extension(api): Extension<DynAPI>,
    Path(index): Path<usize>,
) -> Result<Json<RouteListView>, Error> {
    let session = api.select_route(index).await?;

    Ok(Json(session.into()))
}

#[cfg(test)]
fn session_with_two_routes() -> RouteSession {
    use crate::entities::{FetchedRoute, RouteMetrics, RoutePolyline, TrafficSummary};

    let c = |lat, lng| Coordinate::new(lat, lng).unwrap();
    let fetched = |points: Vec<Coordinate>, distance, duration| FetchedRoute {
        polyline: RoutePolyline::new(points).unwrap(),
        metrics: RouteMetrics {
            distance_meters: distance,
            duration_seconds: duration,
        },
    };

    let mut first = RouteCandidate::new(
        fetched(vec![c(16.3142, 80.4350), c(16.3626, 80.5017)], 8000.0, 1200.0),
        TrafficSummary::default(),
    );
    first.is_selected = true;

    let second = RouteCandidate::new(
        fetched(
            vec![c(16.3142, 80.4350), c(16.2500, 80.5200), c(16.3626, 80.5017)],
            9500.0,
            1500.0,
        ),
        TrafficSummary {
            has_traffic: true,
            flagged_segments: vec![c(16.2500, 80.5200)],
            severity: crate::entities::Severity::Medium,
            aggregate_delay_seconds: 300.0,
        },
    );

    RouteSession {
        source: Some(c(16.3142, 80.4350)),
        destination: Some(c(16.3626, 80.5017)),
        routes: vec![first, second],
        loaded_at: Some(Utc::now()),
    }
}

#[test]
fn list_view_labels_and_texts() {
    let view: RouteListView = session_with_two_routes().into();

    assert_eq!(view.selected_index, Some(0));
    assert_eq!(view.routes[0].label, "Fastest Route");
    assert_eq!(view.routes[0].distance_text, "8.0 km");
    assert_eq!(view.routes[0].duration_text, "20 min");
    assert_eq!(view.routes[0].delay_text, None);
    assert_eq!(view.routes[1].label, "Alternative 1");
    assert_eq!(view.routes[1].delay_text.as_deref(), Some("5 min"));
}

#[test]
fn viewport_follows_selected_route() {
    let mut session = session_with_two_routes();
    assert_eq!(
        viewport(&session),
        Some(Bounds {
            south: 16.3142,
            west: 80.4350,
            north: 16.3626,
            east: 80.5017,
        })
    );

    session.routes[0].is_selected = false;
    session.routes[1].is_selected = true;
    let bounds = viewport(&session).unwrap();
    assert_eq!(bounds.south, 16.2500);
    assert_eq!(bounds.east, 80.5200);

    assert_eq!(viewport(&RouteSession::default()), None);
}

#[test]
fn list_view_serializes_flat_routes() {
    let view: RouteListView = session_with_two_routes().into();
    let json = serde_json::to_value(&view).unwrap();

    assert_eq!(json["routes"][0]["is_selected"], true);
    assert_eq!(json["routes"][1]["traffic"]["severity"], "medium");
    assert_eq!(json["routes"][1]["polyline"][1]["lat"], 16.25);
    assert_eq!(json["routes"][0]["label"], "Fastest Route");
}

#[test]
fn congested_selection_suggests_alternative() {
    let mut session = session_with_two_routes();
    let view: RouteListView = session.clone().into();
    assert!(!view.suggest_alternative);

    // the congested second route is now selected, the first has no delay
    session.routes[0].is_selected = false;
    session.routes[1].is_selected = true;
    let view: RouteListView = session.clone().into();
    assert!(view.suggest_alternative);

    // every other candidate is delayed at least as much
    session.routes[0].traffic = session.routes[1].traffic.clone();
    let view: RouteListView = session.into();
    assert!(!view.suggest_alternative);

    let empty: RouteListView = RouteSession::default().into();
    assert!(!empty.suggest_alternative);
}
