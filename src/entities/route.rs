use geo_types::LineString;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Coordinate, TrafficSummary};
use crate::error::{invalid_input_error, Error};

/// Driving path from source to destination, at least two points long.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Coordinate>", into = "Vec<Coordinate>")]
pub struct RoutePolyline(Vec<Coordinate>);

impl RoutePolyline {
    pub fn new(points: Vec<Coordinate>) -> Result<Self, Error> {
        if points.len() < 2 {
            return Err(invalid_input_error());
        }

        Ok(Self(points))
    }

    pub fn points(&self) -> &[Coordinate] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Every `stride`-th point, starting with the first.
    pub fn sample(&self, stride: usize) -> Vec<Coordinate> {
        self.0.iter().step_by(stride.max(1)).copied().collect()
    }
}

impl TryFrom<Vec<Coordinate>> for RoutePolyline {
    type Error = Error;

    fn try_from(points: Vec<Coordinate>) -> Result<Self, Self::Error> {
        RoutePolyline::new(points)
    }
}

impl From<RoutePolyline> for Vec<Coordinate> {
    fn from(polyline: RoutePolyline) -> Self {
        polyline.0
    }
}

impl From<&RoutePolyline> for LineString<f64> {
    fn from(polyline: &RoutePolyline) -> Self {
        polyline.0.iter().map(|c| geo_types::Coord::from(*c)).collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteMetrics {
    pub distance_meters: f64,
    pub duration_seconds: f64,
}

/// A route as returned by a routing service, before traffic annotation.
#[derive(Clone, Debug, PartialEq)]
pub struct FetchedRoute {
    pub polyline: RoutePolyline,
    pub metrics: RouteMetrics,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteCandidate {
    pub id: Uuid,
    pub polyline: RoutePolyline,
    pub metrics: RouteMetrics,
    pub traffic: TrafficSummary,
    pub is_selected: bool,
}

impl RouteCandidate {
    pub fn new(route: FetchedRoute, traffic: TrafficSummary) -> Self {
        RouteCandidate {
            id: Uuid::new_v4(),
            polyline: route.polyline,
            metrics: route.metrics,
            traffic,
            is_selected: false,
        }
    }
}

#[cfg(test)]
fn line(n: usize) -> RoutePolyline {
    let points = (0..n)
        .map(|i| Coordinate::new(16.0 + i as f64 * 0.001, 80.0).unwrap())
        .collect();
    RoutePolyline::new(points).unwrap()
}

#[test]
fn polyline_needs_two_points() {
    let p = Coordinate::new(0.0, 0.0).unwrap();
    assert!(RoutePolyline::new(vec![]).is_err());
    assert!(RoutePolyline::new(vec![p]).is_err());
    assert!(RoutePolyline::new(vec![p, p]).is_ok());
}

#[test]
fn sample_at_stride() {
    let polyline = line(12);
    let sampled = polyline.sample(5);

    assert_eq!(sampled.len(), 3);
    assert_eq!(sampled[0], polyline.points()[0]);
    assert_eq!(sampled[1], polyline.points()[5]);
    assert_eq!(sampled[2], polyline.points()[10]);

    assert_eq!(polyline.sample(1).len(), 12);
    assert_eq!(polyline.sample(0).len(), 12);
}

#[test]
fn deserialize_rejects_short_polyline() {
    let short: Result<RoutePolyline, _> = serde_json::from_str(r#"[{"lat": 1.0, "lng": 2.0}]"#);
    assert!(short.is_err());
}

#[test]
fn polyline_into_line_string() {
    let ls: LineString<f64> = (&line(3)).into();
    assert_eq!(ls.0.len(), 3);
    assert_eq!(ls.0[0].y, 16.0);
}
