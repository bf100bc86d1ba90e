use geo_types::{Coord, Point};
use serde::{Deserialize, Serialize};

use crate::error::{invalid_input_error, Error};

/// A WGS-84 position, latitude first.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Deserialize)]
struct RawCoordinate {
    lat: f64,
    lng: f64,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = Error;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        Coordinate::new(raw.lat, raw.lng)
    }
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Result<Self, Error> {
        let lat_ok = lat.is_finite() && (-90.0..=90.0).contains(&lat);
        let lng_ok = lng.is_finite() && (-180.0..=180.0).contains(&lng);

        if !(lat_ok && lng_ok) {
            return Err(invalid_input_error());
        }

        Ok(Self { lat, lng })
    }

    /// Upstream geometry arrives as `[lng, lat]`.
    pub fn from_lng_lat(pair: [f64; 2]) -> Result<Self, Error> {
        Coordinate::new(pair[1], pair[0])
    }

    /// `"{lng},{lat}"`, the form routing services expect in a path segment.
    pub fn lng_lat_param(&self) -> String {
        format!("{},{}", self.lng, self.lat)
    }

    /// `"{lat},{lng}"`, the form point queries expect.
    pub fn lat_lng_param(&self) -> String {
        format!("{},{}", self.lat, self.lng)
    }

    /// Shown when no address could be resolved for this position.
    pub fn fallback_label(&self) -> String {
        format!("{:.6}, {:.6}", self.lat, self.lng)
    }
}

impl From<Coordinate> for Coord<f64> {
    fn from(c: Coordinate) -> Self {
        Coord { x: c.lng, y: c.lat }
    }
}

impl From<Coordinate> for Point<f64> {
    fn from(c: Coordinate) -> Self {
        Point::new(c.lng, c.lat)
    }
}

#[test]
fn rejects_out_of_range() {
    assert!(Coordinate::new(90.0, 180.0).is_ok());
    assert!(Coordinate::new(-90.0, -180.0).is_ok());
    assert!(Coordinate::new(90.1, 0.0).is_err());
    assert!(Coordinate::new(0.0, -180.5).is_err());
    assert!(Coordinate::new(f64::NAN, 0.0).is_err());
}

#[test]
fn swaps_axis_order() {
    let c = Coordinate::from_lng_lat([80.4350, 16.3142]).unwrap();
    assert_eq!(c.lat, 16.3142);
    assert_eq!(c.lng, 80.4350);

    assert_eq!(c.lng_lat_param(), "80.435,16.3142");
    assert_eq!(c.lat_lng_param(), "16.3142,80.435");
}

#[test]
fn lng_lat_pair_is_validated_after_swap() {
    // 120 is a fine longitude but not a latitude
    assert!(Coordinate::from_lng_lat([10.0, 120.0]).is_err());
    assert!(Coordinate::from_lng_lat([120.0, 10.0]).is_ok());
}

#[test]
fn deserialize_validates() {
    let ok: Result<Coordinate, _> = serde_json::from_str(r#"{"lat": 16.3, "lng": 80.4}"#);
    assert!(ok.is_ok());

    let bad: Result<Coordinate, _> = serde_json::from_str(r#"{"lat": 100.0, "lng": 80.4}"#);
    assert!(bad.is_err());
}

#[test]
fn fallback_label_format() {
    let c = Coordinate::new(16.3142, 80.435).unwrap();
    assert_eq!(c.fallback_label(), "16.314200, 80.435000");
}

#[test]
fn into_geo_point() {
    let c = Coordinate::new(16.3142, 80.435).unwrap();
    let p: Point<f64> = c.into();
    assert_eq!(p.x(), 80.435);
    assert_eq!(p.y(), 16.3142);
}
