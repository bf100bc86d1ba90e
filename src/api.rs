use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::entities::{Coordinate, PlaceCandidate, RouteCandidate, RoutePolyline, TrafficSummary};
use crate::error::Error;

#[async_trait]
pub trait GeocodeAPI {
    /// Queries shorter than three characters never reach the geocoder.
    /// Upstream failures yield an empty list. `input` names the text field
    /// the query was typed into; only a newer query on the same input
    /// supersedes it.
    async fn suggest(&self, input: &str, query: String) -> Result<Vec<PlaceCandidate>, Error>;

    /// Never fails; falls back to a formatted coordinate.
    async fn reverse_geocode(&self, coordinate: Coordinate) -> String;
}

#[async_trait]
pub trait TrafficAPI {
    async fn annotate(&self, polyline: &RoutePolyline) -> TrafficSummary;
}

#[async_trait]
pub trait RouteAPI {
    async fn load_routes(
        &self,
        source: Coordinate,
        destination: Coordinate,
    ) -> Result<RouteSession, Error>;

    async fn select_route(&self, index: usize) -> Result<RouteSession, Error>;

    async fn current_routes(&self) -> RouteSession;
}

/// Snapshot of the active route list.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RouteSession {
    pub source: Option<Coordinate>,
    pub destination: Option<Coordinate>,
    pub routes: Vec<RouteCandidate>,
    pub loaded_at: Option<DateTime<Utc>>,
}

impl RouteSession {
    pub fn selected_index(&self) -> Option<usize> {
        self.routes.iter().position(|r| r.is_selected)
    }

    pub fn selected(&self) -> Option<&RouteCandidate> {
        self.routes.iter().find(|r| r.is_selected)
    }
}

pub trait API: GeocodeAPI + TrafficAPI + RouteAPI {}

pub type DynAPI = Arc<dyn API + Send + Sync>;
