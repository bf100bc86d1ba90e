mod location;
mod place;
mod route;
mod traffic;

pub use location::Coordinate;
pub use place::{AddressProperties, PlaceCandidate, UNKNOWN_LOCATION};
pub use route::{FetchedRoute, RouteCandidate, RouteMetrics, RoutePolyline};
pub use traffic::{FlowSample, Severity, TrafficSummary, CLOSURE_PENALTY_SECONDS};
