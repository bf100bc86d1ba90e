pub mod places;
pub mod routes;
