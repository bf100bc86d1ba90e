use axum::extract::{Extension, Json, Query};
use serde::{Deserialize, Serialize};

use crate::{
    api::DynAPI,
    entities::{Coordinate, PlaceCandidate},
    error::Error,
    format::short_name,
};

#[derive(Serialize, Deserialize)]
pub struct SuggestionParams {
    q: String,
    /// Which text field is being typed into, e.g. `source` or `destination`.
    #[serde(default)]
    input: String,
}

#[derive(Serialize, Deserialize)]
pub struct ReverseResult {
    display_name: String,
    short_name: String,
}

#[axum_macros::debug_handler]
pub async fn suggestions(
    Extension(api): Extension<DynAPI>,
    Query(params): Query<SuggestionParams>,
) -> Result<Json<Vec<PlaceCandidate>>, Error> {
    let places = api.suggest(&params.input, params.q).await?;

    Ok(places.into())
}

pub async fn reverse(
    Extension(api): Extension<DynAPI>,
    Query(coordinate): Query<Coordinate>,
) -> Json<ReverseResult> {
    let display_name = api.reverse_geocode(coordinate).await;

    ReverseResult {
        short_name: short_name(&display_name).to_string(),
        display_name,
    }
    .into()
}
