mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::Extension,
    routing::{get, patch},
    Router,
};

use crate::server::handlers::{places, routes};
use crate::{
    api::{DynAPI, API},
    error::{upstream_error, Error},
};

pub fn app(api: DynAPI) -> Router {
    Router::new()
        .route("/places/suggestions", get(places::suggestions))
        .route("/places/reverse", get(places::reverse))
        .route("/routes", get(routes::current).post(routes::load))
        .route("/routes/:index/select", patch(routes::select))
        .layer(Extension(api))
}

pub async fn serve<T: API + Sync + Send + 'static>(api: T, addr: SocketAddr) -> Result<(), Error> {
    let api = Arc::new(api) as DynAPI;

    tracing::info!("listening on {}", addr);

    axum::Server::bind(&addr)
        .serve(app(api).into_make_service())
        .await
        .map_err(|err| {
            tracing::error!("server error: {}", err);
            upstream_error()
        })
}

#[cfg(test)]
fn send(
    api: DynAPI,
    request: axum::http::Request<axum::body::Body>,
) -> (axum::http::StatusCode, serde_json::Value) {
    use tower::ServiceExt;

    tokio_test::block_on(async {
        let response = app(api).oneshot(request).await.unwrap();
        let status = response.status();
        let body = hyper::body::to_bytes(response.into_body()).await.unwrap();

        (status, serde_json::from_slice(&body).unwrap())
    })
}

#[cfg(test)]
fn load_request() -> axum::http::Request<axum::body::Body> {
    let body = serde_json::json!({
        "source": {"lat": 16.3142, "lng": 80.4350},
        "destination": {"lat": 16.3626, "lng": 80.5017},
    });

    axum::http::Request::builder()
        .method("POST")
        .uri("/routes")
        .header("content-type", "application/json")
        .body(axum::body::Body::from(body.to_string()))
        .unwrap()
}

#[test]
fn failed_load_is_retryable() {
    use crate::engine::testing::*;
    use crate::error::{route_fetch_failed_error, route_not_found_error};
    use axum::http::StatusCode;

    let router = Arc::new(FakeRouter::with(vec![
        Err(route_fetch_failed_error()),
        Err(route_not_found_error()),
    ]));
    let api = Arc::new(engine(Arc::new(FakeGeocoder::default()), router, None)) as DynAPI;

    let (status, body) = send(api.clone(), load_request());
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], 301);
    assert_eq!(body["retryable"], true);

    let (status, body) = send(api, load_request());
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["retryable"], true);
}

#[test]
fn load_then_select_over_http() {
    use crate::engine::testing::*;
    use axum::http::{Request, StatusCode};

    let source = coord(16.3142, 80.4350);
    let router = Arc::new(FakeRouter::with(vec![Ok(vec![
        route(source, 6, 8000.0, 1200.0),
        route(source, 9, 9500.0, 1500.0),
    ])]));
    let api = Arc::new(engine(Arc::new(FakeGeocoder::default()), router, None)) as DynAPI;

    let (status, body) = send(api.clone(), load_request());
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["selected_index"], 0);
    assert_eq!(body["routes"][0]["label"], "Fastest Route");
    assert_eq!(body["routes"][1]["distance_text"], "9.5 km");

    let select = Request::builder()
        .method("PATCH")
        .uri("/routes/1/select")
        .body(axum::body::Body::empty())
        .unwrap();
    let (status, body) = send(api, select);
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["selected_index"], 1);
    assert_eq!(body["routes"][0]["is_selected"], false);
}

#[test]
fn out_of_range_selection_is_bad_request() {
    use crate::engine::testing::*;
    use axum::http::{Request, StatusCode};

    let api = Arc::new(engine(
        Arc::new(FakeGeocoder::default()),
        Arc::new(FakeRouter::default()),
        None,
    )) as DynAPI;

    let request = Request::builder()
        .method("PATCH")
        .uri("/routes/9/select")
        .body(axum::body::Body::empty())
        .unwrap();
    let (status, body) = send(api, request);

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 101);
    assert_eq!(body["retryable"], false);
}

#[test]
fn reverse_falls_back_to_coordinates() {
    use crate::engine::testing::*;
    use axum::http::{Request, StatusCode};

    let geocoder = Arc::new(FakeGeocoder {
        fail: true,
        ..FakeGeocoder::default()
    });
    let api = Arc::new(engine(geocoder, Arc::new(FakeRouter::default()), None)) as DynAPI;

    let request = Request::builder()
        .uri("/places/reverse?lat=16.3142&lng=80.435")
        .body(axum::body::Body::empty())
        .unwrap();
    let (status, body) = send(api, request);

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["display_name"], "16.314200, 80.435000");
    assert_eq!(body["short_name"], "16.314200");
}
