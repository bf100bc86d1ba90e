use axum::extract::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use std::fmt::{self, Display};
use std::net::AddrParseError;

pub const INVALID_INPUT: i32 = 100;
pub const SELECTION_OUT_OF_RANGE: i32 = 101;
pub const GEOCODE_FAILED: i32 = 200;
pub const ROUTE_NOT_FOUND: i32 = 300;
pub const ROUTE_FETCH_FAILED: i32 = 301;
pub const SUPERSEDED: i32 = 302;
pub const TRAFFIC_SAMPLE_FAILED: i32 = 400;

#[derive(Debug, Clone, PartialEq)]
pub struct Error {
    pub code: i32,
    pub message: String,
}

impl Error {
    /// Route loading failures the user can retry by hand.
    pub fn is_retryable(&self) -> bool {
        self.code == ROUTE_NOT_FOUND || self.code == ROUTE_FETCH_FAILED
    }

    fn status(&self) -> StatusCode {
        match self.code {
            1..=99 => StatusCode::INTERNAL_SERVER_ERROR,
            ROUTE_NOT_FOUND => StatusCode::NOT_FOUND,
            ROUTE_FETCH_FAILED | GEOCODE_FAILED | TRAFFIC_SAMPLE_FAILED => StatusCode::BAD_GATEWAY,
            SUPERSEDED => StatusCode::CONFLICT,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

impl std::error::Error for Error {}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        reqwest_error(err)
    }
}

impl From<AddrParseError> for Error {
    fn from(err: AddrParseError) -> Self {
        invalid_config_error(format!("listen address: {}", err))
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = match self.code {
            1..=99 => "Internal Server Error",
            _ => self.message.as_str(),
        };

        let body = Json(json!({
            "code": self.code,
            "error": error_message,
            "retryable": self.is_retryable(),
        }));

        (status, body).into_response()
    }
}

pub fn invalid_input_error() -> Error {
    Error {
        code: INVALID_INPUT,
        message: "invalid input".into(),
    }
}

pub fn selection_out_of_range_error(index: usize, len: usize) -> Error {
    Error {
        code: SELECTION_OUT_OF_RANGE,
        message: format!("route index {} out of range for {} routes", index, len),
    }
}

pub fn geocode_failed_error() -> Error {
    Error {
        code: GEOCODE_FAILED,
        message: "geocoding failed".into(),
    }
}

pub fn route_not_found_error() -> Error {
    Error {
        code: ROUTE_NOT_FOUND,
        message: "no route found between these places".into(),
    }
}

pub fn route_fetch_failed_error() -> Error {
    Error {
        code: ROUTE_FETCH_FAILED,
        message: "failed to fetch routes".into(),
    }
}

pub fn superseded_error() -> Error {
    Error {
        code: SUPERSEDED,
        message: "superseded by a newer route request".into(),
    }
}

pub fn traffic_sample_failed_error() -> Error {
    Error {
        code: TRAFFIC_SAMPLE_FAILED,
        message: "traffic sample failed".into(),
    }
}

pub fn invalid_config_error(detail: String) -> Error {
    Error {
        code: 2,
        message: format!("invalid configuration: {}", detail),
    }
}

pub fn reqwest_error(_: reqwest::Error) -> Error {
    Error {
        code: 3,
        message: "reqwest error".into(),
    }
}

pub fn upstream_error() -> Error {
    Error {
        code: 4,
        message: "upstream error".into(),
    }
}

#[test]
fn retryable_codes() {
    assert!(route_not_found_error().is_retryable());
    assert!(route_fetch_failed_error().is_retryable());
    assert!(!geocode_failed_error().is_retryable());
    assert!(!superseded_error().is_retryable());
    assert!(!selection_out_of_range_error(3, 2).is_retryable());
}

#[test]
fn status_mapping() {
    assert_eq!(route_not_found_error().status(), StatusCode::NOT_FOUND);
    assert_eq!(route_fetch_failed_error().status(), StatusCode::BAD_GATEWAY);
    assert_eq!(superseded_error().status(), StatusCode::CONFLICT);
    assert_eq!(invalid_input_error().status(), StatusCode::BAD_REQUEST);
    assert_eq!(upstream_error().status(), StatusCode::INTERNAL_SERVER_ERROR);
}
