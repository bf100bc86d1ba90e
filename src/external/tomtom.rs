use async_trait::async_trait;
use serde::Deserialize;

use super::{Limiter, TrafficFlowProvider};
use crate::{
    entities::{Coordinate, FlowSample},
    error::{traffic_sample_failed_error, Error},
};

const FLOW_SEGMENT_PATH: &str = "/traffic/services/4/flowSegmentData/absolute/10/json";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FlowResponse {
    flow_segment_data: FlowSegmentData,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FlowSegmentData {
    current_speed: f64,
    free_flow_speed: f64,
    current_travel_time: f64,
    free_flow_travel_time: f64,
    #[serde(default)]
    road_closure: bool,
}

impl From<FlowSegmentData> for FlowSample {
    fn from(data: FlowSegmentData) -> Self {
        FlowSample {
            current_speed: data.current_speed,
            free_flow_speed: data.free_flow_speed,
            current_travel_time: data.current_travel_time,
            free_flow_travel_time: data.free_flow_travel_time,
            road_closure: data.road_closure,
        }
    }
}

/// Client for the TomTom flow-segment service. Requests wait on the
/// limiter so bursts of samples stay within the account's quota.
pub struct TomTom {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    limiter: Limiter,
}

impl std::fmt::Debug for TomTom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TomTom")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

impl TomTom {
    pub fn new(
        client: reqwest::Client,
        api_base: impl Into<String>,
        api_key: String,
        limiter: Limiter,
    ) -> Self {
        Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key,
            limiter,
        }
    }
}

#[async_trait]
impl TrafficFlowProvider for TomTom {
    #[tracing::instrument(skip(self))]
    async fn flow_at(&self, point: Coordinate) -> Result<FlowSample, Error> {
        let url = format!("{}{}", self.api_base, FLOW_SEGMENT_PATH);

        self.limiter.until_ready().await;

        let res = self
            .client
            .get(url)
            .query(&[("key", self.api_key.clone())])
            .query(&[("point", point.lat_lng_param())])
            .send()
            .await
            .map_err(|_| traffic_sample_failed_error())?;

        if !res.status().is_success() {
            tracing::debug!("traffic service responded with {}", res.status());
            return Err(traffic_sample_failed_error());
        }

        let text = res.text().await.map_err(|_| traffic_sample_failed_error())?;

        parse_flow(&text)
    }
}

fn parse_flow(body: &str) -> Result<FlowSample, Error> {
    let data: FlowResponse = serde_json::from_str(body).map_err(|_| traffic_sample_failed_error())?;

    Ok(data.flow_segment_data.into())
}

#[test]
fn parses_flow_segment() {
    let sample = parse_flow(
        r#"{
            "flowSegmentData": {
                "frc": "FRC2",
                "currentSpeed": 28,
                "freeFlowSpeed": 56,
                "currentTravelTime": 120,
                "freeFlowTravelTime": 60,
                "confidence": 0.95,
                "roadClosure": false,
                "coordinates": {"coordinate": []}
            }
        }"#,
    )
    .unwrap();

    assert_eq!(sample.current_speed, 28.0);
    assert_eq!(sample.free_flow_speed, 56.0);
    assert_eq!(sample.speed_ratio(), Some(0.5));
    assert!(!sample.road_closure);
}

#[test]
fn missing_closure_flag_means_open() {
    let sample = parse_flow(
        r#"{"flowSegmentData": {"currentSpeed": 50, "freeFlowSpeed": 50, "currentTravelTime": 60, "freeFlowTravelTime": 60}}"#,
    )
    .unwrap();

    assert!(!sample.road_closure);
}

#[test]
fn malformed_body_is_sample_failure() {
    use crate::error::TRAFFIC_SAMPLE_FAILED;

    assert_eq!(parse_flow("<html/>").unwrap_err().code, TRAFFIC_SAMPLE_FAILED);
    assert_eq!(
        parse_flow(r#"{"detailedError": {"code": "INVALID_KEY"}}"#).unwrap_err().code,
        TRAFFIC_SAMPLE_FAILED
    );
}

#[test]
fn debug_hides_api_key() {
    use super::per_second_limiter;
    use std::num::NonZeroU32;

    let tomtom = TomTom::new(
        reqwest::Client::new(),
        "https://api.tomtom.com",
        "secret".into(),
        per_second_limiter(NonZeroU32::new(5).unwrap()),
    );
    assert!(!format!("{:?}", tomtom).contains("secret"));
}

#[test]
fn unreachable_service_is_sample_failure() {
    use super::per_second_limiter;
    use crate::error::TRAFFIC_SAMPLE_FAILED;
    use std::num::NonZeroU32;

    let tomtom = TomTom::new(
        reqwest::Client::new(),
        "http://127.0.0.1:9",
        "key".into(),
        per_second_limiter(NonZeroU32::new(1).unwrap()),
    );
    let point = Coordinate::new(16.3142, 80.435).unwrap();

    let err = tokio_test::block_on(tomtom.flow_at(point)).unwrap_err();
    assert_eq!(err.code, TRAFFIC_SAMPLE_FAILED);
}
