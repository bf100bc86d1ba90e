use serde::{Deserialize, Serialize};

use super::Coordinate;
use crate::error::Error;

/// Speed ratio below which a sample counts as congested.
pub const CONGESTION_RATIO: f64 = 0.7;
/// Speed ratio at or below which congestion is severe.
pub const SEVERE_RATIO: f64 = 0.4;
/// Delay charged for a closed road, in seconds.
pub const CLOSURE_PENALTY_SECONDS: f64 = 1000.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn from_speed_ratio(ratio: f64) -> Self {
        if ratio > CONGESTION_RATIO {
            Severity::Low
        } else if ratio > SEVERE_RATIO {
            Severity::Medium
        } else {
            Severity::High
        }
    }
}

/// One reading from a traffic-flow service.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlowSample {
    pub current_speed: f64,
    pub free_flow_speed: f64,
    pub current_travel_time: f64,
    pub free_flow_travel_time: f64,
    pub road_closure: bool,
}

impl FlowSample {
    /// `None` when the reading carries no usable free-flow speed.
    pub fn speed_ratio(&self) -> Option<f64> {
        if self.road_closure {
            return Some(0.0);
        }

        if !(self.free_flow_speed > 0.0) || !self.current_speed.is_finite() {
            return None;
        }

        Some((self.current_speed / self.free_flow_speed).clamp(0.0, 1.0))
    }

    fn delay_seconds(&self) -> f64 {
        if self.road_closure {
            return CLOSURE_PENALTY_SECONDS;
        }

        (self.current_travel_time - self.free_flow_travel_time).max(0.0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrafficSummary {
    pub has_traffic: bool,
    pub flagged_segments: Vec<Coordinate>,
    pub severity: Severity,
    pub aggregate_delay_seconds: f64,
}

impl Default for TrafficSummary {
    fn default() -> Self {
        Self {
            has_traffic: false,
            flagged_segments: vec![],
            severity: Severity::Low,
            aggregate_delay_seconds: 0.0,
        }
    }
}

impl TrafficSummary {
    /// Aggregates sample results in sampling order. Failed samples and
    /// samples without a usable ratio are skipped.
    pub fn from_samples<I>(samples: I) -> Self
    where
        I: IntoIterator<Item = (Coordinate, Result<FlowSample, Error>)>,
    {
        let mut flagged_segments = vec![];
        let mut aggregate_delay_seconds = 0.0;
        let mut min_ratio: f64 = 1.0;

        for (point, result) in samples {
            let sample = match result {
                Ok(sample) => sample,
                Err(_) => continue,
            };

            let ratio = match sample.speed_ratio() {
                Some(ratio) => ratio,
                None => continue,
            };

            min_ratio = min_ratio.min(ratio);

            if sample.road_closure || ratio < CONGESTION_RATIO {
                flagged_segments.push(point);
                aggregate_delay_seconds += sample.delay_seconds();
            }
        }

        Self {
            has_traffic: !flagged_segments.is_empty(),
            flagged_segments,
            severity: Severity::from_speed_ratio(min_ratio.clamp(0.0, 1.0)),
            aggregate_delay_seconds,
        }
    }
}

#[cfg(test)]
fn point(i: usize) -> Coordinate {
    Coordinate::new(16.0 + i as f64 * 0.01, 80.0).unwrap()
}

#[cfg(test)]
fn flow(current: f64, free: f64, current_time: f64, free_time: f64) -> FlowSample {
    FlowSample {
        current_speed: current,
        free_flow_speed: free,
        current_travel_time: current_time,
        free_flow_travel_time: free_time,
        road_closure: false,
    }
}

#[test]
fn free_flowing_route_has_no_traffic() {
    let summary = TrafficSummary::from_samples(
        (0..4).map(|i| (point(i), Ok(flow(50.0, 50.0, 60.0, 60.0)))),
    );

    assert_eq!(summary, TrafficSummary::default());
}

#[test]
fn closure_is_maximal_congestion() {
    let closed = FlowSample {
        road_closure: true,
        ..flow(50.0, 50.0, 60.0, 60.0)
    };
    let summary = TrafficSummary::from_samples(vec![
        (point(0), Ok(flow(50.0, 50.0, 60.0, 60.0))),
        (point(1), Ok(closed)),
    ]);

    assert!(summary.has_traffic);
    assert_eq!(summary.severity, Severity::High);
    assert_eq!(summary.flagged_segments, vec![point(1)]);
    assert_eq!(summary.aggregate_delay_seconds, CLOSURE_PENALTY_SECONDS);
}

#[test]
fn severity_boundaries() {
    assert_eq!(Severity::from_speed_ratio(1.0), Severity::Low);
    assert_eq!(Severity::from_speed_ratio(0.71), Severity::Low);
    assert_eq!(Severity::from_speed_ratio(0.7), Severity::Medium);
    assert_eq!(Severity::from_speed_ratio(0.41), Severity::Medium);
    assert_eq!(Severity::from_speed_ratio(0.4), Severity::High);
    assert_eq!(Severity::from_speed_ratio(0.0), Severity::High);
}

#[test]
fn ratio_exactly_at_threshold_is_medium_but_not_flagged() {
    let summary = TrafficSummary::from_samples(vec![(point(0), Ok(flow(35.0, 50.0, 90.0, 60.0)))]);

    assert_eq!(summary.severity, Severity::Medium);
    assert!(!summary.has_traffic);
    assert_eq!(summary.aggregate_delay_seconds, 0.0);
}

#[test]
fn congested_samples_accumulate_delay_in_order() {
    let summary = TrafficSummary::from_samples(vec![
        (point(0), Ok(flow(20.0, 50.0, 150.0, 60.0))),
        (point(1), Ok(flow(50.0, 50.0, 60.0, 60.0))),
        (point(2), Ok(flow(30.0, 50.0, 100.0, 60.0))),
    ]);

    assert!(summary.has_traffic);
    assert_eq!(summary.flagged_segments, vec![point(0), point(2)]);
    assert_eq!(summary.aggregate_delay_seconds, 130.0);
    assert_eq!(summary.severity, Severity::High);
}

#[test]
fn failed_samples_are_no_data() {
    use crate::error::traffic_sample_failed_error;

    let summary = TrafficSummary::from_samples(vec![
        (point(0), Err(traffic_sample_failed_error())),
        (point(1), Ok(flow(30.0, 50.0, 100.0, 60.0))),
    ]);
    assert_eq!(summary.flagged_segments, vec![point(1)]);
    assert_eq!(summary.severity, Severity::Medium);

    let all_failed = TrafficSummary::from_samples(
        (0..3).map(|i| (point(i), Err(traffic_sample_failed_error()))),
    );
    assert_eq!(all_failed, TrafficSummary::default());
}

#[test]
fn unusable_free_flow_speed_is_skipped() {
    let summary = TrafficSummary::from_samples(vec![(point(0), Ok(flow(0.0, 0.0, 100.0, 60.0)))]);
    assert_eq!(summary, TrafficSummary::default());
}

#[test]
fn negative_delay_is_not_credited() {
    let summary = TrafficSummary::from_samples(vec![(point(0), Ok(flow(30.0, 50.0, 40.0, 60.0)))]);
    assert!(summary.has_traffic);
    assert_eq!(summary.aggregate_delay_seconds, 0.0);
}

#[test]
fn severity_serializes_lowercase() {
    assert_eq!(serde_json::to_string(&Severity::Medium).unwrap(), "\"medium\"");
}
