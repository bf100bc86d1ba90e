//! Human-readable route texts.

pub fn format_distance(meters: f64) -> String {
    if meters >= 1000.0 {
        format!("{:.1} km", meters / 1000.0)
    } else {
        format!("{} m", meters.round() as i64)
    }
}

pub fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;

    if hours > 0 {
        format!("{} hr {} min", hours, minutes)
    } else {
        format!("{} min", minutes)
    }
}

/// First comma-separated part of a display name.
pub fn short_name(full_name: &str) -> &str {
    full_name.split(',').next().unwrap_or("").trim()
}

pub fn route_label(index: usize) -> String {
    match index {
        0 => "Fastest Route".into(),
        i => format!("Alternative {}", i),
    }
}

#[test]
fn distances() {
    assert_eq!(format_distance(8000.0), "8.0 km");
    assert_eq!(format_distance(9500.0), "9.5 km");
    assert_eq!(format_distance(1000.0), "1.0 km");
    assert_eq!(format_distance(999.4), "999 m");
    assert_eq!(format_distance(0.0), "0 m");
}

#[test]
fn durations() {
    assert_eq!(format_duration(1200.0), "20 min");
    assert_eq!(format_duration(59.0), "0 min");
    assert_eq!(format_duration(3600.0), "1 hr 0 min");
    assert_eq!(format_duration(5430.0), "1 hr 30 min");
}

#[test]
fn short_names() {
    assert_eq!(short_name("Acme, Main St 12, Springfield, X"), "Acme");
    assert_eq!(short_name("  Guntur "), "Guntur");
    assert_eq!(short_name(""), "");
}

#[test]
fn labels() {
    assert_eq!(route_label(0), "Fastest Route");
    assert_eq!(route_label(2), "Alternative 2");
}
