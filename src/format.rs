// Display helpers for the report output

/// Shown wherever a statistic could not be computed.
pub const PLACEHOLDER: &str = "—";

/// Formats seconds as `m:ss.mmm`, or the placeholder when absent.
pub fn lap_time(seconds: Option<f64>) -> String {
    match seconds.filter(|s| s.is_finite() && *s >= 0.) {
        Some(s) => {
            let millis = (s * 1000.).round() as u64;
            format!("{}:{:02}.{:03}", millis / 60_000, (millis / 1000) % 60, millis % 1000)
        }
        None => PLACEHOLDER.to_string(),
    }
}

/// Signed seconds with millisecond precision, e.g. `+0.250s`.
pub fn delta(seconds: Option<f64>) -> String {
    match seconds.filter(|s| s.is_finite()) {
        Some(s) => format!("{:+.3}s", s),
        None => PLACEHOLDER.to_string(),
    }
}

pub fn percent(value: Option<f64>) -> String {
    match value.filter(|v| v.is_finite()) {
        Some(v) => format!("{:.2}%", v),
        None => PLACEHOLDER.to_string(),
    }
}
