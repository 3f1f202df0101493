// src/metric.rs
use regex::Regex;
use std::sync::LazyLock;

/// `METRIC:` followed by a decimal literal with optional sign and exponent.
static METRIC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"METRIC:\s*([+-]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?)")
        .expect("metric pattern is valid")
});

/// Pulls the first `METRIC: <number>` value out of trial output.
///
/// Returns `None` when the text is empty, carries no marker, the marker is not
/// followed by a number, or the number overflows to infinity. Later markers in
/// the same output are ignored.
pub fn extract_metric(stdout: &str) -> Option<f64> {
    if stdout.is_empty() {
        return None;
    }
    let caps = METRIC_RE.captures(stdout)?;
    caps[1].parse::<f64>().ok().filter(|v| v.is_finite())
}
