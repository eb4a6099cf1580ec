use std::time::Duration;

use crate::core::timefmt;

/// What a progress bar should show: fill percentage and time label.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressView {
    pub percent: f64,
    pub elapsed: Duration,
    pub label: String,
}

impl ProgressView {
    pub fn new(elapsed: Duration, duration: Option<Duration>) -> Self {
        let current = elapsed.as_secs_f64();
        let total = duration.map(|d| d.as_secs_f64()).unwrap_or(0.0);
        Self {
            percent: timefmt::progress_percent(current, total),
            elapsed,
            label: timefmt::progress_label(current, total),
        }
    }

    /// Preview for a drag at `fraction` of the track, before any seek happens.
    pub fn at_fraction(fraction: f64, duration: Option<Duration>) -> Self {
        let fraction = clamp_fraction(fraction);
        let elapsed = duration
            .map(|d| d.mul_f64(fraction))
            .unwrap_or(Duration::ZERO);
        let mut view = Self::new(elapsed, duration);
        // Keep the bar under the pointer even when the length is still unknown.
        view.percent = fraction * 100.0;
        view
    }

    pub fn zero(duration: Option<Duration>) -> Self {
        Self::new(Duration::ZERO, duration)
    }
}

/// An in-progress drag on one song's progress bar.
#[derive(Debug, Clone, PartialEq)]
pub struct DragState {
    pub id: String,
    pub fraction: f64,
}

pub fn clamp_fraction(fraction: f64) -> f64 {
    if fraction.is_nan() {
        0.0
    } else {
        fraction.clamp(0.0, 1.0)
    }
}
