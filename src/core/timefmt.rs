/// Format seconds as `MM:SS`. Minutes are not wrapped into hours.
pub fn format_clock(secs: f64) -> String {
    let total = if secs.is_finite() && secs > 0.0 {
        secs.floor() as u64
    } else {
        0
    };
    format!("{:02}:{:02}", total / 60, total % 60)
}

/// `"MM:SS / MM:SS"` label shown next to the progress bar.
pub fn progress_label(current: f64, duration: f64) -> String {
    format!("{} / {}", format_clock(current), format_clock(duration))
}

/// Fill percentage of the progress bar, always within `0..=100`.
///
/// An unknown (zero, negative, NaN) duration yields 0.
pub fn progress_percent(current: f64, duration: f64) -> f64 {
    if !duration.is_finite() || duration <= 0.0 || !current.is_finite() {
        return 0.0;
    }
    (current / duration).clamp(0.0, 1.0) * 100.0
}

/// Parse a backend `interval` string into seconds.
///
/// Supported forms:
/// - "03:00", "3:00"
/// - "1:02:03"
/// - "3分00秒", "3分"
pub fn parse_interval(s: &str) -> Option<u64> {
    let normalized = s.trim().replace('分', ":").replace('秒', "");
    let normalized = normalized.trim_end_matches(':');
    if normalized.is_empty() {
        return None;
    }

    let mut total: u64 = 0;
    let mut parts = 0;
    for part in normalized.split(':') {
        let value: u64 = part.trim().parse().ok()?;
        total = total.checked_mul(60)?.checked_add(value)?;
        parts += 1;
    }

    if parts > 3 {
        return None;
    }
    // A bare number is ambiguous; the backend always sends at least MM:SS.
    if parts == 1 && !s.contains('分') {
        return None;
    }
    if parts == 1 {
        total *= 60;
    }
    Some(total)
}
