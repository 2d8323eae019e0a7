//! Countdown display formatting.

use std::time::Duration;

/// Render a remaining duration as `"{h}h {m}m {s}s"`, dropping the hour part
/// when it is zero. Sub-second remainders are truncated.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use coupon_session::format_remaining;
/// assert_eq!(format_remaining(Duration::from_millis(3_723_999)), "1h 2m 3s");
/// assert_eq!(format_remaining(Duration::from_secs(59)), "0m 59s");
/// ```
pub fn format_remaining(remaining: Duration) -> String {
    let total = remaining.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else {
        format!("{minutes}m {seconds}s")
    }
}
