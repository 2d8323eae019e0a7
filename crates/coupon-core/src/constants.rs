//! Cooldown defaults, storage keys and user-facing messages.

use std::time::Duration;

/// Milliseconds in one minute.
pub const MINUTE_MS: u64 = 60 * 1000;

/// Milliseconds in one hour.
pub const HOUR_MS: u64 = 60 * MINUTE_MS;

/// Default minimum wait between successful claims by one identity.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_millis(HOUR_MS);

/// Period of the client-side countdown.
pub const COUNTDOWN_TICK: Duration = Duration::from_secs(1);

/// Storage key holding the persisted claim session.
pub const SESSION_KEY: &str = "couponData";

/// Shown when the allocator has nothing to hand out.
pub const NO_COUPONS_MESSAGE: &str = "No coupons available at the moment.";

/// Shown after a successful claim.
pub const CLAIMED_MESSAGE: &str = "Coupon claimed successfully!";

/// Shown when the countdown lapses.
pub const CLAIM_AGAIN_MESSAGE: &str = "You can claim a new coupon now!";

/// Shown when the claim request itself failed.
pub const CLAIM_ERROR_MESSAGE: &str = "An error occurred while claiming the coupon.";

/// Fallback when a failed claim response carries no message.
pub const CLAIM_FAILED_MESSAGE: &str = "Failed to claim coupon.";

/// Rate-limit message stating whole minutes remaining, rounded up.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use coupon_core::constants::rate_limited_message;
/// assert_eq!(
///     rate_limited_message(Duration::from_millis(61_000)),
///     "You can claim another coupon in 2 minutes."
/// );
/// ```
pub fn rate_limited_message(remaining: Duration) -> String {
    let minutes = remaining.as_millis().div_ceil(MINUTE_MS as u128);
    format!("You can claim another coupon in {minutes} minutes.")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_cooldown_is_one_hour() {
        assert_eq!(DEFAULT_COOLDOWN, Duration::from_secs(3600));
    }

    #[test]
    fn minutes_round_up() {
        assert_eq!(
            rate_limited_message(Duration::from_millis(1)),
            "You can claim another coupon in 1 minutes."
        );
        assert_eq!(
            rate_limited_message(Duration::from_millis(MINUTE_MS)),
            "You can claim another coupon in 1 minutes."
        );
        assert_eq!(
            rate_limited_message(Duration::from_millis(HOUR_MS)),
            "You can claim another coupon in 60 minutes."
        );
    }

    #[test]
    fn zero_remaining_is_zero_minutes() {
        assert_eq!(
            rate_limited_message(Duration::ZERO),
            "You can claim another coupon in 0 minutes."
        );
    }
}
