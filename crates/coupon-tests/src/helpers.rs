//! Shared test helpers for integration tests.

use std::sync::Arc;
use std::time::Duration;

use coupon_core::clock::ManualClock;
use coupon_core::{Allocator, Coupon, Gatekeeper};

/// A fixed instant well after the epoch (2023-11-14T22:13:20Z).
pub const T0: u64 = 1_700_000_000_000;

/// One-hour cooldown used throughout the suite.
pub const COOLDOWN: Duration = Duration::from_secs(3600);

/// Pool of `n` coupons with ids `c0..c{n-1}` and codes `CODE0..`.
pub fn make_pool(n: usize) -> Vec<Coupon> {
    (0..n)
        .map(|i| Coupon::new(format!("c{i}"), format!("CODE{i}"), format!("coupon number {i}")))
        .collect()
}

/// Gatekeeper over `make_pool(n)` driven by a shared manual clock at [`T0`].
pub fn make_gatekeeper(n: usize) -> (Gatekeeper<Arc<ManualClock>>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(T0));
    let gk = Gatekeeper::new(Allocator::new(make_pool(n)), COOLDOWN, Arc::clone(&clock));
    (gk, clock)
}
