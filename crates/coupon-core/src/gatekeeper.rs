//! Per-identity claim gating.
//!
//! The gatekeeper remembers when each identity last claimed successfully and
//! refuses further claims until the cooldown window has passed. The boundary
//! is strict: an identity is rejected while `now - last_claimed_at <
//! cooldown`, so a claim exactly `cooldown` after the previous one succeeds.
//!
//! The gatekeeper owns its [`Allocator`]; eligibility check, allocation and
//! record update all happen inside one `&mut self` call, so a caller holding
//! the gatekeeper behind a single lock gets an atomic claim per identity.
//!
//! Records are kept in memory only. Lapsed records carry no information (a
//! lapsed record and a missing one both mean "allowed"), so
//! [`prune_expired`](Gatekeeper::prune_expired) can drop them at any time to
//! bound memory.

use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::allocator::Allocator;
use crate::clock::{Clock, SystemClock};
use crate::constants::DEFAULT_COOLDOWN;
use crate::types::{ClaimOutcome, ClaimRecord, Eligibility};

/// Cooldown tracker that hands out coupons from an owned [`Allocator`].
pub struct Gatekeeper<C = SystemClock> {
    allocator: Allocator,
    records: HashMap<String, ClaimRecord>,
    cooldown: Duration,
    clock: C,
}

impl Gatekeeper<SystemClock> {
    /// Seed pool, one-hour cooldown, real clock.
    pub fn with_defaults() -> Self {
        Self::new(Allocator::default(), DEFAULT_COOLDOWN, SystemClock)
    }
}

impl<C: Clock> Gatekeeper<C> {
    pub fn new(allocator: Allocator, cooldown: Duration, clock: C) -> Self {
        Self {
            allocator,
            records: HashMap::new(),
            cooldown,
            clock,
        }
    }

    /// Decide whether `identity` may claim now.
    pub fn check_eligibility(&self, identity: &str) -> Eligibility {
        self.eligibility_at(identity, self.clock.now_ms())
    }

    fn eligibility_at(&self, identity: &str, now: u64) -> Eligibility {
        let Some(record) = self.records.get(identity) else {
            return Eligibility::Allowed;
        };
        // A clock that stepped backwards counts as zero elapsed.
        let elapsed = Duration::from_millis(now.saturating_sub(record.last_claimed_at));
        if elapsed < self.cooldown {
            Eligibility::Cooldown {
                remaining: self.cooldown - elapsed,
            }
        } else {
            Eligibility::Allowed
        }
    }

    /// Attempt a claim for `identity`.
    ///
    /// On success the claim is recorded (replacing any earlier record) and
    /// the allocated coupon returned. Rate limiting and an empty pool are
    /// ordinary outcomes, not errors.
    pub fn claim(&mut self, identity: &str) -> ClaimOutcome {
        let now = self.clock.now_ms();

        if let Eligibility::Cooldown { remaining } = self.eligibility_at(identity, now) {
            debug!(%identity, remaining_ms = remaining.as_millis() as u64, "gatekeeper: claim rate limited");
            return ClaimOutcome::RateLimited { remaining };
        }

        let Some(coupon) = self.allocator.next_coupon() else {
            warn!(%identity, "gatekeeper: allocator returned no coupon");
            return ClaimOutcome::Unavailable;
        };

        self.records.insert(
            identity.to_string(),
            ClaimRecord {
                last_claimed_at: now,
                coupon_id: coupon.id.clone(),
            },
        );
        info!(%identity, coupon_id = %coupon.id, code = %coupon.code, "gatekeeper: coupon claimed");
        ClaimOutcome::Claimed(coupon)
    }

    /// The last successful claim by `identity`, if still tracked.
    pub fn record_for(&self, identity: &str) -> Option<&ClaimRecord> {
        self.records.get(identity)
    }

    /// Drop every record whose cooldown has lapsed. Returns how many were removed.
    pub fn prune_expired(&mut self) -> usize {
        let now = self.clock.now_ms();
        let cooldown_ms = self.cooldown.as_millis() as u64;
        let before = self.records.len();
        self.records
            .retain(|_, r| now.saturating_sub(r.last_claimed_at) < cooldown_ms);
        let removed = before - self.records.len();
        if removed > 0 {
            debug!(removed, remaining = self.records.len(), "gatekeeper: pruned lapsed claim records");
        }
        removed
    }

    /// Number of identities currently tracked.
    pub fn tracked_identities(&self) -> usize {
        self.records.len()
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub fn allocator(&self) -> &Allocator {
        &self.allocator
    }
}
