//! Round-robin coupon allocation.
//!
//! The allocator scans the pool in definition order for the first coupon not
//! yet handed out this round, marks it used and returns a copy of it as it
//! was before the mark. When that allocation uses up the last free coupon,
//! the whole pool is reset before returning, so the scan, mark and reset form
//! one step and no caller ever sees a fully used pool.
//!
//! Repeated calls therefore cycle through the pool in order indefinitely:
//! for `[A, B, C]` the sequence is `A, B, C, A, B, C, ...`.
//!
//! The allocator is not synchronized. Concurrent callers must serialize
//! access, which the [`Gatekeeper`](crate::gatekeeper::Gatekeeper) does by
//! owning it.

use tracing::debug;

use crate::pool::seed_coupons;
use crate::types::Coupon;

/// Fixed coupon pool with round-robin allocation.
#[derive(Debug, Clone)]
pub struct Allocator {
    coupons: Vec<Coupon>,
}

impl Allocator {
    /// Build an allocator over `coupons`, kept in the given order.
    pub fn new(coupons: Vec<Coupon>) -> Self {
        Self { coupons }
    }

    /// Hand out the next unused coupon.
    ///
    /// Returns `None` only when the pool is empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use coupon_core::{Allocator, Coupon};
    /// let mut alloc = Allocator::new(vec![
    ///     Coupon::new("a", "A", ""),
    ///     Coupon::new("b", "B", ""),
    /// ]);
    /// let codes: Vec<_> = (0..3).map(|_| alloc.next_coupon().unwrap().code).collect();
    /// assert_eq!(codes, ["A", "B", "A"]);
    /// ```
    pub fn next_coupon(&mut self) -> Option<Coupon> {
        let slot = self.coupons.iter_mut().find(|c| !c.is_used)?;
        let allocated = slot.clone();
        slot.is_used = true;

        if self.coupons.iter().all(|c| c.is_used) {
            debug!(pool_size = self.coupons.len(), "allocator: round complete, resetting pool");
            for coupon in &mut self.coupons {
                coupon.is_used = false;
            }
        }

        Some(allocated)
    }

    /// Number of coupons in the pool.
    pub fn len(&self) -> usize {
        self.coupons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coupons.is_empty()
    }

    /// Coupons not yet handed out in the current round.
    pub fn unused_count(&self) -> usize {
        self.coupons.iter().filter(|c| !c.is_used).count()
    }

    /// The pool in definition order, with current `is_used` flags.
    pub fn coupons(&self) -> &[Coupon] {
        &self.coupons
    }
}

impl Default for Allocator {
    fn default() -> Self {
        Self::new(seed_coupons())
    }
}

/// Endless round-robin stream; ends immediately for an empty pool.
impl Iterator for Allocator {
    type Item = Coupon;

    fn next(&mut self) -> Option<Coupon> {
        self.next_coupon()
    }
}
