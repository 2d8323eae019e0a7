//! # coupon-core
//! Coupon pool, round-robin allocation and per-identity claim gating.
//!
//! # Modules
//!
//! - [`allocator`]: round-robin dispenser over a fixed pool
//! - [`gatekeeper`]: cooldown tracking keyed by client identity
//! - [`clock`]: wall-clock abstraction (system and manual)
//! - [`constants`]: cooldown defaults and user-facing messages
//! - [`error`]: `CouponError` enum
//! - [`pool`]: the seed coupon set and JSON pool loading
//! - [`types`]: coupons, claim records, outcomes and their wire shapes

pub mod allocator;
pub mod clock;
pub mod constants;
pub mod error;
pub mod gatekeeper;
pub mod pool;
pub mod types;

pub use allocator::Allocator;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::CouponError;
pub use gatekeeper::Gatekeeper;
pub use types::{ClaimOutcome, ClaimRecord, ClaimResponse, Coupon, Eligibility, EligibilityResponse};
