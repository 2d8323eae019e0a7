//! # coupon-session: client side of a coupon claim.
//!
//! Mirrors the server's cooldown on the client: the active coupon and its
//! expiry instant are persisted, restored on start-up if still valid, and a
//! one-second countdown releases the claim action when the cooldown lapses.
//!
//! # Modules
//!
//! - [`error`]: `SessionError` enum
//! - [`storage`]: key/value client storage (file-backed and in-memory)
//! - [`session`]: the claim session state machine
//! - [`countdown`]: tokio task driving session ticks
//! - [`identity`]: best-effort client identity resolution
//! - [`format`]: countdown display formatting

pub mod countdown;
pub mod error;
pub mod format;
pub mod identity;
pub mod session;
pub mod storage;

pub use countdown::Countdown;
pub use error::SessionError;
pub use format::format_remaining;
pub use identity::{FixedIdentity, IdentityResolver, IpifyResolver, fallback_identity, resolve_or_fallback};
pub use session::{ClaimSession, SessionRecord, SessionState, Tick};
pub use storage::{FileStorage, LocalStorage, MemoryStorage};
