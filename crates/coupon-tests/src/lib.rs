//! Integration test suite for Coupon Hub.
//!
//! Exercises the gatekeeper, allocator and client session together, the
//! way the server and a client compose them.

pub mod helpers;
