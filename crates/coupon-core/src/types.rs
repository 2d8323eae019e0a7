//! Coupons, claim records and claim outcomes.
//!
//! Timestamps are Unix epoch milliseconds. Durations crossing the wire
//! (`timeRemaining`) are serialized as whole milliseconds.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{NO_COUPONS_MESSAGE, rate_limited_message};

/// A single promotional coupon.
///
/// Everything but `is_used` is fixed at pool construction; `is_used` flips as
/// the allocator cycles and resets when the pool is exhausted.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    /// Unique, stable identifier.
    pub id: String,
    /// Code shown to the visitor.
    pub code: String,
    /// Human-readable description of the offer.
    pub description: String,
    /// Whether the coupon has been handed out in the current round.
    #[serde(default)]
    pub is_used: bool,
}

impl Coupon {
    pub fn new(id: impl Into<String>, code: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            code: code.into(),
            description: description.into(),
            is_used: false,
        }
    }
}

/// Last successful claim made by one identity.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRecord {
    /// When the claim succeeded, in epoch milliseconds.
    pub last_claimed_at: u64,
    /// Id of the coupon handed out.
    pub coupon_id: String,
}

/// Whether an identity may claim right now.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Eligibility {
    Allowed,
    /// Still inside the cooldown window.
    Cooldown { remaining: Duration },
}

impl Eligibility {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }

    /// Time left in the cooldown, if any.
    pub fn time_remaining(&self) -> Option<Duration> {
        match self {
            Self::Allowed => None,
            Self::Cooldown { remaining } => Some(*remaining),
        }
    }
}

/// Result of a claim attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// A coupon was allocated and the claim recorded.
    Claimed(Coupon),
    /// The identity is still cooling down.
    RateLimited { remaining: Duration },
    /// The allocator produced nothing.
    Unavailable,
}

impl ClaimOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Claimed(_))
    }

    /// User-facing message for failed claims.
    pub fn message(&self) -> Option<String> {
        match self {
            Self::Claimed(_) => None,
            Self::RateLimited { remaining } => Some(rate_limited_message(*remaining)),
            Self::Unavailable => Some(NO_COUPONS_MESSAGE.to_string()),
        }
    }
}

/// Wire shape of a claim result: `{success, coupon?, message?, timeRemaining?}`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClaimResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coupon: Option<Coupon>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Milliseconds left in the cooldown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_remaining: Option<u64>,
}

impl From<ClaimOutcome> for ClaimResponse {
    fn from(outcome: ClaimOutcome) -> Self {
        let message = outcome.message();
        match outcome {
            ClaimOutcome::Claimed(coupon) => Self {
                success: true,
                coupon: Some(coupon),
                message,
                time_remaining: None,
            },
            ClaimOutcome::RateLimited { remaining } => Self {
                success: false,
                coupon: None,
                message,
                time_remaining: Some(remaining.as_millis() as u64),
            },
            ClaimOutcome::Unavailable => Self {
                success: false,
                coupon: None,
                message,
                time_remaining: None,
            },
        }
    }
}

/// Wire shape of an eligibility check: `{allowed, timeRemaining?}`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EligibilityResponse {
    pub allowed: bool,
    /// Milliseconds left in the cooldown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_remaining: Option<u64>,
}

impl From<Eligibility> for EligibilityResponse {
    fn from(eligibility: Eligibility) -> Self {
        Self {
            allowed: eligibility.is_allowed(),
            time_remaining: eligibility.time_remaining().map(|d| d.as_millis() as u64),
        }
    }
}
