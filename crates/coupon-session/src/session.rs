//! Claim session state machine.
//!
//! ```text
//!            begin_claim              complete_claim(success)
//!   Idle ──────────────────► Claiming ───────────────────────► Active(coupon)
//!    ▲                          │  complete_claim(rate limited)      │
//!    │                          ├──────────────────────────► Active(no coupon)
//!    │   no coupons / error     │                                    │
//!    ├──────────────────────────┘                                    │ tick
//!    │                  Expired (remaining <= period)                │
//!    └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! The session owns both the countdown state and the persisted record, and
//! every transition goes through one of its methods, so the displayed
//! countdown and the stored expiry never diverge. Only successful claims are
//! persisted; a rate-limited countdown lives in memory alone.
//!
//! Storage failures never abort a transition. Unreadable or malformed
//! records are purged and the session starts `Idle`; failed writes are
//! logged and the in-memory state proceeds.

use std::time::Duration;

use coupon_core::clock::{Clock, SystemClock};
use coupon_core::constants::{
    CLAIM_AGAIN_MESSAGE, CLAIM_ERROR_MESSAGE, CLAIM_FAILED_MESSAGE, CLAIMED_MESSAGE, SESSION_KEY,
};
use coupon_core::{ClaimResponse, Coupon};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::SessionError;
use crate::storage::LocalStorage;

/// Persisted form of an active claim, stored as JSON under [`SESSION_KEY`].
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub coupon: Coupon,
    /// Claim instant, epoch milliseconds.
    pub claimed_at: u64,
    /// `claimed_at + cooldown`, epoch milliseconds.
    pub expiry_time: u64,
}

impl SessionRecord {
    pub fn new(coupon: Coupon, claimed_at: u64, cooldown: Duration) -> Self {
        Self {
            coupon,
            claimed_at,
            expiry_time: claimed_at.saturating_add(cooldown.as_millis() as u64),
        }
    }

    /// Time left at `now_ms`, or `None` once `expiry_time <= now_ms`.
    pub fn remaining_at(&self, now_ms: u64) -> Option<Duration> {
        (self.expiry_time > now_ms).then(|| Duration::from_millis(self.expiry_time - now_ms))
    }
}

/// Where the session currently is.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// No active claim; the claim action is available.
    Idle,
    /// A claim request is in flight.
    Claiming,
    /// Countdown running. `coupon` is `None` when the countdown was armed by
    /// a rate-limited response rather than a successful claim.
    Active {
        coupon: Option<Coupon>,
        remaining: Duration,
    },
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Claiming => "claiming",
            Self::Active { .. } => "active",
        }
    }
}

/// Result of one countdown tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tick {
    /// Still counting down; carries the new remaining time.
    Running(Duration),
    /// The countdown reached zero and the session returned to `Idle`.
    Expired,
    /// No countdown was running.
    Inactive,
}

/// Client-side claim session.
pub struct ClaimSession<S, C = SystemClock> {
    storage: S,
    clock: C,
    cooldown: Duration,
    state: SessionState,
    message: Option<String>,
}

impl<S: LocalStorage, C: Clock> ClaimSession<S, C> {
    /// Start a session, rehydrating any unexpired persisted claim.
    ///
    /// Expired, unreadable and malformed records are purged.
    pub fn restore(storage: S, clock: C, cooldown: Duration) -> Self {
        let mut session = Self {
            storage,
            clock,
            cooldown,
            state: SessionState::Idle,
            message: None,
        };

        match session.load_record() {
            Ok(Some(record)) => match record.remaining_at(session.clock.now_ms()) {
                Some(remaining) => {
                    info!(
                        coupon = %record.coupon.code,
                        remaining_ms = remaining.as_millis() as u64,
                        "session: restored active claim"
                    );
                    session.state = SessionState::Active {
                        coupon: Some(record.coupon),
                        remaining,
                    };
                }
                None => {
                    debug!(expiry_time = record.expiry_time, "session: persisted claim expired");
                    session.purge();
                }
            },
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "session: discarding unreadable persisted claim");
                session.purge();
            }
        }

        session
    }

    fn load_record(&self) -> Result<Option<SessionRecord>, SessionError> {
        let Some(raw) = self.storage.get_item(SESSION_KEY)? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn persist(&self, record: &SessionRecord) {
        let result = serde_json::to_string(record)
            .map_err(SessionError::from)
            .and_then(|json| self.storage.set_item(SESSION_KEY, &json));
        if let Err(e) = result {
            warn!(error = %e, "session: failed to persist claim");
        }
    }

    fn purge(&self) {
        if let Err(e) = self.storage.remove_item(SESSION_KEY) {
            warn!(error = %e, "session: failed to purge persisted claim");
        }
    }

    fn ensure_claiming(&self, action: &'static str) -> Result<(), SessionError> {
        if self.state == SessionState::Claiming {
            Ok(())
        } else {
            Err(SessionError::InvalidTransition {
                state: self.state.name(),
                action,
            })
        }
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    /// `Idle → Claiming`. Rejected in every other state.
    pub fn begin_claim(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::Idle {
            return Err(SessionError::InvalidTransition {
                state: self.state.name(),
                action: "begin a claim",
            });
        }
        self.state = SessionState::Claiming;
        Ok(())
    }

    /// Apply the gatekeeper's answer to the in-flight claim.
    ///
    /// - success with a coupon: persist `{coupon, claimedAt, expiryTime}` and
    ///   start the full cooldown
    /// - failure with a positive `timeRemaining`: countdown only, no coupon
    /// - any other failure: back to `Idle`
    pub fn complete_claim(&mut self, response: ClaimResponse) -> Result<(), SessionError> {
        self.ensure_claiming("complete a claim")?;

        match response {
            ClaimResponse {
                success: true,
                coupon: Some(coupon),
                ..
            } => {
                let record = SessionRecord::new(coupon.clone(), self.clock.now_ms(), self.cooldown);
                self.persist(&record);
                info!(coupon = %coupon.code, expiry_time = record.expiry_time, "session: claim active");
                self.state = SessionState::Active {
                    coupon: Some(coupon),
                    remaining: self.cooldown,
                };
                self.message = Some(CLAIMED_MESSAGE.to_string());
            }
            ClaimResponse {
                message,
                time_remaining,
                ..
            } => {
                self.message = Some(message.unwrap_or_else(|| CLAIM_FAILED_MESSAGE.to_string()));
                self.state = match time_remaining {
                    Some(ms) if ms > 0 => {
                        debug!(remaining_ms = ms, "session: rate limited, countdown armed");
                        SessionState::Active {
                            coupon: None,
                            remaining: Duration::from_millis(ms),
                        }
                    }
                    _ => SessionState::Idle,
                };
            }
        }
        Ok(())
    }

    /// The claim request itself failed (transport, decoding, ...): `Claiming → Idle`.
    pub fn fail_claim(&mut self, error: &dyn std::fmt::Display) -> Result<(), SessionError> {
        self.ensure_claiming("fail a claim")?;
        warn!(error = %error, "session: claim request failed");
        self.state = SessionState::Idle;
        self.message = Some(CLAIM_ERROR_MESSAGE.to_string());
        Ok(())
    }

    /// Advance the countdown by one `period`.
    ///
    /// When the remaining time would reach zero the session expires: the
    /// persisted record and displayed coupon are cleared and it returns to
    /// `Idle`.
    pub fn tick(&mut self, period: Duration) -> Tick {
        let SessionState::Active { remaining, .. } = &mut self.state else {
            return Tick::Inactive;
        };
        if *remaining > period {
            *remaining -= period;
            Tick::Running(*remaining)
        } else {
            self.expire();
            Tick::Expired
        }
    }

    fn expire(&mut self) {
        self.purge();
        self.state = SessionState::Idle;
        self.message = Some(CLAIM_AGAIN_MESSAGE.to_string());
        info!("session: cooldown lapsed");
    }

    /// Drop any active claim and return to `Idle` without a message.
    pub fn reset(&mut self) {
        self.purge();
        self.state = SessionState::Idle;
        self.message = None;
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Last user-facing message.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Coupon currently on display.
    pub fn coupon(&self) -> Option<&Coupon> {
        match &self.state {
            SessionState::Active { coupon, .. } => coupon.as_ref(),
            _ => None,
        }
    }

    pub fn time_remaining(&self) -> Option<Duration> {
        match &self.state {
            SessionState::Active { remaining, .. } => Some(*remaining),
            _ => None,
        }
    }

    /// Whether the claim action is enabled.
    pub fn can_claim(&self) -> bool {
        self.state == SessionState::Idle
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }
}
