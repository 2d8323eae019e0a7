//! Countdown driver.
//!
//! A [`Countdown`] owns a spawned task that ticks a shared [`ClaimSession`]
//! on a fixed period until the session expires, is reset, or the handle is
//! dropped. Dropping the handle aborts the task, so the recurring timer is
//! torn down on every exit path.

use std::sync::Arc;
use std::time::Duration;

use coupon_core::clock::Clock;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

use crate::session::{ClaimSession, Tick};
use crate::storage::LocalStorage;

/// Shortest period a countdown ticks at; a zero period is raised to this.
pub const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Handle to a running countdown task.
pub struct Countdown {
    handle: Option<JoinHandle<()>>,
}

impl Countdown {
    /// Start ticking `session` every `period`.
    ///
    /// The first tick fires one full period after start. `on_tick` runs
    /// under the session lock after every tick, including the final one.
    /// A zero `period` is raised to [`MIN_PERIOD`].
    pub fn start<S, C, F>(
        session: Arc<Mutex<ClaimSession<S, C>>>,
        period: Duration,
        mut on_tick: F,
    ) -> Self
    where
        S: LocalStorage + 'static,
        C: Clock + 'static,
        F: FnMut(Tick, &ClaimSession<S, C>) + Send + 'static,
    {
        let period = period.max(MIN_PERIOD);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let mut session = session.lock().await;
                let tick = session.tick(period);
                on_tick(tick, &*session);
                if !matches!(tick, Tick::Running(_)) {
                    debug!(?tick, "countdown: stopped");
                    break;
                }
            }
        });
        Self {
            handle: Some(handle),
        }
    }

    /// Wait for the countdown to stop on its own.
    ///
    /// Returns `false` if the task was cancelled or had already been joined.
    pub async fn join(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) => handle.await.is_ok(),
            None => false,
        }
    }

    /// Whether the task has stopped.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(|h| h.is_finished())
    }

    /// Stop the countdown now.
    pub fn cancel(mut self) {
        self.abort();
    }

    fn abort(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.abort();
    }
}
