//! Per-room turn timer.
//!
//! One [`TurnTimer`] lives inside each room actor. While unarmed,
//! [`TurnTimer::expired`] pends forever, so it can sit in the actor's
//! `tokio::select!` loop without firing spuriously; while armed it
//! resolves once, at the deadline, and disarms itself.
//!
//! Arming always replaces any previous deadline, and because the actor
//! owns the timer exclusively there is never more than one live
//! countdown per room — cancellation cannot race a player action.
//!
//! # Integration
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* player actions */ }
//!         _ = timer.expired() => { /* auto-roll / auto-move */ }
//!     }
//! }
//! ```

use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::trace;

/// A one-shot countdown that pends forever while unarmed.
#[derive(Debug)]
pub struct TurnTimer {
    duration: Duration,
    deadline: Option<Instant>,
}

impl TurnTimer {
    /// Creates an unarmed timer with the given countdown length.
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            deadline: None,
        }
    }

    /// The configured countdown length.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Whether a countdown is currently running.
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Starts (or restarts) the countdown from now.
    ///
    /// Any previous deadline is replaced — at most one countdown is ever
    /// live.
    pub fn arm(&mut self) {
        self.deadline = Some(Instant::now() + self.duration);
        trace!(duration_ms = self.duration.as_millis() as u64, "timer armed");
    }

    /// Stops the countdown without firing.
    ///
    /// Idempotent; cancelling an unarmed timer is a no-op.
    pub fn cancel(&mut self) {
        if self.deadline.take().is_some() {
            trace!("timer cancelled");
        }
    }

    /// Resolves when the countdown expires, disarming the timer.
    ///
    /// While unarmed this future never completes — `tokio::select!`
    /// keeps servicing its other branches.
    pub async fn expired(&mut self) {
        match self.deadline {
            Some(deadline) => {
                time::sleep_until(deadline).await;
                self.deadline = None;
                trace!("timer expired");
            }
            None => {
                // Never completes; select! handles other branches.
                std::future::pending::<()>().await;
                unreachable!()
            }
        }
    }
}
