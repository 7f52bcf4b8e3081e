//! Global minimum-interval throttle shared by every outbound call.

use parking_lot::Mutex;
use tokio::sync::Mutex as TurnLock;
use tokio::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
#[error("rate limiter wait was cancelled")]
pub struct Cancelled;

/// Keeps successive dispatches at least `min_interval` apart.
///
/// Waiters queue on a fair lock, so they are released in the order they
/// reached [`RateLimiter::acquire`]. Dropping an `acquire` future while it
/// waits gives up its place and leaves the last-dispatch timestamp untouched.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    turn: TurnLock<()>,
    last_request_at: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            turn: TurnLock::new(()),
            last_request_at: Mutex::new(None),
        }
    }

    /// Instant of the most recent dispatch, `None` before the first one.
    pub fn last_request_at(&self) -> Option<Instant> {
        *self.last_request_at.lock()
    }

    /// Wait until it is safe to dispatch, then claim the slot.
    pub async fn acquire(&self) {
        let _turn = self.turn.lock().await;

        let last = *self.last_request_at.lock();
        if let Some(wait) = last.and_then(|at| self.min_interval.checked_sub(at.elapsed())) {
            if !wait.is_zero() {
                debug!(wait_ms = wait.as_millis() as u64, "rate limit: delaying request");
                tokio::time::sleep(wait).await;
            }
        }

        *self.last_request_at.lock() = Some(Instant::now());
    }

    /// Like [`acquire`](Self::acquire), but gives up when `token` is cancelled.
    pub async fn acquire_cancellable(&self, token: &CancellationToken) -> Result<(), Cancelled> {
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(Cancelled),
            _ = self.acquire() => Ok(()),
        }
    }
}
