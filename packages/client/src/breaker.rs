use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use notes_common::limits::SERVER_RETRY_MS;
use tracing::{info, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::{CallError, CallResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
}

/// Two-state circuit breaker guarding the notes server.
///
/// A transport failure opens it. It closes again lazily: the first check made
/// at least `retry_ms` after it opened lets the call through. There is no
/// background timer.
pub struct CircuitBreaker {
    open: AtomicBool,
    opened_at: AtomicI64,
    retry_ms: i64,
    clock: Arc<dyn Clock>,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(SERVER_RETRY_MS, Arc::new(SystemClock))
    }
}

impl CircuitBreaker {
    pub fn new(retry_ms: i64, clock: Arc<dyn Clock>) -> Self {
        Self {
            open: AtomicBool::new(false),
            opened_at: AtomicI64::new(0),
            retry_ms,
            clock,
        }
    }

    /// Current state, closing the breaker first if its retry interval has passed.
    pub fn state(&self) -> BreakerState {
        if !self.open.load(Ordering::SeqCst) {
            return BreakerState::Closed;
        }

        let elapsed = self.clock.now_ms() - self.opened_at.load(Ordering::SeqCst);
        if elapsed >= self.retry_ms {
            if self.open.swap(false, Ordering::SeqCst) {
                info!("Retrying notes server after {elapsed} ms");
            }
            return BreakerState::Closed;
        }
        BreakerState::Open
    }

    pub fn is_open(&self) -> bool {
        self.state() == BreakerState::Open
    }

    /// Gate for an outgoing request.
    pub fn check(&self) -> CallResult<()> {
        match self.state() {
            BreakerState::Closed => Ok(()),
            BreakerState::Open => Err(CallError::Unreachable(
                "notes server marked unreachable".into(),
            )),
        }
    }

    /// Record a transport failure.
    pub fn trip(&self) {
        self.opened_at.store(self.clock.now_ms(), Ordering::SeqCst);
        if !self.open.swap(true, Ordering::SeqCst) {
            warn!(
                "Notes server unreachable, using local storage. Will retry in {}s",
                self.retry_ms / 1000
            );
        }
    }

    pub fn reset(&self) {
        self.open.store(false, Ordering::SeqCst);
    }
}
