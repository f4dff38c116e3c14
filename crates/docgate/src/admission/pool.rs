//! Fixed-window permit pool.
//!
//! The pool is one counter bounded in `[0, capacity]`. It never awaits and is
//! only reached through the controller's mutex, so every transition below is
//! atomic with respect to callers and the scheduler.

use std::num::NonZeroUsize;
use std::time::Duration;

use tokio::time::Instant;

/// Proof that one admission was granted.
///
/// A permit is spent the moment it is granted: dropping it does not give the
/// capacity back. Hand it to [`RequestGateway::dispatch`] or return it early
/// with [`AdmissionController::release`].
///
/// [`RequestGateway::dispatch`]: crate::gateway::RequestGateway::dispatch
/// [`AdmissionController::release`]: crate::admission::AdmissionController::release
#[must_use = "a granted permit counts against the window even if unused"]
#[derive(Debug)]
pub struct Permit {
    generation: u64,
    granted_at: Instant,
}

impl Permit {
    pub(crate) fn new(generation: u64, granted_at: Instant) -> Self {
        Self {
            generation,
            granted_at,
        }
    }

    /// Window generation this permit was granted in.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn granted_at(&self) -> Instant {
        self.granted_at
    }
}

/// Outcome of a single take attempt.
#[derive(Debug)]
pub(crate) enum Take {
    Granted(Permit),
    Exhausted,
    Closed,
}

/// Point-in-time view of the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSnapshot {
    pub capacity: usize,
    pub available: usize,
    pub window: Duration,
    /// Number of window boundaries seen so far.
    pub generation: u64,
    pub last_reset: Instant,
    pub closed: bool,
}

impl PoolSnapshot {
    /// All permits of the current window are spent.
    pub fn is_exhausted(&self) -> bool {
        self.available == 0
    }
}

#[derive(Debug)]
pub(crate) struct PermitPool {
    capacity: usize,
    window: Duration,
    available: usize,
    generation: u64,
    last_reset: Instant,
    closed: bool,
}

impl PermitPool {
    pub fn new(capacity: NonZeroUsize, window: Duration, now: Instant) -> Self {
        Self {
            capacity: capacity.get(),
            window,
            available: capacity.get(),
            generation: 0,
            last_reset: now,
            closed: false,
        }
    }

    pub fn take(&mut self, now: Instant) -> Take {
        if self.closed {
            return Take::Closed;
        }
        if self.available == 0 {
            return Take::Exhausted;
        }
        self.available -= 1;
        Take::Granted(Permit::new(self.generation, now))
    }

    /// Return a permit granted in the current window.
    ///
    /// Permits from an earlier generation were already covered by the reset
    /// and are ignored. Returns whether capacity was actually given back.
    pub fn give_back(&mut self, permit: Permit) -> bool {
        if self.closed || permit.generation != self.generation {
            return false;
        }
        if self.available >= self.capacity {
            return false;
        }
        self.available += 1;
        true
    }

    /// Start a new window: full capacity, next generation.
    pub fn reset(&mut self, now: Instant) -> u64 {
        self.available = self.capacity;
        self.generation += 1;
        self.last_reset = now;
        self.generation
    }

    /// Returns false if the pool was already closed.
    pub fn close(&mut self) -> bool {
        !std::mem::replace(&mut self.closed, true)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        self.available
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            capacity: self.capacity,
            available: self.available,
            window: self.window,
            generation: self.generation,
            last_reset: self.last_reset,
            closed: self.closed,
        }
    }
}
