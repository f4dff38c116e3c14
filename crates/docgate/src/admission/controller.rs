//! Admission controller: blocking, cancellable access to the permit pool.

use std::num::NonZeroUsize;
use std::sync::{Mutex as StdMutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::pool::{Permit, PermitPool, PoolSnapshot, Take};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AdmissionError {
    #[error("Admission cancelled by caller")]
    Cancelled,
    #[error("Admission wait exceeded {0:?}")]
    TimedOut(Duration),
    #[error("Admission controller closed")]
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TryAcquireError {
    #[error("No permits left in the current window")]
    Denied,
    #[error("Admission controller closed")]
    Closed,
}

/// Enforces "at most `capacity` admissions per window" for concurrent callers.
///
/// Capacity is replenished only by [`Scheduler`](crate::scheduler::Scheduler)
/// boundary events, which reset the pool to full and wake every waiter.
/// Waiters are not served in FIFO order: each one re-checks the pool when
/// woken and whoever takes the lock first gets the permit.
#[derive(Debug)]
pub struct AdmissionController {
    pool: StdMutex<PermitPool>,
    boundary: Notify,
    max_wait: Option<Duration>,
    started_at: Instant,
}

impl AdmissionController {
    /// # Panics
    ///
    /// Panics if `window` is zero.
    pub fn new(capacity: NonZeroUsize, window: Duration) -> Self {
        assert!(!window.is_zero(), "admission window must be non-zero");
        let started_at = Instant::now();
        Self {
            pool: StdMutex::new(PermitPool::new(capacity, window, started_at)),
            boundary: Notify::new(),
            max_wait: None,
            started_at,
        }
    }

    /// Bound how long `acquire` may wait before giving up.
    pub fn with_max_wait(mut self, max_wait: Option<Duration>) -> Self {
        self.max_wait = max_wait;
        self
    }

    // Nothing panics while the lock is held, so a poisoned pool is still consistent.
    fn lock(&self) -> MutexGuard<'_, PermitPool> {
        self.pool.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn capacity(&self) -> usize {
        self.lock().capacity()
    }

    pub fn window(&self) -> Duration {
        self.lock().window()
    }

    pub fn max_wait(&self) -> Option<Duration> {
        self.max_wait
    }

    /// Instant the first window started; boundaries are measured from here.
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        self.lock().snapshot()
    }

    /// Take a permit without waiting.
    pub fn try_acquire(&self) -> Result<Permit, TryAcquireError> {
        let taken = self.lock().take(Instant::now());
        match taken {
            Take::Granted(permit) => Ok(permit),
            Take::Exhausted => Err(TryAcquireError::Denied),
            Take::Closed => Err(TryAcquireError::Closed),
        }
    }

    /// Wait for a permit.
    ///
    /// Dropping the returned future abandons the wait without consuming
    /// anything.
    pub async fn acquire(&self) -> Result<Permit, AdmissionError> {
        self.acquire_with_cancel(&CancellationToken::new()).await
    }

    /// Wait for a permit until one is granted, `cancel` fires, the configured
    /// `max_wait` elapses, or the controller closes.
    pub async fn acquire_with_cancel(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Permit, AdmissionError> {
        match self.max_wait {
            Some(limit) => tokio::time::timeout(limit, self.wait_for_permit(cancel))
                .await
                .unwrap_or(Err(AdmissionError::TimedOut(limit))),
            None => self.wait_for_permit(cancel).await,
        }
    }

    async fn wait_for_permit(&self, cancel: &CancellationToken) -> Result<Permit, AdmissionError> {
        loop {
            if cancel.is_cancelled() {
                return Err(AdmissionError::Cancelled);
            }

            // Created before the pool check: notify_waiters reaches every
            // Notified that exists when it is called, so a reset landing
            // between the check and the select below still wakes us.
            let boundary = self.boundary.notified();

            let taken = self.lock().take(Instant::now());
            match taken {
                Take::Granted(permit) => return Ok(permit),
                Take::Closed => return Err(AdmissionError::Closed),
                Take::Exhausted => {}
            }

            tokio::select! {
                _ = boundary => {}
                _ = cancel.cancelled() => return Err(AdmissionError::Cancelled),
            }
        }
    }

    /// Give a permit back before its window ends.
    ///
    /// Ignored for permits granted before the latest reset. Returns whether
    /// capacity was restored.
    pub fn release(&self, permit: Permit) -> bool {
        let restored = self.lock().give_back(permit);
        if restored {
            self.boundary.notify_waiters();
        }
        restored
    }

    /// Reset the pool to full capacity and wake all waiters.
    pub(crate) fn on_window_boundary(&self) -> u64 {
        let (generation, available) = {
            let mut pool = self.lock();
            let generation = pool.reset(Instant::now());
            (generation, pool.available())
        };
        self.boundary.notify_waiters();
        tracing::trace!(generation, available, "Window boundary, permits reset");
        generation
    }

    /// Stop granting permits. Current and future waiters get
    /// [`AdmissionError::Closed`].
    pub fn close(&self) {
        let newly_closed = self.lock().close();
        self.boundary.notify_waiters();
        if newly_closed {
            tracing::info!("Admission controller closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.lock().snapshot().closed
    }
}
