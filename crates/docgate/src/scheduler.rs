//! Window boundary scheduler.
//!
//! Fixed-rate: boundary `n` lands at `start + n * period` no matter how long
//! earlier boundaries took to process. A boundary that is missed entirely is
//! skipped, not replayed.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::admission::AdmissionController;

#[derive(Debug, Clone, Copy)]
pub struct Scheduler {
    start: Instant,
    period: Duration,
}

impl Scheduler {
    /// # Panics
    ///
    /// Panics if `period` is zero.
    pub fn new(start: Instant, period: Duration) -> Self {
        assert!(!period.is_zero(), "scheduler period must be non-zero");
        Self { start, period }
    }

    /// Scheduler aligned to the controller's start instant and window.
    pub fn for_controller(controller: &AdmissionController) -> Self {
        Self::new(controller.started_at(), controller.window())
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Instant of the `n`th boundary (the first one is `n = 1`).
    pub fn boundary(&self, n: u32) -> Instant {
        self.start + self.period * n
    }

    /// Only one scheduler may drive a controller; a second one would
    /// interleave its resets with the first.
    pub(crate) fn spawn(
        self,
        controller: Arc<AdmissionController>,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(self.run(controller, shutdown))
    }

    /// Drive boundaries until `shutdown` fires.
    ///
    /// A single loop owns the ticker, so boundary handling never overlaps.
    pub(crate) async fn run(self, controller: Arc<AdmissionController>, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval_at(self.boundary(1), self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::debug!(period_ms = self.period.as_millis() as u64, "Window scheduler started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::debug!("Window scheduler stopped");
                    return;
                }
                _ = ticker.tick() => {
                    controller.on_window_boundary();
                }
            }
        }
    }
}
