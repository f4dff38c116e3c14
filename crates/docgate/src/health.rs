//! Health status of the gate.

use serde::{Deserialize, Serialize};

use crate::admission::PoolSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Health {
    /// Permits left in the current window
    Ready,
    /// Every permit of the current window is spent; callers wait for the boundary
    Exhausted,
    /// Shut down, no more admissions
    Closed,
}

impl Health {
    pub fn from_snapshot(snapshot: &PoolSnapshot) -> Self {
        if snapshot.closed {
            Health::Closed
        } else if snapshot.is_exhausted() {
            Health::Exhausted
        } else {
            Health::Ready
        }
    }
}
