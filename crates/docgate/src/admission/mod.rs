//! Admission control for outbound submissions.
//!
//! A fixed window rate limit:
//! - `PermitPool` holds one counter in `[0, capacity]`
//! - `AdmissionController` serializes access to it and parks waiters
//! - the scheduler resets the pool to full capacity at every window boundary
//!
//! A granted `Permit` is spent for its window no matter what the submission
//! does afterwards. Capacity comes back only with the next boundary (or an
//! explicit `release` within the same window).

mod controller;
mod pool;

pub use controller::{AdmissionController, AdmissionError, TryAcquireError};
pub use pool::{Permit, PoolSnapshot};
