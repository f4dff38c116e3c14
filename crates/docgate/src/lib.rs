//! docgate: rate-limited gateway for submitting documents to a registration service.

mod health;
mod version;

pub mod admission;
pub mod config;
pub mod document;
pub mod gateway;
pub mod scheduler;
pub mod service;
pub mod submission;
pub mod transport;

pub use admission::{AdmissionController, AdmissionError, Permit, PoolSnapshot, TryAcquireError};
pub use config::{ConfigError, DEFAULT_ENDPOINT, GateConfig};
pub use document::{Description, Document, Product};
pub use gateway::{GatewayConfig, RequestGateway};
pub use health::Health;
pub use scheduler::Scheduler;
pub use service::SubmissionService;
pub use submission::{Accepted, SubmissionError, SubmissionRequest};
pub use version::{DOCGATE_VERSION, VersionInfo};
