//! SubmissionService: the gate as one object.
//!
//! This service owns:
//! - the admission controller (permit pool)
//! - the window scheduler task
//! - the request gateway
//! - shutdown coordination for transports
//!
//! `submit` is acquire-then-dispatch. The permit is taken under the pool lock
//! and the lock is released before any network I/O starts.

use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::admission::{AdmissionController, PoolSnapshot};
use crate::config::{ConfigError, GateConfig};
use crate::document::Document;
use crate::gateway::RequestGateway;
use crate::scheduler::Scheduler;
use crate::submission::{Accepted, SubmissionError, SubmissionRequest};
use crate::version::VersionInfo;

pub struct SubmissionService {
    controller: Arc<AdmissionController>,
    gateway: RequestGateway,

    scheduler: StdMutex<Option<JoinHandle<()>>>,
    scheduler_shutdown: CancellationToken,

    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,

    version: VersionInfo,
}

impl SubmissionService {
    /// Build the gate from configuration and start its scheduler.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(config: &GateConfig) -> Result<Self, ConfigError> {
        let controller = AdmissionController::new(config.capacity, config.window)
            .with_max_wait(config.max_wait);
        let gateway = RequestGateway::new(config.endpoint.clone(), &config.gateway)?;

        tracing::info!(
            endpoint = %config.endpoint,
            capacity = config.capacity.get(),
            window_ms = config.window.as_millis() as u64,
            "Starting submission gate"
        );

        Ok(Self::from_parts(controller, gateway))
    }

    /// Assemble from prebuilt parts and start the scheduler for `controller`.
    ///
    /// The service takes sole ownership of the controller, so it is driven by
    /// exactly one scheduler. Must be called from within a tokio runtime.
    pub fn from_parts(controller: AdmissionController, gateway: RequestGateway) -> Self {
        let controller = Arc::new(controller);
        let scheduler_shutdown = CancellationToken::new();
        let handle = Scheduler::for_controller(&controller)
            .spawn(Arc::clone(&controller), scheduler_shutdown.clone());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let version = VersionInfo::new().with_endpoint(gateway.endpoint().to_string());

        Self {
            controller,
            gateway,
            scheduler: StdMutex::new(Some(handle)),
            scheduler_shutdown,
            shutdown_tx,
            shutdown_rx,
            version,
        }
    }

    pub fn controller(&self) -> &Arc<AdmissionController> {
        &self.controller
    }

    pub fn gateway(&self) -> &RequestGateway {
        &self.gateway
    }

    pub fn version(&self) -> &VersionInfo {
        &self.version
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        self.controller.snapshot()
    }

    /// Wait for admission, then send the request once.
    pub async fn submit<T: Serialize>(
        &self,
        request: &SubmissionRequest<T>,
    ) -> Result<Accepted, SubmissionError> {
        self.submit_with_cancel(request, &CancellationToken::new())
            .await
    }

    /// Like [`submit`](Self::submit), but the admission wait also ends when
    /// `cancel` fires. Once admitted, the request is sent regardless.
    pub async fn submit_with_cancel<T: Serialize>(
        &self,
        request: &SubmissionRequest<T>,
        cancel: &CancellationToken,
    ) -> Result<Accepted, SubmissionError> {
        let submission_id = request.id();

        let permit = self
            .controller
            .acquire_with_cancel(cancel)
            .await
            .inspect_err(|e| {
                tracing::debug!(%submission_id, error = %e, "Submission not admitted");
            })?;

        self.gateway.dispatch(permit, request).await
    }

    /// Register one document, signed with `signature`.
    pub async fn create_document(
        &self,
        document: &Document,
        signature: &str,
    ) -> Result<Accepted, SubmissionError> {
        let request = SubmissionRequest::new(document, signature);
        self.submit(&request).await
    }

    /// Stop the scheduler and close the controller.
    ///
    /// Blocked submitters are released with a closed-admission error.
    pub async fn shutdown(&self) {
        self.scheduler_shutdown.cancel();
        self.controller.close();

        let handle = self
            .scheduler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle
            && let Err(e) = handle.await
        {
            tracing::warn!(error = %e, "Window scheduler task failed");
        }
    }

    pub fn trigger_shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    pub fn shutdown_rx(&self) -> watch::Receiver<bool> {
        self.shutdown_rx.clone()
    }
}

impl Drop for SubmissionService {
    fn drop(&mut self) {
        self.scheduler_shutdown.cancel();
        self.controller.close();
    }
}
