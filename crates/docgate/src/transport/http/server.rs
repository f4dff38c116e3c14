//! HTTP server lifecycle.
//!
//! Stopping happens in two steps. When a stop is requested the admission
//! controller closes first, so handlers parked in `acquire` answer 503 and
//! axum's connection drain can complete. Once axum returns, the window
//! scheduler is stopped and awaited.

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::service::SubmissionService;

use super::routes::routes;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopReason {
    Interrupt,
    Terminate,
    Requested,
}

/// Bind `config.host:config.port` and serve until stopped.
pub async fn serve(config: ServerConfig, service: Arc<SubmissionService>) -> anyhow::Result<()> {
    let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
    serve_on(listener, service).await
}

/// Serve on an already bound listener until SIGINT, SIGTERM or
/// `POST /shutdown`, then tear the service down.
pub async fn serve_on(listener: TcpListener, service: Arc<SubmissionService>) -> anyhow::Result<()> {
    info!(addr = %listener.local_addr()?, "docgate listening");

    let close_admission = {
        let service = Arc::clone(&service);
        let requested = service.shutdown_rx();
        async move {
            let reason = stop_requested(requested).await;
            info!(?reason, "Stopping: closing admission and draining requests");
            service.controller().close();
        }
    };

    axum::serve(listener, routes(Arc::clone(&service)))
        .with_graceful_shutdown(close_admission)
        .await?;

    service.shutdown().await;
    info!("docgate stopped");
    Ok(())
}

async fn stop_requested(mut requested: watch::Receiver<bool>) -> StopReason {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "SIGINT handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    // The sender lives in the service, which outlives this future.
    let explicit = async {
        let signalled = requested.wait_for(|stop| *stop).await.is_ok();
        if !signalled {
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        _ = interrupt => StopReason::Interrupt,
        _ = terminate => StopReason::Terminate,
        _ = explicit => StopReason::Requested,
    }
}
