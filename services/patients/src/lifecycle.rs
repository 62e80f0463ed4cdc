use std::future::Future;
use std::sync::Arc;

use tracing::info;

use crate::worker::WorkerHandle;

/// Resolves on SIGINT (ctrl-c) or, on unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT"),
        _ = terminate => info!("received SIGTERM"),
    }
}

/// Wait for `signal`, stop the worker, then resolve.
///
/// Pass the result to `axum::serve(..).with_graceful_shutdown(..)` so the
/// worker timer is cleared before the listener starts draining.
pub async fn stop_worker_on_shutdown<S>(signal: S, worker: Arc<WorkerHandle>)
where
    S: Future<Output = ()>,
{
    signal.await;
    worker.stop();
    info!("shutting down http listener");
}
