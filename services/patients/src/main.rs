use std::sync::Arc;

use anyhow::Context as _;
use sea_orm::Database;
use tracing::{info, warn};

use clinic_core::tracing::init_tracing;
use clinic_patients::config::PatientsConfig;
use clinic_patients::infra::mailer::SmtpMailer;
use clinic_patients::infra::storage::LocalPhotoStorage;
use clinic_patients::lifecycle::{shutdown_signal, stop_worker_on_shutdown};
use clinic_patients::router::build_router;
use clinic_patients::state::AppState;
use clinic_patients::worker::OutboxWorker;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            return Err(e).context("failed to read .env");
        }
    }
    init_tracing("info");

    let config = PatientsConfig::from_env().context("invalid configuration")?;

    let db = Database::connect(&config.database_url)
        .await
        .context("failed to connect to database")?;

    let photos = LocalPhotoStorage::new(&config.uploads_dir);
    photos.ensure_dirs().await?;

    let mailer = SmtpMailer::new(&config.mail).context("invalid mail configuration")?;
    match mailer.verify().await {
        Ok(()) => info!(host = %config.mail.host, "smtp connection verified"),
        Err(e) => warn!(host = %config.mail.host, error = %e, "smtp connection check failed"),
    }

    let state = AppState { db, photos };

    let worker = Arc::new(OutboxWorker::new(state.outbox_repo(), mailer));
    let worker_handle = Arc::new(worker.start(config.outbox_poll_interval));

    let router = build_router(state);
    let addr = format!("0.0.0.0:{}", config.patients_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!("patients service listening on {addr}");
    axum::serve(listener, router)
        .with_graceful_shutdown(stop_worker_on_shutdown(shutdown_signal(), worker_handle))
        .await
        .context("server error")?;

    info!("patients service stopped");
    Ok(())
}
