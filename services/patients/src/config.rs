use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use clinic_core::config::{
    ConfigError, EnvSource, ProcessEnv, optional_or, optional_parsed, required, required_parsed,
};

use crate::domain::types::OUTBOX_POLL_INTERVAL_MS;

const DEFAULT_MAIL_FROM: &str = "Patient Registration <noreply@example.com>";

/// Patients service configuration loaded from environment variables.
#[derive(Debug)]
pub struct PatientsConfig {
    /// PostgreSQL connection URL. Env var: `DATABASE_URL`.
    pub database_url: String,
    /// TCP port to listen on (default 4000). Env var: `PATIENTS_PORT`.
    pub patients_port: u16,
    /// Root directory for uploaded files (default `uploads`). Env var: `UPLOADS_DIR`.
    pub uploads_dir: PathBuf,
    /// Delay between outbox worker cycles (default 5000 ms).
    /// Env var: `OUTBOX_POLL_INTERVAL_MS`.
    pub outbox_poll_interval: Duration,
    pub mail: MailConfig,
}

/// SMTP settings for confirmation emails.
pub struct MailConfig {
    /// Env var: `MAIL_HOST`.
    pub host: String,
    /// Env var: `MAIL_PORT`.
    pub port: u16,
    /// Env var: `MAIL_USER`.
    pub user: String,
    /// Env var: `MAIL_PASS`.
    pub pass: String,
    /// Sender mailbox (default `Patient Registration <noreply@example.com>`).
    /// Env var: `MAIL_FROM`.
    pub from: String,
}

impl fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("pass", &"<redacted>")
            .field("from", &self.from)
            .finish()
    }
}

impl PatientsConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(&ProcessEnv)
    }

    pub fn from_source<E: EnvSource + ?Sized>(env: &E) -> Result<Self, ConfigError> {
        let poll_ms: u64 = optional_parsed(env, "OUTBOX_POLL_INTERVAL_MS", OUTBOX_POLL_INTERVAL_MS)?;
        if poll_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "OUTBOX_POLL_INTERVAL_MS",
                value: "0".to_owned(),
            });
        }
        Ok(Self {
            database_url: required(env, "DATABASE_URL")?,
            patients_port: optional_parsed(env, "PATIENTS_PORT", 4000)?,
            uploads_dir: PathBuf::from(optional_or(env, "UPLOADS_DIR", "uploads")),
            outbox_poll_interval: Duration::from_millis(poll_ms),
            mail: MailConfig {
                host: required(env, "MAIL_HOST")?,
                port: required_parsed(env, "MAIL_PORT")?,
                user: required(env, "MAIL_USER")?,
                pass: required(env, "MAIL_PASS")?,
                from: optional_or(env, "MAIL_FROM", DEFAULT_MAIL_FROM),
            },
        })
    }
}
