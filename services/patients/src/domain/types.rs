use chrono::{DateTime, Utc};
use clinic_domain::id::{OutboxEntryId, PatientId};
use clinic_domain::outbox::{OutboxChannel, OutboxStatus};

/// Registered patient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patient {
    pub id: PatientId,
    pub full_name: String,
    /// Always lowercase.
    pub email: String,
    pub phone_country_code: String,
    pub phone_number: String,
    /// Path relative to the uploads root, e.g. `documents/<file>.jpg`.
    pub document_photo_path: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Message waiting in (or delivered from) the outbox.
///
/// `to`, `subject` and `body` are a snapshot taken at enqueue time; later
/// changes to the patient do not affect them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboxEntry {
    pub id: OutboxEntryId,
    pub patient_id: PatientId,
    pub channel: OutboxChannel,
    pub to: String,
    pub subject: Option<String>,
    pub body: String,
    pub status: OutboxStatus,
    /// Last delivery error; only set when `status` is `Failed`.
    pub error: Option<String>,
    /// Only set when `status` is `Sent`.
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl OutboxEntry {
    /// A fresh entry: pending, never attempted.
    pub fn pending(
        patient_id: PatientId,
        channel: OutboxChannel,
        to: String,
        subject: Option<String>,
        body: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: OutboxEntryId::generate(),
            patient_id,
            channel,
            to,
            subject,
            body,
            status: OutboxStatus::Pending,
            error: None,
            sent_at: None,
            created_at,
        }
    }
}

/// What the mail transport is asked to deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: Option<String>,
    pub body: String,
}

impl From<&OutboxEntry> for EmailMessage {
    fn from(entry: &OutboxEntry) -> Self {
        Self {
            to: entry.to.clone(),
            subject: entry.subject.clone(),
            body: entry.body.clone(),
        }
    }
}

/// Maximum number of pending entries a single worker cycle picks up.
pub const OUTBOX_BATCH_SIZE: u64 = 10;

/// Default delay between worker cycles, in milliseconds.
pub const OUTBOX_POLL_INTERVAL_MS: u64 = 5000;

/// Upper bound for an uploaded document photo.
pub const MAX_DOCUMENT_PHOTO_BYTES: usize = 5 * 1024 * 1024;
