#![allow(async_fn_in_trait)]

use std::future::Future;

use chrono::{DateTime, Utc};
use clinic_domain::id::OutboxEntryId;
use clinic_domain::outbox::OutboxChannel;

use crate::domain::types::{EmailMessage, OutboxEntry, Patient};
use crate::error::{MailError, PatientsServiceError};

/// Repository for patients.
pub trait PatientRepository: Send + Sync {
    /// Insert a patient and its first outbox entry in one transaction.
    ///
    /// Either both rows are written or neither is. A second patient with the
    /// same email fails with [`PatientsServiceError::DuplicateEmail`].
    async fn create_with_outbox(
        &self,
        patient: &Patient,
        entry: &OutboxEntry,
    ) -> Result<(), PatientsServiceError>;

    /// All patients, most recently registered first.
    async fn list_newest_first(&self) -> Result<Vec<Patient>, PatientsServiceError>;
}

/// Worker-side view of the outbox table.
///
/// Futures are `Send` because the worker runs cycles on spawned tasks.
pub trait OutboxRepository: Send + Sync {
    /// Up to `limit` pending entries on one of `channels`, oldest
    /// `created_at` first.
    ///
    /// Entries on other channels stay pending and do not take batch slots.
    fn find_pending(
        &self,
        channels: &[OutboxChannel],
        limit: u64,
    ) -> impl Future<Output = Result<Vec<OutboxEntry>, PatientsServiceError>> + Send;

    /// Set status `SENT` with `sent_at`, clearing any error.
    fn mark_sent(
        &self,
        id: OutboxEntryId,
        sent_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<(), PatientsServiceError>> + Send;

    /// Set status `FAILED` and record the delivery error.
    fn mark_failed(
        &self,
        id: OutboxEntryId,
        error: &str,
    ) -> impl Future<Output = Result<(), PatientsServiceError>> + Send;
}

/// Outbound mail capability.
pub trait MailTransport: Send + Sync {
    fn send(&self, message: &EmailMessage)
    -> impl Future<Output = Result<(), MailError>> + Send;
}
