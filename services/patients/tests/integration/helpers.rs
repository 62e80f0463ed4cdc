use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeZone, Utc};
use tokio::sync::Notify;

use clinic_domain::id::{OutboxEntryId, PatientId};
use clinic_domain::outbox::{OutboxChannel, OutboxStatus};
use clinic_patients::domain::repository::{MailTransport, OutboxRepository, PatientRepository};
use clinic_patients::domain::types::{EmailMessage, OutboxEntry, Patient};
use clinic_patients::error::{MailError, PatientsServiceError};

// ── InMemoryStore ────────────────────────────────────────────────────────────

#[derive(Default)]
struct Tables {
    patients: Vec<Patient>,
    outbox: Vec<OutboxEntry>,
}

#[derive(Default)]
struct StoreInner {
    tables: Mutex<Tables>,
    fail_outbox_insert: AtomicBool,
    fail_updates: AtomicBool,
    find_pending_calls: AtomicUsize,
    gate: Mutex<Option<Arc<Notify>>>,
}

/// Both repositories over shared in-memory tables. Clones share state, so a
/// test can hand one clone to the code under test and inspect another.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<StoreInner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the outbox insert of the next registrations fail, rolling back
    /// the patient insert with it.
    pub fn fail_outbox_insert(&self) {
        self.inner.fail_outbox_insert.store(true, Ordering::SeqCst);
    }

    /// Make `mark_sent` / `mark_failed` return a store error.
    pub fn fail_updates(&self, fail: bool) {
        self.inner.fail_updates.store(fail, Ordering::SeqCst);
    }

    /// Block every `find_pending` call until the returned gate is notified.
    pub fn gate_find_pending(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.inner.gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    pub fn find_pending_calls(&self) -> usize {
        self.inner.find_pending_calls.load(Ordering::SeqCst)
    }

    pub fn patients(&self) -> Vec<Patient> {
        self.inner.tables.lock().unwrap().patients.clone()
    }

    pub fn outbox(&self) -> Vec<OutboxEntry> {
        self.inner.tables.lock().unwrap().outbox.clone()
    }

    pub fn entry(&self, id: OutboxEntryId) -> OutboxEntry {
        self.outbox()
            .into_iter()
            .find(|e| e.id == id)
            .expect("outbox entry exists")
    }

    pub fn count_with_status(&self, status: OutboxStatus) -> usize {
        self.outbox().iter().filter(|e| e.status == status).count()
    }

    /// Insert a pending entry directly, bypassing registration.
    pub fn seed_pending(
        &self,
        channel: OutboxChannel,
        to: &str,
        created_at: DateTime<Utc>,
    ) -> OutboxEntryId {
        let entry = OutboxEntry::pending(
            PatientId::generate(),
            channel,
            to.to_owned(),
            Some("Patient registration confirmed".to_owned()),
            format!("Hi {to},"),
            created_at,
        );
        let id = entry.id;
        self.inner.tables.lock().unwrap().outbox.push(entry);
        id
    }

    fn update(
        &self,
        id: OutboxEntryId,
        apply: impl FnOnce(&mut OutboxEntry),
    ) -> Result<(), PatientsServiceError> {
        if self.inner.fail_updates.load(Ordering::SeqCst) {
            return Err(anyhow::anyhow!("store unavailable").into());
        }
        let mut tables = self.inner.tables.lock().unwrap();
        if let Some(entry) = tables.outbox.iter_mut().find(|e| e.id == id) {
            apply(entry);
        }
        Ok(())
    }
}

impl PatientRepository for InMemoryStore {
    async fn create_with_outbox(
        &self,
        patient: &Patient,
        entry: &OutboxEntry,
    ) -> Result<(), PatientsServiceError> {
        let mut tables = self.inner.tables.lock().unwrap();
        if tables.patients.iter().any(|p| p.email == patient.email) {
            return Err(PatientsServiceError::DuplicateEmail);
        }
        if self.inner.fail_outbox_insert.load(Ordering::SeqCst) {
            return Err(anyhow::anyhow!("outbox insert failed").into());
        }
        tables.patients.push(patient.clone());
        tables.outbox.push(entry.clone());
        Ok(())
    }

    async fn list_newest_first(&self) -> Result<Vec<Patient>, PatientsServiceError> {
        let mut patients = self.patients();
        patients.reverse();
        Ok(patients)
    }
}

impl OutboxRepository for InMemoryStore {
    async fn find_pending(
        &self,
        channels: &[OutboxChannel],
        limit: u64,
    ) -> Result<Vec<OutboxEntry>, PatientsServiceError> {
        self.inner.find_pending_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.inner.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let mut pending: Vec<OutboxEntry> = self
            .outbox()
            .into_iter()
            .filter(|e| e.status == OutboxStatus::Pending && channels.contains(&e.channel))
            .collect();
        pending.sort_by_key(|e| e.created_at);
        pending.truncate(limit as usize);
        Ok(pending)
    }

    async fn mark_sent(
        &self,
        id: OutboxEntryId,
        sent_at: DateTime<Utc>,
    ) -> Result<(), PatientsServiceError> {
        self.update(id, |e| {
            e.status = OutboxStatus::Sent;
            e.sent_at = Some(sent_at);
            e.error = None;
        })
    }

    async fn mark_failed(&self, id: OutboxEntryId, error: &str) -> Result<(), PatientsServiceError> {
        let error = error.to_owned();
        self.update(id, |e| {
            e.status = OutboxStatus::Failed;
            e.error = Some(error);
        })
    }
}

// ── ScriptedMailer ───────────────────────────────────────────────────────────

#[derive(Default)]
struct MailerInner {
    attempts: Mutex<Vec<String>>,
    delivered: Mutex<Vec<EmailMessage>>,
    failures: Mutex<HashMap<String, String>>,
}

/// Records every send attempt; fails for recipients registered with
/// [`fail_for`](Self::fail_for).
#[derive(Clone, Default)]
pub struct ScriptedMailer {
    inner: Arc<MailerInner>,
}

impl ScriptedMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(&self, to: &str, reason: &str) {
        self.inner
            .failures
            .lock()
            .unwrap()
            .insert(to.to_owned(), reason.to_owned());
    }

    /// Recipients in the order sends were attempted.
    pub fn attempts(&self) -> Vec<String> {
        self.inner.attempts.lock().unwrap().clone()
    }

    pub fn delivered(&self) -> Vec<EmailMessage> {
        self.inner.delivered.lock().unwrap().clone()
    }
}

impl MailTransport for ScriptedMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        self.inner.attempts.lock().unwrap().push(message.to.clone());
        let failure = self.inner.failures.lock().unwrap().get(&message.to).cloned();
        if let Some(reason) = failure {
            return Err(MailError::Transport(reason));
        }
        self.inner.delivered.lock().unwrap().push(message.clone());
        Ok(())
    }
}

// ── Fixtures ─────────────────────────────────────────────────────────────────

/// Fixed base instant; add offsets to get ordered `created_at` values.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

pub fn at(seconds: i64) -> DateTime<Utc> {
    t0() + Duration::seconds(seconds)
}

/// Yield until `cond` holds; panics after many rounds so a broken test fails
/// instead of hanging.
pub async fn wait_until(mut cond: impl FnMut() -> bool) {
    for _ in 0..10_000 {
        if cond() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}
