//! Outbox delivery worker.
//!
//! A timer task fires every poll interval and spawns one delivery cycle per
//! tick. Cycles never overlap: a tick that lands while the previous cycle is
//! still running is dropped.

mod guard;

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use clinic_domain::outbox::OutboxChannel;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info, warn};

pub use guard::{FlightGuard, SingleFlight};

use crate::domain::repository::{MailTransport, OutboxRepository};
use crate::domain::types::{EmailMessage, OUTBOX_BATCH_SIZE, OutboxEntry};
use crate::error::{MailError, PatientsServiceError};

/// Recorded on a failed entry when the transport gives no reason.
pub const UNKNOWN_DELIVERY_ERROR: &str = "Unknown error";

/// Channels the worker has a delivery handler for. Pending entries on any
/// other channel are never fetched, so they cannot crowd a batch.
pub const DELIVERABLE_CHANNELS: &[OutboxChannel] = &[OutboxChannel::Email];

/// Outcome of one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleReport {
    /// Another cycle held the flight; nothing was fetched.
    Skipped,
    Completed(CycleStats),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleStats {
    pub fetched: usize,
    pub sent: usize,
    pub failed: usize,
}

pub struct OutboxWorker<R, M> {
    repo: R,
    mailer: M,
    flight: SingleFlight,
    batch_size: u64,
}

impl<R, M> OutboxWorker<R, M>
where
    R: OutboxRepository + 'static,
    M: MailTransport + 'static,
{
    pub fn new(repo: R, mailer: M) -> Self {
        Self {
            repo,
            mailer,
            flight: SingleFlight::new(),
            batch_size: OUTBOX_BATCH_SIZE,
        }
    }

    /// `true` while a cycle holds the flight.
    pub fn is_busy(&self) -> bool {
        self.flight.is_running()
    }

    /// Deliver one batch of pending entries, oldest first.
    ///
    /// Entries are handled one after another; a delivery failure is recorded
    /// on that entry and the batch moves on. A store error aborts the cycle.
    pub async fn run_cycle(&self) -> Result<CycleReport, PatientsServiceError> {
        let Some(_flight) = self.flight.try_acquire() else {
            return Ok(CycleReport::Skipped);
        };

        let entries = self
            .repo
            .find_pending(DELIVERABLE_CHANNELS, self.batch_size)
            .await?;
        let mut stats = CycleStats {
            fetched: entries.len(),
            ..CycleStats::default()
        };

        for entry in &entries {
            match entry.channel {
                OutboxChannel::Email => {
                    if self.deliver_email(entry).await? {
                        stats.sent += 1;
                    } else {
                        stats.failed += 1;
                    }
                }
                channel => warn!(
                    outbox_id = %entry.id,
                    %channel,
                    "no delivery handler for channel, entry left pending"
                ),
            }
        }

        Ok(CycleReport::Completed(stats))
    }

    /// `Ok(true)` when sent, `Ok(false)` when the failure was recorded.
    async fn deliver_email(&self, entry: &OutboxEntry) -> Result<bool, PatientsServiceError> {
        let message = EmailMessage::from(entry);
        match self.mailer.send(&message).await {
            Ok(()) => {
                self.repo.mark_sent(entry.id, Utc::now()).await?;
                info!(outbox_id = %entry.id, patient_id = %entry.patient_id, "email sent");
                Ok(true)
            }
            Err(e) => {
                let reason = failure_reason(&e);
                self.repo.mark_failed(entry.id, &reason).await?;
                warn!(outbox_id = %entry.id, error = %reason, "email delivery failed");
                Ok(false)
            }
        }
    }

    /// Run one cycle and log its outcome.
    pub async fn tick(self: Arc<Self>) {
        match self.run_cycle().await {
            Ok(CycleReport::Skipped) => {
                debug!("outbox cycle skipped, previous cycle still running")
            }
            Ok(CycleReport::Completed(stats)) if stats.fetched == 0 => {}
            Ok(CycleReport::Completed(stats)) => info!(
                fetched = stats.fetched,
                sent = stats.sent,
                failed = stats.failed,
                "outbox cycle finished"
            ),
            Err(e) => error!(error = %e.log_detail(), "outbox cycle aborted"),
        }
    }

    /// Start polling: one cycle right away, then one every `period`.
    pub fn start(self: Arc<Self>, period: Duration) -> WorkerHandle {
        let timer = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                tokio::spawn(Arc::clone(&self).tick());
            }
        });
        info!(period_ms = period.as_millis() as u64, "outbox worker started");
        WorkerHandle {
            timer: Mutex::new(Some(timer)),
        }
    }
}

fn failure_reason(error: &MailError) -> String {
    let reason = error.to_string();
    if reason.trim().is_empty() {
        UNKNOWN_DELIVERY_ERROR.to_owned()
    } else {
        reason
    }
}

/// Controls a started worker.
#[derive(Debug)]
pub struct WorkerHandle {
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl WorkerHandle {
    /// Stop scheduling new cycles. A cycle already running finishes on its
    /// own. Calling this more than once is harmless.
    pub fn stop(&self) {
        let timer = self
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(timer) = timer {
            timer.abort();
            info!("outbox worker stopped");
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}
