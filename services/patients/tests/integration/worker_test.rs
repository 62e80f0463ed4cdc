use std::sync::Arc;
use std::time::Duration;

use clinic_domain::outbox::{OutboxChannel, OutboxStatus};
use clinic_patients::lifecycle::stop_worker_on_shutdown;
use clinic_patients::worker::{CycleReport, CycleStats, OutboxWorker, UNKNOWN_DELIVERY_ERROR};

use crate::helpers::{InMemoryStore, ScriptedMailer, at, wait_until};

fn worker(
    store: &InMemoryStore,
    mailer: &ScriptedMailer,
) -> OutboxWorker<InMemoryStore, ScriptedMailer> {
    OutboxWorker::new(store.clone(), mailer.clone())
}

fn completed(report: CycleReport) -> CycleStats {
    match report {
        CycleReport::Completed(stats) => stats,
        CycleReport::Skipped => panic!("expected a completed cycle"),
    }
}

// ── run_cycle ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_mark_delivered_entry_sent_and_never_revisit_it() {
    let store = InMemoryStore::new();
    let mailer = ScriptedMailer::new();
    let id = store.seed_pending(OutboxChannel::Email, "jane@gmail.com", at(0));
    let worker = worker(&store, &mailer);

    let stats = completed(worker.run_cycle().await.unwrap());
    assert_eq!(stats.sent, 1);

    let entry = store.entry(id);
    assert_eq!(entry.status, OutboxStatus::Sent);
    assert!(entry.sent_at.is_some());
    assert!(entry.error.is_none());

    let stats = completed(worker.run_cycle().await.unwrap());
    assert_eq!(stats, CycleStats::default());
    assert_eq!(mailer.attempts(), ["jane@gmail.com"]);
}

#[tokio::test]
async fn should_isolate_delivery_failures_within_a_batch() {
    let store = InMemoryStore::new();
    let mailer = ScriptedMailer::new();
    let a = store.seed_pending(OutboxChannel::Email, "a@gmail.com", at(0));
    let b = store.seed_pending(OutboxChannel::Email, "b@gmail.com", at(1));
    let c = store.seed_pending(OutboxChannel::Email, "c@gmail.com", at(2));
    mailer.fail_for("b@gmail.com", "SMTP 550");

    let stats = completed(worker(&store, &mailer).run_cycle().await.unwrap());

    assert_eq!(
        stats,
        CycleStats {
            fetched: 3,
            sent: 2,
            failed: 1,
        }
    );
    assert_eq!(store.entry(a).status, OutboxStatus::Sent);
    let failed = store.entry(b);
    assert_eq!(failed.status, OutboxStatus::Failed);
    assert_eq!(failed.error.as_deref(), Some("SMTP 550"));
    assert!(failed.sent_at.is_none());
    assert_eq!(store.entry(c).status, OutboxStatus::Sent);
}

#[tokio::test]
async fn should_not_retry_failed_entries() {
    let store = InMemoryStore::new();
    let mailer = ScriptedMailer::new();
    store.seed_pending(OutboxChannel::Email, "b@gmail.com", at(0));
    mailer.fail_for("b@gmail.com", "SMTP 550");
    let worker = worker(&store, &mailer);

    worker.run_cycle().await.unwrap();
    let stats = completed(worker.run_cycle().await.unwrap());

    assert_eq!(stats.fetched, 0);
    assert_eq!(mailer.attempts().len(), 1);
}

#[tokio::test]
async fn should_record_fallback_when_transport_error_is_empty() {
    let store = InMemoryStore::new();
    let mailer = ScriptedMailer::new();
    let id = store.seed_pending(OutboxChannel::Email, "a@gmail.com", at(0));
    mailer.fail_for("a@gmail.com", "");

    worker(&store, &mailer).run_cycle().await.unwrap();

    let entry = store.entry(id);
    assert_eq!(entry.status, OutboxStatus::Failed);
    assert_eq!(entry.error.as_deref(), Some(UNKNOWN_DELIVERY_ERROR));
}

#[tokio::test]
async fn should_process_oldest_entries_first() {
    let store = InMemoryStore::new();
    let mailer = ScriptedMailer::new();
    store.seed_pending(OutboxChannel::Email, "third@gmail.com", at(30));
    store.seed_pending(OutboxChannel::Email, "first@gmail.com", at(10));
    store.seed_pending(OutboxChannel::Email, "second@gmail.com", at(20));

    worker(&store, &mailer).run_cycle().await.unwrap();

    assert_eq!(
        mailer.attempts(),
        ["first@gmail.com", "second@gmail.com", "third@gmail.com"]
    );
}

#[tokio::test]
async fn should_cap_each_cycle_at_ten_entries() {
    let store = InMemoryStore::new();
    let mailer = ScriptedMailer::new();
    for i in 0..15 {
        store.seed_pending(OutboxChannel::Email, &format!("p{i}@gmail.com"), at(i));
    }
    let worker = worker(&store, &mailer);

    let stats = completed(worker.run_cycle().await.unwrap());
    assert_eq!(stats.fetched, 10);
    assert_eq!(store.count_with_status(OutboxStatus::Sent), 10);
    assert_eq!(store.count_with_status(OutboxStatus::Pending), 5);
    assert_eq!(
        mailer.attempts().last().map(String::as_str),
        Some("p9@gmail.com")
    );

    let stats = completed(worker.run_cycle().await.unwrap());
    assert_eq!(stats.fetched, 5);
    assert_eq!(store.count_with_status(OutboxStatus::Pending), 0);
}

#[tokio::test]
async fn should_leave_unsupported_channels_pending() {
    let store = InMemoryStore::new();
    let mailer = ScriptedMailer::new();
    let sms = store.seed_pending(OutboxChannel::Sms, "+59899695828", at(0));
    let email = store.seed_pending(OutboxChannel::Email, "a@gmail.com", at(1));

    let stats = completed(worker(&store, &mailer).run_cycle().await.unwrap());

    assert_eq!(stats.fetched, 1);
    assert_eq!(stats.sent, 1);
    assert_eq!(store.entry(sms).status, OutboxStatus::Pending);
    assert_eq!(store.entry(email).status, OutboxStatus::Sent);
    assert_eq!(mailer.attempts(), ["a@gmail.com"]);
}

#[tokio::test]
async fn should_deliver_email_behind_a_full_batch_of_sms_entries() {
    let store = InMemoryStore::new();
    let mailer = ScriptedMailer::new();
    for i in 0..10 {
        store.seed_pending(OutboxChannel::Sms, &format!("+5989969582{i}"), at(i));
    }
    let email = store.seed_pending(OutboxChannel::Email, "late@gmail.com", at(60));

    let stats = completed(worker(&store, &mailer).run_cycle().await.unwrap());

    assert_eq!(stats.sent, 1);
    assert_eq!(store.entry(email).status, OutboxStatus::Sent);
    assert_eq!(store.count_with_status(OutboxStatus::Pending), 10);
}

#[tokio::test]
async fn should_release_guard_when_store_update_fails() {
    let store = InMemoryStore::new();
    let mailer = ScriptedMailer::new();
    let id = store.seed_pending(OutboxChannel::Email, "a@gmail.com", at(0));
    store.fail_updates(true);
    let worker = worker(&store, &mailer);

    let err = worker.run_cycle().await.unwrap_err();
    assert!(err.log_detail().contains("store unavailable"));
    assert!(!worker.is_busy());

    store.fail_updates(false);
    let stats = completed(worker.run_cycle().await.unwrap());
    assert_eq!(stats.sent, 1);
    assert_eq!(store.entry(id).status, OutboxStatus::Sent);
}

#[tokio::test]
async fn should_skip_cycle_while_another_is_running() {
    let store = InMemoryStore::new();
    let mailer = ScriptedMailer::new();
    store.seed_pending(OutboxChannel::Email, "a@gmail.com", at(0));
    let gate = store.gate_find_pending();
    let worker = Arc::new(worker(&store, &mailer));

    let running = tokio::spawn({
        let worker = Arc::clone(&worker);
        async move { worker.run_cycle().await }
    });
    wait_until(|| store.find_pending_calls() == 1).await;

    let overlapping = worker.run_cycle().await.unwrap();
    assert_eq!(overlapping, CycleReport::Skipped);
    assert_eq!(store.find_pending_calls(), 1);

    gate.notify_one();
    let stats = completed(running.await.unwrap().unwrap());
    assert_eq!(stats.sent, 1);
    assert!(!worker.is_busy());
}

// ── start / stop ─────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn should_poll_immediately_then_every_period_until_stopped() {
    let store = InMemoryStore::new();
    let mailer = ScriptedMailer::new();
    let worker = Arc::new(worker(&store, &mailer));

    let handle = worker.start(Duration::from_millis(5000));
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(store.find_pending_calls(), 1);

    tokio::time::sleep(Duration::from_millis(5000)).await;
    assert_eq!(store.find_pending_calls(), 2);

    handle.stop();
    assert!(handle.is_stopped());
    tokio::time::sleep(Duration::from_millis(20_000)).await;
    assert_eq!(store.find_pending_calls(), 2);
}

#[tokio::test]
async fn should_let_in_flight_cycle_finish_after_stop() {
    let store = InMemoryStore::new();
    let mailer = ScriptedMailer::new();
    let id = store.seed_pending(OutboxChannel::Email, "a@gmail.com", at(0));
    let gate = store.gate_find_pending();
    let worker = Arc::new(worker(&store, &mailer));

    let handle = Arc::clone(&worker).start(Duration::from_secs(3600));
    wait_until(|| store.find_pending_calls() == 1).await;
    handle.stop();

    gate.notify_one();
    wait_until(|| store.entry(id).status == OutboxStatus::Sent).await;
    assert!(!worker.is_busy());
}

#[tokio::test]
async fn should_stop_worker_when_shutdown_signal_fires() {
    let store = InMemoryStore::new();
    let mailer = ScriptedMailer::new();
    let worker = Arc::new(worker(&store, &mailer));
    let handle = Arc::new(worker.start(Duration::from_secs(3600)));
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    let shutdown = tokio::spawn(stop_worker_on_shutdown(
        async {
            let _ = rx.await;
        },
        Arc::clone(&handle),
    ));
    tokio::task::yield_now().await;
    assert!(!handle.is_stopped());

    tx.send(()).unwrap();
    shutdown.await.unwrap();
    assert!(handle.is_stopped());
}
