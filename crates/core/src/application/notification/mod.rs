// Notification Scheduler - "queue is open" reminders and end-of-session clears
//
// Two independent timers:
// - tick (1 minute): check and send, then check and clear
// - purge (24 hours): ledger housekeeping
//
// Every subject is processed on its own; a subject with a bad schedule or a
// failing store call is logged and skipped without affecting the others.

pub mod constants;
mod ledger;

pub use constants::SchedulerConfig;
pub use ledger::{LedgerKey, NotificationLedger};

use crate::application::queue_store::QueueStore;
use crate::application::shutdown::ShutdownToken;
use crate::domain::{NotificationOpened, Occurrence, OutboundEvent, Subject, SubjectCatalog};
use crate::error::Result;
use crate::port::{ChatTransport, SheetStore, TimeProvider};
use chrono::{DateTime, FixedOffset};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// What `notify` did for one (subject, date)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyOutcome {
    Sent,
    Suppressed,
}

pub struct NotificationScheduler {
    catalog: Arc<SubjectCatalog>,
    queues: Arc<QueueStore>,
    sheet: Arc<dyn SheetStore>,
    transport: Arc<dyn ChatTransport>,
    time_provider: Arc<dyn TimeProvider>,
    config: SchedulerConfig,
    // Held across the emit so two paths never announce the same key twice
    ledger: tokio::sync::Mutex<NotificationLedger>,
    // Subject name -> end of the last occurrence whose queue was cleared
    cleared: Mutex<HashMap<String, DateTime<FixedOffset>>>,
    // Sessions that ended before this instant are never cleared
    started_at: DateTime<FixedOffset>,
}

impl NotificationScheduler {
    pub fn new(
        catalog: Arc<SubjectCatalog>,
        queues: Arc<QueueStore>,
        sheet: Arc<dyn SheetStore>,
        transport: Arc<dyn ChatTransport>,
        time_provider: Arc<dyn TimeProvider>,
        config: SchedulerConfig,
    ) -> Self {
        let started_at = time_provider.now();
        Self {
            catalog,
            queues,
            sheet,
            transport,
            time_provider,
            config,
            ledger: tokio::sync::Mutex::new(NotificationLedger::new()),
            cleared: Mutex::new(HashMap::new()),
            started_at,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub async fn ledger_len(&self) -> usize {
        self.ledger.lock().await.len()
    }

    /// One-time check at process start: announce every occurrence that
    /// starts within the lead time, so a restart does not miss a window.
    pub async fn startup_catch_up(&self, now: DateTime<FixedOffset>) -> usize {
        let sent = self
            .announce_matching(now, |until| self.config.in_catch_up_range(until))
            .await;
        info!(sent, "Startup notification catch-up finished");
        sent
    }

    /// Announce occurrences whose start is about `notify_lead` away.
    /// Returns the number of notifications actually delivered.
    pub async fn check_and_send(&self, now: DateTime<FixedOffset>) -> usize {
        self.announce_matching(now, |until| self.config.in_trigger_window(until))
            .await
    }

    async fn announce_matching<F>(&self, now: DateTime<FixedOffset>, due: F) -> usize
    where
        F: Fn(chrono::Duration) -> bool,
    {
        let mut sent = 0;

        for subject in self.catalog.iter() {
            let slot = match subject.slot() {
                Ok(slot) => slot,
                Err(e) => {
                    warn!(subject = %subject.name, error = %e, "Skipping subject with invalid schedule");
                    continue;
                }
            };

            let occurrence = slot.next_occurrence(now);
            let until_start = occurrence.start - now;
            if !due(until_start) {
                continue;
            }

            match self.notify(subject, &occurrence, now).await {
                Ok(NotifyOutcome::Sent) => sent += 1,
                Ok(NotifyOutcome::Suppressed) => {}
                Err(e) => {
                    error!(subject = %subject.name, error = %e, "Failed to send queue notification");
                }
            }
        }

        sent
    }

    /// Announce one occurrence unless the same (subject, date) was announced
    /// within the suppression window. A failed delivery is not recorded, so
    /// the next tick inside the window tries again.
    pub async fn notify(
        &self,
        subject: &Subject,
        occurrence: &Occurrence,
        now: DateTime<FixedOffset>,
    ) -> Result<NotifyOutcome> {
        let date = occurrence.date();
        let mut ledger = self.ledger.lock().await;

        if let Some(elapsed) =
            ledger.suppressed_for(&subject.name, date, now, self.config.suppression)
        {
            debug!(
                subject = %subject.name,
                %date,
                minutes_since_last = elapsed.num_minutes(),
                "Notification suppressed"
            );
            return Ok(NotifyOutcome::Suppressed);
        }

        let event = OutboundEvent::QueueOpened(NotificationOpened {
            subject: subject.name.clone(),
            occurrence_start: occurrence.start,
            day_label: subject.day.trim().to_string(),
            start_label: subject.start.trim().to_string(),
            end_label: subject.end.trim().to_string(),
            action_token: subject.action_token().to_string(),
        });
        self.transport.emit(&event).await?;
        ledger.record(&subject.name, date, now);

        info!(
            subject = %subject.name,
            occurrence_start = %occurrence.start,
            "Queue opened notification sent"
        );
        Ok(NotifyOutcome::Sent)
    }

    /// Clear the queue of every subject whose last occurrence has ended.
    ///
    /// Only an end crossed while this scheduler runs counts: whatever the
    /// sheet holds at startup may already be sign-ups for the next session.
    /// A subject is cleared at most once per occurrence, and only until the
    /// next occurrence's queue opens; after that the queue belongs to the
    /// next session. Subjects whose end is not after their start are never
    /// cleared. Returns the number of subjects cleared.
    pub async fn check_and_clear(&self, now: DateTime<FixedOffset>) -> usize {
        let mut cleared = 0;

        for subject in self.catalog.iter() {
            let slot = match subject.slot() {
                Ok(slot) => slot,
                Err(e) => {
                    warn!(subject = %subject.name, error = %e, "Skipping subject with invalid schedule");
                    continue;
                }
            };

            if !slot.ends_after_start() {
                debug!(subject = %subject.name, "Session end is not after its start, not clearing");
                continue;
            }

            let last = slot.last_started(now);
            if !last.has_ended(now) || self.already_cleared(&subject.name, last.end) {
                continue;
            }
            if last.end <= self.started_at {
                debug!(subject = %subject.name, occurrence_end = %last.end, "Session ended before startup, not clearing");
                self.mark_cleared(&subject.name, last.end);
                continue;
            }

            let next = slot.next_occurrence(now);
            if now >= next.start - self.config.opens_before() {
                debug!(subject = %subject.name, "Next queue already open, not clearing");
                self.mark_cleared(&subject.name, last.end);
                continue;
            }

            let removed = self.queues.clear(&subject.name);
            match self.sheet.clear_column(subject).await {
                Ok(()) => {
                    self.mark_cleared(&subject.name, last.end);
                    cleared += 1;
                    info!(
                        subject = %subject.name,
                        removed,
                        occurrence_end = %last.end,
                        "Queue cleared after session end"
                    );
                }
                Err(e) => {
                    // Watermark stays behind, the next tick retries
                    error!(subject = %subject.name, error = %e, "Failed to clear sheet column");
                }
            }
        }

        cleared
    }

    fn already_cleared(&self, subject: &str, end: DateTime<FixedOffset>) -> bool {
        self.cleared
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(subject)
            .is_some_and(|watermark| *watermark >= end)
    }

    fn mark_cleared(&self, subject: &str, end: DateTime<FixedOffset>) {
        self.cleared
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(subject.to_string(), end);
    }

    /// Drop ledger entries older than the TTL
    pub async fn purge_ledger(&self, now: DateTime<FixedOffset>) -> usize {
        let purged = self.ledger.lock().await.purge(now, self.config.ledger_ttl);
        if purged > 0 {
            info!(purged, "Purged notification ledger");
        }
        purged
    }

    /// Drive both timers until shutdown.
    ///
    /// Should be spawned in tokio::spawn. The first tick fires one period
    /// after start; call `startup_catch_up` beforehand.
    pub async fn run(&self, shutdown: ShutdownToken) {
        info!(
            subjects = self.catalog.len(),
            tick_secs = self.config.tick.as_secs(),
            purge_interval_secs = self.config.purge_interval.as_secs(),
            "Notification scheduler started"
        );

        tokio::join!(self.tick_loop(shutdown.clone()), self.purge_loop(shutdown));

        info!("Notification scheduler stopped");
    }

    async fn tick_loop(&self, mut shutdown: ShutdownToken) {
        let mut tick = interval_at(Instant::now() + self.config.tick, self.config.tick);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.wait() => break,
                _ = tick.tick() => {
                    let now = self.time_provider.now();
                    let sent = self.check_and_send(now).await;
                    let cleared = self.check_and_clear(now).await;
                    debug!(sent, cleared, "Scheduler tick");
                }
            }
        }
    }

    async fn purge_loop(&self, mut shutdown: ShutdownToken) {
        let period = self.config.purge_interval;
        let mut tick = interval_at(Instant::now() + period, period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.wait() => break,
                _ = tick.tick() => {
                    self.purge_ledger(self.time_provider.now()).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::shutdown::shutdown_channel;
    use crate::port::mocks::{InMemorySheetStore, ManualClock, RecordingTransport};
    use chrono::Duration;

    fn at(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    struct Fixture {
        scheduler: NotificationScheduler,
        queues: Arc<QueueStore>,
        sheet: Arc<InMemorySheetStore>,
        transport: Arc<RecordingTransport>,
        clock: Arc<ManualClock>,
    }

    // Wednesday 10:00-11:30; 2024-05-15 is a Wednesday
    fn fixture(subjects: Vec<Subject>) -> Fixture {
        fixture_started_at(subjects, at("2024-05-14T10:00:00+03:00"))
    }

    fn fixture_started_at(subjects: Vec<Subject>, started: DateTime<FixedOffset>) -> Fixture {
        let queues = Arc::new(QueueStore::new());
        let sheet = Arc::new(InMemorySheetStore::new());
        let transport = Arc::new(RecordingTransport::new());
        let clock = Arc::new(ManualClock::new(started));
        let scheduler = NotificationScheduler::new(
            Arc::new(SubjectCatalog::new(subjects).unwrap()),
            Arc::clone(&queues),
            sheet.clone(),
            transport.clone(),
            clock.clone(),
            SchedulerConfig::default(),
        );
        Fixture {
            scheduler,
            queues,
            sheet,
            transport,
            clock,
        }
    }

    fn algebra() -> Subject {
        Subject::new("Algebra", "ср", "10:00", "11:30", "ALG")
    }

    #[tokio::test]
    async fn test_send_once_per_window() {
        let f = fixture(vec![algebra()]);

        assert_eq!(f.scheduler.check_and_send(at("2024-05-14T09:55:00+03:00")).await, 1);
        assert_eq!(f.scheduler.check_and_send(at("2024-05-14T10:04:00+03:00")).await, 0);
        assert_eq!(f.transport.opened_count("Algebra"), 1);

        // Outside the window nothing happens
        assert_eq!(f.scheduler.check_and_send(at("2024-05-14T12:00:00+03:00")).await, 0);
    }

    #[tokio::test]
    async fn test_resend_after_suppression_expires() {
        let f = fixture(vec![algebra()]);

        assert_eq!(f.scheduler.check_and_send(at("2024-05-14T10:00:00+03:00")).await, 1);

        // A restart 7 hours later re-announces the same date
        assert_eq!(f.scheduler.startup_catch_up(at("2024-05-14T17:00:00+03:00")).await, 1);
        // ...and another restart shortly after stays quiet
        assert_eq!(f.scheduler.startup_catch_up(at("2024-05-14T20:00:00+03:00")).await, 0);
        assert_eq!(f.transport.opened_count("Algebra"), 2);
    }

    #[tokio::test]
    async fn test_notification_payload() {
        let f = fixture(vec![algebra()]);
        f.scheduler.check_and_send(at("2024-05-14T10:00:00+03:00")).await;

        let events = f.transport.events();
        let OutboundEvent::QueueOpened(opened) = &events[0] else {
            panic!("expected QueueOpened, got {:?}", events[0]);
        };
        assert_eq!(opened.day_label, "ср");
        assert_eq!(opened.start_label, "10:00");
        assert_eq!(opened.end_label, "11:30");
        assert_eq!(opened.action_token, "ALG");
        assert_eq!(opened.occurrence_start, at("2024-05-15T10:00:00+03:00"));
    }

    #[tokio::test]
    async fn test_failed_delivery_is_retried() {
        let f = fixture(vec![algebra()]);
        f.transport.set_failing(true);
        assert_eq!(f.scheduler.check_and_send(at("2024-05-14T09:55:00+03:00")).await, 0);
        assert_eq!(f.scheduler.ledger_len().await, 0);

        f.transport.set_failing(false);
        assert_eq!(f.scheduler.check_and_send(at("2024-05-14T09:56:00+03:00")).await, 1);
    }

    #[tokio::test]
    async fn test_catch_up_skips_far_and_started() {
        let f = fixture(vec![algebra()]);
        // 30 hours before start: too early
        assert_eq!(f.scheduler.startup_catch_up(at("2024-05-14T04:00:00+03:00")).await, 0);
        // Mid-session: next occurrence is a week away
        assert_eq!(f.scheduler.startup_catch_up(at("2024-05-15T10:30:00+03:00")).await, 0);
        // Same morning
        assert_eq!(f.scheduler.startup_catch_up(at("2024-05-15T08:00:00+03:00")).await, 1);
    }

    #[tokio::test]
    async fn test_invalid_subject_does_not_block_others() {
        let f = fixture(vec![
            Subject::new("Broken", "someday", "10:00", "11:00", "BRK"),
            algebra(),
        ]);
        assert_eq!(f.scheduler.check_and_send(at("2024-05-14T10:00:00+03:00")).await, 1);
        assert_eq!(f.scheduler.check_and_clear(at("2024-05-15T12:00:00+03:00")).await, 1);
    }

    #[tokio::test]
    async fn test_clear_fires_once_after_end() {
        let f = fixture(vec![algebra()]);
        f.queues.join("Algebra", "Ivanov Ivan");
        f.sheet.set_column("ALG", &["Ivanov"]);

        // Still in progress
        assert_eq!(f.scheduler.check_and_clear(at("2024-05-15T11:00:00+03:00")).await, 0);
        assert_eq!(f.queues.len("Algebra"), 1);

        assert_eq!(f.scheduler.check_and_clear(at("2024-05-15T11:31:00+03:00")).await, 1);
        assert!(f.queues.snapshot("Algebra").is_empty());
        assert!(f.sheet.column("ALG").is_empty());

        for minute in 32..40 {
            let now = at(&format!("2024-05-15T11:{minute}:00+03:00"));
            assert_eq!(f.scheduler.check_and_clear(now).await, 0);
        }
        assert_eq!(f.sheet.clear_count(), 1);
    }

    #[tokio::test]
    async fn test_clear_spares_next_occurrence_queue() {
        let f = fixture(vec![algebra()]);
        f.scheduler.check_and_clear(at("2024-05-15T12:00:00+03:00")).await;

        // Next week's queue opened and someone joined
        f.queues.join("Algebra", "Petrov Petr");
        assert_eq!(f.scheduler.check_and_clear(at("2024-05-21T10:00:00+03:00")).await, 0);
        assert_eq!(f.queues.len("Algebra"), 1);

        // A fresh process started while the queue is open does not clear either
        let fresh = fixture(vec![algebra()]);
        fresh.queues.join("Algebra", "Petrov Petr");
        assert_eq!(fresh.scheduler.check_and_clear(at("2024-05-21T10:00:00+03:00")).await, 0);
        assert_eq!(fresh.queues.len("Algebra"), 1);
    }

    #[tokio::test]
    async fn test_fresh_start_keeps_sign_ups_for_next_session() {
        // Started on Friday; Wednesday's session ended before the process did
        let f = fixture_started_at(vec![algebra()], at("2024-05-17T12:00:00+03:00"));
        // Joined on Thursday for next Wednesday
        f.queues.join("Algebra", "Ivanov Ivan");
        f.sheet.set_column("ALG", &["Ivanov"]);

        assert_eq!(f.scheduler.check_and_clear(at("2024-05-17T12:00:00+03:00")).await, 0);
        assert_eq!(f.scheduler.check_and_clear(at("2024-05-18T12:00:00+03:00")).await, 0);
        assert_eq!(f.queues.snapshot("Algebra"), vec!["Ivanov Ivan"]);
        assert_eq!(f.sheet.column("ALG"), vec!["Ivanov"]);
        assert_eq!(f.sheet.clear_count(), 0);

        // The next session's end is crossed while running, so it clears
        assert_eq!(f.scheduler.check_and_clear(at("2024-05-22T11:30:00+03:00")).await, 1);
        assert!(f.sheet.column("ALG").is_empty());
    }

    #[tokio::test]
    async fn test_session_ending_before_start_is_never_cleared() {
        let f = fixture(vec![Subject::new("Night", "ср", "23:00", "01:00", "NGT")]);
        f.queues.join("Night", "Ivanov Ivan");

        assert_eq!(f.scheduler.check_and_clear(at("2024-05-15T23:00:00+03:00")).await, 0);
        assert_eq!(f.scheduler.check_and_clear(at("2024-05-16T12:00:00+03:00")).await, 0);
        assert_eq!(f.queues.len("Night"), 1);
        assert_eq!(f.sheet.clear_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_sheet_clear_is_retried() {
        let f = fixture(vec![algebra()]);
        f.sheet.set_fail_writes(true);
        assert_eq!(f.scheduler.check_and_clear(at("2024-05-15T11:31:00+03:00")).await, 0);

        f.sheet.set_fail_writes(false);
        assert_eq!(f.scheduler.check_and_clear(at("2024-05-15T11:32:00+03:00")).await, 1);
    }

    #[tokio::test]
    async fn test_purge_ledger() {
        let f = fixture(vec![algebra()]);
        f.scheduler.check_and_send(at("2024-05-14T10:00:00+03:00")).await;
        assert_eq!(f.scheduler.purge_ledger(at("2024-05-14T20:00:00+03:00")).await, 0);
        assert_eq!(f.scheduler.purge_ledger(at("2024-05-15T10:01:00+03:00")).await, 1);
        assert_eq!(f.scheduler.ledger_len().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_ticks_and_stops_on_shutdown() {
        let f = fixture(vec![algebra()]);
        // One minute before the trigger window opens
        f.clock.set(at("2024-05-14T09:49:00+03:00"));
        let scheduler = Arc::new(f.scheduler);
        let (tx, token) = shutdown_channel();

        let handle = tokio::spawn({
            let scheduler = Arc::clone(&scheduler);
            async move { scheduler.run(token).await }
        });

        f.clock.advance(Duration::minutes(2));
        tokio::time::sleep(std::time::Duration::from_secs(61)).await;
        assert_eq!(f.transport.opened_count("Algebra"), 1);

        tx.shutdown();
        tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .expect("scheduler should stop")
            .unwrap();
    }
}
