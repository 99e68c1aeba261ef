//! Shared wiring for the integration scenarios

#![allow(dead_code)]

use chrono::{DateTime, FixedOffset};
use lineup_core::application::{NotificationScheduler, QueueService, QueueStore, SchedulerConfig};
use lineup_core::domain::{Roster, Subject, SubjectCatalog, UserMapping};
use lineup_core::port::mocks::{InMemorySheetStore, ManualClock, RecordingTransport};
use std::sync::Arc;

pub struct Harness {
    pub catalog: Arc<SubjectCatalog>,
    pub queues: Arc<QueueStore>,
    pub sheet: Arc<InMemorySheetStore>,
    pub transport: Arc<RecordingTransport>,
    pub clock: Arc<ManualClock>,
    pub service: Arc<QueueService>,
    pub scheduler: Arc<NotificationScheduler>,
}

pub fn at(s: &str) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(s).unwrap()
}

/// Algebra: Wednesdays 10:00-11:30. Physics: Fridays 12:00-13:30.
pub fn subjects() -> Vec<Subject> {
    vec![
        Subject::new("Algebra", "ср", "10:00", "11:30", "ALG"),
        Subject::new("Physics", "пт", "12:00", "13:30", "PHY"),
    ]
}

pub fn roster() -> Roster {
    Roster::new(vec![
        UserMapping::new("ivan", "Ivanov Ivan"),
        UserMapping::new("petr", "Petrov Petr"),
        UserMapping::new("olga", "Sidorova Olga"),
    ])
}

pub fn harness(now: DateTime<FixedOffset>, config: SchedulerConfig, confirm_join: bool) -> Harness {
    harness_with_roster(now, config, confirm_join, roster())
}

pub fn harness_with_roster(
    now: DateTime<FixedOffset>,
    config: SchedulerConfig,
    confirm_join: bool,
    roster: Roster,
) -> Harness {
    let catalog = Arc::new(SubjectCatalog::new(subjects()).unwrap());
    let queues = Arc::new(QueueStore::new());
    let sheet = Arc::new(InMemorySheetStore::new());
    let transport = Arc::new(RecordingTransport::new());
    let clock = Arc::new(ManualClock::new(now));

    let service = Arc::new(
        QueueService::new(
            Arc::clone(&catalog),
            Arc::new(roster),
            Arc::clone(&queues),
            sheet.clone(),
            transport.clone(),
        )
        .with_confirm_join(confirm_join),
    );
    let scheduler = Arc::new(NotificationScheduler::new(
        Arc::clone(&catalog),
        Arc::clone(&queues),
        sheet.clone(),
        transport.clone(),
        clock.clone(),
        config,
    ));

    Harness {
        catalog,
        queues,
        sheet,
        transport,
        clock,
        service,
        scheduler,
    }
}
