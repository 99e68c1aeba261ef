//! Full notification lifecycle over simulated weeks
//!
//! Drives the scheduler minute by minute with a manual clock, the way the
//! daemon's one-minute timer would, while users join and leave.

mod common;

use chrono::Duration;
use common::{at, harness};
use lineup_core::application::SchedulerConfig;
use lineup_core::domain::{IntentReply, OutboundEvent};
use lineup_core::port::TimeProvider;

#[tokio::test]
async fn test_one_announcement_and_one_clear_per_week() {
    // Monday 00:00; Algebra is Wednesday 10:00, Physics Friday 12:00
    let h = harness(at("2024-05-13T00:00:00+03:00"), SchedulerConfig::default(), true);

    let mut now = h.clock.now();
    let end = at("2024-05-27T00:00:00+03:00");
    while now < end {
        h.scheduler.check_and_send(now).await;
        h.scheduler.check_and_clear(now).await;
        h.clock.advance(Duration::minutes(1));
        now = h.clock.now();
    }

    // Two weeks: one announcement per subject per week
    assert_eq!(h.transport.opened_count("Algebra"), 2);
    assert_eq!(h.transport.opened_count("Physics"), 2);
    // Sessions that ended before startup are left alone; each of the two
    // weeks' sessions is cleared once
    assert_eq!(h.sheet.clear_count(), 2 + 2);
}

#[tokio::test]
async fn test_restart_keeps_next_week_sign_ups() {
    // Olga joined on Thursday, after Wednesday's queue was cleared; the bot
    // then restarts on Friday morning
    let h = harness(at("2024-05-17T09:00:00+03:00"), SchedulerConfig::default(), true);
    h.sheet.set_column("ALG", &["Sidorova"]);
    assert_eq!(h.service.sync_all().await, 2);

    let mut now = h.clock.now();
    let end = at("2024-05-20T00:00:00+03:00");
    while now < end {
        h.scheduler.check_and_clear(now).await;
        h.clock.advance(Duration::minutes(1));
        now = h.clock.now();
    }

    assert_eq!(h.sheet.column("ALG"), vec!["Sidorova"]);
    assert_eq!(h.queues.snapshot("Algebra"), vec!["Sidorova Olga"]);
    // Physics ended on Friday 13:30 while running
    assert_eq!(h.sheet.clear_count(), 1);
}

#[tokio::test]
async fn test_queue_lives_from_announcement_to_session_end() {
    let h = harness(at("2024-05-14T09:55:00+03:00"), SchedulerConfig::default(), true);
    let now = at("2024-05-14T09:55:00+03:00");

    // Tuesday 09:55: the Wednesday queue opens
    assert_eq!(h.scheduler.check_and_send(now).await, 1);
    let opened = h
        .transport
        .events()
        .into_iter()
        .find_map(|e| match e {
            OutboundEvent::QueueOpened(n) => Some(n),
            _ => None,
        })
        .unwrap();
    assert_eq!(opened.action_token, "ALG");

    // Users press the buttons carried by the announcement
    assert!(h.service.join(&opened.action_token, Some("petr")).await.is_success());
    assert!(h.service.join(&opened.action_token, Some("ivan")).await.is_success());
    assert_eq!(h.sheet.column("ALG"), vec!["Petrov", "Ivanov"]);
    assert_eq!(h.service.leave("ALG", Some("petr")).await, IntentReply::Left);

    // Ticks during the day and the session itself leave the queue alone
    h.scheduler.check_and_clear(at("2024-05-14T18:00:00+03:00")).await;
    assert_eq!(h.scheduler.check_and_clear(at("2024-05-15T11:29:00+03:00")).await, 0);
    assert_eq!(h.queues.snapshot("Algebra"), vec!["Ivanov Ivan"]);

    // Session over
    assert_eq!(h.scheduler.check_and_clear(at("2024-05-15T11:30:00+03:00")).await, 1);
    assert!(h.queues.snapshot("Algebra").is_empty());
    assert!(h.sheet.column("ALG").is_empty());

    // Joining next week's queue once it opens is not undone by later ticks
    assert_eq!(h.scheduler.check_and_send(at("2024-05-21T10:00:00+03:00")).await, 1);
    assert!(h.service.join("ALG", Some("olga")).await.is_success());
    h.scheduler.check_and_clear(at("2024-05-21T10:01:00+03:00")).await;
    assert_eq!(h.queues.snapshot("Algebra"), vec!["Sidorova Olga"]);
}

#[tokio::test]
async fn test_restart_catch_up_then_ticks_stay_quiet() {
    // Process (re)started Wednesday 08:00, two hours before Algebra
    let h = harness(at("2024-05-15T08:00:00+03:00"), SchedulerConfig::default(), true);
    let now = at("2024-05-15T08:00:00+03:00");

    assert_eq!(h.scheduler.startup_catch_up(now).await, 1);
    for minute in 1..=60 {
        h.scheduler
            .check_and_send(now + Duration::minutes(minute))
            .await;
    }
    assert_eq!(h.transport.opened_count("Algebra"), 1);
    assert_eq!(h.transport.opened_count("Physics"), 0);
}

#[tokio::test]
async fn test_ledger_purge_bounds_size() {
    let h = harness(at("2024-05-14T10:00:00+03:00"), SchedulerConfig::default(), true);

    h.scheduler.check_and_send(at("2024-05-14T10:00:00+03:00")).await;
    h.scheduler.check_and_send(at("2024-05-16T12:00:00+03:00")).await;
    assert_eq!(h.scheduler.ledger_len().await, 2);

    assert_eq!(h.scheduler.purge_ledger(at("2024-05-17T12:00:00+03:00")).await, 1);
    assert_eq!(h.scheduler.ledger_len().await, 1);
}
