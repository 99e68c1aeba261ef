// Notification Ledger - which (subject, occurrence date) pairs were announced

use chrono::{DateTime, Duration, FixedOffset, NaiveDate};
use std::collections::HashMap;

/// Key: subject name + calendar date of the occurrence
pub type LedgerKey = (String, NaiveDate);

/// Per-key state is implicit: absent = nothing sent, present = sent at
/// the stored instant. Purging removes the key again.
#[derive(Debug, Default)]
pub struct NotificationLedger {
    entries: HashMap<LedgerKey, DateTime<FixedOffset>>,
}

impl NotificationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last_sent(&self, subject: &str, date: NaiveDate) -> Option<DateTime<FixedOffset>> {
        self.entries.get(&(subject.to_string(), date)).copied()
    }

    /// Time since the last send, if that send is still inside `window`
    pub fn suppressed_for(
        &self,
        subject: &str,
        date: NaiveDate,
        now: DateTime<FixedOffset>,
        window: Duration,
    ) -> Option<Duration> {
        let elapsed = now - self.last_sent(subject, date)?;
        (elapsed < window).then_some(elapsed)
    }

    pub fn record(&mut self, subject: &str, date: NaiveDate, at: DateTime<FixedOffset>) {
        self.entries.insert((subject.to_string(), date), at);
    }

    /// Drop entries sent more than `max_age` before `now`; returns how many
    pub fn purge(&mut self, now: DateTime<FixedOffset>, max_age: Duration) -> usize {
        let cutoff = now - max_age;
        let before = self.entries.len();
        self.entries.retain(|_, sent_at| *sent_at >= cutoff);
        before - self.entries.len()
    }
}
