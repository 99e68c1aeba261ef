//! Recurrence math for weekly sessions
//!
//! All computations happen in the offset carried by `now`; callers obtain
//! `now` from a `TimeProvider` configured with a single offset so every
//! subject is evaluated on the same wall clock.

use crate::domain::error::Result;
use crate::domain::subject::Subject;
use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, Weekday};

/// Parsed weekly schedule of one subject
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeeklySlot {
    pub weekday: Weekday,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

/// One concrete session instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurrence {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

impl Occurrence {
    /// Calendar date of the session (ledger key component)
    pub fn date(&self) -> NaiveDate {
        self.start.date_naive()
    }

    pub fn has_ended(&self, now: DateTime<FixedOffset>) -> bool {
        now >= self.end
    }

    pub fn is_in_progress(&self, now: DateTime<FixedOffset>) -> bool {
        self.start <= now && now < self.end
    }
}

impl WeeklySlot {
    pub fn new(weekday: Weekday, start: NaiveTime, end: NaiveTime) -> Self {
        Self {
            weekday,
            start,
            end,
        }
    }

    /// False for sessions written with an end at or before their start.
    /// Such an occurrence "ends" the moment it begins.
    pub fn ends_after_start(&self) -> bool {
        self.end > self.start
    }

    /// The first occurrence starting strictly after `now`.
    ///
    /// A session that already started today (including one still in
    /// progress) rolls over to next week.
    pub fn next_occurrence(&self, now: DateTime<FixedOffset>) -> Occurrence {
        let target = self.weekday.num_days_from_monday();
        let current = now.weekday().num_days_from_monday();

        let mut days_until = (target + 7 - current) % 7;
        if days_until == 0 && now.time() >= self.start {
            days_until = 7;
        }

        self.on(now.date_naive() + Duration::days(days_until as i64), now.offset())
    }

    /// The most recent occurrence whose start is at or before `now`
    pub fn last_started(&self, now: DateTime<FixedOffset>) -> Occurrence {
        let target = self.weekday.num_days_from_monday();
        let current = now.weekday().num_days_from_monday();

        let mut days_back = (current + 7 - target) % 7;
        if days_back == 0 && now.time() < self.start {
            days_back = 7;
        }

        self.on(now.date_naive() - Duration::days(days_back as i64), now.offset())
    }

    /// The session in progress at `now`, if any
    pub fn current_occurrence(&self, now: DateTime<FixedOffset>) -> Option<Occurrence> {
        let last = self.last_started(now);
        last.is_in_progress(now).then_some(last)
    }

    /// Start and end on a given date. Both share the date: an end that is
    /// not after the start is kept on the same day, never rolled forward.
    fn on(&self, date: NaiveDate, offset: &FixedOffset) -> Occurrence {
        Occurrence {
            start: at(date, self.start, offset),
            end: at(date, self.end, offset),
        }
    }
}

/// Next occurrence for a subject, or the reason its schedule is unusable
pub fn next_occurrence(subject: &Subject, now: DateTime<FixedOffset>) -> Result<Occurrence> {
    Ok(subject.slot()?.next_occurrence(now))
}

fn at(date: NaiveDate, time: NaiveTime, offset: &FixedOffset) -> DateTime<FixedOffset> {
    // Wall-clock -> UTC for a fixed offset is total (no gaps, no folds)
    let utc = date.and_time(time) - Duration::seconds(offset.local_minus_utc() as i64);
    DateTime::from_naive_utc_and_offset(utc, *offset)
}
