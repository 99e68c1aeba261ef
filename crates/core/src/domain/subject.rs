// Subject Domain Model

use crate::domain::error::{DomainError, Result};
use crate::domain::occurrence::WeeklySlot;
use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A recurring weekly session people queue up for.
///
/// Day and times are kept as written in the subjects file. They are parsed on
/// use so that one bad entry only takes that subject out of a scheduling cycle
/// instead of refusing the whole catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub name: String,
    pub day: String,
    pub start: String,
    pub end: String,
    /// Short stable code: action token for chat buttons and sheet column key
    pub code: String,
}

impl Subject {
    pub fn new(
        name: impl Into<String>,
        day: impl Into<String>,
        start: impl Into<String>,
        end: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            day: day.into(),
            start: start.into(),
            end: end.into(),
            code: code.into(),
        }
    }

    pub fn action_token(&self) -> &str {
        &self.code
    }

    /// Parse the weekday and clock times into a schedulable slot
    pub fn slot(&self) -> Result<WeeklySlot> {
        let weekday = parse_weekday(&self.day).ok_or_else(|| DomainError::InvalidWeekday {
            subject: self.name.clone(),
            value: self.day.clone(),
        })?;
        let start = self.parse_time(&self.start)?;
        let end = self.parse_time(&self.end)?;
        Ok(WeeklySlot::new(weekday, start, end))
    }

    fn parse_time(&self, value: &str) -> Result<NaiveTime> {
        NaiveTime::parse_from_str(value.trim(), "%H:%M").map_err(|_| DomainError::InvalidTime {
            subject: self.name.clone(),
            value: value.to_string(),
        })
    }
}

/// Parse a weekday written either as a Russian two-letter abbreviation
/// (пн..вс) or as an English name / three-letter abbreviation.
pub fn parse_weekday(day: &str) -> Option<Weekday> {
    let day = day.trim().to_lowercase();
    let weekday = match day.as_str() {
        "пн" => Weekday::Mon,
        "вт" => Weekday::Tue,
        "ср" => Weekday::Wed,
        "чт" => Weekday::Thu,
        "пт" => Weekday::Fri,
        "сб" => Weekday::Sat,
        "вс" => Weekday::Sun,
        other => other.parse::<Weekday>().ok()?,
    };
    Some(weekday)
}

/// The fixed working set of subjects for the process lifetime
#[derive(Debug, Clone, Default)]
pub struct SubjectCatalog {
    subjects: Vec<Subject>,
}

impl SubjectCatalog {
    /// Build a catalog, rejecting empty or duplicate names and codes.
    ///
    /// Weekday/time problems are NOT rejected here (see `validate`).
    pub fn new(subjects: Vec<Subject>) -> Result<Self> {
        let mut names = HashSet::new();
        let mut codes = HashSet::new();

        for subject in &subjects {
            if subject.name.trim().is_empty() {
                return Err(DomainError::ValidationError(
                    "subject name must not be empty".to_string(),
                ));
            }
            if subject.code.trim().is_empty() {
                return Err(DomainError::ValidationError(format!(
                    "subject '{}' has an empty code",
                    subject.name
                )));
            }
            if !names.insert(subject.name.as_str()) {
                return Err(DomainError::Duplicate {
                    field: "name",
                    value: subject.name.clone(),
                });
            }
            if !codes.insert(subject.code.as_str()) {
                return Err(DomainError::Duplicate {
                    field: "code",
                    value: subject.code.clone(),
                });
            }
        }

        Ok(Self { subjects })
    }

    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    pub fn iter(&self) -> impl Iterator<Item = &Subject> {
        self.subjects.iter()
    }

    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }

    pub fn by_name(&self, name: &str) -> Option<&Subject> {
        self.subjects.iter().find(|s| s.name == name)
    }

    /// Resolve the opaque action token a chat button carries
    pub fn by_token(&self, token: &str) -> Option<&Subject> {
        self.subjects.iter().find(|s| s.code == token)
    }

    /// Every weekday/time problem in the catalog, plus a warning-level
    /// problem for sessions whose end is not after their start.
    pub fn validate(&self) -> Vec<DomainError> {
        let mut problems = Vec::new();
        for subject in &self.subjects {
            match subject.slot() {
                Ok(slot) if !slot.ends_after_start() => {
                    problems.push(DomainError::ValidationError(format!(
                        "subject '{}' ends at {} which is not after its start {}; \
                         its queue will not be cleared automatically",
                        subject.name, subject.end, subject.start
                    )));
                }
                Ok(_) => {}
                Err(e) => problems.push(e),
            }
        }
        problems
    }
}
