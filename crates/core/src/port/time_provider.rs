// Time Provider Port (for testability)

use chrono::{DateTime, FixedOffset, Local, Utc};

/// Time provider interface (allows mocking in tests)
pub trait TimeProvider: Send + Sync {
    /// Current wall-clock time in the deployment's offset
    fn now(&self) -> DateTime<FixedOffset>;
}

/// System time provider (production)
///
/// With no configured offset the host's current local offset is used.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeProvider {
    offset: Option<FixedOffset>,
}

impl SystemTimeProvider {
    pub fn new(offset: Option<FixedOffset>) -> Self {
        Self { offset }
    }

    pub fn offset(&self) -> Option<FixedOffset> {
        self.offset
    }
}

impl TimeProvider for SystemTimeProvider {
    fn now(&self) -> DateTime<FixedOffset> {
        match self.offset {
            Some(offset) => Utc::now().with_timezone(&offset),
            None => Local::now().into(),
        }
    }
}

/// Parse "+03:00", "-0530", "+3" or "Z"/"UTC" into a fixed offset
pub fn parse_utc_offset(value: &str) -> Option<FixedOffset> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("z") || value.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0);
    }

    let (sign, rest) = match value.as_bytes().first()? {
        b'+' => (1, &value[1..]),
        b'-' => (-1, &value[1..]),
        _ => return None,
    };

    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.is_empty() || digits.len() > 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let (hours, minutes) = if digits.len() <= 2 {
        (digits.parse::<i32>().ok()?, 0)
    } else {
        let split = digits.len() - 2;
        (
            digits[..split].parse::<i32>().ok()?,
            digits[split..].parse::<i32>().ok()?,
        )
    };
    if hours > 23 || minutes > 59 {
        return None;
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
