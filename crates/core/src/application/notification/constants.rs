// Notification timing defaults, all overridable per deployment

use chrono::Duration;

/// Polling cadence of "check and send" + "check and clear" (1 minute)
pub const DEFAULT_TICK: std::time::Duration = std::time::Duration::from_secs(60);

/// Cadence of ledger housekeeping (24 hours)
pub const DEFAULT_PURGE_INTERVAL: std::time::Duration = std::time::Duration::from_secs(24 * 3600);

/// How long before an occurrence the queue opens (24 hours)
pub const DEFAULT_NOTIFY_LEAD_HOURS: i64 = 24;

/// Half-width of the trigger window around the lead mark (10 minutes)
pub const DEFAULT_TRIGGER_HALF_WINDOW_MINS: i64 = 10;

/// Re-send suppression for the same (subject, date) (6 hours)
pub const DEFAULT_SUPPRESSION_HOURS: i64 = 6;

/// Ledger entries older than this are purged (24 hours)
pub const DEFAULT_LEDGER_TTL_HOURS: i64 = 24;

/// Timing knobs of the notification scheduler
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub tick: std::time::Duration,
    pub purge_interval: std::time::Duration,
    pub notify_lead: Duration,
    pub trigger_half_window: Duration,
    pub suppression: Duration,
    pub ledger_ttl: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick: DEFAULT_TICK,
            purge_interval: DEFAULT_PURGE_INTERVAL,
            notify_lead: Duration::hours(DEFAULT_NOTIFY_LEAD_HOURS),
            trigger_half_window: Duration::minutes(DEFAULT_TRIGGER_HALF_WINDOW_MINS),
            suppression: Duration::hours(DEFAULT_SUPPRESSION_HOURS),
            ledger_ttl: Duration::hours(DEFAULT_LEDGER_TTL_HOURS),
        }
    }
}

impl SchedulerConfig {
    /// Open interval around the lead mark in which "check and send" fires
    pub fn in_trigger_window(&self, until_start: Duration) -> bool {
        until_start > self.notify_lead - self.trigger_half_window
            && until_start < self.notify_lead + self.trigger_half_window
    }

    /// Startup catch-up range: the occurrence starts within (0, lead]
    pub fn in_catch_up_range(&self, until_start: Duration) -> bool {
        until_start > Duration::zero() && until_start <= self.notify_lead
    }

    /// Earliest instant at which the queue for an occurrence may open
    pub fn opens_before(&self) -> Duration {
        self.notify_lead + self.trigger_half_window
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_window_bounds_are_open() {
        let config = SchedulerConfig::default();
        assert!(config.in_trigger_window(Duration::hours(24)));
        assert!(config.in_trigger_window(Duration::hours(24) + Duration::minutes(9)));
        assert!(!config.in_trigger_window(Duration::hours(24) + Duration::minutes(10)));
        assert!(!config.in_trigger_window(Duration::hours(23) + Duration::minutes(50)));
        assert!(config.in_trigger_window(Duration::hours(23) + Duration::minutes(51)));
    }

    #[test]
    fn test_catch_up_range() {
        let config = SchedulerConfig::default();
        assert!(!config.in_catch_up_range(Duration::zero()));
        assert!(config.in_catch_up_range(Duration::minutes(1)));
        assert!(config.in_catch_up_range(Duration::hours(24)));
        assert!(!config.in_catch_up_range(Duration::hours(24) + Duration::seconds(1)));
    }
}
