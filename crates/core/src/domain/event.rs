// Outbound events (core -> chat transport)

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// "Queue is open" announcement for the next occurrence of a subject
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationOpened {
    pub subject: String,
    pub occurrence_start: DateTime<FixedOffset>,
    pub day_label: String,
    pub start_label: String,
    pub end_label: String,
    pub action_token: String,
}

/// Current queue of a subject, as sheet labels in order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub subject: String,
    pub action_token: String,
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutboundEvent {
    QueueOpened(NotificationOpened),
    Joined {
        subject: String,
        label: String,
        position: usize,
    },
    Left {
        subject: String,
        label: String,
    },
    Snapshot(QueueSnapshot),
}

impl OutboundEvent {
    pub fn subject(&self) -> &str {
        match self {
            OutboundEvent::QueueOpened(n) => &n.subject,
            OutboundEvent::Joined { subject, .. } | OutboundEvent::Left { subject, .. } => subject,
            OutboundEvent::Snapshot(s) => &s.subject,
        }
    }
}
