// Message texts and keyboards

use crate::api::{InlineKeyboardButton, InlineKeyboardMarkup};
use crate::callback::callback_data;
use lineup_core::domain::{IntentKind, IntentReply, NotificationOpened, OutboundEvent, QueueSnapshot};

pub fn queue_keyboard(token: &str) -> InlineKeyboardMarkup {
    let button = |text: &str, kind| InlineKeyboardButton {
        text: text.to_string(),
        callback_data: callback_data(kind, token),
    };
    InlineKeyboardMarkup {
        inline_keyboard: vec![
            vec![
                button("Join", IntentKind::Join),
                button("Leave", IntentKind::Leave),
            ],
            vec![button("Show queue", IntentKind::Show)],
        ],
    }
}

pub fn opened(n: &NotificationOpened) -> String {
    format!(
        "🎓 {}\n📅 {} {}-{}\n\nThe queue is open. Press \"Join\" to sign up.",
        n.subject, n.day_label, n.start_label, n.end_label
    )
}

pub fn snapshot(s: &QueueSnapshot) -> String {
    if s.labels.is_empty() {
        return format!("📋 Queue for \"{}\":\n\n(empty)", s.subject);
    }
    let mut text = format!("📋 Queue for \"{}\":\n", s.subject);
    for (index, label) in s.labels.iter().enumerate() {
        text.push_str(&format!("\n{}. {}", index + 1, label));
    }
    text
}

/// Text posted to the group chat for an event
pub fn event(event: &OutboundEvent) -> String {
    match event {
        OutboundEvent::QueueOpened(n) => opened(n),
        OutboundEvent::Joined {
            subject,
            label,
            position,
        } => format!("✅ {label} joined the queue for \"{subject}\" (place {position})"),
        OutboundEvent::Left { subject, label } => {
            format!("❌ {label} left the queue for \"{subject}\"")
        }
        OutboundEvent::Snapshot(s) => snapshot(s),
    }
}

/// Toast answering a button press
pub fn reply(reply: &IntentReply) -> String {
    match reply {
        IntentReply::Joined {
            position,
            predecessor: Some(ahead),
        } => format!("✅ You are number {position}, after {ahead}"),
        IntentReply::Joined {
            position,
            predecessor: None,
        } => format!("✅ You are number {position}, first in line"),
        IntentReply::AlreadyQueued { position } => {
            format!("✅ You are already in the queue. Place: {position}")
        }
        IntentReply::Left => "You left the queue".to_string(),
        IntentReply::NotQueued => "You are not in this queue".to_string(),
        IntentReply::Shown { count } => format!("{count} in the queue"),
        IntentReply::UnknownSubject => "❌ Unknown subject".to_string(),
        IntentReply::UnknownUser => {
            "❌ You are not in the user list. Ask the administrator to add you.".to_string()
        }
        IntentReply::StoreUnavailable => {
            "⚠️ The spreadsheet is not responding, please try again later".to_string()
        }
    }
}
