// Intents (chat -> core) and their replies (core -> chat)

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentKind {
    Join,
    Leave,
    Show,
}

impl IntentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentKind::Join => "join",
            IntentKind::Leave => "leave",
            IntentKind::Show => "show",
        }
    }
}

impl std::fmt::Display for IntentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for IntentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "join" => Ok(IntentKind::Join),
            "leave" => Ok(IntentKind::Leave),
            "show" => Ok(IntentKind::Show),
            other => Err(format!("unknown intent kind: {other}")),
        }
    }
}

/// A user action relayed by the chat transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    pub kind: IntentKind,
    /// Subject action token carried by the button
    pub token: String,
    /// Chat username of the actor (absent for users without one)
    pub username: Option<String>,
}

impl Intent {
    pub fn new(kind: IntentKind, token: impl Into<String>, username: Option<String>) -> Self {
        Self {
            kind,
            token: token.into(),
            username,
        }
    }
}

/// Outcome reported back to the acting user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntentReply {
    /// Newly admitted; `predecessor` is the label of the person ahead
    Joined {
        position: usize,
        predecessor: Option<String>,
    },
    /// Was already in the queue, nothing changed
    AlreadyQueued { position: usize },
    Left,
    NotQueued,
    Shown { count: usize },
    UnknownSubject,
    UnknownUser,
    /// External store write failed; local state rolled back, retry later
    StoreUnavailable,
}

impl IntentReply {
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            IntentReply::Joined { .. }
                | IntentReply::AlreadyQueued { .. }
                | IntentReply::Left
                | IntentReply::Shown { .. }
        )
    }
}
