// Roster - static username -> real name mapping

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// One entry of the user mapping file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMapping {
    #[serde(rename = "TelegramUsername")]
    pub telegram_username: String,
    #[serde(rename = "RealName")]
    pub real_name: String,
}

impl UserMapping {
    pub fn new(telegram_username: impl Into<String>, real_name: impl Into<String>) -> Self {
        Self {
            telegram_username: telegram_username.into(),
            real_name: real_name.into(),
        }
    }
}

/// Who may join, and how their identity is written in the sheet.
///
/// Identities are real names ("Ivanov Ivan"); the sheet only stores the
/// label, which is the first word (the surname). Several people may share a
/// label, so the reverse lookup can be ambiguous.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    by_username: HashMap<String, String>,
    // Label -> every identity carrying it, sorted
    by_label: BTreeMap<String, Vec<String>>,
}

impl Roster {
    pub fn new(entries: impl IntoIterator<Item = UserMapping>) -> Self {
        let mut by_username = HashMap::new();
        for entry in entries {
            let username = strip_at(entry.telegram_username.trim()).to_string();
            let real_name = normalize(&entry.real_name).to_string();
            if username.is_empty() || real_name.is_empty() {
                continue;
            }
            by_username.insert(username, real_name);
        }

        let mut by_label: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for name in by_username.values() {
            let identities = by_label.entry(Self::label_of(name).to_string()).or_default();
            if !identities.contains(name) {
                identities.push(name.clone());
            }
        }
        for identities in by_label.values_mut() {
            identities.sort();
        }

        Self {
            by_username,
            by_label,
        }
    }

    pub fn len(&self) -> usize {
        self.by_username.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_username.is_empty()
    }

    /// Real name of a chat user, with or without a leading '@'
    pub fn identity_for(&self, username: &str) -> Option<&str> {
        self.by_username
            .get(strip_at(username.trim()))
            .map(String::as_str)
    }

    /// Reverse lookup: sheet label -> full identity, only when exactly one
    /// person carries the label
    pub fn identity_for_label(&self, label: &str) -> Option<&str> {
        match self.identities_for_label(label) {
            [only] => Some(only.as_str()),
            _ => None,
        }
    }

    /// Every identity carrying `label`, sorted
    pub fn identities_for_label(&self, label: &str) -> &[String] {
        self.by_label
            .get(label.trim())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn is_shared_label(&self, label: &str) -> bool {
        self.identities_for_label(label).len() > 1
    }

    /// Labels carried by more than one person, with their identities
    pub fn shared_labels(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.by_label
            .iter()
            .filter(|(_, identities)| identities.len() > 1)
            .map(|(label, identities)| (label.as_str(), identities.as_slice()))
    }

    /// Resolve a sheet label while rebuilding a queue.
    ///
    /// A shared label goes to the first entry of `preferred` (the queue as
    /// known before the rebuild) that carries it and is not `taken` yet. That
    /// entry may be the bare label itself, which keeps an unattributed row in
    /// its place. With no such entry the label stays unresolved rather than
    /// being pinned on someone who never joined.
    pub fn resolve_label(
        &self,
        label: &str,
        preferred: &[String],
        taken: &HashSet<String>,
    ) -> Option<String> {
        match self.identities_for_label(label) {
            [] => None,
            [only] => Some(only.clone()),
            shared => preferred
                .iter()
                .find(|entry| {
                    (entry.as_str() == label || shared.contains(*entry)) && !taken.contains(*entry)
                })
                .filter(|entry| entry.as_str() != label)
                .cloned(),
        }
    }

    /// Sheet label of an identity (its first word)
    pub fn label_of(identity: &str) -> &str {
        let identity = normalize(identity);
        identity.split_whitespace().next().unwrap_or(identity)
    }
}

/// Identities compare by exact string after trimming, nothing more
pub fn normalize(identity: &str) -> &str {
    identity.trim()
}

fn strip_at(username: &str) -> &str {
    username.strip_prefix('@').unwrap_or(username)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> Roster {
        Roster::new(vec![
            UserMapping::new("ivan", "Ivanov Ivan"),
            UserMapping::new("@petr", "  Petrov Petr "),
            UserMapping::new("", "Nobody Here"),
            UserMapping::new("olga", "Ivanova Olga"),
        ])
    }

    #[test]
    fn test_identity_for_username() {
        let roster = roster();
        assert_eq!(roster.identity_for("ivan"), Some("Ivanov Ivan"));
        assert_eq!(roster.identity_for("@ivan"), Some("Ivanov Ivan"));
        assert_eq!(roster.identity_for("petr"), Some("Petrov Petr"));
        assert_eq!(roster.identity_for("unknown"), None);
        assert_eq!(roster.len(), 3);
    }

    #[test]
    fn test_label_round_trip() {
        let roster = roster();
        assert_eq!(Roster::label_of("Ivanov Ivan"), "Ivanov");
        assert_eq!(Roster::label_of("Mononym"), "Mononym");
        assert_eq!(roster.identity_for_label("Petrov"), Some("Petrov Petr"));
        assert_eq!(roster.identity_for_label(" Ivanova "), Some("Ivanova Olga"));
        assert_eq!(roster.identity_for_label("Sidorov"), None);
    }

    #[test]
    fn test_shared_surname_is_not_resolved_blindly() {
        let roster = Roster::new(vec![
            UserMapping::new("b", "Smirnov Boris"),
            UserMapping::new("a", "Smirnov Anton"),
            UserMapping::new("ivan", "Ivanov Ivan"),
        ]);
        assert_eq!(roster.identity_for_label("Smirnov"), None);
        assert_eq!(
            roster.identities_for_label("Smirnov"),
            ["Smirnov Anton".to_string(), "Smirnov Boris".to_string()]
        );
        assert!(roster.is_shared_label("Smirnov"));
        assert!(!roster.is_shared_label("Ivanov"));

        let shared: Vec<&str> = roster.shared_labels().map(|(label, _)| label).collect();
        assert_eq!(shared, vec!["Smirnov"]);
    }

    #[test]
    fn test_resolve_label_prefers_known_queue() {
        let roster = Roster::new(vec![
            UserMapping::new("b", "Smirnov Boris"),
            UserMapping::new("a", "Smirnov Anton"),
            UserMapping::new("ivan", "Ivanov Ivan"),
        ]);
        let queue = vec!["Smirnov Boris".to_string()];
        let mut taken = HashSet::new();

        assert_eq!(
            roster.resolve_label("Smirnov", &queue, &taken).as_deref(),
            Some("Smirnov Boris")
        );
        taken.insert("Smirnov Boris".to_string());
        assert_eq!(roster.resolve_label("Smirnov", &queue, &taken), None);
        assert_eq!(roster.resolve_label("Smirnov", &[], &HashSet::new()), None);
        assert_eq!(
            roster.resolve_label("Ivanov", &[], &HashSet::new()).as_deref(),
            Some("Ivanov Ivan")
        );
        assert_eq!(roster.resolve_label("Sidorov", &queue, &taken), None);

        // An unattributed row ahead of Anton keeps the first Smirnov
        let queue = vec!["Smirnov".to_string(), "Smirnov Anton".to_string()];
        let mut taken = HashSet::new();
        assert_eq!(roster.resolve_label("Smirnov", &queue, &taken), None);
        taken.insert("Smirnov".to_string());
        assert_eq!(
            roster.resolve_label("Smirnov", &queue, &taken).as_deref(),
            Some("Smirnov Anton")
        );
    }
}
