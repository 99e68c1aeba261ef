// Static data files: subjects and user mapping
//
// Loaded once at startup and handed to the rest of the core as immutable
// values. Nothing here is re-read while the process runs.

use crate::domain::{Roster, Subject, SubjectCatalog, UserMapping};
use crate::error::{AppError, Result};
use std::path::Path;
use tracing::{info, warn};

/// Parse a subjects file: a JSON array of `{name, day, start, end, code}`
pub fn load_subjects(path: impl AsRef<Path>) -> Result<SubjectCatalog> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|e| {
        AppError::Config(format!("cannot read subjects file {}: {e}", path.display()))
    })?;
    let catalog = parse_subjects(&raw)?;
    info!(path = %path.display(), subjects = catalog.len(), "Subjects loaded");
    Ok(catalog)
}

pub fn parse_subjects(raw: &str) -> Result<SubjectCatalog> {
    let subjects: Vec<Subject> = serde_json::from_str(raw)?;
    Ok(SubjectCatalog::new(subjects)?)
}

/// Parse a user mapping file: a JSON array of `{TelegramUsername, RealName}`.
///
/// A missing file yields an empty roster (nobody can join) with a warning;
/// an unreadable or malformed one is an error.
pub fn load_roster(path: impl AsRef<Path>) -> Result<Roster> {
    let path = path.as_ref();
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "User mapping file not found, starting with an empty roster");
            return Ok(Roster::default());
        }
        Err(e) => return Err(e.into()),
    };
    let roster = parse_roster(&raw)?;
    info!(path = %path.display(), users = roster.len(), "User mapping loaded");
    Ok(roster)
}

pub fn parse_roster(raw: &str) -> Result<Roster> {
    let entries: Vec<UserMapping> = serde_json::from_str(raw)?;
    Ok(Roster::new(entries))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_subjects() {
        let raw = r#"[
            {"name": "Algebra", "day": "ср", "start": "10:00", "end": "11:30", "code": "ALG"},
            {"name": "Physics", "day": "fri", "start": "12:00", "end": "13:30", "code": "PHY"}
        ]"#;
        let catalog = parse_subjects(raw).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.by_token("PHY").unwrap().name, "Physics");
    }

    #[test]
    fn test_duplicate_code_rejected() {
        let raw = r#"[
            {"name": "A", "day": "пн", "start": "10:00", "end": "11:00", "code": "X"},
            {"name": "B", "day": "вт", "start": "10:00", "end": "11:00", "code": "X"}
        ]"#;
        assert!(matches!(parse_subjects(raw), Err(AppError::Domain(_))));
    }

    #[test]
    fn test_parse_roster_field_names() {
        let raw = r#"[{"TelegramUsername": "ivan", "RealName": "Ivanov Ivan"}]"#;
        let roster = parse_roster(raw).unwrap();
        assert_eq!(roster.identity_for("ivan"), Some("Ivanov Ivan"));

        assert!(matches!(
            parse_roster(r#"{"ivan": "x"}"#),
            Err(AppError::Serialization(_))
        ));
    }

    #[test]
    fn test_missing_roster_file_is_empty() {
        let roster = load_roster("/nonexistent/lineup/user_mapping.json").unwrap();
        assert!(roster.is_empty());
    }

    #[test]
    fn test_missing_subjects_file_is_error() {
        assert!(matches!(
            load_subjects("/nonexistent/lineup/subjects.json"),
            Err(AppError::Config(_))
        ));
    }
}
