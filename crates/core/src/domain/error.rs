// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid weekday '{value}' for subject '{subject}'")]
    InvalidWeekday { subject: String, value: String },

    #[error("Invalid time of day '{value}' for subject '{subject}' (expected HH:MM)")]
    InvalidTime { subject: String, value: String },

    #[error("Duplicate subject {field}: {value}")]
    Duplicate { field: &'static str, value: String },

    #[error("Validation error: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
