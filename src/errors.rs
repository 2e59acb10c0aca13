// Error types for paddock_planner

use std::io;

use thiserror::Error;

use crate::session::FieldErrors;
use crate::steps::StepId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClockError {
    #[error("time must be written as HH:MM, got {0:?}")]
    Malformed(String),
    #[error("time out of range: {hour:02}:{minute:02}")]
    OutOfRange { hour: u32, minute: u32 },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CalendarError {
    #[error("month must be between 1 and 12, got {0}")]
    InvalidMonth(u32),
    #[error("year out of range: {0}")]
    InvalidYear(i32),
}

/// Raised by the collaborator that owns event persistence.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SinkError {
    #[error("team not found: {0}")]
    TeamNotFound(String),
    #[error("roster {roster_id} does not belong to team {team_id}")]
    RosterNotFound { team_id: String, roster_id: String },
    #[error("driver not found: {0}")]
    DriverNotFound(String),
    #[error("event not found: {0}")]
    EventNotFound(String),
    #[error("{0}")]
    Rejected(String),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum WizardError {
    #[error("step {step} incomplete: {errors}")]
    StepIncomplete { step: StepId, errors: FieldErrors },
    #[error("championship events cannot be created yet")]
    BranchUnavailable,
    #[error("step {0} is not on the current path")]
    OffPath(StepId),
    #[error("event was not saved: {message}")]
    Rejected { message: String },
}

impl From<SinkError> for WizardError {
    fn from(value: SinkError) -> Self {
        WizardError::Rejected {
            message: value.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("failed to parse TOML header: {0}")]
    TomlDecode(#[from] toml::de::Error),
    #[error("failed to encode TOML header: {0}")]
    TomlEncode(#[from] toml::ser::Error),
    #[error("failed to parse JSONL event on line {line}: {source}")]
    JsonDecode {
        line: usize,
        source: serde_json::Error,
    },
    #[error("failed to encode JSONL event: {0}")]
    JsonEncode(serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings file {path}: {source}")]
    Read { path: String, source: io::Error },
    #[error("failed to parse settings file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}

#[derive(Debug, Error)]
pub enum DraftError {
    #[error("failed to read draft {path}: {source}")]
    Read { path: String, source: io::Error },
    #[error("failed to parse draft: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("session #{index} is invalid: {errors}")]
    Session { index: usize, errors: FieldErrors },
    #[error(transparent)]
    Wizard(#[from] WizardError),
}
