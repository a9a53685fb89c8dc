//! Error types for schedule-engine operations.

use chrono::NaiveDateTime;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Invalid range: end {end} is not after start {start}")]
    InvalidRange {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },

    #[error("Invalid recurrence rule: {0}")]
    InvalidRecurrenceRule(String),

    #[error("Invalid grid config: {0}")]
    InvalidGridConfig(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Event lookup failed: {0}")]
    Lookup(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
