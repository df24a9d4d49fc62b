//! Error types for schedule engine operations.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid IANA timezone: {0}")]
    InvalidTimezone(String),

    #[error("week must be between 1 and {max_week}")]
    InvalidWeekIndex { max_week: u32 },

    #[error("startWeek and endWeek are required when range is weeks")]
    MissingWeekRange,

    #[error("startWeek must be less than or equal to endWeek")]
    InvalidWeekRange,

    #[error("Invalid calendar document: {0}")]
    InvalidCalendar(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
