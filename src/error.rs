use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlannerError {
    #[error("course code {0:?} is reserved or empty")]
    InvalidCourseCode(String),

    #[error("start time {start} must be before end time {end}")]
    InvalidTimeRange { start: String, end: String },

    #[error("invalid time {0:?}, expected HH:MM")]
    InvalidTime(String),

    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("unknown weekday: {0}")]
    UnknownWeekday(String),

    #[error("invalid color {0:?}, expected #RRGGBB")]
    InvalidColor(String),

    #[error("{0} is not enabled in the calendar settings")]
    DayNotEnabled(String),

    #[error("slot must be between 10 and 120 minutes in steps of 5, got {0}")]
    InvalidSlot(u32),

    #[error("unknown selection mode: {0}")]
    UnknownSelectionMode(String),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse JSON document: {0}")]
    JsonDecode(#[source] serde_json::Error),

    #[error("failed to encode JSON document: {0}")]
    JsonEncode(#[source] serde_json::Error),

    #[error("failed to parse TOML config: {0}")]
    TomlDecode(#[from] toml::de::Error),
}
