use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

/// Errors surfaced by ingestion, configuration and rendering.
///
/// The assignment engine itself never fails; "nobody can take this slot" is
/// an empty slot, not an error.
#[derive(Error, Debug)]
pub enum RosterError {
    #[error("no availability file found (looked for: {})", searched.join(", "))]
    NoSource { searched: Vec<String> },

    #[error("no usable staff rows in {}", path.display())]
    EmptyRoster { path: PathBuf },

    #[error("unrecognized shift label {label:?} for {staff} on weekday {weekday}")]
    UnrecognizedLabel {
        staff: String,
        weekday: u8,
        label: String,
    },

    #[error("invalid availability override for {staff}: {value:?}")]
    InvalidOverride { staff: String, value: String },

    #[error("invalid date {0:?}, expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("invalid date range: {start} is after {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("a date range needs both a start and an end")]
    IncompleteRange,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to parse configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("failed to write spreadsheet: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

impl RosterError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RosterError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, RosterError>;
