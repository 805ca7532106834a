//! Error types for the trip map pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Coarse category of a [`TripMapError`], used to decide whether a run
/// can continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad CSV shape or content. Raised before any network call.
    Parse,
    /// A place name could not be resolved to coordinates.
    Geocode,
    /// A road route could not be fetched. Recoverable.
    Routing,
    /// Reading or writing a file failed.
    Io,
    /// Transport or template failures.
    Other,
}

/// Errors produced while building a trip map.
#[derive(Error, Debug)]
pub enum TripMapError {
    #[error("failed to read CSV {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("CSV must have '{date_column}' and '{place_column}' columns (found: {found})")]
    MissingColumns {
        date_column: String,
        place_column: String,
        found: String,
    },

    #[error("line {line}: unparseable date '{value}'")]
    InvalidDate { line: usize, value: String },

    #[error("line {line}: empty place name")]
    EmptyPlace { line: usize },

    #[error("no locations found in {0}")]
    NoRecords(PathBuf),

    #[error("could not geocode '{place}': {reason}")]
    Geocode { place: String, reason: String },

    #[error("routing failed: {0}")]
    Routing(String),

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Transport failure from a provider that does not speak reqwest.
    #[error("request failed: {0}")]
    Transport(String),

    #[error("template error: {0}")]
    Template(String),
}

impl TripMapError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TripMapError::Csv { .. }
            | TripMapError::MissingColumns { .. }
            | TripMapError::InvalidDate { .. }
            | TripMapError::EmptyPlace { .. }
            | TripMapError::NoRecords(_) => ErrorKind::Parse,
            TripMapError::Geocode { .. } => ErrorKind::Geocode,
            TripMapError::Routing(_) => ErrorKind::Routing,
            TripMapError::Io { .. } => ErrorKind::Io,
            TripMapError::Http(_) | TripMapError::Transport(_) | TripMapError::Template(_) => {
                ErrorKind::Other
            }
        }
    }

    /// Routing failures degrade a segment; everything else aborts the run.
    pub fn is_fatal(&self) -> bool {
        self.kind() != ErrorKind::Routing
    }
}

/// Result alias for trip map operations.
pub type Result<T> = std::result::Result<T, TripMapError>;
