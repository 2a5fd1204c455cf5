//! Error types for the meetup database.

use std::path::PathBuf;
use thiserror::Error;

use crate::revision::Phase;

/// Main error type for meetupdb operations.
#[derive(Debug, Error)]
pub enum MeetupError {
    /// Error reading or writing a file.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document tree declares a schema version this build cannot load.
    #[error("Unsupported schema version {found} (expected {expected})")]
    UnsupportedSchemaVersion { found: u32, expected: u32 },

    /// Two rows share a natural key but disagree on their values.
    #[error("Conflicting duplicate key in {table}: {key} (column '{column}' differs)")]
    ConflictingDuplicateKey {
        table: &'static str,
        key: String,
        column: &'static str,
    },

    /// A talk names a speaker that was never declared in the batch.
    #[error("Unknown speaker '{speaker}' in talk '{talk}'")]
    UnknownSpeakerReference { speaker: String, talk: String },

    /// A row points at a city, venue or series that does not exist.
    #[error("Unknown {kind} '{key}' referenced by {referrer}")]
    UnknownReference {
        kind: &'static str,
        key: String,
        referrer: String,
    },

    /// Rows of one table were staged with different column sets.
    #[error("Schema drift in {table}: expected columns [{expected}], got [{found}]")]
    SchemaDrift {
        table: &'static str,
        expected: String,
        found: String,
    },

    /// A city, venue or series key is not a valid slug.
    #[error("Invalid slug '{0}'")]
    InvalidSlug(String),

    /// A date, time or date expression could not be parsed.
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// No city or event matched a lookup.
    #[error("{0}")]
    NotFound(String),

    /// More than one city or event matched a lookup that must be unique.
    #[error("{0}")]
    AmbiguousMatch(String),

    /// A document is structurally wrong (missing file, wrong shape).
    #[error("Invalid document '{path}': {message}")]
    Document { path: PathBuf, message: String },

    /// Staging a revision failed during the named phase.
    #[error("Error {phase}: {source}")]
    Revision {
        phase: Phase,
        #[source]
        source: Box<MeetupError>,
    },

    /// YAML serialization/deserialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error from the SQLite backend, surfaced unchanged.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl MeetupError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MeetupError::Io {
            path: path.into(),
            source,
        }
    }

    /// True for lookup failures that should be shown to the user as plain
    /// messages rather than errors.
    pub fn is_lookup_failure(&self) -> bool {
        matches!(self, MeetupError::NotFound(_) | MeetupError::AmbiguousMatch(_))
    }
}

/// Result type alias for meetupdb operations.
pub type Result<T> = std::result::Result<T, MeetupError>;
