//! Error types for intentgraph-store

use std::fmt;
use thiserror::Error;

/// Store error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Node, blob, ref, or selector target does not exist
    NotFound,
    /// Short id prefix matched more than one node
    Ambiguous,
    /// Resolved node has a different kind than requested
    KindMismatch,
    /// Attempt to mutate the payload of a content-addressed node
    Conflict,
    /// Bytes could not be parsed into any useful tree
    ParseFailure,
    /// Underlying storage I/O failed
    Io,
    /// Malformed id, edge to an unknown node, or broken internal assumption
    InvariantViolation,
    /// SQLite reported an error
    Database,
    /// Serialization/deserialization errors
    Serialization,
    /// Operation was cancelled by the caller
    Cancelled,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Ambiguous => "ambiguous",
            ErrorKind::KindMismatch => "kind_mismatch",
            ErrorKind::Conflict => "conflict",
            ErrorKind::ParseFailure => "parse_failure",
            ErrorKind::Io => "io",
            ErrorKind::InvariantViolation => "invariant_violation",
            ErrorKind::Database => "database",
            ErrorKind::Serialization => "serialization",
            ErrorKind::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Store error type
///
/// `candidates` is populated only for `Ambiguous`: up to ten node ids
/// sharing the prefix that failed to resolve.
#[derive(Debug, Error)]
#[error("[{kind}] {message}")]
pub struct StoreError {
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
    pub kind: ErrorKind,
    pub message: String,
    pub candidates: Vec<String>,
}

impl StoreError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
            candidates: Vec::new(),
        }
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    // Convenience constructors
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, format!("not found: {}", what.into()))
    }

    pub fn ambiguous(input: impl Into<String>, candidates: Vec<String>) -> Self {
        let mut err = Self::new(
            ErrorKind::Ambiguous,
            format!(
                "ambiguous reference '{}' ({} candidates)",
                input.into(),
                candidates.len()
            ),
        );
        err.candidates = candidates;
        err
    }

    pub fn kind_mismatch(input: impl Into<String>, expected: &str, actual: &str) -> Self {
        Self::new(
            ErrorKind::KindMismatch,
            format!(
                "'{}' resolved to a {} node, expected {}",
                input.into(),
                actual,
                expected
            ),
        )
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn parse_failure(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ParseFailure, message)
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvariantViolation, message)
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Database, message)
    }

    pub fn cancelled(operation: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::Cancelled,
            format!("cancelled: {}", operation.into()),
        )
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::database(format!("SQLite error: {}", err)).with_source(err)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::new(ErrorKind::Serialization, format!("JSON error: {}", err)).with_source(err)
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::new(ErrorKind::Io, format!("I/O error: {}", err)).with_source(err)
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, StoreError>;
