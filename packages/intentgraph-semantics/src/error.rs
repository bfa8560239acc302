//! Error types for intentgraph-semantics
//!
//! Mirrors the store taxonomy so resolver and builder failures keep their
//! kind (and ambiguity candidates) across the crate boundary.

use std::fmt;
use thiserror::Error;

use intentgraph_store::StoreError;

/// Semantic layer error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bytes could not be parsed into any useful tree
    Parse,
    /// Rules or state-directory configuration problems
    Config,
    /// File source enumeration failed
    Source,
    /// Underlying store failure (database, object store, serialization)
    Storage,
    /// Node, ref, slug, or selector target does not exist
    NotFound,
    /// Short id prefix matched more than one node
    Ambiguous,
    /// Resolved node has a different kind than requested
    KindMismatch,
    /// Attempt to mutate what must stay immutable
    Conflict,
    /// Operation was cancelled by the caller
    Cancelled,
    /// Broken internal assumption
    InvariantViolation,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Parse => "parse",
            ErrorKind::Config => "config",
            ErrorKind::Source => "source",
            ErrorKind::Storage => "storage",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Ambiguous => "ambiguous",
            ErrorKind::KindMismatch => "kind_mismatch",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::InvariantViolation => "invariant_violation",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Semantic layer error type
#[derive(Debug, Error)]
#[error("[{kind}] {message}")]
pub struct SemanticError {
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
    pub kind: ErrorKind,
    pub message: String,
    /// Populated only for `Ambiguous`
    pub candidates: Vec<String>,
}

impl SemanticError {
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
    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Parse, message)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, message)
    }

    pub fn source_failure(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Source, message)
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, format!("not found: {}", what.into()))
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

    pub fn invariant(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvariantViolation, message)
    }

    pub fn cancelled(operation: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::Cancelled,
            format!("cancelled: {}", operation.into()),
        )
    }
}

impl From<StoreError> for SemanticError {
    fn from(err: StoreError) -> Self {
        use intentgraph_store::ErrorKind as Sk;
        let kind = match err.kind {
            Sk::NotFound => ErrorKind::NotFound,
            Sk::Ambiguous => ErrorKind::Ambiguous,
            Sk::KindMismatch => ErrorKind::KindMismatch,
            Sk::Conflict => ErrorKind::Conflict,
            Sk::ParseFailure => ErrorKind::Parse,
            Sk::Cancelled => ErrorKind::Cancelled,
            Sk::InvariantViolation => ErrorKind::InvariantViolation,
            Sk::Io | Sk::Database | Sk::Serialization => ErrorKind::Storage,
        };
        let mut out = Self::new(kind, err.message.clone());
        out.candidates = err.candidates.clone();
        out.with_source(err)
    }
}

impl From<std::io::Error> for SemanticError {
    fn from(err: std::io::Error) -> Self {
        SemanticError::new(ErrorKind::Source, format!("I/O error: {}", err)).with_source(err)
    }
}

impl From<serde_yaml::Error> for SemanticError {
    fn from(err: serde_yaml::Error) -> Self {
        SemanticError::config(format!("YAML error: {}", err)).with_source(err)
    }
}

impl From<serde_json::Error> for SemanticError {
    fn from(err: serde_json::Error) -> Self {
        SemanticError::new(ErrorKind::Storage, format!("JSON error: {}", err)).with_source(err)
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, SemanticError>;
