//! Error types for CQL store operations
//!
//! Every fallible store, snapshot, aggregate, lock and persistence operation
//! reports failure through the CqlError enum. Lookups never hand back
//! placeholder objects: a missing column is `ColumnNotFound`, not an empty
//! column with a magic name.

use std::error::Error;
use std::fmt;
use std::path::PathBuf;

use crate::value::ValueKind;

/// How a column was looked up when it could not be found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnKey {
    /// Lookup by column name
    Name(String),
    /// Lookup by column id
    Id(u32),
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnKey::Name(name) => write!(f, "'{}'", name),
            ColumnKey::Id(id) => write!(f, "#{}", id),
        }
    }
}

/// Which snapshot sequence an operation referred to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotKind {
    Table,
    Document,
}

impl fmt::Display for SnapshotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotKind::Table => f.write_str("table"),
            SnapshotKind::Document => f.write_str("document"),
        }
    }
}

/// CQL error types with detailed context
#[derive(Debug, Clone)]
pub enum CqlError {
    /// No column matches the given name or id
    ColumnNotFound {
        key: ColumnKey,
    },

    /// Column exists but holds no row with the given index or id
    RowNotFound {
        column: String,
        /// Human-readable row selector ("index 3", "id 812")
        row: String,
    },

    /// Strict mode refused to overwrite an existing column name
    DuplicateColumnName {
        name: String,
    },

    /// Average/Max/Min over a column without numeric rows
    EmptyAggregate {
        column: String,
        function: &'static str,
    },

    /// Identifier space exhausted or retry bound hit
    ResourceExhausted {
        /// What was being allocated ("column id", "row id")
        resource: &'static str,
        /// Number of draws attempted before giving up
        attempts: u32,
    },

    /// Rollback requested with no snapshot taken
    SnapshotHistoryEmpty {
        kind: SnapshotKind,
    },

    /// Rollback target is not in the snapshot sequence
    UnknownSnapshot {
        kind: SnapshotKind,
    },

    /// Another holder owns the lock on this path
    LockConflict {
        path: PathBuf,
    },

    /// I/O operation failed (open/create/write)
    Io {
        /// The file path where the error occurred
        path: Option<PathBuf>,
        /// The underlying I/O error kind
        kind: std::io::ErrorKind,
        /// Human-readable description
        message: String,
    },

    /// A value did not have the kind an operation expected
    TypeMismatch {
        expected: String,
        found: String,
    },

    /// A store operation ran before any document was made active
    NoActiveDocument,

    /// Persisted table file could not be parsed
    Parse {
        path: PathBuf,
        line: usize,
        reason: String,
    },
}

impl CqlError {
    pub(crate) fn type_mismatch(expected: ValueKind, found: ValueKind) -> Self {
        CqlError::TypeMismatch {
            expected: expected.name().to_string(),
            found: found.name().to_string(),
        }
    }

    /// Wrap an I/O error with the path it happened on.
    pub fn io_at(path: impl Into<PathBuf>, err: &std::io::Error, context: &str) -> Self {
        CqlError::Io {
            path: Some(path.into()),
            kind: err.kind(),
            message: format!("{}: {}", context, err),
        }
    }
}

impl fmt::Display for CqlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CqlError::ColumnNotFound { key } => write!(f, "Column {} not found", key),

            CqlError::RowNotFound { column, row } => {
                write!(f, "Row with {} not found in column '{}'", row, column)
            }

            CqlError::DuplicateColumnName { name } => {
                write!(f, "Column '{}' already exists", name)
            }

            CqlError::EmptyAggregate { column, function } => {
                write!(f, "{} over column '{}' has no numeric rows", function, column)
            }

            CqlError::ResourceExhausted { resource, attempts } => {
                write!(f, "No free {} after {} attempts", resource, attempts)
            }

            CqlError::SnapshotHistoryEmpty { kind } => {
                write!(f, "No {} snapshot to roll back to", kind)
            }

            CqlError::UnknownSnapshot { kind } => {
                write!(f, "Rollback target is not a recorded {} snapshot", kind)
            }

            CqlError::LockConflict { path } => {
                write!(f, "File {} is locked by another holder", path.display())
            }

            CqlError::Io { path, kind, message } => {
                if let Some(path) = path {
                    write!(f, "I/O error in {}: {} ({})", path.display(), message, kind)
                } else {
                    write!(f, "I/O error: {} ({})", message, kind)
                }
            }

            CqlError::TypeMismatch { expected, found } => {
                write!(f, "Type mismatch: expected {}, found {}", expected, found)
            }

            CqlError::NoActiveDocument => f.write_str("No active document; call new_document first"),

            CqlError::Parse { path, line, reason } => {
                write!(f, "Parse error in {} at line {}: {}", path.display(), line, reason)
            }
        }
    }
}

impl Error for CqlError {}

/// Convert std::io::Error to CqlError::Io
impl From<std::io::Error> for CqlError {
    fn from(err: std::io::Error) -> Self {
        CqlError::Io {
            path: None,
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Result type alias for CQL operations
pub type CqlResult<T> = Result<T, CqlError>;
