//! Error types for msikit-core

use thiserror::Error;

/// Result type alias using msikit-core's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for msikit
#[derive(Error, Debug)]
pub enum Error {
    /// Package container missing or malformed
    #[error("Cannot open package {path}: {reason}")]
    Open { path: String, reason: String },

    /// Unknown table, unknown column, or column/value type mismatch
    #[error("Schema violation: {message}")]
    Schema { message: String },

    /// Primary key collision within a table
    #[error("Duplicate primary key {key} in table {table}")]
    DuplicateKey { table: String, key: String },

    /// Two directory nodes share an identifier
    #[error("Duplicate directory identifier: {id}")]
    DuplicateIdentifier { id: String },

    /// Directory traversal revisited a node
    #[error("Cycle detected in directory tree at {id}")]
    Cycle { id: String },

    /// Sequence number collision within a sequence table
    #[error("Duplicate sequence number {sequence} in table {table}")]
    DuplicateSequence { table: String, sequence: i32 },

    /// Update or reference target absent
    #[error("No row in table {table} matches {key}")]
    NotFound { table: String, key: String },

    /// Source file missing at insert or pack time
    #[error("Source file not found: {path}")]
    FileNotFound { path: String },

    /// Precondition on a row or handle violated
    #[error("Validation failed: {message}")]
    Validation { message: String },

    /// I/O failure while flushing the transaction buffer
    #[error("Commit failed: {0}")]
    Commit(#[source] std::io::Error),

    /// I/O failure while writing the cabinet archive
    #[error("Archive write failed: {0}")]
    ArchiveWrite(#[source] std::io::Error),
}

impl Error {
    /// Create an open error
    pub fn open(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Open {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a schema violation error
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
        }
    }

    /// Create a duplicate key error
    pub fn duplicate_key(table: impl Into<String>, key: impl Into<String>) -> Self {
        Self::DuplicateKey {
            table: table.into(),
            key: key.into(),
        }
    }

    /// Create a duplicate directory identifier error
    pub fn duplicate_identifier(id: impl Into<String>) -> Self {
        Self::DuplicateIdentifier { id: id.into() }
    }

    /// Create a cycle error
    pub fn cycle(id: impl Into<String>) -> Self {
        Self::Cycle { id: id.into() }
    }

    /// Create a duplicate sequence error
    pub fn duplicate_sequence(table: impl Into<String>, sequence: i32) -> Self {
        Self::DuplicateSequence {
            table: table.into(),
            sequence,
        }
    }

    /// Create a not found error
    pub fn not_found(table: impl Into<String>, key: impl Into<String>) -> Self {
        Self::NotFound {
            table: table.into(),
            key: key.into(),
        }
    }

    /// Create a file not found error
    pub fn file_not_found(path: impl Into<String>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}
