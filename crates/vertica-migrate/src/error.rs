//! Error types for the migration system.

use std::path::PathBuf;

/// Error type returned by a [`Connection`](crate::connection::Connection).
pub type ConnectionError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur during migration operations.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// A statement failed on the live connection. The driver error is kept as is.
    #[error("{source}")]
    Execution {
        /// The statement that failed.
        statement: String,
        /// The error reported by the connection.
        #[source]
        source: ConnectionError,
    },

    /// A catalog query returned rows that could not be interpreted.
    #[error("Unexpected catalog result: {0}")]
    Reflection(String),

    /// Reflection found no column with the requested name.
    #[error("Column '{column}' not found in table '{table}'")]
    ColumnNotFound {
        /// Table name (schema-qualified when a schema was given).
        table: String,
        /// Column name.
        column: String,
    },

    /// Migration contains an operation that cannot be reversed.
    #[error("Migration '{0}' is not reversible")]
    NotReversible(String),

    /// IO error (reading plans, writing scripts).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse a plan or options file.
    #[error("Failed to parse '{path}': {message}")]
    ParseError {
        /// Path to the file.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MigrateError {
    /// Wraps a connection error together with the statement that caused it.
    pub fn execution(statement: impl Into<String>, source: ConnectionError) -> Self {
        Self::Execution {
            statement: statement.into(),
            source,
        }
    }
}

/// Result type for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
