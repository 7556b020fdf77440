//! Execution context.
//!
//! A migration run either executes statements on a live connection or
//! renders them into an offline SQL script. [`ExecContext`] is the single
//! place statements leave the crate, whichever mode is active.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::connection::{Connection, Row};
use crate::error::{MigrateError, Result};

/// Batch separator used when none is configured.
pub const DEFAULT_BATCH_SEPARATOR: &str = "$";

/// Statement terminator written after each statement in script mode.
pub const COMMAND_TERMINATOR: &str = ";";

/// Per-run options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextOptions {
    /// Token written after each statement in script mode. An empty string
    /// disables the separator.
    #[serde(default)]
    pub vertica_batch_separator: Option<String>,
}

impl ContextOptions {
    /// Creates options with every setting at its default.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads options from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|e| MigrateError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Sets the batch separator.
    #[must_use]
    pub fn with_batch_separator(mut self, separator: impl Into<String>) -> Self {
        self.vertica_batch_separator = Some(separator.into());
        self
    }

    /// Returns the effective batch separator, `None` when disabled.
    #[must_use]
    pub fn batch_separator(&self) -> Option<&str> {
        match self.vertica_batch_separator.as_deref() {
            None => Some(DEFAULT_BATCH_SEPARATOR),
            Some("") => None,
            Some(separator) => Some(separator),
        }
    }
}

/// Where statements go.
pub enum ExecutionMode {
    /// Statements run on a live connection.
    Connected(Box<dyn Connection>),
    /// Statements are appended to a script.
    Script(String),
}

/// Emits statements for a migration run.
pub struct ExecContext {
    mode: ExecutionMode,
}

impl ExecContext {
    /// Creates a context that executes on `connection`.
    pub fn connected(connection: impl Connection + 'static) -> Self {
        Self {
            mode: ExecutionMode::Connected(Box::new(connection)),
        }
    }

    /// Creates a context that renders an offline script.
    #[must_use]
    pub const fn script() -> Self {
        Self {
            mode: ExecutionMode::Script(String::new()),
        }
    }

    /// Returns true in script (offline) mode.
    #[must_use]
    pub const fn as_sql(&self) -> bool {
        matches!(self.mode, ExecutionMode::Script(_))
    }

    /// Executes one statement, or appends it to the script.
    pub fn exec(&mut self, sql: &str) -> Result<()> {
        debug!(sql = %sql, "Executing SQL");
        if let ExecutionMode::Connected(connection) = &mut self.mode {
            return connection
                .execute(sql)
                .map_err(|source| MigrateError::execution(sql, source));
        }
        let text = format!("{}{}", sql.replace('\t', "    ").trim(), COMMAND_TERMINATOR);
        self.static_output(&text);
        Ok(())
    }

    /// Writes text to the script verbatim. Ignored when connected.
    pub fn static_output(&mut self, text: &str) {
        if let ExecutionMode::Script(buffer) = &mut self.mode {
            buffer.push_str(text);
            buffer.push_str("\n\n");
        }
    }

    /// Runs a catalog query. Returns `None` in script mode, where there is
    /// nothing to ask.
    pub fn query(&mut self, sql: &str) -> Result<Option<Vec<Row>>> {
        match &mut self.mode {
            ExecutionMode::Connected(connection) => {
                debug!(sql = %sql, "Querying catalog");
                connection
                    .query(sql)
                    .map(Some)
                    .map_err(|source| MigrateError::execution(sql, source))
            }
            ExecutionMode::Script(_) => Ok(None),
        }
    }

    /// Returns the script rendered so far.
    #[must_use]
    pub fn script_text(&self) -> Option<&str> {
        match &self.mode {
            ExecutionMode::Script(buffer) => Some(buffer),
            ExecutionMode::Connected(_) => None,
        }
    }

    /// Consumes the context and returns the rendered script.
    #[must_use]
    pub fn into_script(self) -> Option<String> {
        match self.mode {
            ExecutionMode::Script(buffer) => Some(buffer),
            ExecutionMode::Connected(_) => None,
        }
    }
}
