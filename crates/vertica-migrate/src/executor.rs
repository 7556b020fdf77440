//! Migration executor.
//!
//! This module feeds the operations of a migration, in order, through a
//! [`MigrationImpl`]. Whether statements hit a live database or land in a
//! script is decided by the implementation's execution context.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::ddl_impl::MigrationImpl;
use crate::error::{MigrateError, Result};
use crate::operations::MigrationOperation;

/// A migration ready to be executed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutableMigration {
    /// Application/module name.
    pub app: String,
    /// Migration name.
    pub name: String,
    /// Migration operations.
    #[serde(default)]
    pub operations: Vec<MigrationOperation>,
}

impl ExecutableMigration {
    /// Creates a new executable migration.
    #[must_use]
    pub fn new(app: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            app: app.into(),
            name: name.into(),
            operations: Vec::new(),
        }
    }

    /// Reads a migration plan from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|e| MigrateError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Adds an operation to this migration.
    #[must_use]
    pub fn operation(mut self, op: MigrationOperation) -> Self {
        self.operations.push(op);
        self
    }

    /// Adds operations to this migration.
    #[must_use]
    pub fn operations(mut self, ops: Vec<MigrationOperation>) -> Self {
        self.operations.extend(ops);
        self
    }

    /// Returns the full migration identifier.
    #[must_use]
    pub fn id(&self) -> String {
        format!("{}/{}", self.app, self.name)
    }

    /// Returns the reverse operations for rollback, `None` if any operation
    /// cannot be reversed.
    #[must_use]
    pub fn reverse_operations(&self) -> Option<Vec<MigrationOperation>> {
        self.operations.iter().rev().map(|op| op.reverse()).collect()
    }
}

/// Runs migrations through a [`MigrationImpl`].
pub struct MigrationExecutor<M: MigrationImpl> {
    imp: M,
}

impl<M: MigrationImpl> MigrationExecutor<M> {
    /// Creates a new migration executor.
    pub fn new(imp: M) -> Self {
        Self { imp }
    }

    /// Returns the implementation.
    pub fn implementation(&self) -> &M {
        &self.imp
    }

    /// Consumes the executor and returns the implementation.
    pub fn into_inner(self) -> M {
        self.imp
    }

    /// Applies a single migration. Stops at the first failing operation.
    pub fn apply(&mut self, migration: &ExecutableMigration) -> Result<()> {
        info!(
            app = %migration.app,
            name = %migration.name,
            operations = migration.operations.len(),
            "Applying migration"
        );

        for operation in &migration.operations {
            self.imp.run_operation(operation)?;
        }

        info!(
            app = %migration.app,
            name = %migration.name,
            "Migration applied successfully"
        );
        Ok(())
    }

    /// Runs the reverse of a migration.
    pub fn rollback(&mut self, migration: &ExecutableMigration) -> Result<()> {
        info!(
            app = %migration.app,
            name = %migration.name,
            "Rolling back migration"
        );

        let reverse_ops = migration
            .reverse_operations()
            .ok_or_else(|| MigrateError::NotReversible(migration.id()))?;
        for operation in &reverse_ops {
            self.imp.run_operation(operation)?;
        }

        info!(
            app = %migration.app,
            name = %migration.name,
            "Migration rolled back successfully"
        );
        Ok(())
    }

    /// Applies multiple migrations in order.
    pub fn apply_all(&mut self, migrations: &[ExecutableMigration]) -> Result<()> {
        for migration in migrations {
            self.apply(migration)?;
        }
        Ok(())
    }
}
