//! Vertica dialect for schema migrations.
//!
//! `vertica-migrate` turns migration operations into DDL that Vertica
//! accepts, either executing it on a live connection or rendering an offline
//! SQL script. Vertica differs from the usual migration targets in a few
//! ways this crate papers over:
//! - Most column type changes are rebuilt through a shadow column
//! - Unique indexes become `ADD UNIQUE` constraints; other indexes are skipped
//! - Column drops cascade to dependent projections
//! - Auto-increment columns use `IDENTITY(1,1)`
//!
//! # Architecture
//!
//! - **Operations** - Schema changes like `AddColumn`, `AlterColumn`, `CreateIndex`
//! - **Dialect** - Renders one DDL element to one statement
//! - **Implementation** - Sequences statements per operation (`DefaultImpl`, `VerticaImpl`)
//! - **Context** - Sends statements to a connection or a script
//! - **Reflection** - Reads column and constraint metadata from `v_catalog`
//! - **Autodetector** - Diffs catalog columns against desired columns
//! - **Executor** - Runs a migration's operations in order
//!
//! # Example
//!
//! ```rust
//! use vertica_migrate::prelude::*;
//!
//! let mut imp = VerticaImpl::offline(&ContextOptions::new());
//! imp.alter_column(
//!     &AlterColumnRequest::new("users", "age")
//!         .set_type(SqlType::BigInt)
//!         .existing_type(SqlType::Integer),
//! )
//! .unwrap();
//!
//! let script = imp.into_script().unwrap();
//! assert!(script.contains("ADD COLUMN \"age_temp\" BIGINT"));
//! assert!(script.contains("SELECT MAKE_AHM_NOW()"));
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # Render a plan as a Vertica script
//! vertica-migrate sql-migrate --plan plan.json --output migrate.sql
//!
//! # Compare two type spellings
//! vertica-migrate compare-types INT INTEGER
//! ```

pub mod autodetector;
pub mod connection;
pub mod context;
pub mod ddl_impl;
pub mod dialect;
pub mod error;
pub mod executor;
pub mod operations;
pub mod reflection;
pub mod schema;
pub mod vertica;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::autodetector::{Autodetector, AutodetectorOptions};
    pub use crate::connection::{Connection, Row};
    pub use crate::context::{ContextOptions, ExecContext, ExecutionMode};
    pub use crate::ddl_impl::{DefaultImpl, MigrationImpl};
    pub use crate::dialect::{
        DdlElement, GenericDialect, MigrationDialect, TableRef, VerticaDialect,
    };
    pub use crate::error::{ConnectionError, MigrateError, Result};
    pub use crate::executor::{ExecutableMigration, MigrationExecutor};
    pub use crate::operations::{
        AlterColumnRequest, DefaultChange, IndexBuilder, IndexDescriptor, MigrationOperation,
    };
    pub use crate::reflection::{CatalogInspector, ReflectedColumn, ReflectedUniqueConstraint};
    pub use crate::schema::{ColumnSchema, DefaultValue, SqlType, TableSchema};
    pub use crate::vertica::VerticaImpl;
}

/// Trait for migrations defined in Rust code.
///
/// This trait is implemented by migration structs to define schema changes.
pub trait Migration {
    /// Application/module name (e.g., "users", "events").
    const APP: &'static str;

    /// Migration name (e.g., "0001_initial", "0002_widen_ids").
    const NAME: &'static str;

    /// Returns the migration operations.
    fn operations() -> Vec<operations::MigrationOperation>;

    /// Converts to an executable migration.
    fn to_executable() -> executor::ExecutableMigration {
        executor::ExecutableMigration::new(Self::APP, Self::NAME).operations(Self::operations())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::*;

    struct WidenIds;

    impl Migration for WidenIds {
        const APP: &'static str = "events";
        const NAME: &'static str = "0002_widen_ids";

        fn operations() -> Vec<MigrationOperation> {
            vec![MigrationOperation::alter_column(
                AlterColumnRequest::new("events", "id")
                    .set_type(SqlType::BigInt)
                    .existing_type(SqlType::Integer),
            )]
        }
    }

    #[test]
    fn test_migration_trait() {
        assert_eq!(WidenIds::APP, "events");
        assert_eq!(WidenIds::NAME, "0002_widen_ids");
        assert_eq!(WidenIds::operations().len(), 1);
    }

    #[test]
    fn test_to_executable() {
        let executable = WidenIds::to_executable();
        assert_eq!(executable.id(), "events/0002_widen_ids");
        assert_eq!(executable.operations.len(), 1);
    }
}
