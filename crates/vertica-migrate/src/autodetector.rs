//! Autodetector for column-level schema drift.
//!
//! Compares the columns a table has in the catalog with the columns it should
//! have and produces the operations that close the gap. Type differences are
//! judged through the dialect's synonym table, so `INT` against `INTEGER` or
//! `varchar(80)` against `VARCHAR(80)` is not a change.

use tracing::debug;

use crate::dialect::MigrationDialect;
use crate::operations::{AlterColumnRequest, MigrationOperation};
use crate::reflection::ReflectedColumn;
use crate::schema::{ColumnSchema, TableSchema};

/// Options for the autodetector.
#[derive(Debug, Clone)]
pub struct AutodetectorOptions {
    /// Whether to emit `DropColumn` for reflected columns that are no longer
    /// desired.
    pub drop_columns: bool,
}

impl Default for AutodetectorOptions {
    fn default() -> Self {
        Self { drop_columns: true }
    }
}

impl AutodetectorOptions {
    /// Creates default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps columns that exist in the catalog but not in the desired table.
    #[must_use]
    pub fn keep_extra_columns(mut self) -> Self {
        self.drop_columns = false;
        self
    }
}

/// Detects column changes and generates migration operations.
#[derive(Debug, Default)]
pub struct Autodetector {
    options: AutodetectorOptions,
}

impl Autodetector {
    /// Creates a new autodetector with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new autodetector with custom options.
    #[must_use]
    pub fn with_options(options: AutodetectorOptions) -> Self {
        Self { options }
    }

    /// Returns the operations that turn the `reflected` columns into
    /// `desired`. Additions come first in desired order, then drops, then
    /// alterations.
    #[must_use]
    pub fn diff_table(
        &self,
        reflected: &[ReflectedColumn],
        desired: &TableSchema,
        dialect: &dyn MigrationDialect,
    ) -> Vec<MigrationOperation> {
        let mut operations = Vec::new();
        let find_reflected =
            |name: &str| reflected.iter().find(|c| c.name.eq_ignore_ascii_case(name));

        // New columns
        for column in &desired.columns {
            if find_reflected(&column.name).is_none() {
                operations.push(MigrationOperation::AddColumn {
                    table: desired.name.clone(),
                    schema: desired.schema.clone(),
                    column: column.clone(),
                });
            }
        }

        // Dropped columns
        if self.options.drop_columns {
            for column in reflected {
                let still_desired = desired
                    .columns
                    .iter()
                    .any(|c| c.name.eq_ignore_ascii_case(&column.name));
                if !still_desired {
                    operations.push(MigrationOperation::DropColumn {
                        table: desired.name.clone(),
                        schema: desired.schema.clone(),
                        column_name: column.name.clone(),
                    });
                }
            }
        }

        // Modified columns
        for column in &desired.columns {
            if let Some(current) = find_reflected(&column.name) {
                if let Some(request) = self.diff_column(desired, current, column, dialect) {
                    operations.push(MigrationOperation::AlterColumn(request));
                }
            }
        }

        debug!(
            table = %desired.name,
            operations = operations.len(),
            "Diffed table"
        );
        operations
    }

    /// Compares one column and returns the change request, if any.
    fn diff_column(
        &self,
        table: &TableSchema,
        current: &ReflectedColumn,
        desired: &ColumnSchema,
        dialect: &dyn MigrationDialect,
    ) -> Option<AlterColumnRequest> {
        let mut request = AlterColumnRequest::new(&table.name, &current.name)
            .existing_type(current.sql_type())
            .existing_nullable(current.nullable);
        request.schema = table.schema.clone();

        let desired_type = dialect.type_name(&desired.sql_type);
        if !dialect.types_equivalent(&current.type_text, &desired_type) {
            request = request.set_type(desired.sql_type.clone());
        }

        if current.nullable != desired.nullable {
            request = request.set_nullable(desired.nullable);
        }

        if request.is_empty() {
            None
        } else {
            Some(request)
        }
    }
}
