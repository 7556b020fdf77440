//! Vertica implementation of migration operations.
//!
//! Vertica rejects most in-place type changes, has no secondary indexes and
//! needs `CASCADE` to drop columns that projections depend on. [`VerticaImpl`]
//! overrides the affected operations and leaves the rest to the base
//! behaviour in [`ddl_impl`](crate::ddl_impl).

use tracing::{debug, info};

use crate::context::{ContextOptions, ExecContext};
use crate::ddl_impl::{base_alter_column, MigrationImpl};
use crate::dialect::{DdlElement, MigrationDialect, TableRef, VerticaDialect};
use crate::error::{MigrateError, Result};
use crate::operations::{AlterColumnRequest, IndexDescriptor};
use crate::reflection::{CatalogInspector, ReflectedColumn, ReflectedUniqueConstraint};
use crate::schema::{ColumnSchema, SqlType};

/// Migration implementation for Vertica.
pub struct VerticaImpl {
    dialect: VerticaDialect,
    ctx: ExecContext,
    batch_separator: Option<String>,
    inspector: CatalogInspector,
}

impl VerticaImpl {
    /// Creates an implementation emitting through `ctx`.
    pub fn new(ctx: ExecContext, options: &ContextOptions) -> Self {
        let batch_separator = options.batch_separator().map(str::to_string);
        debug!(
            offline = ctx.as_sql(),
            separator = ?batch_separator,
            "Initialized Vertica implementation"
        );
        Self {
            dialect: VerticaDialect::new(),
            ctx,
            batch_separator,
            inspector: CatalogInspector::new(),
        }
    }

    /// Creates an implementation that renders an offline script.
    #[must_use]
    pub fn offline(options: &ContextOptions) -> Self {
        Self::new(ExecContext::script(), options)
    }

    /// Returns the batch separator written after each script statement.
    #[must_use]
    pub fn batch_separator(&self) -> Option<&str> {
        self.batch_separator.as_deref()
    }

    /// Consumes the implementation and returns the rendered script.
    #[must_use]
    pub fn into_script(self) -> Option<String> {
        self.ctx.into_script()
    }

    /// Reflects the columns of a table.
    pub fn reflect_columns(
        &mut self,
        table: &str,
        schema: Option<&str>,
    ) -> Result<Vec<ReflectedColumn>> {
        self.inspector
            .get_columns(&mut self.ctx, &self.dialect, table, schema)
    }

    /// Reflects the unique constraints of a table.
    pub fn reflect_unique_constraints(
        &mut self,
        table: &str,
        schema: Option<&str>,
    ) -> Result<Vec<ReflectedUniqueConstraint>> {
        self.inspector
            .get_unique_constraints(&mut self.ctx, &self.dialect, table, schema)
    }

    /// Rebuilds a column with a new type through a shadow column.
    fn rebuild_column(
        &mut self,
        table: &TableRef,
        column: &str,
        sql_type: &SqlType,
        existing_nullable: Option<bool>,
    ) -> Result<()> {
        info!(
            table = %table.name,
            column = %column,
            new_type = %self.dialect.type_name(sql_type),
            "Rebuilding column through shadow column"
        );
        let statements = [
            self.dialect
                .add_shadow_column(table, column, sql_type, existing_nullable),
            self.dialect.drop_shadow_default_and_purge(table, column),
            self.dialect.drop_column(table, column),
            self.dialect.rename_shadow_column(table, column),
        ];
        for sql in &statements {
            self.exec(sql)?;
        }
        Ok(())
    }

    /// Current nullability: the request's prior state, else the catalog
    /// when connected. `None` when unknown.
    fn current_nullable(&mut self, request: &AlterColumnRequest) -> Result<Option<bool>> {
        if request.existing_nullable.is_some() || self.ctx.as_sql() {
            return Ok(request.existing_nullable);
        }
        match self.inspector.get_column(
            &mut self.ctx,
            &self.dialect,
            &request.table,
            &request.column,
            request.schema.as_deref(),
        ) {
            Ok(column) => Ok(Some(column.nullable)),
            Err(MigrateError::ColumnNotFound { .. }) => {
                debug!(column = %request.column, "Column not in catalog, nullability unknown");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

impl MigrationImpl for VerticaImpl {
    fn dialect(&self) -> &dyn MigrationDialect {
        &self.dialect
    }

    fn exec(&mut self, sql: &str) -> Result<()> {
        self.ctx.exec(sql)?;
        if self.ctx.as_sql() {
            if let Some(separator) = &self.batch_separator {
                self.ctx.static_output(separator);
            }
        }
        Ok(())
    }

    fn static_output(&mut self, text: &str) {
        self.ctx.static_output(text);
    }

    fn alter_column(&mut self, request: &AlterColumnRequest) -> Result<()> {
        let table = TableRef::new(&request.table, request.schema.as_deref());

        if let Some(sql_type) = &request.sql_type {
            if request.existing_type.is_some() {
                self.rebuild_column(&table, &request.column, sql_type, request.existing_nullable)?;
                self.inspector.invalidate(&table.name, table.schema.as_deref());
            } else {
                self.exec_element(&DdlElement::ColumnType {
                    table: table.clone(),
                    column: request.column.clone(),
                    sql_type: sql_type.clone(),
                })?;
            }
        }

        if let Some(nullable) = request.nullable {
            let current = self.current_nullable(request)?;
            if current == Some(nullable) {
                debug!(
                    column = %request.column,
                    nullable,
                    "Nullability already matches, skipping"
                );
            } else {
                self.exec_element(&DdlElement::ColumnNullable {
                    table: table.clone(),
                    column: request.column.clone(),
                    nullable,
                })?;
                self.inspector.record_nullable(
                    &table.name,
                    &request.column,
                    table.schema.as_deref(),
                    nullable,
                );
            }
        }

        let rest = AlterColumnRequest {
            sql_type: None,
            nullable: None,
            ..request.clone()
        };
        if rest.is_empty() {
            return Ok(());
        }
        base_alter_column(self, &rest)?;
        self.inspector.invalidate(&table.name, table.schema.as_deref());
        Ok(())
    }

    fn create_table(
        &mut self,
        table: &TableRef,
        columns: &[ColumnSchema],
        if_not_exists: bool,
    ) -> Result<()> {
        self.exec_element(&DdlElement::CreateTable {
            table: table.clone(),
            columns: columns.to_vec(),
            if_not_exists,
        })?;
        self.inspector.invalidate(&table.name, table.schema.as_deref());
        Ok(())
    }

    fn drop_table(&mut self, table: &TableRef, if_exists: bool) -> Result<()> {
        self.exec_element(&DdlElement::DropTable {
            table: table.clone(),
            if_exists,
        })?;
        self.inspector.invalidate(&table.name, table.schema.as_deref());
        Ok(())
    }

    fn add_column(&mut self, table: &TableRef, column: &ColumnSchema) -> Result<()> {
        self.exec_element(&DdlElement::AddColumn {
            table: table.clone(),
            column: column.clone(),
        })?;
        self.inspector.invalidate(&table.name, table.schema.as_deref());
        Ok(())
    }

    fn drop_column(&mut self, table: &TableRef, column: &str) -> Result<()> {
        self.exec_element(&DdlElement::DropColumn {
            table: table.clone(),
            column: column.to_string(),
        })?;
        self.inspector.invalidate(&table.name, table.schema.as_deref());
        Ok(())
    }

    /// Raw SQL may touch any table, so the whole catalog cache is dropped.
    fn run_sql(&mut self, sql: &str) -> Result<()> {
        self.exec_element(&DdlElement::RawSql(sql.to_string()))?;
        self.inspector.clear();
        Ok(())
    }

    fn create_index(&mut self, index: &IndexDescriptor) -> Result<()> {
        if !index.unique {
            debug!(index = %index.name, "Vertica has no secondary indexes, skipping");
            return Ok(());
        }
        let table = TableRef::new(&index.table, index.schema.as_deref());
        for column in &index.columns {
            self.exec_element(&DdlElement::AddUnique {
                table: table.clone(),
                columns: vec![column.clone()],
            })?;
        }
        Ok(())
    }

    fn drop_index(&mut self, name: &str, _schema: Option<&str>) -> Result<()> {
        debug!(index = %name, "Vertica has no indexes to drop, skipping");
        Ok(())
    }
}
