//! Base implementation of migration operations.
//!
//! [`MigrationImpl`] turns operations into DDL elements, renders them with
//! its dialect and emits them through its execution context. Every operation
//! has a provided method; an implementation overrides only the operations
//! its database handles differently. The `base_*` functions hold the
//! provided behaviour so an override can fall back to it.

use tracing::debug;

use crate::context::ExecContext;
use crate::dialect::{DdlElement, MigrationDialect, TableRef};
use crate::error::Result;
use crate::operations::{AlterColumnRequest, IndexDescriptor, MigrationOperation};
use crate::schema::ColumnSchema;

/// Emits the DDL for migration operations.
pub trait MigrationImpl {
    /// The dialect used to render statements.
    fn dialect(&self) -> &dyn MigrationDialect;

    /// Executes one statement.
    fn exec(&mut self, sql: &str) -> Result<()>;

    /// Writes text to the script without treating it as a statement.
    fn static_output(&mut self, text: &str);

    /// Renders and executes one DDL element.
    fn exec_element(&mut self, element: &DdlElement) -> Result<()> {
        let sql = self.dialect().render(element);
        self.exec(&sql)
    }

    /// Creates a table.
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
        })
    }

    /// Drops a table.
    fn drop_table(&mut self, table: &TableRef, if_exists: bool) -> Result<()> {
        self.exec_element(&DdlElement::DropTable {
            table: table.clone(),
            if_exists,
        })
    }

    /// Adds a column.
    fn add_column(&mut self, table: &TableRef, column: &ColumnSchema) -> Result<()> {
        self.exec_element(&DdlElement::AddColumn {
            table: table.clone(),
            column: column.clone(),
        })
    }

    /// Drops a column.
    fn drop_column(&mut self, table: &TableRef, column: &str) -> Result<()> {
        self.exec_element(&DdlElement::DropColumn {
            table: table.clone(),
            column: column.to_string(),
        })
    }

    /// Alters a column. See [`base_alter_column`].
    fn alter_column(&mut self, request: &AlterColumnRequest) -> Result<()> {
        base_alter_column(self, request)
    }

    /// Creates an index.
    fn create_index(&mut self, index: &IndexDescriptor) -> Result<()> {
        self.exec_element(&DdlElement::CreateIndex(index.clone()))
    }

    /// Drops an index.
    fn drop_index(&mut self, name: &str, schema: Option<&str>) -> Result<()> {
        self.exec_element(&DdlElement::DropIndex {
            name: name.to_string(),
            schema: schema.map(str::to_string),
        })
    }

    /// Executes raw SQL unchanged.
    fn run_sql(&mut self, sql: &str) -> Result<()> {
        self.exec_element(&DdlElement::RawSql(sql.to_string()))
    }

    /// Dispatches one operation to the method that handles it.
    fn run_operation(&mut self, operation: &MigrationOperation) -> Result<()> {
        base_run_operation(self, operation)
    }
}

/// Emits one statement per requested attribute change: nullability, then
/// default, then type, with the rename last so the earlier statements still
/// address the old name. Autoincrement changes have no generic DDL and are
/// skipped.
pub fn base_alter_column<M: MigrationImpl + ?Sized>(
    m: &mut M,
    request: &AlterColumnRequest,
) -> Result<()> {
    let table = TableRef::new(&request.table, request.schema.as_deref());
    let column = &request.column;

    if let Some(nullable) = request.nullable {
        m.exec_element(&DdlElement::ColumnNullable {
            table: table.clone(),
            column: column.clone(),
            nullable,
        })?;
    }

    if let Some(change) = &request.default {
        m.exec_element(&DdlElement::ColumnDefault {
            table: table.clone(),
            column: column.clone(),
            change: change.clone(),
        })?;
    }

    if let Some(sql_type) = &request.sql_type {
        m.exec_element(&DdlElement::ColumnType {
            table: table.clone(),
            column: column.clone(),
            sql_type: sql_type.clone(),
        })?;
    }

    if request.autoincrement.is_some() {
        debug!(column = %column, "Autoincrement change has no DDL, skipping");
    }

    if let Some(new_name) = &request.new_name {
        m.exec_element(&DdlElement::ColumnName {
            table,
            column: column.clone(),
            new_name: new_name.clone(),
        })?;
    }

    Ok(())
}

/// Routes an operation to the matching [`MigrationImpl`] method.
pub fn base_run_operation<M: MigrationImpl + ?Sized>(
    m: &mut M,
    operation: &MigrationOperation,
) -> Result<()> {
    debug!(operation = %operation.description(), "Running operation");
    match operation {
        MigrationOperation::CreateTable {
            name,
            schema,
            columns,
            if_not_exists,
        } => m.create_table(
            &TableRef::new(name, schema.as_deref()),
            columns,
            *if_not_exists,
        ),
        MigrationOperation::DropTable {
            name,
            schema,
            if_exists,
        } => m.drop_table(&TableRef::new(name, schema.as_deref()), *if_exists),
        MigrationOperation::AddColumn {
            table,
            schema,
            column,
        } => m.add_column(&TableRef::new(table, schema.as_deref()), column),
        MigrationOperation::DropColumn {
            table,
            schema,
            column_name,
        } => m.drop_column(&TableRef::new(table, schema.as_deref()), column_name),
        MigrationOperation::AlterColumn(request) => m.alter_column(request),
        MigrationOperation::CreateIndex(index) => m.create_index(index),
        MigrationOperation::DropIndex { name, schema, .. } => {
            m.drop_index(name, schema.as_deref())
        }
        MigrationOperation::RunSql { forward, .. } => m.run_sql(forward),
    }
}

/// [`MigrationImpl`] over any dialect, with no database-specific behaviour.
pub struct DefaultImpl<D: MigrationDialect> {
    dialect: D,
    ctx: ExecContext,
}

impl<D: MigrationDialect> DefaultImpl<D> {
    /// Creates an implementation emitting through `ctx`.
    pub fn new(dialect: D, ctx: ExecContext) -> Self {
        Self { dialect, ctx }
    }

    /// Consumes the implementation and returns the rendered script.
    pub fn into_script(self) -> Option<String> {
        self.ctx.into_script()
    }
}

impl<D: MigrationDialect> MigrationImpl for DefaultImpl<D> {
    fn dialect(&self) -> &dyn MigrationDialect {
        &self.dialect
    }

    fn exec(&mut self, sql: &str) -> Result<()> {
        self.ctx.exec(sql)
    }

    fn static_output(&mut self, text: &str) {
        self.ctx.static_output(text);
    }
}
