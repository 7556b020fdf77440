//! Migration operations.
//!
//! This module defines the schema changes a migration can express. Operations
//! carry no SQL; a [`MigrationImpl`](crate::ddl_impl::MigrationImpl) turns them
//! into statements for its dialect.

use serde::{Deserialize, Serialize};

use crate::schema::{ColumnSchema, DefaultValue, SqlType};

/// A change to a column's server default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DefaultChange {
    /// Set a new default.
    Set(DefaultValue),
    /// Remove the default.
    Drop,
}

/// A request to alter an existing column.
///
/// The `existing_*` fields describe the column before the change. They are
/// optional; when present they let a dialect pick a cheaper or safer rewrite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AlterColumnRequest {
    /// Table name.
    pub table: String,
    /// Schema the table lives in.
    #[serde(default)]
    pub schema: Option<String>,
    /// Column name.
    pub column: String,
    /// New data type (if changing).
    #[serde(default)]
    pub sql_type: Option<SqlType>,
    /// New nullability (if changing).
    #[serde(default)]
    pub nullable: Option<bool>,
    /// New default (if changing).
    #[serde(default)]
    pub default: Option<DefaultChange>,
    /// New column name (if renaming).
    #[serde(default)]
    pub new_name: Option<String>,
    /// New autoincrement setting (if changing).
    #[serde(default)]
    pub autoincrement: Option<bool>,
    /// Type before the change.
    #[serde(default)]
    pub existing_type: Option<SqlType>,
    /// Nullability before the change.
    #[serde(default)]
    pub existing_nullable: Option<bool>,
    /// Default before the change.
    #[serde(default)]
    pub existing_default: Option<DefaultValue>,
    /// Autoincrement setting before the change.
    #[serde(default)]
    pub existing_autoincrement: Option<bool>,
}

impl AlterColumnRequest {
    /// Creates a request that changes nothing yet.
    #[must_use]
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
            ..Self::default()
        }
    }

    /// Places the table in a schema.
    #[must_use]
    pub fn in_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Sets a new type.
    #[must_use]
    pub fn set_type(mut self, sql_type: SqlType) -> Self {
        self.sql_type = Some(sql_type);
        self
    }

    /// Sets nullability.
    #[must_use]
    pub fn set_nullable(mut self, nullable: bool) -> Self {
        self.nullable = Some(nullable);
        self
    }

    /// Sets a new default value.
    #[must_use]
    pub fn set_default(mut self, default: DefaultValue) -> Self {
        self.default = Some(DefaultChange::Set(default));
        self
    }

    /// Removes the default value.
    #[must_use]
    pub fn drop_default(mut self) -> Self {
        self.default = Some(DefaultChange::Drop);
        self
    }

    /// Renames the column.
    #[must_use]
    pub fn rename_to(mut self, new_name: impl Into<String>) -> Self {
        self.new_name = Some(new_name.into());
        self
    }

    /// Sets autoincrement.
    #[must_use]
    pub fn set_autoincrement(mut self, autoincrement: bool) -> Self {
        self.autoincrement = Some(autoincrement);
        self
    }

    /// Records the type before the change.
    #[must_use]
    pub fn existing_type(mut self, sql_type: SqlType) -> Self {
        self.existing_type = Some(sql_type);
        self
    }

    /// Records the nullability before the change.
    #[must_use]
    pub fn existing_nullable(mut self, nullable: bool) -> Self {
        self.existing_nullable = Some(nullable);
        self
    }

    /// Records the default before the change.
    #[must_use]
    pub fn existing_default(mut self, default: DefaultValue) -> Self {
        self.existing_default = Some(default);
        self
    }

    /// Records the autoincrement setting before the change.
    #[must_use]
    pub fn existing_autoincrement(mut self, autoincrement: bool) -> Self {
        self.existing_autoincrement = Some(autoincrement);
        self
    }

    /// Returns true if no changes are specified.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sql_type.is_none()
            && self.nullable.is_none()
            && self.default.is_none()
            && self.new_name.is_none()
            && self.autoincrement.is_none()
    }

    /// Builds the request that undoes this one, if the prior state is known.
    #[must_use]
    pub fn reverse(&self) -> Option<Self> {
        if self.sql_type.is_some() && self.existing_type.is_none() {
            return None;
        }
        if self.nullable.is_some() && self.existing_nullable.is_none() {
            return None;
        }
        if self.default.is_some() && self.existing_default.is_none() {
            return None;
        }

        let column = self.new_name.clone().unwrap_or_else(|| self.column.clone());
        let default = self.default.as_ref().and_then(|_| {
            self.existing_default.as_ref().map(|d| match d {
                DefaultValue::None => DefaultChange::Drop,
                other => DefaultChange::Set(other.clone()),
            })
        });

        Some(Self {
            table: self.table.clone(),
            schema: self.schema.clone(),
            column,
            sql_type: self.sql_type.as_ref().and(self.existing_type.clone()),
            nullable: self.nullable.and(self.existing_nullable),
            default,
            new_name: self.new_name.as_ref().map(|_| self.column.clone()),
            autoincrement: self.autoincrement.and(self.existing_autoincrement),
            existing_type: self.sql_type.clone(),
            existing_nullable: self.nullable.or(self.existing_nullable),
            existing_default: None,
            existing_autoincrement: self.autoincrement,
        })
    }
}

/// An index request: table reference, ordered columns and uniqueness.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexDescriptor {
    /// Index name.
    pub name: String,
    /// Table name.
    pub table: String,
    /// Schema the table lives in.
    #[serde(default)]
    pub schema: Option<String>,
    /// Indexed columns, in order.
    pub columns: Vec<String>,
    /// Whether this is a unique index.
    #[serde(default)]
    pub unique: bool,
}

/// A single migration operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MigrationOperation {
    /// Create a new table.
    CreateTable {
        /// Table name.
        name: String,
        /// Schema the table lives in.
        #[serde(default)]
        schema: Option<String>,
        /// Column definitions.
        columns: Vec<ColumnSchema>,
        /// Whether to use IF NOT EXISTS.
        #[serde(default)]
        if_not_exists: bool,
    },

    /// Drop a table.
    DropTable {
        /// Table name.
        name: String,
        /// Schema the table lives in.
        #[serde(default)]
        schema: Option<String>,
        /// Whether to use IF EXISTS.
        #[serde(default)]
        if_exists: bool,
    },

    /// Add a column to a table.
    AddColumn {
        /// Table name.
        table: String,
        /// Schema the table lives in.
        #[serde(default)]
        schema: Option<String>,
        /// Column definition.
        column: ColumnSchema,
    },

    /// Drop a column from a table.
    DropColumn {
        /// Table name.
        table: String,
        /// Schema the table lives in.
        #[serde(default)]
        schema: Option<String>,
        /// Column name.
        column_name: String,
    },

    /// Alter a column's properties.
    AlterColumn(AlterColumnRequest),

    /// Create an index.
    CreateIndex(IndexDescriptor),

    /// Drop an index.
    DropIndex {
        /// Index name.
        name: String,
        /// Table name (needed for some databases).
        #[serde(default)]
        table: Option<String>,
        /// Schema the index lives in.
        #[serde(default)]
        schema: Option<String>,
    },

    /// Run raw SQL (for custom migrations).
    RunSql {
        /// Forward SQL statement(s).
        forward: String,
        /// Backward SQL statement(s) for rollback.
        #[serde(default)]
        backward: Option<String>,
    },
}

impl MigrationOperation {
    /// Creates a CreateTable operation.
    #[must_use]
    pub fn create_table(name: impl Into<String>, columns: Vec<ColumnSchema>) -> Self {
        Self::CreateTable {
            name: name.into(),
            schema: None,
            columns,
            if_not_exists: false,
        }
    }

    /// Creates a DropTable operation.
    #[must_use]
    pub fn drop_table(name: impl Into<String>) -> Self {
        Self::DropTable {
            name: name.into(),
            schema: None,
            if_exists: false,
        }
    }

    /// Creates an AddColumn operation.
    #[must_use]
    pub fn add_column(table: impl Into<String>, column: ColumnSchema) -> Self {
        Self::AddColumn {
            table: table.into(),
            schema: None,
            column,
        }
    }

    /// Creates a DropColumn operation.
    #[must_use]
    pub fn drop_column(table: impl Into<String>, column_name: impl Into<String>) -> Self {
        Self::DropColumn {
            table: table.into(),
            schema: None,
            column_name: column_name.into(),
        }
    }

    /// Creates an AlterColumn operation.
    #[must_use]
    pub const fn alter_column(request: AlterColumnRequest) -> Self {
        Self::AlterColumn(request)
    }

    /// Creates a CreateIndex operation.
    #[must_use]
    pub fn create_index(
        name: impl Into<String>,
        table: impl Into<String>,
        columns: Vec<String>,
        unique: bool,
    ) -> Self {
        Self::CreateIndex(IndexDescriptor {
            name: name.into(),
            table: table.into(),
            schema: None,
            columns,
            unique,
        })
    }

    /// Creates a DropIndex operation.
    #[must_use]
    pub fn drop_index(name: impl Into<String>) -> Self {
        Self::DropIndex {
            name: name.into(),
            table: None,
            schema: None,
        }
    }

    /// Creates a RunSql operation.
    #[must_use]
    pub fn run_sql(forward: impl Into<String>, backward: Option<String>) -> Self {
        Self::RunSql {
            forward: forward.into(),
            backward,
        }
    }

    /// Returns the reverse operation for rollback.
    ///
    /// Returns `None` if the operation is not reversible.
    #[must_use]
    pub fn reverse(&self) -> Option<Self> {
        match self {
            Self::CreateTable { name, schema, .. } => Some(Self::DropTable {
                name: name.clone(),
                schema: schema.clone(),
                if_exists: false,
            }),

            Self::AddColumn {
                table,
                schema,
                column,
            } => Some(Self::DropColumn {
                table: table.clone(),
                schema: schema.clone(),
                column_name: column.name.clone(),
            }),

            Self::AlterColumn(request) => request.reverse().map(Self::AlterColumn),

            Self::CreateIndex(index) => Some(Self::DropIndex {
                name: index.name.clone(),
                table: Some(index.table.clone()),
                schema: index.schema.clone(),
            }),

            // Cannot reverse without knowing the original definition
            Self::DropTable { .. } | Self::DropColumn { .. } | Self::DropIndex { .. } => None,

            Self::RunSql { backward, forward } => backward.as_ref().map(|bwd| Self::RunSql {
                forward: bwd.clone(),
                backward: Some(forward.clone()),
            }),
        }
    }

    /// Returns true if this operation can be reversed.
    #[must_use]
    pub fn is_reversible(&self) -> bool {
        self.reverse().is_some()
    }

    /// Returns a human-readable description of this operation.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::CreateTable { name, .. } => format!("Create table '{}'", name),
            Self::DropTable { name, .. } => format!("Drop table '{}'", name),
            Self::AddColumn { table, column, .. } => {
                format!("Add column '{}' to table '{}'", column.name, table)
            }
            Self::DropColumn {
                table, column_name, ..
            } => format!("Drop column '{}' from table '{}'", column_name, table),
            Self::AlterColumn(request) => format!(
                "Alter column '{}' in table '{}'",
                request.column, request.table
            ),
            Self::CreateIndex(index) => {
                format!("Create index '{}' on table '{}'", index.name, index.table)
            }
            Self::DropIndex { name, .. } => format!("Drop index '{}'", name),
            Self::RunSql { .. } => "Run custom SQL".to_string(),
        }
    }
}

/// Builder for index descriptors.
pub struct IndexBuilder {
    descriptor: IndexDescriptor,
}

impl IndexBuilder {
    /// Creates a new index builder.
    #[must_use]
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            descriptor: IndexDescriptor {
                name: name.into(),
                table: table.into(),
                schema: None,
                columns: Vec::new(),
                unique: false,
            },
        }
    }

    /// Places the table in a schema.
    #[must_use]
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.descriptor.schema = Some(schema.into());
        self
    }

    /// Appends a column to the index.
    #[must_use]
    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.descriptor.columns.push(column.into());
        self
    }

    /// Makes this a unique index.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.descriptor.unique = true;
        self
    }

    /// Builds the index descriptor.
    #[must_use]
    pub fn build(self) -> IndexDescriptor {
        self.descriptor
    }
}
