//! Database dialect implementations.
//!
//! A dialect turns individual DDL elements into SQL text. Every element kind
//! has its own method on [`MigrationDialect`] with a generic default, so a
//! dialect only overrides the pieces its database spells differently.

mod generic;
mod vertica;

pub use generic::GenericDialect;
pub use vertica::VerticaDialect;

use crate::operations::{DefaultChange, IndexDescriptor};
use crate::schema::{ColumnSchema, DefaultValue, SqlType};

/// Type names every dialect treats as interchangeable.
pub const BASE_TYPE_SYNONYMS: &[&[&str]] = &[&["DECIMAL", "NUMERIC"]];

/// A possibly schema-qualified table name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableRef {
    /// Table name.
    pub name: String,
    /// Schema the table lives in.
    pub schema: Option<String>,
}

impl TableRef {
    /// Creates a table reference.
    #[must_use]
    pub fn new(name: impl Into<String>, schema: Option<&str>) -> Self {
        Self {
            name: name.into(),
            schema: schema.map(str::to_string),
        }
    }
}

/// One DDL element, rendered to a single statement by a dialect.
#[derive(Debug, Clone, PartialEq)]
pub enum DdlElement {
    /// `CREATE TABLE`.
    CreateTable {
        /// Target table.
        table: TableRef,
        /// Column definitions.
        columns: Vec<ColumnSchema>,
        /// Whether to use IF NOT EXISTS.
        if_not_exists: bool,
    },
    /// `DROP TABLE`.
    DropTable {
        /// Target table.
        table: TableRef,
        /// Whether to use IF EXISTS.
        if_exists: bool,
    },
    /// `ALTER TABLE ... ADD COLUMN`.
    AddColumn {
        /// Target table.
        table: TableRef,
        /// Column definition.
        column: ColumnSchema,
    },
    /// `ALTER TABLE ... DROP COLUMN`.
    DropColumn {
        /// Target table.
        table: TableRef,
        /// Column name.
        column: String,
    },
    /// `SET NOT NULL` / `DROP NOT NULL`.
    ColumnNullable {
        /// Target table.
        table: TableRef,
        /// Column name.
        column: String,
        /// Nullability after the change.
        nullable: bool,
    },
    /// `SET DEFAULT` / `DROP DEFAULT`.
    ColumnDefault {
        /// Target table.
        table: TableRef,
        /// Column name.
        column: String,
        /// The default change.
        change: DefaultChange,
    },
    /// Column type change.
    ColumnType {
        /// Target table.
        table: TableRef,
        /// Column name.
        column: String,
        /// New type.
        sql_type: SqlType,
    },
    /// Column rename.
    ColumnName {
        /// Target table.
        table: TableRef,
        /// Current column name.
        column: String,
        /// New column name.
        new_name: String,
    },
    /// `ALTER TABLE ... ADD UNIQUE (...)`.
    AddUnique {
        /// Target table.
        table: TableRef,
        /// Constrained columns.
        columns: Vec<String>,
    },
    /// `CREATE INDEX`.
    CreateIndex(IndexDescriptor),
    /// `DROP INDEX`.
    DropIndex {
        /// Index name.
        name: String,
        /// Schema the index lives in.
        schema: Option<String>,
    },
    /// Raw SQL passed through unchanged.
    RawSql(String),
}

/// Trait for database-specific SQL generation.
pub trait MigrationDialect: Send + Sync {
    /// Returns the dialect name.
    fn name(&self) -> &'static str;

    /// Returns the SQL type name for the given type.
    fn type_name(&self, sql_type: &SqlType) -> String;

    /// Renders a DDL element.
    fn render(&self, element: &DdlElement) -> String {
        match element {
            DdlElement::CreateTable {
                table,
                columns,
                if_not_exists,
            } => self.create_table(table, columns, *if_not_exists),
            DdlElement::DropTable { table, if_exists } => self.drop_table(table, *if_exists),
            DdlElement::AddColumn { table, column } => self.add_column(table, column),
            DdlElement::DropColumn { table, column } => self.drop_column(table, column),
            DdlElement::ColumnNullable {
                table,
                column,
                nullable,
            } => self.column_nullable(table, column, *nullable),
            DdlElement::ColumnDefault {
                table,
                column,
                change,
            } => self.column_default(table, column, change),
            DdlElement::ColumnType {
                table,
                column,
                sql_type,
            } => self.column_type(table, column, sql_type),
            DdlElement::ColumnName {
                table,
                column,
                new_name,
            } => self.column_name(table, column, new_name),
            DdlElement::AddUnique { table, columns } => self.add_unique(table, columns),
            DdlElement::CreateIndex(index) => self.create_index(index),
            DdlElement::DropIndex { name, schema } => self.drop_index(name, schema.as_deref()),
            DdlElement::RawSql(sql) => sql.clone(),
        }
    }

    /// Generates SQL for creating a table.
    fn create_table(
        &self,
        table: &TableRef,
        columns: &[ColumnSchema],
        if_not_exists: bool,
    ) -> String {
        let mut sql = String::from("CREATE TABLE ");
        if if_not_exists {
            sql.push_str("IF NOT EXISTS ");
        }
        sql.push_str(&self.format_table_name(table));
        sql.push_str(" (\n");

        let col_defs: Vec<String> = columns.iter().map(|c| self.column_definition(c)).collect();
        sql.push_str("  ");
        sql.push_str(&col_defs.join(",\n  "));
        sql.push_str("\n)");
        sql
    }

    /// Generates SQL for dropping a table.
    fn drop_table(&self, table: &TableRef, if_exists: bool) -> String {
        let mut sql = String::from("DROP TABLE ");
        if if_exists {
            sql.push_str("IF EXISTS ");
        }
        sql.push_str(&self.format_table_name(table));
        sql
    }

    /// Generates SQL for adding a column.
    fn add_column(&self, table: &TableRef, column: &ColumnSchema) -> String {
        format!(
            "{} ADD COLUMN {}",
            self.alter_table(table),
            self.column_definition(column)
        )
    }

    /// Generates SQL for dropping a column.
    fn drop_column(&self, table: &TableRef, column: &str) -> String {
        format!(
            "{} DROP COLUMN {}",
            self.alter_table(table),
            self.quote_identifier(column)
        )
    }

    /// Generates SQL for changing nullability.
    fn column_nullable(&self, table: &TableRef, column: &str, nullable: bool) -> String {
        format!(
            "{} ALTER COLUMN {} {} NOT NULL",
            self.alter_table(table),
            self.quote_identifier(column),
            if nullable { "DROP" } else { "SET" }
        )
    }

    /// Generates SQL for changing a column default.
    fn column_default(&self, table: &TableRef, column: &str, change: &DefaultChange) -> String {
        let action = match change {
            DefaultChange::Set(value) => match self.render_default(value) {
                Some(sql) => format!("SET DEFAULT {}", sql),
                None => "DROP DEFAULT".to_string(),
            },
            DefaultChange::Drop => "DROP DEFAULT".to_string(),
        };
        format!(
            "{} ALTER COLUMN {} {}",
            self.alter_table(table),
            self.quote_identifier(column),
            action
        )
    }

    /// Generates SQL for changing a column type.
    fn column_type(&self, table: &TableRef, column: &str, sql_type: &SqlType) -> String {
        format!(
            "{} ALTER COLUMN {} TYPE {}",
            self.alter_table(table),
            self.quote_identifier(column),
            self.type_name(sql_type)
        )
    }

    /// Generates SQL for renaming a column.
    fn column_name(&self, table: &TableRef, column: &str, new_name: &str) -> String {
        format!(
            "{} RENAME COLUMN {} TO {}",
            self.alter_table(table),
            self.quote_identifier(column),
            self.quote_identifier(new_name)
        )
    }

    /// Generates SQL for adding a unique constraint.
    fn add_unique(&self, table: &TableRef, columns: &[String]) -> String {
        let quoted: Vec<String> = columns.iter().map(|c| self.quote_identifier(c)).collect();
        format!("{} ADD UNIQUE ({})", self.alter_table(table), quoted.join(", "))
    }

    /// Generates SQL for creating an index.
    fn create_index(&self, index: &IndexDescriptor) -> String {
        let mut sql = String::from("CREATE ");
        if index.unique {
            sql.push_str("UNIQUE ");
        }
        sql.push_str("INDEX ");
        sql.push_str(&self.quote_identifier(&index.name));
        sql.push_str(" ON ");
        sql.push_str(&self.format_table_name(&TableRef::new(
            index.table.clone(),
            index.schema.as_deref(),
        )));
        sql.push_str(" (");

        let quoted: Vec<String> = index
            .columns
            .iter()
            .map(|c| self.quote_identifier(c))
            .collect();
        sql.push_str(&quoted.join(", "));
        sql.push(')');
        sql
    }

    /// Generates SQL for dropping an index.
    fn drop_index(&self, name: &str, schema: Option<&str>) -> String {
        format!(
            "DROP INDEX {}",
            self.format_table_name(&TableRef::new(name, schema))
        )
    }

    /// Generates column definition SQL.
    fn column_definition(&self, column: &ColumnSchema) -> String {
        column_definition_sql(self, column)
    }

    /// Returns the generic auto-increment spelling for an integer type.
    fn serial_type_name(&self, sql_type: &SqlType) -> String {
        match sql_type {
            SqlType::BigInt => "BIGSERIAL",
            SqlType::SmallInt | SqlType::TinyInt => "SMALLSERIAL",
            _ => "SERIAL",
        }
        .to_string()
    }

    /// Renders a default value, `None` when the column has no default.
    fn render_default(&self, default: &DefaultValue) -> Option<String> {
        default.to_sql()
    }

    /// Quote an identifier (table name, column name, etc.).
    ///
    /// Embedded double quotes are doubled.
    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    /// Quotes a string literal, doubling embedded single quotes.
    fn quote_literal(&self, value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    /// Formats a table name, qualified with its schema when one is given.
    fn format_table_name(&self, table: &TableRef) -> String {
        match &table.schema {
            Some(schema) => format!(
                "{}.{}",
                self.quote_identifier(schema),
                self.quote_identifier(&table.name)
            ),
            None => self.quote_identifier(&table.name),
        }
    }

    /// Returns the `ALTER TABLE <name>` prefix.
    fn alter_table(&self, table: &TableRef) -> String {
        format!("ALTER TABLE {}", self.format_table_name(table))
    }

    /// Groups of type names that denote the same storage type.
    fn type_synonyms(&self) -> Vec<&'static [&'static str]> {
        BASE_TYPE_SYNONYMS.to_vec()
    }

    /// Returns true if two type spellings denote the same type.
    ///
    /// Names are compared case-insensitively through [`type_synonyms`].
    /// Length or precision arguments only matter when both sides carry them.
    ///
    /// [`type_synonyms`]: MigrationDialect::type_synonyms
    fn types_equivalent(&self, left: &str, right: &str) -> bool {
        let (left_name, left_args) = split_type(left);
        let (right_name, right_args) = split_type(right);

        if let (Some(l), Some(r)) = (&left_args, &right_args) {
            if l != r {
                return false;
            }
        }

        left_name == right_name
            || self.type_synonyms().iter().any(|group| {
                group.contains(&left_name.as_str()) && group.contains(&right_name.as_str())
            })
    }
}

/// Generic column definition, shared by dialects that post-process it.
pub fn column_definition_sql<D: MigrationDialect + ?Sized>(
    dialect: &D,
    column: &ColumnSchema,
) -> String {
    let type_sql = if column.auto_increment && column.sql_type.is_integer() {
        dialect.serial_type_name(&column.sql_type)
    } else {
        dialect.type_name(&column.sql_type)
    };
    let mut parts = vec![dialect.quote_identifier(&column.name), type_sql];

    if column.primary_key {
        parts.push("PRIMARY KEY".to_string());
    }

    if !column.nullable && !column.primary_key {
        parts.push("NOT NULL".to_string());
    }

    if column.unique && !column.primary_key {
        parts.push("UNIQUE".to_string());
    }

    if let Some(default_sql) = dialect.render_default(&column.default) {
        parts.push(format!("DEFAULT {}", default_sql));
    }

    if let Some(ref check) = column.check {
        parts.push(format!("CHECK ({})", check));
    }

    parts.join(" ")
}

/// Splits `varchar ( 80 )` into `("VARCHAR", Some("80"))`.
fn split_type(spelling: &str) -> (String, Option<String>) {
    let (name, args) = match spelling.find('(') {
        Some(open) => {
            let args = spelling[open + 1..]
                .trim_end()
                .trim_end_matches(')')
                .split(',')
                .map(str::trim)
                .collect::<Vec<_>>()
                .join(",");
            (&spelling[..open], Some(args))
        }
        None => (spelling, None),
    };
    let name = name
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_uppercase();
    (name, args)
}
