//! Catalog reflection for Vertica.
//!
//! Reads column and unique-constraint metadata from `v_catalog`. Results are
//! cached per `(schema, table)` for the lifetime of the inspector, so a
//! migration that touches the same table repeatedly queries it once.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::connection::Row;
use crate::context::ExecContext;
use crate::dialect::MigrationDialect;
use crate::error::{MigrateError, Result};
use crate::schema::SqlType;

/// A column as reported by `v_catalog.columns`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReflectedColumn {
    /// Column name.
    pub name: String,
    /// Type text as the catalog spells it, e.g. `varchar(80)`.
    pub type_text: String,
    /// Whether the column accepts NULL.
    pub nullable: bool,
    /// Default expression text.
    #[serde(default)]
    pub default: Option<String>,
    /// Whether the column is an identity column.
    #[serde(default)]
    pub identity: bool,
}

impl ReflectedColumn {
    /// Creates a nullable, non-identity column without a default.
    pub fn new(name: impl Into<String>, type_text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_text: type_text.into(),
            nullable: true,
            default: None,
            identity: false,
        }
    }

    /// Marks the column NOT NULL.
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Interprets the catalog type text.
    #[must_use]
    pub fn sql_type(&self) -> SqlType {
        parse_type(&self.type_text)
    }
}

/// One column of a unique constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReflectedUniqueConstraint {
    /// Constraint name.
    pub name: String,
    /// Constrained column.
    pub column: String,
}

type CacheKey = (Option<String>, String);

/// Reads and caches catalog metadata.
#[derive(Debug, Default)]
pub struct CatalogInspector {
    columns: HashMap<CacheKey, Vec<ReflectedColumn>>,
    unique_constraints: HashMap<CacheKey, Vec<ReflectedUniqueConstraint>>,
}

impl CatalogInspector {
    /// Creates an inspector with an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the columns of `table`, in ordinal order.
    pub fn get_columns(
        &mut self,
        ctx: &mut ExecContext,
        dialect: &dyn MigrationDialect,
        table: &str,
        schema: Option<&str>,
    ) -> Result<Vec<ReflectedColumn>> {
        let key = cache_key(table, schema);
        if let Some(columns) = self.columns.get(&key) {
            debug!(table = %table, "Using cached columns");
            return Ok(columns.clone());
        }

        let sql = format!(
            "SELECT column_name, data_type, is_nullable, column_default, is_identity \
             FROM v_catalog.columns \
             WHERE table_name = {} AND table_schema = {} \
             ORDER BY ordinal_position",
            dialect.quote_literal(table),
            schema_predicate(dialect, schema)
        );
        let rows = catalog_rows(ctx, &sql)?;
        let columns = rows
            .iter()
            .map(parse_column_row)
            .collect::<Result<Vec<_>>>()?;

        debug!(table = %table, count = columns.len(), "Reflected columns");
        self.columns.insert(key, columns.clone());
        Ok(columns)
    }

    /// Returns one column of `table`.
    pub fn get_column(
        &mut self,
        ctx: &mut ExecContext,
        dialect: &dyn MigrationDialect,
        table: &str,
        column: &str,
        schema: Option<&str>,
    ) -> Result<ReflectedColumn> {
        self.get_columns(ctx, dialect, table, schema)?
            .into_iter()
            .find(|c| c.name.eq_ignore_ascii_case(column))
            .ok_or_else(|| MigrateError::ColumnNotFound {
                table: match schema {
                    Some(schema) => format!("{schema}.{table}"),
                    None => table.to_string(),
                },
                column: column.to_string(),
            })
    }

    /// Returns the unique constraints of `table`, one entry per column.
    pub fn get_unique_constraints(
        &mut self,
        ctx: &mut ExecContext,
        dialect: &dyn MigrationDialect,
        table: &str,
        schema: Option<&str>,
    ) -> Result<Vec<ReflectedUniqueConstraint>> {
        let key = cache_key(table, schema);
        if let Some(constraints) = self.unique_constraints.get(&key) {
            return Ok(constraints.clone());
        }

        let sql = format!(
            "SELECT constraint_name, column_name \
             FROM v_catalog.constraint_columns \
             WHERE table_name = {} AND table_schema = {} AND constraint_type = 'u'",
            dialect.quote_literal(table),
            schema_predicate(dialect, schema)
        );
        let rows = catalog_rows(ctx, &sql)?;
        let constraints = rows
            .iter()
            .map(|row| {
                Ok(ReflectedUniqueConstraint {
                    name: required(row, 0, "constraint_name")?,
                    column: required(row, 1, "column_name")?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        self.unique_constraints.insert(key, constraints.clone());
        Ok(constraints)
    }

    /// Forgets everything cached for `table`.
    pub fn invalidate(&mut self, table: &str, schema: Option<&str>) {
        let key = cache_key(table, schema);
        self.columns.remove(&key);
        self.unique_constraints.remove(&key);
    }

    /// Forgets everything cached.
    pub fn clear(&mut self) {
        self.columns.clear();
        self.unique_constraints.clear();
    }

    /// Updates the cached nullability of a column after a successful
    /// `SET NOT NULL` / `DROP NOT NULL`. A table that was never reflected
    /// stays uncached.
    pub fn record_nullable(
        &mut self,
        table: &str,
        column: &str,
        schema: Option<&str>,
        nullable: bool,
    ) {
        if let Some(columns) = self.columns.get_mut(&cache_key(table, schema)) {
            for cached in columns.iter_mut() {
                if cached.name.eq_ignore_ascii_case(column) {
                    cached.nullable = nullable;
                }
            }
        }
    }
}

fn cache_key(table: &str, schema: Option<&str>) -> CacheKey {
    (schema.map(str::to_string), table.to_string())
}

fn schema_predicate(dialect: &dyn MigrationDialect, schema: Option<&str>) -> String {
    match schema {
        Some(schema) => dialect.quote_literal(schema),
        None => "CURRENT_SCHEMA()".to_string(),
    }
}

fn catalog_rows(ctx: &mut ExecContext, sql: &str) -> Result<Vec<Row>> {
    ctx.query(sql)?.ok_or_else(|| {
        MigrateError::Reflection("catalog queries need a live connection".to_string())
    })
}

fn required(row: &Row, index: usize, field: &str) -> Result<String> {
    row.get(index)
        .cloned()
        .flatten()
        .ok_or_else(|| MigrateError::Reflection(format!("missing {field}")))
}

fn parse_bool(value: Option<&str>, field: &str) -> Result<bool> {
    match value.map(str::to_ascii_lowercase).as_deref() {
        Some("t" | "true" | "1" | "yes") => Ok(true),
        Some("f" | "false" | "0" | "no") | None => Ok(false),
        Some(other) => Err(MigrateError::Reflection(format!(
            "invalid {field} value '{other}'"
        ))),
    }
}

fn parse_column_row(row: &Row) -> Result<ReflectedColumn> {
    if row.len() < 5 {
        return Err(MigrateError::Reflection(format!(
            "expected 5 column fields, got {}",
            row.len()
        )));
    }
    Ok(ReflectedColumn {
        name: required(row, 0, "column_name")?,
        type_text: required(row, 1, "data_type")?,
        nullable: parse_bool(row[2].as_deref(), "is_nullable")?,
        default: row[3].clone(),
        identity: parse_bool(row[4].as_deref(), "is_identity")?,
    })
}

/// Interprets a catalog type spelling. Unknown names become
/// [`SqlType::Custom`].
#[must_use]
pub fn parse_type(text: &str) -> SqlType {
    let text = text.trim();
    let (name, args) = match text.find('(') {
        Some(open) => (
            text[..open].trim().to_ascii_uppercase(),
            text[open + 1..].trim_end_matches(')').to_string(),
        ),
        None => (text.to_ascii_uppercase(), String::new()),
    };
    let args: Vec<&str> = args.split(',').map(str::trim).collect();
    let length = args.first().and_then(|a| a.parse::<usize>().ok());
    let precision = || -> Option<(u8, u8)> {
        Some((args.first()?.parse().ok()?, args.get(1)?.parse().ok()?))
    };

    match (name.as_str(), length) {
        ("INTEGER" | "INT" | "INT8", _) => SqlType::Integer,
        ("BIGINT", _) => SqlType::BigInt,
        ("SMALLINT", _) => SqlType::SmallInt,
        ("TINYINT", _) => SqlType::TinyInt,
        ("VARCHAR", Some(len)) => SqlType::Varchar(len),
        ("CHAR", Some(len)) => SqlType::Char(len),
        ("LONG VARCHAR", Some(len)) => SqlType::LongVarchar(len),
        ("LONG VARCHAR", None) => SqlType::Text,
        ("BOOLEAN", _) => SqlType::Boolean,
        ("DATE", _) => SqlType::Date,
        ("TIME", _) => SqlType::Time,
        ("TIMESTAMP", _) => SqlType::Timestamp,
        ("TIMESTAMPTZ" | "TIMESTAMP WITH TIME ZONE", _) => SqlType::TimestampTz,
        ("REAL", _) => SqlType::Real,
        ("FLOAT" | "FLOAT8" | "DOUBLE PRECISION", _) => SqlType::Double,
        ("BINARY", Some(len)) => SqlType::Binary(len),
        ("VARBINARY", Some(len)) => SqlType::VarBinary(len),
        ("LONG VARBINARY", Some(len)) => SqlType::LongVarBinary(len),
        ("LONG VARBINARY", None) => SqlType::Blob,
        ("UUID", _) => SqlType::Uuid,
        ("NUMERIC" | "DECIMAL", _) => match precision() {
            Some((p, s)) if name == "DECIMAL" => SqlType::Decimal(p, s),
            Some((p, s)) => SqlType::Numeric(p, s),
            None => SqlType::Custom(text.to_string()),
        },
        _ => SqlType::Custom(text.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::testing::{row, RecordingConnection};
    use crate::dialect::VerticaDialect;

    fn users_rows() -> Vec<Row> {
        vec![
            row(&[Some("id"), Some("int"), Some("f"), None, Some("t")]),
            row(&[Some("email"), Some("varchar(80)"), Some("t"), None, Some("f")]),
            row(&[
                Some("active"),
                Some("boolean"),
                Some("f"),
                Some("true"),
                Some("f"),
            ]),
        ]
    }

    #[test]
    fn test_get_columns() {
        let conn = RecordingConnection::new().respond("v_catalog.columns", users_rows());
        let queries = conn.queries.clone();
        let mut ctx = ExecContext::connected(conn);
        let mut inspector = CatalogInspector::new();

        let columns = inspector
            .get_columns(&mut ctx, &VerticaDialect::new(), "users", Some("app"))
            .unwrap();

        assert_eq!(columns.len(), 3);
        assert!(columns[0].identity);
        assert!(!columns[0].nullable);
        assert_eq!(columns[1].sql_type(), SqlType::Varchar(80));
        assert_eq!(columns[2].default.as_deref(), Some("true"));

        let sql = &queries.borrow()[0];
        assert!(sql.contains("table_name = 'users'"));
        assert!(sql.contains("table_schema = 'app'"));
    }

    #[test]
    fn test_columns_are_cached() {
        let conn = RecordingConnection::new().respond("v_catalog.columns", users_rows());
        let queries = conn.queries.clone();
        let mut ctx = ExecContext::connected(conn);
        let mut inspector = CatalogInspector::new();
        let dialect = VerticaDialect::new();

        inspector.get_columns(&mut ctx, &dialect, "users", None).unwrap();
        inspector
            .get_column(&mut ctx, &dialect, "users", "email", None)
            .unwrap();
        assert_eq!(queries.borrow().len(), 1);

        inspector.invalidate("users", None);
        inspector.get_columns(&mut ctx, &dialect, "users", None).unwrap();
        assert_eq!(queries.borrow().len(), 2);
    }

    #[test]
    fn test_record_nullable_updates_cache() {
        let conn = RecordingConnection::new().respond("v_catalog.columns", users_rows());
        let queries = conn.queries.clone();
        let mut ctx = ExecContext::connected(conn);
        let mut inspector = CatalogInspector::new();
        let dialect = VerticaDialect::new();

        inspector.record_nullable("users", "email", None, false);
        inspector.get_columns(&mut ctx, &dialect, "users", None).unwrap();
        inspector.record_nullable("users", "EMAIL", None, false);

        let email = inspector
            .get_column(&mut ctx, &dialect, "users", "email", None)
            .unwrap();
        assert!(!email.nullable);
        assert_eq!(queries.borrow().len(), 1);

        inspector.clear();
        let email = inspector
            .get_column(&mut ctx, &dialect, "users", "email", None)
            .unwrap();
        assert!(email.nullable);
        assert_eq!(queries.borrow().len(), 2);
    }

    #[test]
    fn test_catalog_literals_are_escaped() {
        let conn = RecordingConnection::new();
        let queries = conn.queries.clone();
        let mut ctx = ExecContext::connected(conn);
        let mut inspector = CatalogInspector::new();

        inspector
            .get_columns(&mut ctx, &VerticaDialect::new(), "o'brien", None)
            .unwrap();

        let sql = &queries.borrow()[0];
        assert!(sql.contains("table_name = 'o''brien'"));
        assert!(sql.contains("table_schema = CURRENT_SCHEMA()"));
    }

    #[test]
    fn test_missing_column() {
        let conn = RecordingConnection::new().respond("v_catalog.columns", users_rows());
        let mut ctx = ExecContext::connected(conn);
        let mut inspector = CatalogInspector::new();

        let err = inspector
            .get_column(&mut ctx, &VerticaDialect::new(), "users", "age", Some("app"))
            .unwrap_err();
        assert_eq!(err.to_string(), "Column 'age' not found in table 'app.users'");
    }

    #[test]
    fn test_unique_constraints() {
        let conn = RecordingConnection::new().respond(
            "v_catalog.constraint_columns",
            vec![
                row(&[Some("uq_users_email"), Some("email")]),
                row(&[Some("uq_users_name"), Some("name")]),
            ],
        );
        let queries = conn.queries.clone();
        let mut ctx = ExecContext::connected(conn);
        let mut inspector = CatalogInspector::new();

        let constraints = inspector
            .get_unique_constraints(&mut ctx, &VerticaDialect::new(), "users", None)
            .unwrap();

        assert_eq!(constraints.len(), 2);
        assert_eq!(constraints[0].name, "uq_users_email");
        assert_eq!(constraints[1].column, "name");
        assert!(queries.borrow()[0].contains("constraint_type = 'u'"));
    }

    #[test]
    fn test_malformed_rows() {
        let conn = RecordingConnection::new().respond(
            "v_catalog.columns",
            vec![row(&[Some("id"), Some("int"), Some("maybe"), None, None])],
        );
        let mut ctx = ExecContext::connected(conn);
        let result =
            CatalogInspector::new().get_columns(&mut ctx, &VerticaDialect::new(), "t", None);
        assert!(matches!(result, Err(MigrateError::Reflection(_))));
    }

    #[test]
    fn test_script_mode_cannot_reflect() {
        let mut ctx = ExecContext::script();
        let result =
            CatalogInspector::new().get_columns(&mut ctx, &VerticaDialect::new(), "t", None);
        assert!(matches!(result, Err(MigrateError::Reflection(_))));
    }

    #[test]
    fn test_parse_type() {
        assert_eq!(parse_type("int"), SqlType::Integer);
        assert_eq!(parse_type("varchar(80)"), SqlType::Varchar(80));
        assert_eq!(parse_type("long varchar"), SqlType::Text);
        assert_eq!(parse_type("numeric(10,2)"), SqlType::Numeric(10, 2));
        assert_eq!(parse_type("UUID"), SqlType::Uuid);
        assert_eq!(parse_type("float"), SqlType::Double);
        assert_eq!(
            parse_type("geometry(1024)"),
            SqlType::Custom("geometry(1024)".to_string())
        );
    }
}
