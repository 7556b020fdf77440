//! Vertica dialect for migrations.
//!
//! Vertica cannot change most column types in place, has no secondary
//! indexes and spells auto-increment columns as `IDENTITY`. The statement
//! shapes for those workarounds live here; sequencing them is the job of
//! [`VerticaImpl`](crate::vertica::VerticaImpl).

use crate::schema::{ColumnSchema, SqlType};

use super::{column_definition_sql, MigrationDialect, TableRef, BASE_TYPE_SYNONYMS};

/// Vertica's type-name synonym groups, on top of [`BASE_TYPE_SYNONYMS`].
pub const VERTICA_TYPE_SYNONYMS: &[&[&str]] = &[
    &["VARCHAR", "VARCHAR2", "CHAR", "TEXT", "LONG VARCHAR"],
    &["INTEGER", "INT", "INT8", "SMALLINT", "TINYINT"],
    &["BINARY", "VARBINARY", "LONG VARBINARY", "BYTEA", "RAW"],
    &["FLOAT", "FLOAT8", "DOUBLE", "REAL"],
];

/// Suffix of the temporary column used to rebuild a column with a new type.
pub const SHADOW_SUFFIX: &str = "_temp";

/// Identity spelling used in place of the generic serial types.
const IDENTITY: &str = "IDENTITY(1,1)";

/// Vertica migration dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct VerticaDialect;

impl VerticaDialect {
    /// Creates a new Vertica dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Name of the shadow column for `column`.
    #[must_use]
    pub fn shadow_name(column: &str) -> String {
        format!("{column}{SHADOW_SUFFIX}")
    }

    /// `ADD COLUMN` for the shadow column, populated from the original
    /// column through its default expression.
    #[must_use]
    pub fn add_shadow_column(
        &self,
        table: &TableRef,
        column: &str,
        sql_type: &SqlType,
        existing_nullable: Option<bool>,
    ) -> String {
        let type_sql = self.type_name(sql_type);
        let mut sql = format!(
            "{} ADD COLUMN {} {} DEFAULT {}::{}",
            self.alter_table(table),
            self.quote_identifier(&Self::shadow_name(column)),
            type_sql,
            self.quote_identifier(column),
            type_sql
        );
        match existing_nullable {
            Some(true) => sql.push_str(" NULL"),
            Some(false) => sql.push_str(" NOT NULL"),
            None => {}
        }
        sql
    }

    /// Drops the shadow column's default and advances the AHM so
    /// delete-marked rows no longer pin the original column.
    #[must_use]
    pub fn drop_shadow_default_and_purge(&self, table: &TableRef, column: &str) -> String {
        format!(
            "{} ALTER COLUMN {} DROP DEFAULT; SELECT MAKE_AHM_NOW()",
            self.alter_table(table),
            self.quote_identifier(&Self::shadow_name(column))
        )
    }

    /// Renames the shadow column into the original's place.
    #[must_use]
    pub fn rename_shadow_column(&self, table: &TableRef, column: &str) -> String {
        self.column_name(table, &Self::shadow_name(column), column)
    }
}

/// Replaces the generic serial type that follows the column name with
/// Vertica's identity syntax.
fn use_identity(definition: &str, name_len: usize) -> String {
    let (name, rest) = definition.split_at(name_len);
    let rest = rest.trim_start();
    for serial in ["SERIAL", "BIGSERIAL", "SMALLSERIAL"] {
        if let Some(tail) = rest.strip_prefix(serial) {
            if tail.is_empty() || tail.starts_with(' ') {
                return format!("{name} {IDENTITY}{tail}");
            }
        }
    }
    definition.to_string()
}

impl MigrationDialect for VerticaDialect {
    fn name(&self) -> &'static str {
        "vertica"
    }

    fn type_name(&self, sql_type: &SqlType) -> String {
        match sql_type {
            SqlType::Integer => "INTEGER".to_string(),
            SqlType::BigInt => "BIGINT".to_string(),
            SqlType::SmallInt => "SMALLINT".to_string(),
            SqlType::TinyInt => "TINYINT".to_string(),
            SqlType::Text | SqlType::Json => "LONG VARCHAR".to_string(),
            SqlType::Varchar(len) => format!("VARCHAR({})", len),
            SqlType::Char(len) => format!("CHAR({})", len),
            SqlType::LongVarchar(len) => format!("LONG VARCHAR({})", len),
            SqlType::Boolean => "BOOLEAN".to_string(),
            SqlType::DateTime | SqlType::Timestamp => "TIMESTAMP".to_string(),
            SqlType::TimestampTz => "TIMESTAMPTZ".to_string(),
            SqlType::Date => "DATE".to_string(),
            SqlType::Time => "TIME".to_string(),
            SqlType::Real => "REAL".to_string(),
            SqlType::Double => "FLOAT".to_string(),
            SqlType::Decimal(p, s) => format!("DECIMAL({}, {})", p, s),
            SqlType::Numeric(p, s) => format!("NUMERIC({}, {})", p, s),
            SqlType::Blob => "LONG VARBINARY".to_string(),
            SqlType::Binary(len) => format!("BINARY({})", len),
            SqlType::VarBinary(len) => format!("VARBINARY({})", len),
            SqlType::LongVarBinary(len) => format!("LONG VARBINARY({})", len),
            SqlType::Uuid => "UUID".to_string(),
            SqlType::Custom(name) => name.clone(),
        }
    }

    fn add_column(&self, table: &TableRef, column: &ColumnSchema) -> String {
        let mut sql = format!(
            "{} ADD COLUMN {}",
            self.alter_table(table),
            self.column_definition(column)
        );
        let identity = column.auto_increment && column.sql_type.is_integer();
        if !identity && self.render_default(&column.default).is_none() {
            sql.push_str(" DEFAULT NULL");
        }
        sql
    }

    fn drop_column(&self, table: &TableRef, column: &str) -> String {
        format!(
            "{} DROP COLUMN {} CASCADE",
            self.alter_table(table),
            self.quote_identifier(column)
        )
    }

    fn column_type(&self, table: &TableRef, column: &str, sql_type: &SqlType) -> String {
        format!(
            "{} ALTER COLUMN {} SET DATA TYPE {}",
            self.alter_table(table),
            self.quote_identifier(column),
            self.type_name(sql_type)
        )
    }

    fn column_definition(&self, column: &ColumnSchema) -> String {
        let name_len = self.quote_identifier(&column.name).len();
        use_identity(&column_definition_sql(self, column), name_len)
    }

    fn type_synonyms(&self) -> Vec<&'static [&'static str]> {
        BASE_TYPE_SYNONYMS
            .iter()
            .chain(VERTICA_TYPE_SYNONYMS)
            .copied()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::DdlElement;
    use crate::schema::DefaultValue;

    fn dialect() -> VerticaDialect {
        VerticaDialect::new()
    }

    fn users() -> TableRef {
        TableRef::new("users", None)
    }

    #[test]
    fn test_drop_column_cascades() {
        let sql = dialect().render(&DdlElement::DropColumn {
            table: TableRef::new("users", Some("app")),
            column: "email".to_string(),
        });
        assert_eq!(
            sql,
            "ALTER TABLE \"app\".\"users\" DROP COLUMN \"email\" CASCADE"
        );
    }

    #[test]
    fn test_add_column_explicit_default_null() {
        let sql = dialect().render(&DdlElement::AddColumn {
            table: users(),
            column: ColumnSchema::new("nickname", SqlType::Varchar(64)),
        });
        assert_eq!(
            sql,
            "ALTER TABLE \"users\" ADD COLUMN \"nickname\" VARCHAR(64) DEFAULT NULL"
        );
    }

    #[test]
    fn test_add_identity_column_has_no_default() {
        let sql = dialect().render(&DdlElement::AddColumn {
            table: users(),
            column: ColumnSchema::new("id", SqlType::Integer).auto_increment(),
        });
        assert_eq!(sql, "ALTER TABLE \"users\" ADD COLUMN \"id\" IDENTITY(1,1)");

        let sql = dialect().render(&DdlElement::AddColumn {
            table: users(),
            column: ColumnSchema::new("code", SqlType::Varchar(8)).auto_increment(),
        });
        assert!(sql.ends_with("VARCHAR(8) DEFAULT NULL"));
    }

    #[test]
    fn test_add_column_with_default() {
        let sql = dialect().render(&DdlElement::AddColumn {
            table: users(),
            column: ColumnSchema::new("score", SqlType::Integer)
                .not_null()
                .default(DefaultValue::Integer(0)),
        });
        assert_eq!(
            sql,
            "ALTER TABLE \"users\" ADD COLUMN \"score\" INTEGER NOT NULL DEFAULT 0"
        );
    }

    #[test]
    fn test_set_data_type() {
        let sql = dialect().render(&DdlElement::ColumnType {
            table: users(),
            column: "name".to_string(),
            sql_type: SqlType::Varchar(512),
        });
        assert_eq!(
            sql,
            "ALTER TABLE \"users\" ALTER COLUMN \"name\" SET DATA TYPE VARCHAR(512)"
        );
    }

    #[test]
    fn test_identity_replaces_serial() {
        let d = dialect();
        let id = ColumnSchema::new("id", SqlType::BigInt)
            .primary_key()
            .auto_increment();
        assert_eq!(d.column_definition(&id), "\"id\" IDENTITY(1,1) PRIMARY KEY");

        let counter = ColumnSchema::new("seq", SqlType::Integer)
            .not_null()
            .auto_increment();
        assert_eq!(d.column_definition(&counter), "\"seq\" IDENTITY(1,1) NOT NULL");
    }

    #[test]
    fn test_identity_leaves_names_and_defaults_alone() {
        let col = ColumnSchema::new("SERIAL", SqlType::Integer);
        assert_eq!(dialect().column_definition(&col), "\"SERIAL\" INTEGER");

        let col = ColumnSchema::new("kind", SqlType::Varchar(16))
            .default(DefaultValue::Expression("SERIAL".to_string()));
        assert_eq!(
            dialect().column_definition(&col),
            "\"kind\" VARCHAR(16) DEFAULT SERIAL"
        );
    }

    #[test]
    fn test_shadow_statements() {
        let d = dialect();
        assert_eq!(
            d.add_shadow_column(&users(), "age", &SqlType::BigInt, Some(false)),
            "ALTER TABLE \"users\" ADD COLUMN \"age_temp\" BIGINT DEFAULT \"age\"::BIGINT NOT NULL"
        );
        assert_eq!(
            d.add_shadow_column(&users(), "age", &SqlType::BigInt, None),
            "ALTER TABLE \"users\" ADD COLUMN \"age_temp\" BIGINT DEFAULT \"age\"::BIGINT"
        );
        assert_eq!(
            d.drop_shadow_default_and_purge(&users(), "age"),
            "ALTER TABLE \"users\" ALTER COLUMN \"age_temp\" DROP DEFAULT; SELECT MAKE_AHM_NOW()"
        );
        assert_eq!(
            d.rename_shadow_column(&users(), "age"),
            "ALTER TABLE \"users\" RENAME COLUMN \"age_temp\" TO \"age\""
        );
    }

    #[test]
    fn test_type_synonyms() {
        let d = dialect();
        assert!(d.types_equivalent("INT", "INTEGER"));
        assert!(d.types_equivalent("int8", "TINYINT"));
        assert!(d.types_equivalent("varchar(80)", "LONG VARCHAR"));
        assert!(d.types_equivalent("BYTEA", "raw"));
        assert!(d.types_equivalent("Float8", "DOUBLE"));
        assert!(d.types_equivalent("DECIMAL(10,2)", "NUMERIC(10, 2)"));
        assert!(!d.types_equivalent("INTEGER", "VARCHAR"));
        assert!(!d.types_equivalent("VARCHAR(80)", "VARCHAR(255)"));
        assert!(!d.types_equivalent("FLOAT", "NUMERIC"));
    }

    #[test]
    fn test_type_names() {
        let d = dialect();
        assert_eq!(d.type_name(&SqlType::Text), "LONG VARCHAR");
        assert_eq!(d.type_name(&SqlType::Double), "FLOAT");
        assert_eq!(d.type_name(&SqlType::Uuid), "UUID");
        assert_eq!(d.type_name(&SqlType::TimestampTz), "TIMESTAMPTZ");
        assert_eq!(d.type_name(&SqlType::Blob), "LONG VARBINARY");
    }
}
