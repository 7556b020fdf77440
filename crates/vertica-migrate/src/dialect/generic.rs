//! Generic dialect.
//!
//! ANSI-flavoured DDL close to what PostgreSQL accepts. This is the base the
//! database-specific dialects override.

use crate::schema::SqlType;

use super::MigrationDialect;

/// Generic migration dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericDialect;

impl GenericDialect {
    /// Creates a new generic dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl MigrationDialect for GenericDialect {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn type_name(&self, sql_type: &SqlType) -> String {
        match sql_type {
            SqlType::Integer => "INTEGER".to_string(),
            SqlType::BigInt => "BIGINT".to_string(),
            SqlType::SmallInt | SqlType::TinyInt => "SMALLINT".to_string(),
            SqlType::Text | SqlType::LongVarchar(_) | SqlType::Json => "TEXT".to_string(),
            SqlType::Varchar(len) => format!("VARCHAR({})", len),
            SqlType::Char(len) => format!("CHAR({})", len),
            SqlType::Boolean => "BOOLEAN".to_string(),
            SqlType::DateTime | SqlType::Timestamp => "TIMESTAMP".to_string(),
            SqlType::TimestampTz => "TIMESTAMP WITH TIME ZONE".to_string(),
            SqlType::Date => "DATE".to_string(),
            SqlType::Time => "TIME".to_string(),
            SqlType::Real => "REAL".to_string(),
            SqlType::Double => "DOUBLE PRECISION".to_string(),
            SqlType::Decimal(p, s) => format!("DECIMAL({}, {})", p, s),
            SqlType::Numeric(p, s) => format!("NUMERIC({}, {})", p, s),
            SqlType::Blob | SqlType::LongVarBinary(_) => "BYTEA".to_string(),
            SqlType::Binary(len) | SqlType::VarBinary(len) => format!("BYTEA({})", len),
            SqlType::Uuid => "UUID".to_string(),
            SqlType::Custom(name) => name.clone(),
        }
    }
}
