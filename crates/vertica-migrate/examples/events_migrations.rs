//! Example: Event Warehouse Migrations
//!
//! Renders the Vertica script for a small event warehouse: an initial table,
//! a widened id column, a unique index and a column drop. A schema diff
//! against simulated catalog rows shows how drift becomes operations.
//!
//! Run with: cargo run --example events_migrations -p vertica-migrate

use vertica_migrate::prelude::*;
use vertica_migrate::Migration;

/// Initial migration: Create events table
struct Migration0001;

impl Migration for Migration0001 {
    const APP: &'static str = "events";
    const NAME: &'static str = "0001_create_events";

    fn operations() -> Vec<MigrationOperation> {
        vec![MigrationOperation::create_table(
            "events",
            vec![
                ColumnSchema::new("id", SqlType::Integer)
                    .primary_key()
                    .auto_increment(),
                ColumnSchema::new("kind", SqlType::Varchar(64)).not_null(),
                ColumnSchema::new("payload", SqlType::Json),
                ColumnSchema::new("created_at", SqlType::TimestampTz)
                    .not_null()
                    .default(DefaultValue::Expression("NOW()".to_string())),
            ],
        )]
    }
}

/// Second migration: widen ids, dedupe kinds, drop payload
struct Migration0002;

impl Migration for Migration0002 {
    const APP: &'static str = "events";
    const NAME: &'static str = "0002_widen_ids";

    fn operations() -> Vec<MigrationOperation> {
        vec![
            MigrationOperation::alter_column(
                AlterColumnRequest::new("events", "id")
                    .set_type(SqlType::BigInt)
                    .existing_type(SqlType::Integer)
                    .existing_nullable(false),
            ),
            MigrationOperation::CreateIndex(
                IndexBuilder::new("uq_events_kind", "events")
                    .column("kind")
                    .unique()
                    .build(),
            ),
            MigrationOperation::create_index(
                "ix_events_created_at",
                "events",
                vec!["created_at".to_string()],
                false,
            ),
            MigrationOperation::drop_column("events", "payload"),
        ]
    }
}

fn main() -> Result<()> {
    println!("{}", "=".repeat(70));
    println!(" vertica-migrate: event warehouse example");
    println!("{}", "=".repeat(70));
    println!();

    let migrations = [Migration0001::to_executable(), Migration0002::to_executable()];

    println!("[1] Rendering offline script...\n");
    let mut executor = MigrationExecutor::new(VerticaImpl::offline(&ContextOptions::new()));
    for migration in &migrations {
        println!("    Rendering {}", migration.id());
        executor.apply(migration)?;
    }
    let script = executor.into_inner().into_script().unwrap_or_default();
    println!();
    println!("{}", "-".repeat(70));
    print!("{}", script);
    println!("{}", "-".repeat(70));
    println!();

    println!("[2] Diffing simulated catalog against desired table...\n");
    let reflected = vec![
        ReflectedColumn::new("id", "int").not_null(),
        ReflectedColumn::new("kind", "varchar(64)").not_null(),
        ReflectedColumn::new("note", "varchar(20)"),
    ];
    let desired = TableSchema::new("events")
        .column(ColumnSchema::new("id", SqlType::SmallInt).not_null())
        .column(ColumnSchema::new("kind", SqlType::Varchar(128)).not_null())
        .column(ColumnSchema::new("source", SqlType::Varchar(32)));

    let ops = Autodetector::new().diff_table(&reflected, &desired, &VerticaDialect::new());
    println!("    Schema changes detected:");
    for op in &ops {
        println!("    - {}", op.description());
    }
    println!();

    println!("[3] Type synonyms...\n");
    let dialect = VerticaDialect::new();
    for (left, right) in [("INT", "INTEGER"), ("BYTEA", "RAW"), ("FLOAT", "NUMERIC")] {
        println!(
            "    {:<8} vs {:<8} -> {}",
            left,
            right,
            dialect.types_equivalent(left, right)
        );
    }
    println!();

    Ok(())
}
