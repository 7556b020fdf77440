//! End-to-end tests: plans in, Vertica DDL out.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use vertica_migrate::prelude::*;

/// Connection double that records statements and serves one catalog table.
struct FakeVertica {
    executed: Rc<RefCell<Vec<String>>>,
    columns: Vec<Row>,
}

impl FakeVertica {
    fn new(columns: Vec<Row>) -> (Self, Rc<RefCell<Vec<String>>>) {
        let executed = Rc::new(RefCell::new(Vec::new()));
        let conn = Self {
            executed: executed.clone(),
            columns,
        };
        (conn, executed)
    }
}

impl Connection for FakeVertica {
    fn execute(&mut self, sql: &str) -> std::result::Result<(), ConnectionError> {
        self.executed.borrow_mut().push(sql.to_string());
        Ok(())
    }

    fn query(&mut self, sql: &str) -> std::result::Result<Vec<Row>, ConnectionError> {
        if sql.contains("v_catalog.columns") {
            Ok(self.columns.clone())
        } else {
            Ok(Vec::new())
        }
    }
}

fn text_row(values: &[Option<&str>]) -> Row {
    values.iter().map(|v| v.map(str::to_string)).collect()
}

const PLAN: &str = r#"{
    "app": "events",
    "name": "0002_widen_ids",
    "operations": [
        {"AlterColumn": {
            "table": "events",
            "schema": "warehouse",
            "column": "id",
            "sql_type": "BigInt",
            "existing_type": "Integer",
            "existing_nullable": false
        }},
        {"CreateIndex": {
            "name": "uq_events_kind",
            "table": "events",
            "schema": "warehouse",
            "columns": ["kind", "source"],
            "unique": true
        }},
        {"CreateIndex": {
            "name": "ix_events_created_at",
            "table": "events",
            "columns": ["created_at"]
        }},
        {"DropIndex": {"name": "ix_old"}},
        {"DropColumn": {"table": "events", "schema": "warehouse", "column_name": "payload"}}
    ]
}"#;

#[test]
fn test_plan_renders_vertica_script() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(PLAN.as_bytes()).unwrap();
    let migration = ExecutableMigration::from_file(file.path()).unwrap();

    let mut executor = MigrationExecutor::new(VerticaImpl::offline(&ContextOptions::new()));
    executor.apply(&migration).unwrap();
    let script = executor.into_inner().into_script().unwrap();

    let expected = [
        "ALTER TABLE \"warehouse\".\"events\" ADD COLUMN \"id_temp\" BIGINT DEFAULT \"id\"::BIGINT NOT NULL;",
        "$",
        "ALTER TABLE \"warehouse\".\"events\" ALTER COLUMN \"id_temp\" DROP DEFAULT; SELECT MAKE_AHM_NOW();",
        "$",
        "ALTER TABLE \"warehouse\".\"events\" DROP COLUMN \"id\" CASCADE;",
        "$",
        "ALTER TABLE \"warehouse\".\"events\" RENAME COLUMN \"id_temp\" TO \"id\";",
        "$",
        "ALTER TABLE \"warehouse\".\"events\" ADD UNIQUE (\"kind\");",
        "$",
        "ALTER TABLE \"warehouse\".\"events\" ADD UNIQUE (\"source\");",
        "$",
        "ALTER TABLE \"warehouse\".\"events\" DROP COLUMN \"payload\" CASCADE;",
        "$",
    ];
    let expected: String = expected.iter().map(|s| format!("{s}\n\n")).collect();
    assert_eq!(script, expected);
}

#[test]
fn test_options_file_disables_separator() {
    let mut options_file = tempfile::NamedTempFile::new().unwrap();
    write!(options_file, r#"{{"vertica_batch_separator": ""}}"#).unwrap();
    let options = ContextOptions::from_file(options_file.path()).unwrap();

    let mut imp = VerticaImpl::offline(&options);
    imp.run_operation(&MigrationOperation::drop_column("events", "payload"))
        .unwrap();

    assert_eq!(
        imp.into_script().unwrap(),
        "ALTER TABLE \"events\" DROP COLUMN \"payload\" CASCADE;\n\n"
    );
}

#[test]
fn test_connected_run_uses_catalog() {
    let (conn, executed) = FakeVertica::new(vec![
        text_row(&[Some("id"), Some("int"), Some("f"), None, Some("t")]),
        text_row(&[Some("kind"), Some("varchar(64)"), Some("t"), None, Some("f")]),
    ]);
    let mut imp = VerticaImpl::new(ExecContext::connected(conn), &ContextOptions::new());

    // kind is nullable in the catalog, so only the SET NOT NULL goes out
    imp.alter_column(&AlterColumnRequest::new("events", "kind").set_nullable(false))
        .unwrap();
    imp.alter_column(&AlterColumnRequest::new("events", "id").set_nullable(false))
        .unwrap();

    assert_eq!(
        *executed.borrow(),
        vec!["ALTER TABLE \"events\" ALTER COLUMN \"kind\" SET NOT NULL"]
    );
}

#[test]
fn test_autodetected_changes_apply() {
    let (conn, executed) = FakeVertica::new(vec![
        text_row(&[Some("id"), Some("int"), Some("f"), None, Some("f")]),
        text_row(&[Some("kind"), Some("varchar(64)"), Some("t"), None, Some("f")]),
    ]);
    let mut imp = VerticaImpl::new(ExecContext::connected(conn), &ContextOptions::new());

    let reflected = imp.reflect_columns("events", None).unwrap();
    let desired = TableSchema::new("events")
        .column(ColumnSchema::new("id", SqlType::Integer).not_null())
        .column(ColumnSchema::new("kind", SqlType::Boolean));
    let ops = Autodetector::new().diff_table(&reflected, &desired, imp.dialect());
    assert_eq!(ops.len(), 1);

    let migration = ExecutableMigration::new("events", "0003_auto").operations(ops);
    let mut executor = MigrationExecutor::new(imp);
    executor.apply(&migration).unwrap();

    let executed = executed.borrow();
    assert_eq!(executed.len(), 4);
    assert_eq!(
        executed[0],
        "ALTER TABLE \"events\" ADD COLUMN \"kind_temp\" BOOLEAN DEFAULT \"kind\"::BOOLEAN NULL"
    );
    assert_eq!(
        executed[3],
        "ALTER TABLE \"events\" RENAME COLUMN \"kind_temp\" TO \"kind\""
    );
}

#[test]
fn test_quoted_identifiers_are_escaped() {
    let mut imp = VerticaImpl::offline(&ContextOptions::new().with_batch_separator(""));
    imp.run_operation(&MigrationOperation::drop_column("we\"ird", "col\"umn"))
        .unwrap();

    assert_eq!(
        imp.into_script().unwrap(),
        "ALTER TABLE \"we\"\"ird\" DROP COLUMN \"col\"\"umn\" CASCADE;\n\n"
    );
}

#[test]
fn test_rollback_rebuild_keeps_not_null() {
    let widen = AlterColumnRequest::new("events", "id")
        .set_type(SqlType::BigInt)
        .existing_type(SqlType::Integer)
        .existing_nullable(false);
    let migration = ExecutableMigration::new("events", "0004_widen_id")
        .operation(MigrationOperation::AlterColumn(widen));

    let options = ContextOptions::new().with_batch_separator("");
    let mut executor = MigrationExecutor::new(VerticaImpl::offline(&options));
    executor.apply(&migration).unwrap();
    executor.rollback(&migration).unwrap();
    let script = executor.into_inner().into_script().unwrap();

    assert_eq!(script.matches("NOT NULL").count(), 2);
    assert!(
        script.contains("ADD COLUMN \"id_temp\" INTEGER DEFAULT \"id\"::INTEGER NOT NULL;")
    );
}

#[test]
fn test_connected_nullability_toggle() {
    let (conn, executed) = FakeVertica::new(vec![text_row(&[
        Some("kind"),
        Some("varchar(64)"),
        Some("f"),
        None,
        Some("f"),
    ])]);
    let mut imp = VerticaImpl::new(ExecContext::connected(conn), &ContextOptions::new());

    imp.alter_column(&AlterColumnRequest::new("events", "kind").set_nullable(true))
        .unwrap();
    imp.alter_column(&AlterColumnRequest::new("events", "kind").set_nullable(false))
        .unwrap();

    assert_eq!(
        *executed.borrow(),
        vec![
            "ALTER TABLE \"events\" ALTER COLUMN \"kind\" DROP NOT NULL",
            "ALTER TABLE \"events\" ALTER COLUMN \"kind\" SET NOT NULL",
        ]
    );
}
