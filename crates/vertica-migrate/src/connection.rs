//! Live database connections.
//!
//! Connection management belongs to the embedding application. It wraps its
//! Vertica driver in a [`Connection`] and hands it to an
//! [`ExecContext`](crate::context::ExecContext).

use crate::error::ConnectionError;

/// One result row; `None` is SQL NULL.
pub type Row = Vec<Option<String>>;

/// A synchronous connection able to run DDL and catalog queries.
pub trait Connection {
    /// Executes DDL. `sql` may hold several `;`-separated statements, some of
    /// which return rows (`SELECT MAKE_AHM_NOW()` after a column rebuild);
    /// the driver runs all of them and discards any result sets.
    fn execute(&mut self, sql: &str) -> Result<(), ConnectionError>;

    /// Runs a query and returns its rows as text.
    fn query(&mut self, sql: &str) -> Result<Vec<Row>, ConnectionError>;
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::{Connection, Row};
    use crate::error::ConnectionError;

    /// Records executed statements and answers queries from canned rows.
    #[derive(Default)]
    pub struct RecordingConnection {
        pub executed: Rc<RefCell<Vec<String>>>,
        pub queries: Rc<RefCell<Vec<String>>>,
        responses: Vec<(String, Vec<Row>)>,
        fail_on: Option<String>,
    }

    impl RecordingConnection {
        pub fn new() -> Self {
            Self::default()
        }

        /// Answers any query containing `needle` with `rows`.
        pub fn respond(mut self, needle: &str, rows: Vec<Row>) -> Self {
            self.responses.push((needle.to_string(), rows));
            self
        }

        /// Fails any statement containing `needle`.
        pub fn fail_on(mut self, needle: &str) -> Self {
            self.fail_on = Some(needle.to_string());
            self
        }
    }

    impl Connection for RecordingConnection {
        fn execute(&mut self, sql: &str) -> Result<(), ConnectionError> {
            if let Some(needle) = &self.fail_on {
                if sql.contains(needle.as_str()) {
                    return Err(format!("Syntax error at or near \"{needle}\"").into());
                }
            }
            self.executed.borrow_mut().push(sql.to_string());
            Ok(())
        }

        fn query(&mut self, sql: &str) -> Result<Vec<Row>, ConnectionError> {
            self.queries.borrow_mut().push(sql.to_string());
            Ok(self
                .responses
                .iter()
                .find(|(needle, _)| sql.contains(needle.as_str()))
                .map(|(_, rows)| rows.clone())
                .unwrap_or_default())
        }
    }

    /// Builds a text row.
    pub fn row(values: &[Option<&str>]) -> Row {
        values.iter().map(|v| v.map(str::to_string)).collect()
    }
}
