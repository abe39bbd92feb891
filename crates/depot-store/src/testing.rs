// ABOUTME: Test utilities for depot-store, including a recording SQL connector.
// ABOUTME: Used in tests to observe connections and statements without a real database.

use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;

use crate::properties::{ConnectionProperties, DbEngine};
use crate::sql::{QueryResult, SqlConnection, SqlConnector, SqlError};

/// A statement seen by a recording connection.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

#[derive(Debug, Default)]
struct Log {
    connections: usize,
    statements: Vec<Statement>,
}

/// A connector whose connections record every statement and answer every
/// query with the same canned result.
///
/// Clones share the same log, so a test can keep one handle while the code
/// under test owns another.
#[derive(Debug, Clone, Default)]
pub struct RecordingConnector {
    log: Arc<Mutex<Log>>,
    result: QueryResult,
}

impl RecordingConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer queries with these column names and rows.
    pub fn with_result(columns: &[&str], rows: Vec<Vec<Value>>) -> Self {
        Self {
            log: Arc::default(),
            result: QueryResult {
                columns: columns.iter().map(|c| c.to_string()).collect(),
                rows,
            },
        }
    }

    /// Connection properties suitable for tests that never reach a database.
    pub fn properties(&self) -> ConnectionProperties {
        ConnectionProperties {
            engine: DbEngine::Sqlite,
            db_name: "recording".to_string(),
            username: None,
            password: None,
            host: "localhost".to_string(),
            port: 1433,
            driver: String::new(),
            extra_args: Default::default(),
            sqlite_folder_path: ".".into(),
            sqlite_file_extension: ".db".to_string(),
        }
    }

    /// Number of connections opened so far.
    pub fn connections(&self) -> usize {
        self.lock().connections
    }

    /// SQL text of every statement and query, in order.
    pub fn statements(&self) -> Vec<String> {
        self.lock().statements.iter().map(|s| s.sql.clone()).collect()
    }

    pub fn recorded(&self) -> Vec<Statement> {
        self.lock().statements.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Log> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SqlConnector for RecordingConnector {
    fn connect(&self, _props: &ConnectionProperties) -> Result<Box<dyn SqlConnection>, SqlError> {
        self.lock().connections += 1;
        Ok(Box::new(RecordingConnection {
            log: Arc::clone(&self.log),
            result: self.result.clone(),
        }))
    }
}

struct RecordingConnection {
    log: Arc<Mutex<Log>>,
    result: QueryResult,
}

impl RecordingConnection {
    fn record(&self, sql: &str, params: &[Value]) {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .statements
            .push(Statement {
                sql: sql.to_string(),
                params: params.to_vec(),
            });
    }
}

impl SqlConnection for RecordingConnection {
    fn query(&mut self, sql: &str, params: &[Value]) -> Result<QueryResult, SqlError> {
        self.record(sql, params);
        Ok(self.result.clone())
    }

    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<usize, SqlError> {
        self.record(sql, params);
        Ok(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn clones_share_the_log() {
        let connector = RecordingConnector::new();
        let handle = connector.clone();

        let mut conn = connector.connect(&connector.properties()).unwrap();
        conn.execute("INSERT INTO t VALUES (?1)", &[json!(1)]).unwrap();

        assert_eq!(handle.connections(), 1);
        assert_eq!(
            handle.recorded(),
            vec![Statement {
                sql: "INSERT INTO t VALUES (?1)".to_string(),
                params: vec![json!(1)],
            }]
        );
    }

    #[test]
    fn queries_return_canned_result() {
        let connector = RecordingConnector::with_result(&["a"], vec![vec![json!(1)]]);
        let mut conn = connector.connect(&connector.properties()).unwrap();

        let result = conn.query("SELECT a FROM t", &[]).unwrap();
        assert_eq!(result.columns, vec!["a"]);
        assert_eq!(result.rows, vec![vec![json!(1)]]);
    }
}
