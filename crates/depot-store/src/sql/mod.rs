// ABOUTME: SQL engine seam: connectors open scoped connections that run queries and statements.
// ABOUTME: The default connector serves sqlite through rusqlite; other dialects need an injected connector.

pub mod data_node;
pub mod payload;
pub mod repository;
pub mod rows;
pub mod sqlite;

use depot_core::Record;
use serde_json::Value;
use thiserror::Error;

use crate::properties::{ConnectionProperties, DbEngine};

pub use data_node::{Exposed, ExposedType, SqlDataNode};
pub use payload::{NormalizedRows, WritePayload};
pub use repository::SqlRepository;
pub use rows::{FromRow, RowArgs, RowClass, RowObject};
pub use sqlite::SqliteConnection;

/// Errors that can occur while talking to a SQL engine.
#[derive(Debug, Error)]
pub enum SqlError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no connector available for engine {0}")]
    UnsupportedEngine(DbEngine),

    #[error("unknown exposed type: {0}")]
    UnknownExposedType(String),

    #[error("invalid identifier: {0:?}")]
    InvalidIdentifier(String),
}

/// Rows returned by a query, with the column names in result order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl QueryResult {
    /// Each row as a column-keyed record.
    pub fn records(&self) -> Vec<Record> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect()
            })
            .collect()
    }
}

/// An open connection. Dropping it closes the connection.
pub trait SqlConnection {
    fn query(&mut self, sql: &str, params: &[Value]) -> Result<QueryResult, SqlError>;

    /// Run a statement, returning the number of affected rows.
    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<usize, SqlError>;

    fn begin(&mut self) -> Result<(), SqlError> {
        self.execute("BEGIN", &[]).map(|_| ())
    }

    fn commit(&mut self) -> Result<(), SqlError> {
        self.execute("COMMIT", &[]).map(|_| ())
    }

    fn rollback(&mut self) -> Result<(), SqlError> {
        self.execute("ROLLBACK", &[]).map(|_| ())
    }
}

/// Opens connections from connection properties.
pub trait SqlConnector: Send + Sync {
    fn connect(&self, props: &ConnectionProperties) -> Result<Box<dyn SqlConnection>, SqlError>;
}

/// Serves sqlite databases from local files.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultConnector;

impl SqlConnector for DefaultConnector {
    fn connect(&self, props: &ConnectionProperties) -> Result<Box<dyn SqlConnection>, SqlError> {
        match props.engine {
            DbEngine::Sqlite => Ok(Box::new(SqliteConnection::open(&props.sqlite_path())?)),
            other => Err(SqlError::UnsupportedEngine(other)),
        }
    }
}

/// Run `work` inside a transaction, rolling back if it fails.
pub(crate) fn in_transaction<T>(
    conn: &mut dyn SqlConnection,
    work: impl FnOnce(&mut dyn SqlConnection) -> Result<T, SqlError>,
) -> Result<T, SqlError> {
    conn.begin()?;
    match work(&mut *conn) {
        Ok(value) => {
            conn.commit()?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback_err) = conn.rollback() {
                tracing::warn!("rollback failed: {}", rollback_err);
            }
            Err(e)
        }
    }
}

/// Quote a table or column name for interpolation into SQL.
pub fn quote_ident(name: &str) -> Result<String, SqlError> {
    if name.is_empty() || name.contains('\0') {
        return Err(SqlError::InvalidIdentifier(name.to_string()));
    }
    Ok(format!("\"{}\"", name.replace('"', "\"\"")))
}
