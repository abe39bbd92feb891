// ABOUTME: rusqlite-backed SqlConnection for the sqlite engine.
// ABOUTME: Converts between JSON cell values and sqlite storage classes.

use std::path::Path;

use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{Connection, params_from_iter};
use serde_json::{Number, Value};

use super::{QueryResult, SqlConnection, SqlError};

/// A sqlite database connection, closed when dropped.
pub struct SqliteConnection {
    conn: Connection,
}

impl SqliteConnection {
    /// Open or create a sqlite database file.
    pub fn open(path: &Path) -> Result<Self, SqlError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        tracing::debug!("opened sqlite database {}", path.display());
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, SqlError> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }
}

impl SqlConnection for SqliteConnection {
    fn query(&mut self, sql: &str, params: &[Value]) -> Result<QueryResult, SqlError> {
        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let width = columns.len();

        let mut rows = stmt.query(params_from_iter(params.iter().map(to_sql_value)))?;
        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(width);
            for idx in 0..width {
                values.push(from_sql_ref(row.get_ref(idx)?));
            }
            result.push(values);
        }

        Ok(QueryResult {
            columns,
            rows: result,
        })
    }

    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<usize, SqlError> {
        let affected = self
            .conn
            .execute(sql, params_from_iter(params.iter().map(to_sql_value)))?;
        Ok(affected)
    }
}

/// JSON cell to sqlite value. Arrays and objects are stored as JSON text.
fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        Value::Array(_) | Value::Object(_) => SqlValue::Text(value.to_string()),
    }
}

/// sqlite value to JSON cell. Non-finite reals become null; blobs become byte lists.
fn from_sql_ref(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::Array(b.iter().map(|&byte| Value::from(byte)).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn execute_and_query_round_trip() {
        let mut conn = SqliteConnection::open_in_memory().unwrap();
        conn.execute("CREATE TABLE t (a, b, c)", &[]).unwrap();
        conn.execute(
            "INSERT INTO t VALUES (?1, ?2, ?3)",
            &[json!(1), json!("two"), json!(3.5)],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO t VALUES (?1, ?2, ?3)",
            &[Value::Null, json!(true), json!({"k": "v"})],
        )
        .unwrap();

        let result = conn.query("SELECT a, b, c FROM t ORDER BY rowid", &[]).unwrap();

        assert_eq!(result.columns, vec!["a", "b", "c"]);
        assert_eq!(result.rows[0], vec![json!(1), json!("two"), json!(3.5)]);
        assert_eq!(result.rows[1], vec![Value::Null, json!(1), json!(r#"{"k":"v"}"#)]);
    }

    #[test]
    fn query_with_params_filters() {
        let mut conn = SqliteConnection::open_in_memory().unwrap();
        conn.execute("CREATE TABLE t (name)", &[]).unwrap();
        for name in ["a", "b", "a"] {
            conn.execute("INSERT INTO t VALUES (?1)", &[json!(name)]).unwrap();
        }

        let result = conn
            .query("SELECT name FROM t WHERE name = ?1", &[json!("a")])
            .unwrap();
        assert_eq!(result.rows.len(), 2);
    }

    #[test]
    fn transactions_commit_and_roll_back() {
        let dir = TempDir::new().unwrap();
        let mut conn = SqliteConnection::open(&dir.path().join("tx.db")).unwrap();
        conn.execute("CREATE TABLE t (a)", &[]).unwrap();

        conn.begin().unwrap();
        conn.execute("INSERT INTO t VALUES (1)", &[]).unwrap();
        conn.rollback().unwrap();

        conn.begin().unwrap();
        conn.execute("INSERT INTO t VALUES (2)", &[]).unwrap();
        conn.commit().unwrap();

        let result = conn.query("SELECT a FROM t", &[]).unwrap();
        assert_eq!(result.rows, vec![vec![json!(2)]]);
    }

    #[test]
    fn blobs_and_empty_results() {
        let mut conn = SqliteConnection::open_in_memory().unwrap();
        let result = conn.query("SELECT x'0102' AS data", &[]).unwrap();
        assert_eq!(result.rows[0][0], json!([1, 2]));

        conn.execute("CREATE TABLE t (a)", &[]).unwrap();
        let empty = conn.query("SELECT * FROM t", &[]).unwrap();
        assert_eq!(empty.columns, vec!["a"]);
        assert!(empty.rows.is_empty());
    }
}
