// ABOUTME: SQL-backed entity repository storing one JSON model per row, keyed by entity id.
// ABOUTME: Each operation opens its own connection and ensures the table exists first.

use std::sync::Arc;

use depot_core::{Entity, ModelCodec};
use serde_json::Value;

use super::{DefaultConnector, SqlConnection, SqlConnector, SqlError, quote_ident};
use crate::properties::ConnectionProperties;
use crate::repository::{Repository, RepositoryError, model_matches};

/// A repository keeping entities as rows of `(id, model)` in one table.
pub struct SqlRepository<C> {
    codec: C,
    connection: ConnectionProperties,
    table: String,
    connector: Arc<dyn SqlConnector>,
}

impl<C: ModelCodec> SqlRepository<C> {
    pub fn new(codec: C, connection: ConnectionProperties, table: impl Into<String>) -> Self {
        Self {
            codec,
            connection,
            table: table.into(),
            connector: Arc::new(DefaultConnector),
        }
    }

    pub fn with_connector(mut self, connector: Arc<dyn SqlConnector>) -> Self {
        self.connector = connector;
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Open a connection with the entity table in place.
    fn open(&self) -> Result<(Box<dyn SqlConnection>, String), SqlError> {
        let mut conn = self.connector.connect(&self.connection)?;
        let table = quote_ident(&self.table)?;
        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {table} (
                    id TEXT PRIMARY KEY,
                    model TEXT NOT NULL
                )"
            ),
            &[],
        )?;
        Ok((conn, table))
    }

    fn decode(&self, id: &str, cell: &Value) -> Result<C::Entity, RepositoryError> {
        let model: C::Model = serde_json::from_str(model_text(id, cell)?)?;
        Ok(self.codec.from_model(model))
    }

    /// Every stored `(id, model)` pair, the model as its raw cell.
    fn all_models(&self) -> Result<Vec<(String, Value)>, RepositoryError> {
        let (mut conn, table) = self.open()?;
        let result = conn.query(&format!("SELECT id, model FROM {table}"), &[])?;
        Ok(result
            .rows
            .into_iter()
            .filter_map(|row| {
                let mut cells = row.into_iter();
                let id = match cells.next()? {
                    Value::String(id) => id,
                    other => other.to_string(),
                };
                Some((id, cells.next()?))
            })
            .collect())
    }
}

impl<C: ModelCodec> Repository for SqlRepository<C> {
    type Entity = C::Entity;

    fn load(&self, id: &str) -> Result<Option<C::Entity>, RepositoryError> {
        let (mut conn, table) = self.open()?;
        let result = conn.query(
            &format!("SELECT model FROM {table} WHERE id = ?1"),
            &[Value::from(id)],
        )?;

        match result.rows.first().and_then(|row| row.first()) {
            Some(cell) => Ok(Some(self.decode(id, cell)?)),
            None => Ok(None),
        }
    }

    fn save(&self, entity: &C::Entity) -> Result<(), RepositoryError> {
        let json = serde_json::to_string(&self.codec.to_model(entity))?;
        let (mut conn, table) = self.open()?;
        conn.execute(
            &format!(
                "INSERT INTO {table} (id, model) VALUES (?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET model = excluded.model"
            ),
            &[Value::from(entity.id()), Value::from(json)],
        )?;
        tracing::debug!("saved {} to table {}", entity.id(), self.table);
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<C::Entity>, RepositoryError> {
        self.all_models()?
            .iter()
            .map(|(id, cell)| self.decode(id, cell))
            .collect()
    }

    fn delete(&self, id: &str) -> Result<(), RepositoryError> {
        let (mut conn, table) = self.open()?;
        let removed = conn.execute(
            &format!("DELETE FROM {table} WHERE id = ?1"),
            &[Value::from(id)],
        )?;
        tracing::debug!("deleted {} rows for {} from {}", removed, id, self.table);
        Ok(())
    }

    fn delete_all(&self) -> Result<(), RepositoryError> {
        let (mut conn, table) = self.open()?;
        let removed = conn.execute(&format!("DELETE FROM {table}"), &[])?;
        tracing::info!("deleted {} rows from {}", removed, self.table);
        Ok(())
    }

    fn search(&self, attribute: &str, value: &Value) -> Result<Vec<C::Entity>, RepositoryError> {
        let mut found = Vec::new();
        for (id, cell) in self.all_models()? {
            let model: Value = serde_json::from_str(model_text(&id, &cell)?)?;
            if model_matches(&model, attribute, value) {
                found.push(self.decode(&id, &cell)?);
            }
        }
        Ok(found)
    }
}

/// The JSON text held in a model cell.
fn model_text<'a>(id: &str, cell: &'a Value) -> Result<&'a str, RepositoryError> {
    cell.as_str().ok_or_else(|| RepositoryError::InvalidModel {
        id: id.to_string(),
        found: match cell {
            Value::Null => "null",
            Value::Bool(_) => "a boolean",
            Value::Number(_) => "a number",
            Value::String(_) => "text",
            Value::Array(_) => "binary data",
            Value::Object(_) => "an object",
        },
    })
}
