// ABOUTME: The Repository trait implemented by every storage backend.
// ABOUTME: Load, save, list, and delete entities keyed by id; absent ids load as None.

use depot_core::Entity;
use serde_json::Value;
use thiserror::Error;

use crate::sql::SqlError;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("sql error: {0}")]
    Sql(#[from] SqlError),

    #[error("invalid entity id: {0:?}")]
    InvalidId(String),

    #[error("stored model for {id} is not JSON text: found {found}")]
    InvalidModel { id: String, found: &'static str },
}

/// Backend-specific persistence for one entity type.
///
/// Repositories never hold on to entities: every load reconstructs a fresh
/// value from persisted state.
pub trait Repository {
    type Entity: Entity;

    /// Fetch an entity by id. Returns `Ok(None)` when nothing is stored under it.
    fn load(&self, id: &str) -> Result<Option<Self::Entity>, RepositoryError>;

    /// Persist an entity, replacing any record with the same id.
    fn save(&self, entity: &Self::Entity) -> Result<(), RepositoryError>;

    /// Every entity currently stored, in no particular order.
    fn load_all(&self) -> Result<Vec<Self::Entity>, RepositoryError>;

    /// Remove an entity. Removing an id that is not stored is a no-op.
    fn delete(&self, id: &str) -> Result<(), RepositoryError>;

    fn delete_all(&self) -> Result<(), RepositoryError>;

    /// Entities whose model field `attribute` equals `value`.
    fn search(&self, attribute: &str, value: &Value) -> Result<Vec<Self::Entity>, RepositoryError>;

    fn exists(&self, id: &str) -> Result<bool, RepositoryError> {
        Ok(self.load(id)?.is_some())
    }
}

/// True when the serialized model has `attribute` set to `value`.
pub(crate) fn model_matches(model: &Value, attribute: &str, value: &Value) -> bool {
    model.get(attribute) == Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn model_matches_compares_single_field() {
        let model = json!({"id": "uuid", "name": "foo", "size": 3});

        assert!(model_matches(&model, "name", &json!("foo")));
        assert!(model_matches(&model, "size", &json!(3)));
        assert!(!model_matches(&model, "name", &json!("bar")));
        assert!(!model_matches(&model, "missing", &Value::Null));
    }

    #[test]
    fn invalid_id_error_quotes_id() {
        let err = RepositoryError::InvalidId("../escape".to_string());
        assert_eq!(err.to_string(), "invalid entity id: \"../escape\"");
    }
}
