// ABOUTME: Manager façade binding one entity type to exactly one repository.
// ABOUTME: Every call goes straight through to the repository; nothing is cached here.

use serde_json::Value;

use crate::repository::{Repository, RepositoryError};

/// Entry point for application code working with one kind of entity.
pub struct Manager<R> {
    entity_name: &'static str,
    repository: R,
}

impl<R: Repository> Manager<R> {
    pub fn new(entity_name: &'static str, repository: R) -> Self {
        Self {
            entity_name,
            repository,
        }
    }

    pub fn entity_name(&self) -> &'static str {
        self.entity_name
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn set(&self, entity: &R::Entity) -> Result<(), RepositoryError> {
        self.repository.save(entity)
    }

    /// The entity stored under `id`, or `None`.
    pub fn get(&self, id: &str) -> Result<Option<R::Entity>, RepositoryError> {
        let entity = self.repository.load(id)?;
        if entity.is_none() {
            tracing::debug!("{} {} not found", self.entity_name, id);
        }
        Ok(entity)
    }

    pub fn get_all(&self) -> Result<Vec<R::Entity>, RepositoryError> {
        self.repository.load_all()
    }

    pub fn delete(&self, id: &str) -> Result<(), RepositoryError> {
        self.repository.delete(id)
    }

    pub fn delete_all(&self) -> Result<(), RepositoryError> {
        tracing::info!("deleting all {} entities", self.entity_name);
        self.repository.delete_all()
    }

    pub fn exists(&self, id: &str) -> Result<bool, RepositoryError> {
        self.repository.exists(id)
    }

    pub fn search(
        &self,
        attribute: &str,
        value: &Value,
    ) -> Result<Vec<R::Entity>, RepositoryError> {
        self.repository.search(attribute, value)
    }
}
