// ABOUTME: File-system repository storing one pretty-printed JSON model per entity.
// ABOUTME: Writes are atomic (tmp file, fsync, rename) and the folder is resolved on every call.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use depot_core::{Entity, FolderResolver, ModelCodec};
use serde_json::Value;

use crate::repository::{Repository, RepositoryError, model_matches};

const MODEL_EXTENSION: &str = "json";

/// A repository keeping each entity in `<storage_folder>/<dir_name>/<id>.json`.
pub struct FileSystemRepository<C> {
    codec: C,
    dir_name: String,
    storage_folder: FolderResolver,
}

impl<C: ModelCodec> FileSystemRepository<C> {
    pub fn new(codec: C, dir_name: impl Into<String>, storage_folder: FolderResolver) -> Self {
        Self {
            codec,
            dir_name: dir_name.into(),
            storage_folder,
        }
    }

    /// The directory holding this repository's files, as currently configured.
    pub fn dir_path(&self) -> PathBuf {
        self.storage_folder.resolve().join(&self.dir_name)
    }

    /// The file an entity with the given id is stored in.
    pub fn path_of(&self, id: &str) -> Result<PathBuf, RepositoryError> {
        validate_id(id)?;
        Ok(self.dir_path().join(format!("{id}.{MODEL_EXTENSION}")))
    }

    /// Copy the stored file for `id` into `folder`, creating the folder if needed.
    /// Returns the path of the copy.
    pub fn export(&self, id: &str, folder: &Path) -> Result<PathBuf, RepositoryError> {
        let source = self.path_of(id)?;
        fs::create_dir_all(folder)?;
        let target = folder.join(format!("{id}.{MODEL_EXTENSION}"));
        fs::copy(&source, &target)?;
        tracing::info!("exported {} to {}", id, target.display());
        Ok(target)
    }

    fn read_model(&self, path: &Path) -> Result<C::Model, RepositoryError> {
        let contents = fs::read_to_string(path)?;
        let model = serde_json::from_str(&contents)?;
        Ok(model)
    }

    /// Paths of every model file in the repository directory.
    fn model_paths(&self) -> Result<Vec<PathBuf>, RepositoryError> {
        let dir = self.dir_path();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == MODEL_EXTENSION) {
                paths.push(path);
            } else {
                tracing::debug!("skipping non-model entry {}", path.display());
            }
        }
        Ok(paths)
    }
}

impl<C: ModelCodec> Repository for FileSystemRepository<C> {
    type Entity = C::Entity;

    fn load(&self, id: &str) -> Result<Option<C::Entity>, RepositoryError> {
        let path = self.path_of(id)?;
        let model = match self.read_model(&path) {
            Ok(model) => model,
            Err(RepositoryError::Io(e)) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        Ok(Some(self.codec.from_model(model)))
    }

    /// Serialize the model, write it to `<id>.json.tmp`, fsync, then rename over
    /// `<id>.json`. Creates the repository directory if it does not exist.
    fn save(&self, entity: &C::Entity) -> Result<(), RepositoryError> {
        let final_path = self.path_of(entity.id())?;
        let dir = self.dir_path();
        fs::create_dir_all(&dir)?;

        let tmp_path = dir.join(format!("{}.{MODEL_EXTENSION}.tmp", entity.id()));
        let json = serde_json::to_string_pretty(&self.codec.to_model(entity))?;

        let written = write_synced(&tmp_path, json.as_bytes())
            .and_then(|()| fs::rename(&tmp_path, &final_path));
        if let Err(e) = written {
            match fs::remove_file(&tmp_path) {
                Err(cleanup) if cleanup.kind() != ErrorKind::NotFound => {
                    tracing::warn!("could not remove {}: {}", tmp_path.display(), cleanup);
                }
                _ => {}
            }
            return Err(e.into());
        }
        tracing::debug!("saved {} to {}", entity.id(), final_path.display());

        Ok(())
    }

    fn load_all(&self) -> Result<Vec<C::Entity>, RepositoryError> {
        let mut entities = Vec::new();
        for path in self.model_paths()? {
            let model = self.read_model(&path)?;
            entities.push(self.codec.from_model(model));
        }
        Ok(entities)
    }

    fn delete(&self, id: &str) -> Result<(), RepositoryError> {
        let path = self.path_of(id)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!("deleted {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn delete_all(&self) -> Result<(), RepositoryError> {
        let dir = self.dir_path();
        match fs::remove_dir_all(&dir) {
            Ok(()) => {
                tracing::info!("removed repository directory {}", dir.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn search(&self, attribute: &str, value: &Value) -> Result<Vec<C::Entity>, RepositoryError> {
        let mut found = Vec::new();
        for path in self.model_paths()? {
            let model = self.read_model(&path)?;
            if model_matches(&serde_json::to_value(&model)?, attribute, value) {
                found.push(self.codec.from_model(model));
            }
        }
        Ok(found)
    }
}

fn write_synced(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(contents)?;
    file.sync_all()
}

/// Ids become file names, so they must not be able to leave the repository directory.
fn validate_id(id: &str) -> Result<(), RepositoryError> {
    if id.is_empty() || id == "." || id.contains("..") || id.contains(['/', '\\']) {
        return Err(RepositoryError::InvalidId(id.to_string()));
    }
    Ok(())
}
