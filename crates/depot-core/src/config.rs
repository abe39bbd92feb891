// ABOUTME: Global configuration for depot: where file-system repositories keep their data.
// ABOUTME: Loads from environment variables or YAML and hands out always-fresh folder resolvers.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_STORAGE_FOLDER: &str = ".data";

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Process-level settings consulted by repositories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default = "default_storage_folder")]
    pub storage_folder: PathBuf,
}

fn default_storage_folder() -> PathBuf {
    PathBuf::from(DEFAULT_STORAGE_FOLDER)
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            storage_folder: default_storage_folder(),
        }
    }
}

impl GlobalConfig {
    /// Load configuration from environment variables with sensible defaults.
    ///
    /// Environment variables:
    /// - DEPOT_STORAGE_FOLDER: root folder for file-system repositories (default: .data)
    pub fn from_env() -> Self {
        let storage_folder = std::env::var("DEPOT_STORAGE_FOLDER")
            .ok()
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_storage_folder);

        Self { storage_folder }
    }

    /// Load configuration from a YAML document on disk. Missing keys take defaults.
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }
}

/// Resolves the storage folder at the moment of each call.
#[derive(Clone)]
pub struct FolderResolver(Arc<dyn Fn() -> PathBuf + Send + Sync>);

impl FolderResolver {
    pub fn new(resolve: impl Fn() -> PathBuf + Send + Sync + 'static) -> Self {
        Self(Arc::new(resolve))
    }

    /// A resolver that always answers with the same folder.
    pub fn fixed(folder: impl Into<PathBuf>) -> Self {
        let folder = folder.into();
        Self::new(move || folder.clone())
    }

    pub fn resolve(&self) -> PathBuf {
        (self.0)()
    }
}

impl std::fmt::Debug for FolderResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("FolderResolver").field(&self.resolve()).finish()
    }
}

/// A global configuration that can be changed while repositories hold resolvers to it.
#[derive(Debug, Clone, Default)]
pub struct SharedConfig {
    inner: Arc<RwLock<GlobalConfig>>,
}

impl SharedConfig {
    pub fn new(config: GlobalConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    pub fn snapshot(&self) -> GlobalConfig {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn storage_folder(&self) -> PathBuf {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .storage_folder
            .clone()
    }

    pub fn set_storage_folder(&self, folder: impl Into<PathBuf>) {
        let folder = folder.into();
        tracing::debug!("storage folder set to {}", folder.display());
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .storage_folder = folder;
    }

    /// A resolver that reads the storage folder from this config on every call.
    pub fn folder_resolver(&self) -> FolderResolver {
        let shared = self.clone();
        FolderResolver::new(move || shared.storage_folder())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn config_loads_defaults() {
        // SAFETY: test-only code, single-threaded test execution
        unsafe {
            std::env::remove_var("DEPOT_STORAGE_FOLDER");
        }

        let config = GlobalConfig::from_env();
        assert_eq!(config.storage_folder, PathBuf::from(".data"));
    }

    #[test]
    fn config_loads_yaml_with_defaults_for_missing_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("depot.yaml");

        fs::write(&path, "storage_folder: /var/lib/depot\n").unwrap();
        let config = GlobalConfig::from_yaml_file(&path).unwrap();
        assert_eq!(config.storage_folder, PathBuf::from("/var/lib/depot"));

        fs::write(&path, "{}\n").unwrap();
        let config = GlobalConfig::from_yaml_file(&path).unwrap();
        assert_eq!(config, GlobalConfig::default());
    }

    #[test]
    fn config_yaml_missing_file_names_path() {
        let err = GlobalConfig::from_yaml_file(Path::new("/nonexistent/depot.yaml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/depot.yaml"));
    }

    #[test]
    fn resolver_sees_later_changes() {
        let shared = SharedConfig::new(GlobalConfig::default());
        let resolver = shared.folder_resolver();
        assert_eq!(resolver.resolve(), PathBuf::from(".data"));

        shared.set_storage_folder("/tmp/elsewhere");
        assert_eq!(resolver.resolve(), PathBuf::from("/tmp/elsewhere"));
        assert_eq!(shared.snapshot().storage_folder, PathBuf::from("/tmp/elsewhere"));
    }

    #[test]
    fn fixed_resolver_is_constant() {
        let resolver = FolderResolver::fixed("/srv/depot");
        assert_eq!(resolver.resolve(), PathBuf::from("/srv/depot"));
        assert_eq!(resolver.resolve(), resolver.clone().resolve());
    }
}
