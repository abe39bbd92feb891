// ABOUTME: Core library for depot, containing entity traits, configuration, and shared value types.
// ABOUTME: This crate defines the vocabulary used by every repository backend and the CLI.

pub mod config;
pub mod entity;
pub mod scope;
pub mod table;

pub use config::{ConfigError, FolderResolver, GlobalConfig, SharedConfig};
pub use entity::{Entity, IdentityCodec, ModelCodec};
pub use scope::{DataNodeId, Scope};
pub use table::{Array, Frame, Record};
