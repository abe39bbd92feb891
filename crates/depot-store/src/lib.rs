// ABOUTME: Persistence layer for depot, mapping entities onto file-system and SQL storage.
// ABOUTME: Provides the Repository trait, its two backends, the Manager façade, and SQL data nodes.

pub mod filesystem;
pub mod manager;
pub mod properties;
pub mod repository;
pub mod sql;
pub mod testing;

pub use filesystem::FileSystemRepository;
pub use manager::Manager;
pub use properties::{ConnectionProperties, DbEngine, Properties, PropertyError};
pub use repository::{Repository, RepositoryError};
pub use sql::{
    DefaultConnector, Exposed, ExposedType, QueryResult, SqlConnection, SqlConnector,
    SqlDataNode, SqlError, SqlRepository, WritePayload,
};
