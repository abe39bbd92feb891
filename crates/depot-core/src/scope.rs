// ABOUTME: Identifiers and visibility scopes for data nodes.
// ABOUTME: Data node ids embed their config id plus a fresh ULID.

use std::fmt;

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// How widely a data node is shared between pipeline runs.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Pipeline,
    #[default]
    Scenario,
    Cycle,
    Global,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Scope::Pipeline => "pipeline",
            Scope::Scenario => "scenario",
            Scope::Cycle => "cycle",
            Scope::Global => "global",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataNodeId(String);

impl DataNodeId {
    const PREFIX: &'static str = "DATANODE";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh id of the form `DATANODE_<config_id>_<ulid>`.
    pub fn generate(config_id: &str) -> Self {
        Self(format!("{}_{}_{}", Self::PREFIX, config_id, Ulid::new()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DataNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DataNodeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}
