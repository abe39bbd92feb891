// ABOUTME: Implementations of the depot binary's subcommands.
// ABOUTME: Inspects file-system repositories as raw JSON documents and reads SQL data nodes.

use std::fs;
use std::path::Path;

use anyhow::{Context, bail};
use clap::ArgMatches;
use depot_core::{Entity, IdentityCodec, Scope, SharedConfig};
use depot_store::properties::Properties;
use depot_store::{FileSystemRepository, Manager, SqlDataNode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Any stored model, viewed as an id plus whatever other fields it has.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Entity for Document {
    fn id(&self) -> &str {
        &self.id
    }
}

type DocumentManager = Manager<FileSystemRepository<IdentityCodec<Document>>>;

fn document_manager(config: &SharedConfig, dir: &str) -> DocumentManager {
    Manager::new(
        "Document",
        FileSystemRepository::new(IdentityCodec::new(), dir, config.folder_resolver()),
    )
}

fn required<'a>(matches: &'a ArgMatches, name: &str) -> anyhow::Result<&'a str> {
    matches
        .get_one::<String>(name)
        .map(String::as_str)
        .with_context(|| format!("missing --{name}"))
}

/// Run the parsed subcommand and return what it prints.
pub fn run(matches: &ArgMatches, config: &SharedConfig) -> anyhow::Result<String> {
    match matches.subcommand() {
        Some(("ls", sub)) => {
            let manager = document_manager(config, required(sub, "dir")?);
            let mut ids: Vec<String> = manager.get_all()?.into_iter().map(|d| d.id).collect();
            ids.sort();
            Ok(ids.join("\n"))
        }
        Some(("show", sub)) => {
            let dir = required(sub, "dir")?;
            let id = required(sub, "id")?;
            match document_manager(config, dir).get(id)? {
                Some(document) => Ok(serde_json::to_string_pretty(&document)?),
                None => bail!("no entity {id} in {dir}"),
            }
        }
        Some(("purge", sub)) => {
            let dir = required(sub, "dir")?;
            let manager = document_manager(config, dir);
            let count = manager.get_all()?.len();
            manager.delete_all()?;
            Ok(format!("removed {count} entities from {dir}"))
        }
        Some(("sql-read", sub)) => sql_read(Path::new(required(sub, "properties")?)),
        Some((other, _)) => bail!("subcommand {other} has no handler"),
        None => bail!("no subcommand given; see --help"),
    }
}

/// Build a data node from a YAML properties file named after its config id,
/// read it, and render the exposed data as JSON.
fn sql_read(path: &Path) -> anyhow::Result<String> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let properties: Properties = serde_yaml::from_str(&contents)
        .with_context(|| format!("parsing {}", path.display()))?;
    let config_id = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "sql".to_string());

    let node = SqlDataNode::new(config_id, Scope::default(), None, &properties)?;
    tracing::info!("reading data node {} from {}", node.id(), node.write_table());
    let data = node.read()?;
    Ok(serde_json::to_string_pretty(&data)?)
}
