// ABOUTME: Entry point for the depot binary.
// ABOUTME: Loads configuration, initializes tracing, and dispatches the parsed subcommand.

use std::path::Path;

use depot::{cli, commands};
use depot_core::{GlobalConfig, SharedConfig};

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("depot=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let matches = cli::default_registry().command().get_matches();

    let global = match std::env::var("DEPOT_CONFIG") {
        Ok(path) => GlobalConfig::from_yaml_file(Path::new(&path))?,
        Err(_) => GlobalConfig::from_env(),
    };
    tracing::debug!("storage folder: {}", global.storage_folder.display());

    let output = commands::run(&matches, &SharedConfig::new(global))?;
    if !output.is_empty() {
        println!("{output}");
    }
    Ok(())
}
