// ABOUTME: Dynamic subcommand registry layered over clap's builder API.
// ABOUTME: Subcommands can be added and removed at runtime; duplicate names reuse the existing entry.

use clap::{Arg, ArgMatches, Command};

/// One `--long`/`-s` option taking a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentSpec {
    pub long: String,
    pub short: Option<char>,
    pub help: String,
    pub required: bool,
}

/// A registered subcommand and its options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubcommandSpec {
    name: String,
    help: String,
    arguments: Vec<ArgumentSpec>,
}

impl SubcommandSpec {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arguments(&self) -> &[ArgumentSpec] {
        &self.arguments
    }

    /// Add an optional `--long <LONG>` option.
    pub fn add_argument(&mut self, long: &str, short: Option<char>, help: &str) -> &mut Self {
        self.push_argument(long, short, help, false)
    }

    /// Add a `--long <LONG>` option that must be given.
    pub fn add_required_argument(
        &mut self,
        long: &str,
        short: Option<char>,
        help: &str,
    ) -> &mut Self {
        self.push_argument(long, short, help, true)
    }

    fn push_argument(
        &mut self,
        long: &str,
        short: Option<char>,
        help: &str,
        required: bool,
    ) -> &mut Self {
        self.arguments.push(ArgumentSpec {
            long: long.to_string(),
            short,
            help: help.to_string(),
            required,
        });
        self
    }

    fn command(&self) -> Command {
        let mut command = Command::new(self.name.clone()).about(self.help.clone());
        for spec in &self.arguments {
            let mut arg = Arg::new(spec.long.clone())
                .long(spec.long.clone())
                .value_name(spec.long.to_uppercase())
                .help(spec.help.clone())
                .required(spec.required);
            if let Some(short) = spec.short {
                arg = arg.short(short);
            }
            command = command.arg(arg);
        }
        command
    }
}

/// The top-level command with a runtime-editable set of subcommands.
#[derive(Debug, Clone)]
pub struct CliRegistry {
    name: String,
    about: String,
    subcommands: Vec<SubcommandSpec>,
}

impl CliRegistry {
    pub fn new(name: &str, about: &str) -> Self {
        Self {
            name: name.to_string(),
            about: about.to_string(),
            subcommands: Vec::new(),
        }
    }

    /// Register a subcommand. If the name is already taken, the existing
    /// subcommand is returned unchanged and nothing new is created.
    pub fn add_subcommand(&mut self, name: &str, help: &str) -> &mut SubcommandSpec {
        let idx = match self.subcommands.iter().position(|s| s.name == name) {
            Some(idx) => {
                tracing::debug!("subcommand {} already registered", name);
                idx
            }
            None => {
                self.subcommands.push(SubcommandSpec {
                    name: name.to_string(),
                    help: help.to_string(),
                    arguments: Vec::new(),
                });
                self.subcommands.len() - 1
            }
        };
        &mut self.subcommands[idx]
    }

    /// Drop a subcommand. Returns whether it was registered.
    pub fn remove_subcommand(&mut self, name: &str) -> bool {
        let before = self.subcommands.len();
        self.subcommands.retain(|s| s.name != name);
        before != self.subcommands.len()
    }

    pub fn subcommand(&self, name: &str) -> Option<&SubcommandSpec> {
        self.subcommands.iter().find(|s| s.name == name)
    }

    pub fn len(&self) -> usize {
        self.subcommands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subcommands.is_empty()
    }

    /// Build the clap command for the current registrations.
    pub fn command(&self) -> Command {
        self.subcommands.iter().fold(
            Command::new(self.name.clone()).about(self.about.clone()),
            |command, spec| command.subcommand(spec.command()),
        )
    }

    pub fn try_parse_from<I, T>(&self, args: I) -> Result<ArgMatches, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        self.command().try_get_matches_from(args)
    }

    pub fn render_help(&self) -> String {
        self.command().render_help().to_string()
    }

    pub fn render_subcommand_help(&self, name: &str) -> Option<String> {
        let mut command = self.subcommand(name)?.command();
        Some(command.render_help().to_string())
    }
}

/// The registry behind the `depot` binary.
pub fn default_registry() -> CliRegistry {
    const DIR_HELP: &str = "repository directory name under the storage folder";
    let mut registry = CliRegistry::new("depot", "Inspect depot repositories and SQL data nodes");

    registry
        .add_subcommand("ls", "List entity ids stored in a file-system repository")
        .add_required_argument("dir", Some('d'), DIR_HELP);
    registry
        .add_subcommand("show", "Print one stored entity as JSON")
        .add_required_argument("dir", Some('d'), DIR_HELP)
        .add_required_argument("id", Some('i'), "entity id");
    registry
        .add_subcommand("purge", "Delete every entity in a file-system repository")
        .add_required_argument("dir", Some('d'), DIR_HELP);
    registry
        .add_subcommand("sql-read", "Read a SQL data node and print its data as JSON")
        .add_required_argument("properties", Some('p'), "YAML file with the data node properties");

    registry
}
