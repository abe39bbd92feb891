// ABOUTME: Library half of the depot binary.
// ABOUTME: Exposes the subcommand registry and the command handlers so tests can drive them.

pub mod cli;
pub mod commands;
