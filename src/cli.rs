use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::resource::ResourceKind;

#[derive(Parser, Debug)]
#[command(name = "pvenotes", about = "Mirror Proxmox VE inventory notes into Markdown documents")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "pvenotes.toml")]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Plain)]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Reconcile remote notes into the notes directory
    Sync {
        /// Kind to sync (host, vm, container); repeatable. Defaults to [sync] kinds
        #[arg(short, long = "kind", value_parser = parse_kind)]
        kinds: Vec<ResourceKind>,
    },

    /// List inventory without touching any document
    List {
        /// Kind to list (host, vm, container); repeatable. Defaults to [sync] kinds
        #[arg(short, long = "kind", value_parser = parse_kind)]
        kinds: Vec<ResourceKind>,
    },

    /// Write a starter config file
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

fn parse_kind(s: &str) -> Result<ResourceKind, String> {
    s.parse().map_err(|e: crate::error::SyncError| e.to_string())
}
