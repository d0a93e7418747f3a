//! # CLI Argument Definitions

use chrono::{DateTime, Utc};
use clap::{ArgAction, Args, Parser, Subcommand};
use kreg::domain::EntityKinds;
use std::path::PathBuf;

/// The `kreg` command line.
#[derive(Debug, Parser)]
#[command(name = "kreg")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(arg_required_else_help = true)]
#[command(about = "Compile ontology packs into a kernel registry, generated constants and database rows")]
pub struct Cli {
    /// Configuration file (defaults to ./kreg.toml when present)
    #[arg(long, global = true, env = "KREG_CONFIG")]
    pub config: Option<PathBuf>,

    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load and merge all packs, then print a summary
    Validate(PacksArgs),
    /// Generate the concept and value constant modules
    Generate(GenerateArgs),
    /// Compare the database with the registry and optionally apply it
    Sync(SyncArgs),
    /// Report drift between the database and the registry
    Drift(DriftArgs),
    /// Print the current kernel snapshot of the database
    Status,
}

#[derive(Debug, Clone, Default, Args)]
pub struct PacksArgs {
    /// Pack directory (overrides `packs.dir`)
    #[arg(long, value_name = "DIR")]
    pub packs: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub packs: PacksArgs,

    /// Output directory (overrides `codegen.out_dir`)
    #[arg(long, value_name = "DIR")]
    pub out: Option<PathBuf>,

    /// Timestamp written into the generated headers (RFC 3339, defaults to now)
    #[arg(long, value_name = "RFC3339", value_parser = parse_timestamp)]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Args)]
pub struct SyncArgs {
    #[command(flatten)]
    pub packs: PacksArgs,

    /// Write the registry to the database (otherwise only report drift)
    #[arg(long)]
    pub apply: bool,

    /// Entity kinds to sync, e.g. `concepts,values`
    #[arg(long, value_name = "KINDS", value_parser = parse_kinds)]
    pub only: Option<EntityKinds>,

    /// Rows per batch (1..=1000, overrides `sync.batch_size`)
    #[arg(long, value_name = "N")]
    pub batch_size: Option<usize>,

    /// Activate without deactivating; only valid on an empty database
    #[arg(long)]
    pub skip_deactivation: bool,

    /// Deactivate rows not written by this snapshot
    #[arg(long)]
    pub retire_stale: bool,

    /// Activate the snapshot even if some batches failed
    #[arg(long)]
    pub activate_on_partial: bool,
}

#[derive(Debug, Clone, Args)]
pub struct DriftArgs {
    #[command(flatten)]
    pub packs: PacksArgs,

    /// Print the drift report as JSON
    #[arg(long)]
    pub json: bool,
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| format!("expected RFC 3339 timestamp: {e}"))
}

fn parse_kinds(raw: &str) -> Result<EntityKinds, String> {
    EntityKinds::parse_list(raw)
        .filter(|kinds| !kinds.is_empty())
        .ok_or_else(|| format!("unknown entity kinds '{raw}' (expected concepts, value_sets, values or all)"))
}
