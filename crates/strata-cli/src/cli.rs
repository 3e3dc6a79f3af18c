use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "strata",
    about = "Strata — layered fileset storage and leveled compaction",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// TOML file with compaction settings
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Check whether layers of the given sizes are compacted
    Check(LayerArgs),
    /// Compact layers of the given sizes
    Compact(CompactArgs),
    /// Print the effective configuration
    Config,
}

#[derive(Args)]
pub struct LayerArgs {
    /// Layer sizes in bytes, oldest first
    #[arg(long, value_delimiter = ',', required = true)]
    pub sizes: Vec<u64>,
    /// Override the configured level factor
    #[arg(long)]
    pub level_factor: Option<i64>,
}

#[derive(Args)]
pub struct CompactArgs {
    #[command(flatten)]
    pub layers: LayerArgs,
    /// Fan compaction out to a worker pool
    #[arg(long)]
    pub distributed: bool,
    /// Override the configured maximum fan-in
    #[arg(long)]
    pub max_fan_in: Option<usize>,
    /// Override the configured worker pool size
    #[arg(long)]
    pub workers: Option<usize>,
}
