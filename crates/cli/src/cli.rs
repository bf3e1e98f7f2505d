use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ckansync")]
#[command(version, about = "Find local files that are newer than, or missing from, a CKAN catalog", long_about = None)]
pub struct Cli {
    /// Configuration file
    #[arg(long, global = true, env = "CKANSYNC_CONFIG", default_value = "ckansync.toml")]
    pub config: PathBuf,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan a directory and report files that need syncing
    Scan(ScanArgs),
    /// Show how a single filename would be looked up
    Probe(ProbeArgs),
    /// Print the tracking snapshot
    Tracking,
    /// Print the effective configuration (secrets redacted)
    Config,
}

#[derive(clap::Args, Debug)]
pub struct ScanArgs {
    /// Directory to scan (defaults to monitor.directory)
    pub directory: Option<PathBuf>,

    /// Trace candidate identifiers, queries and resource scores
    #[arg(long)]
    pub debug: bool,

    /// Reconcile every file, ignoring the tracking snapshot
    #[arg(long)]
    pub force: bool,
}

#[derive(clap::Args, Debug)]
pub struct ProbeArgs {
    /// File name to look up, e.g. "sensor_2024.csv"
    pub filename: String,
}

impl Cli {
    pub fn debug(&self) -> bool {
        match &self.command {
            Commands::Scan(args) => args.debug,
            // Probing is a diagnostic by nature.
            Commands::Probe(_) => true,
            Commands::Tracking | Commands::Config => false,
        }
    }
}
