use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "sitepulse",
    version,
    about = "Normalize browser-performance test results into a time-series store and reconstruct per-page and cross-run views"
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Normalize one run's artifacts and write them as a single point batch
    Ingest(IngestArgs),
    /// List known test runs, newest first
    List,
    /// Reconstruct per-page views for one run
    Report(ReportArgs),
    /// Compare 2 or 3 runs across the fixed measurement set
    Compare(CompareArgs),
}

#[derive(clap::Args)]
pub struct IngestArgs {
    /// Results root containing `<testId>/pages/...` as left by the runner
    pub results_root: PathBuf,

    /// Run id; generated when omitted
    #[arg(long)]
    pub test_id: Option<String>,

    /// Browser the run used
    #[arg(long, default_value = "chrome")]
    pub browser: String,

    /// Iteration count the run used
    #[arg(long, default_value_t = 1)]
    pub iterations: u32,
}

#[derive(clap::Args)]
pub struct ReportArgs {
    /// Run id to reconstruct
    pub test_id: String,
}

#[derive(clap::Args)]
pub struct CompareArgs {
    /// Run ids to compare (exactly 2 or 3)
    #[arg(required = true, num_args = 1..)]
    pub test_ids: Vec<String>,
}
