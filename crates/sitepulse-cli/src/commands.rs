use crate::args::{Cli, Command, CompareArgs, IngestArgs, ReportArgs};
use anyhow::Result;
use serde_json::json;
use sitepulse_core::model::RunContext;
use sitepulse_core::{catalog, compare, ingest, reconstruct};
use sitepulse_influx::InfluxStore;
use tracing::info;

pub async fn dispatch(cli: Cli) -> Result<()> {
    match cli.cmd {
        Command::Ingest(args) => run_ingest(args).await,
        Command::List => run_list().await,
        Command::Report(args) => run_report(args).await,
        Command::Compare(args) => run_compare(args).await,
    }
}

fn store() -> Result<InfluxStore> {
    Ok(InfluxStore::from_env()?)
}

async fn run_ingest(args: IngestArgs) -> Result<()> {
    let test_id = args.test_id.unwrap_or_else(RunContext::new_run_id);
    let ctx = RunContext::new(test_id, args.browser, args.iterations);
    info!(test_id = %ctx.test_id, root = %args.results_root.display(), "starting ingestion pass");

    let store = store()?;
    let report = ingest::ingest_run(&store, &ctx, &args.results_root).await?;
    print_json(&report)
}

async fn run_list() -> Result<()> {
    let store = store()?;
    let runs = catalog::list_runs(&store).await?;
    print_json(&runs)
}

async fn run_report(args: ReportArgs) -> Result<()> {
    let store = store()?;
    let views = reconstruct::page_views_for_run(&store, &args.test_id).await?;
    print_json(&json!({ "testId": args.test_id, "pages": views }))
}

async fn run_compare(args: CompareArgs) -> Result<()> {
    // Request shape is checked before the store is even constructed.
    compare::validate_ids(&args.test_ids)?;
    let store = store()?;
    let rows = compare::compare_runs(&store, &args.test_ids).await?;
    print_json(&rows)
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
