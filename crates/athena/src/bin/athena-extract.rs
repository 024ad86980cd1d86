//! athena-extract: run the date-partitioned Athena extraction and write one
//! Parquet file per table and date.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use chrono::NaiveDate;
use clap::Parser;
use tracing::info;

use tabdump_athena::{daily_range, run_extraction, AthenaEngine, TablePlan};
use tabdump_core::{load_dotenv, ExtractConfig, SourceTable};

// ── CLI ─────────────────────────────────────────────────────────────

/// Extract Athena tables day by day into local Parquet files.
#[derive(Parser, Debug)]
#[command(name = "athena-extract", version, about)]
struct Cli {
    /// Only extract this table (e.g. TableB2C or ATH_TBL_B2C). Default: all.
    #[arg(long)]
    table: Option<SourceTable>,

    /// First date to extract (YYYY-MM-DD).
    #[arg(long, requires = "to", conflicts_with = "dates_file")]
    from: Option<NaiveDate>,

    /// Last date to extract, inclusive (YYYY-MM-DD).
    #[arg(long, requires = "from")]
    to: Option<NaiveDate>,

    /// JSON file mapping table to dates, e.g. {"TableB2C": ["2024-01-01"]}.
    #[arg(long)]
    dates_file: Option<PathBuf>,

    /// Configuration profile; env vars are read as {PROFILE}_{KEY} first.
    #[arg(long, env = "EXTRACT_PROFILE")]
    profile: Option<String>,

    /// Override the output directory.
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

fn load_dates_file(path: &Path) -> anyhow::Result<BTreeMap<SourceTable, Vec<NaiveDate>>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading dates file {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing dates file {}", path.display()))
}

fn plans(cli: &Cli) -> anyhow::Result<Vec<TablePlan>> {
    if let Some(path) = &cli.dates_file {
        return Ok(TablePlan::from_map(load_dates_file(path)?, cli.table));
    }
    match (cli.from, cli.to) {
        (Some(from), Some(to)) => {
            if to < from {
                bail!("--to ({}) is before --from ({})", to, from);
            }
            Ok(TablePlan::for_selection(cli.table, &daily_range(from, to)))
        }
        _ => bail!("either --from/--to or --dates-file is required"),
    }
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match cli.profile.as_deref() {
        Some(profile) if !profile.is_empty() => ExtractConfig::for_profile(profile),
        _ => ExtractConfig::from_env(),
    };
    if let Some(dir) = &cli.output_dir {
        config.paths.output_dir = dir.clone();
    }
    config.log_summary();

    let plans = plans(&cli)?;
    let jobs: usize = plans.iter().map(|p| p.dates.len()).sum();
    info!(tables = plans.len(), jobs, "Planned extraction");

    let engine = AthenaEngine::new(&config).context("building Athena client")?;
    let summary = run_extraction(&config, Arc::new(engine), plans)
        .await
        .context("extraction failed")?;

    info!(
        files = summary.files_written(),
        rows = summary.rows_written(),
        elapsed_secs = summary.elapsed.as_secs_f64(),
        "done"
    );
    Ok(())
}
