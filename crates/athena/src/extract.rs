//! Top-level extraction run: one orchestrator per table, all sharing one
//! concurrency gate.

use std::collections::BTreeMap;
use std::fs;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use futures::future::join_all;
use tokio::time::Instant;
use tracing::{error, info};

use tabdump_core::{ExtractConfig, SourceTable};

use crate::engine::QueryEngine;
use crate::error::ExtractError;
use crate::executor::{ExecutorSettings, QueryExecutor};
use crate::gate::ConcurrencyGate;
use crate::orchestrator::{TableJobOrchestrator, TableSummary};
use crate::template::QueryTemplate;

/// Dates to extract for one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TablePlan {
    pub table: SourceTable,
    pub dates: Vec<NaiveDate>,
}

impl TablePlan {
    pub fn new(table: SourceTable, dates: Vec<NaiveDate>) -> Self {
        Self { table, dates }
    }

    /// The same dates for `selection`, or for every table when `None`.
    pub fn for_selection(selection: Option<SourceTable>, dates: &[NaiveDate]) -> Vec<TablePlan> {
        match selection {
            Some(table) => vec![TablePlan::new(table, dates.to_vec())],
            None => SourceTable::ALL
                .into_iter()
                .map(|table| TablePlan::new(table, dates.to_vec()))
                .collect(),
        }
    }

    /// Plans from a per-table date map, restricted to `selection` if given.
    pub fn from_map(
        mut dates: BTreeMap<SourceTable, Vec<NaiveDate>>,
        selection: Option<SourceTable>,
    ) -> Vec<TablePlan> {
        match selection {
            Some(table) => vec![TablePlan::new(table, dates.remove(&table).unwrap_or_default())],
            None => dates
                .into_iter()
                .map(|(table, dates)| TablePlan::new(table, dates))
                .collect(),
        }
    }
}

/// Every day from `from` to `to`, inclusive. Empty when `to < from`.
pub fn daily_range(from: NaiveDate, to: NaiveDate) -> Vec<NaiveDate> {
    from.iter_days().take_while(|d| *d <= to).collect()
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub tables: Vec<TableSummary>,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn files_written(&self) -> usize {
        self.tables.iter().map(|t| t.outcomes.len()).sum()
    }

    pub fn rows_written(&self) -> u64 {
        self.tables.iter().map(TableSummary::rows_written).sum()
    }
}

/// Validate configuration, then extract every plan concurrently.
///
/// Nothing is submitted to `engine` unless the configuration is complete
/// and every query template loads. All tables run to completion; the first
/// failure (in plan order) is returned afterwards.
pub async fn run_extraction<E: QueryEngine + ?Sized>(
    config: &ExtractConfig,
    engine: Arc<E>,
    plans: Vec<TablePlan>,
) -> Result<RunSummary, ExtractError> {
    let start = Instant::now();
    let selected: Vec<SourceTable> = plans.iter().map(|p| p.table).collect();
    config.validate(&selected)?;

    let mut prepared = Vec::with_capacity(plans.len());
    for plan in plans {
        let table_name = config.table_name(plan.table)?.to_string();
        let template = QueryTemplate::load(&config.script_path(plan.table))?;
        info!(table = %plan.table, athena_table = %table_name, dates = plan.dates.len(), "Prepared table");
        prepared.push((plan, table_name, template));
    }

    fs::create_dir_all(&config.paths.output_dir)?;

    let gate = ConcurrencyGate::new(config.scheduler.max_concurrent_queries as usize);
    let executor = Arc::new(QueryExecutor::new(
        engine,
        config.credentials(),
        ExecutorSettings::from_scheduler(&config.scheduler),
    ));
    let orchestrator = TableJobOrchestrator::new(executor, config.paths.output_dir.clone())
        .with_batch_size(config.scheduler.batch_size as usize);

    info!(
        tables = prepared.len(),
        concurrency = gate.limit(),
        output = %config.paths.output_dir.display(),
        "Extracting the data"
    );

    let runs = prepared
        .into_iter()
        .map(|(plan, table_name, template)| {
            let orchestrator = &orchestrator;
            let gate = &gate;
            async move { orchestrator.run(&table_name, plan.dates, &template, gate).await }
        });
    let results = join_all(runs).await;

    let mut tables = Vec::new();
    let mut first_error = None;
    for result in results {
        match result {
            Ok(summary) => tables.push(summary),
            Err(err) => {
                if first_error.is_none() {
                    first_error = Some(err);
                }
            }
        }
    }
    if let Some(err) = first_error {
        error!(error = %err, "Extraction failed");
        return Err(err.into());
    }

    let summary = RunSummary {
        tables,
        elapsed: start.elapsed(),
    };
    info!(
        files = summary.files_written(),
        rows = summary.rows_written(),
        elapsed_secs = summary.elapsed.as_secs_f64(),
        "Extraction complete"
    );
    Ok(summary)
}
