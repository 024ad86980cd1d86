//! Drives every date of one table through query, materialization and
//! logging, batch by batch.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use futures::future::join_all;
use tokio::time::Instant;
use tracing::{error, info};

use crate::engine::QueryEngine;
use crate::error::{JobError, QueryError};
use crate::executor::QueryExecutor;
use crate::gate::ConcurrencyGate;
use crate::job::{JobState, QueryJob};
use crate::materialize::{output_path, persist};
use crate::partition::{chunk, DEFAULT_BATCH_SIZE};
use crate::template::QueryTemplate;

/// Result of one successfully materialized date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutcome {
    pub date: NaiveDate,
    pub path: PathBuf,
    /// Data rows read back from the written file.
    pub rows: u64,
}

/// Totals for one table after every batch succeeded.
#[derive(Debug, Clone)]
pub struct TableSummary {
    pub table_name: String,
    pub outcomes: Vec<JobOutcome>,
    pub elapsed: Duration,
}

impl TableSummary {
    pub fn rows_written(&self) -> u64 {
        self.outcomes.iter().map(|o| o.rows).sum()
    }
}

pub struct TableJobOrchestrator<E: ?Sized> {
    executor: Arc<QueryExecutor<E>>,
    output_dir: PathBuf,
    batch_size: usize,
}

impl<E: QueryEngine + ?Sized> TableJobOrchestrator<E> {
    pub fn new(executor: Arc<QueryExecutor<E>>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            executor,
            output_dir: output_dir.into(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Extract every date in `dates` for `table_name`.
    ///
    /// Jobs of a batch run concurrently (bounded by `gate`); the next batch
    /// starts only after every job of the current one has finished. When
    /// jobs fail, their siblings still run to completion and the error of
    /// the earliest failed date is returned.
    pub async fn run(
        &self,
        table_name: &str,
        dates: Vec<NaiveDate>,
        template: &QueryTemplate,
        gate: &ConcurrencyGate,
    ) -> Result<TableSummary, JobError> {
        let start = Instant::now();
        let batches = chunk(dates, self.batch_size);
        let total_batches = batches.len();

        info!(table = %table_name, batches = total_batches, batch_size = self.batch_size, "Processing table");

        let mut outcomes = Vec::new();
        for (idx, batch) in batches.enumerate() {
            let first = batch.first().copied();
            let last = batch.last().copied();
            info!(
                table = %table_name,
                batch = idx + 1,
                of = total_batches,
                jobs = batch.len(),
                from = ?first,
                to = ?last,
                "Starting batch"
            );

            let jobs = batch
                .into_iter()
                .map(|date| self.run_job(table_name, date, template, gate));
            let results = join_all(jobs).await;

            let mut first_error = None;
            let mut failed = 0usize;
            for result in results {
                match result {
                    Ok(outcome) => outcomes.push(outcome),
                    Err(err) => {
                        failed += 1;
                        if first_error.is_none() {
                            first_error = Some(err);
                        }
                    }
                }
            }

            if let Some(err) = first_error {
                error!(
                    table = %table_name,
                    batch = idx + 1,
                    failed,
                    error = %err,
                    "Batch failed"
                );
                return Err(err);
            }
        }

        let summary = TableSummary {
            table_name: table_name.to_string(),
            outcomes,
            elapsed: start.elapsed(),
        };
        info!(
            table = %table_name,
            files = summary.outcomes.len(),
            rows = summary.rows_written(),
            elapsed_secs = summary.elapsed.as_secs_f64(),
            "Table done"
        );
        Ok(summary)
    }

    async fn run_job(
        &self,
        table_name: &str,
        date: NaiveDate,
        template: &QueryTemplate,
        gate: &ConcurrencyGate,
    ) -> Result<JobOutcome, JobError> {
        let mut job = QueryJob::new(table_name, date, template.render(date));

        match self.materialize(&mut job, gate).await {
            Ok(outcome) => {
                info!(
                    table = %table_name,
                    date = %date,
                    rows = outcome.rows,
                    path = %outcome.path.display(),
                    "Result done"
                );
                Ok(outcome)
            }
            Err(err) => {
                job.fail();
                error!(table = %table_name, date = %date, error = %err, "Job failed");
                Err(JobError::new(table_name, date, err))
            }
        }
    }

    async fn materialize(
        &self,
        job: &mut QueryJob,
        gate: &ConcurrencyGate,
    ) -> Result<JobOutcome, QueryError> {
        let result = self.executor.execute(job, gate).await?;

        job.mark(JobState::Materializing);
        let path = output_path(&self.output_dir, &job.table_name, job.date);
        let rows = persist(result, path.clone()).await?;
        job.mark(JobState::Done);

        Ok(JobOutcome {
            date: job.date,
            path,
            rows,
        })
    }
}
