//! Runs one query job against the remote engine.
//!
//! Provides [`QueryExecutor`], which holds a [`ConcurrencyGate`] slot for the
//! whole remote lifecycle: submit, fixed-interval polling with a deadline,
//! and paginated result retrieval. Throttling errors on any of those calls
//! are retried with exponential backoff against one attempt budget per job.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use tabdump_core::{Credentials, SchedulerConfig};

use crate::backoff::RetryPolicy;
use crate::engine::{EngineError, ExecutionState, ExecutionStatus, QueryEngine, QueryExecutionHandle};
use crate::error::QueryError;
use crate::gate::ConcurrencyGate;
use crate::job::{JobState, QueryJob};
use crate::result::{QueryMetadata, ResultSet};

/// Timing knobs for a single execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorSettings {
    pub retry: RetryPolicy,
    pub poll_interval: Duration,
    /// Deadline for the query to reach a terminal state once submitted.
    pub query_timeout: Duration,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self::from_scheduler(&SchedulerConfig::default())
    }
}

impl ExecutorSettings {
    pub fn from_scheduler(cfg: &SchedulerConfig) -> Self {
        Self {
            retry: RetryPolicy::new(cfg.max_retries),
            poll_interval: Duration::from_secs(cfg.poll_interval_secs),
            query_timeout: Duration::from_secs(cfg.query_timeout_secs),
        }
    }
}

/// Table and date of the job being executed, for log fields.
struct JobContext {
    table: String,
    date: NaiveDate,
}

pub struct QueryExecutor<E: ?Sized> {
    engine: Arc<E>,
    credentials: Credentials,
    settings: ExecutorSettings,
}

impl<E: QueryEngine + ?Sized> QueryExecutor<E> {
    pub fn new(engine: Arc<E>, credentials: Credentials, settings: ExecutorSettings) -> Self {
        Self {
            engine,
            credentials,
            settings,
        }
    }

    /// Run `job` to completion and return every result row, header echo
    /// included.
    ///
    /// The gate slot is held from submission until the last page is read
    /// and is released on every return path.
    pub async fn execute(
        &self,
        job: &mut QueryJob,
        gate: &ConcurrencyGate,
    ) -> Result<ResultSet, QueryError> {
        self.credentials.validate()?;

        let _permit = gate.acquire().await;
        let ctx = JobContext {
            table: job.table_name.clone(),
            date: job.date,
        };
        let mut throttles = 0u32;

        let sql = job.query_text.clone();
        let query_id = self
            .with_backoff(&ctx, &mut throttles, || self.engine.start_query(&sql))
            .await?;
        let mut handle = QueryExecutionHandle::submitted(query_id);
        job.mark(JobState::Submitted);

        info!(
            table = %ctx.table,
            date = %ctx.date,
            query_id = %handle.query_id,
            in_flight = gate.in_flight(),
            "Executing query"
        );

        job.mark(JobState::Polling);
        let status = self.poll_until_complete(&ctx, &mut handle, &mut throttles).await;
        let status = match status {
            Ok(status) => status,
            Err(err) => {
                if let QueryError::RemoteFailure { state, .. } = &err {
                    job.mark(if *state == ExecutionState::Cancelled {
                        JobState::Cancelled
                    } else {
                        JobState::Failed
                    });
                }
                return Err(err);
            }
        };
        job.mark(JobState::Succeeded);

        let mut result = self.fetch_results(&ctx, &handle.query_id, &mut throttles).await?;
        result.metadata = QueryMetadata {
            query_id: handle.query_id.clone(),
            bytes_scanned: status.bytes_scanned,
            execution_time_ms: status.execution_time_ms,
        };

        debug!(
            table = %ctx.table,
            date = %ctx.date,
            query_id = %handle.query_id,
            rows = result.data_row_count(),
            throttles,
            "Query results fetched"
        );

        Ok(result)
    }

    /// Poll at the fixed interval until SUCCEEDED, failing on
    /// FAILED/CANCELLED or when the job deadline passes.
    async fn poll_until_complete(
        &self,
        ctx: &JobContext,
        handle: &mut QueryExecutionHandle,
        throttles: &mut u32,
    ) -> Result<ExecutionStatus, QueryError> {
        let deadline = Instant::now() + self.settings.query_timeout;

        loop {
            let query_id = handle.query_id.clone();
            let status = self
                .with_backoff(ctx, throttles, || self.engine.query_status(&query_id))
                .await?;
            handle.state = status.state;

            match status.state {
                ExecutionState::Succeeded => return Ok(status),
                ExecutionState::Failed | ExecutionState::Cancelled => {
                    let reason = status
                        .reason
                        .unwrap_or_else(|| "No reason provided".to_string());
                    error!(
                        table = %ctx.table,
                        date = %ctx.date,
                        query_id = %query_id,
                        state = %status.state,
                        reason = %reason,
                        "Query failed"
                    );
                    return Err(QueryError::RemoteFailure {
                        query_id,
                        state: status.state,
                        reason,
                    });
                }
                // Submitted | Queued | Running
                _ => {}
            }

            if Instant::now() >= deadline {
                warn!(
                    table = %ctx.table,
                    date = %ctx.date,
                    query_id = %query_id,
                    last_state = %handle.state,
                    timeout_seconds = self.settings.query_timeout.as_secs(),
                    "Query timed out, cancelling"
                );
                // Best-effort cancel; the timeout is reported either way.
                if let Err(e) = self.engine.stop_query(&query_id).await {
                    warn!(query_id = %query_id, error = %e, "Failed to cancel timed out query");
                }
                return Err(QueryError::Timeout {
                    query_id,
                    seconds: self.settings.query_timeout.as_secs(),
                });
            }

            tokio::time::sleep(self.settings.poll_interval).await;
        }
    }

    /// Follow continuation tokens until exhausted. Columns come from the
    /// first page; rows are concatenated in arrival order.
    async fn fetch_results(
        &self,
        ctx: &JobContext,
        query_id: &str,
        throttles: &mut u32,
    ) -> Result<ResultSet, QueryError> {
        let mut columns = None;
        let mut rows = Vec::new();
        let mut next_token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self
                .with_backoff(ctx, throttles, || {
                    self.engine.result_page(query_id, next_token.as_deref())
                })
                .await?;
            pages += 1;

            if columns.is_none() {
                columns = Some(page.columns);
            }
            rows.extend(page.rows);

            match page.next_token {
                Some(token) => next_token = Some(token),
                None => break,
            }
        }

        debug!(table = %ctx.table, date = %ctx.date, query_id = %query_id, pages, "Read all result pages");

        Ok(ResultSet {
            columns: columns.unwrap_or_default(),
            rows,
            metadata: QueryMetadata::default(),
        })
    }

    /// Repeat `op` while it is throttled, sleeping `min(2^n, 60)` units after
    /// the n-th throttle of this job. Other errors return immediately.
    async fn with_backoff<T, F, Fut>(
        &self,
        ctx: &JobContext,
        throttles: &mut u32,
        mut op: F,
    ) -> Result<T, QueryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, EngineError>>,
    {
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(EngineError::Throttled(message)) => {
                    *throttles += 1;
                    if !self.settings.retry.allows_retry(*throttles) {
                        error!(
                            table = %ctx.table,
                            date = %ctx.date,
                            attempts = *throttles,
                            "Throttling retries exhausted"
                        );
                        return Err(QueryError::ThrottlingExhausted {
                            attempts: *throttles,
                            message,
                        });
                    }
                    let wait = self.settings.retry.delay(*throttles);
                    warn!(
                        table = %ctx.table,
                        date = %ctx.date,
                        attempt = *throttles,
                        wait_secs = wait.as_secs_f64(),
                        "Throttled by Athena, backing off"
                    );
                    tokio::time::sleep(wait).await;
                }
                Err(EngineError::Transport(message)) => {
                    error!(table = %ctx.table, date = %ctx.date, error = %message, "Athena client error");
                    return Err(QueryError::Transport(message));
                }
            }
        }
    }
}
