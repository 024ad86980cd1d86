//! Error taxonomy for query jobs and extraction runs.

use chrono::NaiveDate;

use tabdump_core::ConfigError;

use crate::engine::ExecutionState;
use crate::materialize::WriteError;

/// Why a single query job failed.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// Missing or invalid configuration. Never retried.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Athena kept throttling until the retry budget ran out.
    #[error("throttled on {attempts} attempts, giving up: {message}")]
    ThrottlingExhausted { attempts: u32, message: String },

    /// The execution ended FAILED or CANCELLED on the Athena side.
    #[error("query {query_id} {state}: {reason}")]
    RemoteFailure {
        query_id: String,
        state: ExecutionState,
        reason: String,
    },

    /// The execution did not reach a terminal state before the job deadline.
    #[error("query {query_id} timed out after {seconds}s")]
    Timeout { query_id: String, seconds: u64 },

    /// Writing the Parquet file failed.
    #[error(transparent)]
    Write(#[from] WriteError),

    /// Any other Athena client error.
    #[error("transport error: {0}")]
    Transport(String),
}

/// A [`QueryError`] tagged with the table and date it belongs to.
#[derive(Debug, thiserror::Error)]
#[error("{table} {date}: {source}")]
pub struct JobError {
    pub table: String,
    pub date: NaiveDate,
    #[source]
    pub source: QueryError,
}

impl JobError {
    pub fn new(table: impl Into<String>, date: NaiveDate, source: QueryError) -> Self {
        Self {
            table: table.into(),
            date,
            source,
        }
    }
}

/// Why an extraction run stopped.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to prepare output directory: {0}")]
    OutputDir(#[from] std::io::Error),

    #[error(transparent)]
    Job(#[from] JobError),
}
