//! The remote query service seen by the executor.
//!
//! [`QueryEngine`] is the seam between scheduling and AWS: the executor only
//! submits, polls, pages and stops through it. [`crate::client::AthenaEngine`]
//! implements it over the AWS SDK; tests use in-memory engines.

use std::fmt;

use async_trait::async_trait;

use crate::result::ResultColumn;

/// Error codes Athena uses to signal rate limiting.
const THROTTLING_CODES: &[&str] = &[
    "TooManyRequestsException",
    "ThrottlingException",
    "ThrottledException",
];

pub fn is_throttling_code(code: &str) -> bool {
    THROTTLING_CODES.contains(&code)
}

/// Errors from a single remote call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// Rate-limit signal. The call may succeed if repeated later.
    #[error("throttled by Athena: {0}")]
    Throttled(String),

    /// Any other client or service error.
    #[error("Athena request failed: {0}")]
    Transport(String),
}

/// Lifecycle state of a remote query execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    Submitted,
    Queued,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl ExecutionState {
    pub fn as_str(self) -> &'static str {
        match self {
            ExecutionState::Submitted => "SUBMITTED",
            ExecutionState::Queued => "QUEUED",
            ExecutionState::Running => "RUNNING",
            ExecutionState::Succeeded => "SUCCEEDED",
            ExecutionState::Failed => "FAILED",
            ExecutionState::Cancelled => "CANCELLED",
        }
    }

    /// Parse Athena's state string. Unknown states count as still queued so
    /// polling continues until the deadline.
    pub fn from_athena(state: &str) -> Self {
        match state {
            "SUCCEEDED" => ExecutionState::Succeeded,
            "FAILED" => ExecutionState::Failed,
            "CANCELLED" => ExecutionState::Cancelled,
            "RUNNING" => ExecutionState::Running,
            _ => ExecutionState::Queued,
        }
    }
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remote execution id with the last observed state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryExecutionHandle {
    pub query_id: String,
    pub state: ExecutionState,
}

impl QueryExecutionHandle {
    pub fn submitted(query_id: impl Into<String>) -> Self {
        Self {
            query_id: query_id.into(),
            state: ExecutionState::Submitted,
        }
    }
}

/// Snapshot returned by a status poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionStatus {
    pub state: ExecutionState,
    /// Athena's `StateChangeReason`, set on failure or cancellation.
    pub reason: Option<String>,
    pub bytes_scanned: u64,
    pub execution_time_ms: u64,
}

impl ExecutionStatus {
    pub fn new(state: ExecutionState) -> Self {
        Self {
            state,
            reason: None,
            bytes_scanned: 0,
            execution_time_ms: 0,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// One page of `GetQueryResults`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultPage {
    pub columns: Vec<ResultColumn>,
    pub rows: Vec<Vec<Option<String>>>,
    /// Continuation token; `None` on the last page.
    pub next_token: Option<String>,
}

/// Remote interactive query service.
#[async_trait]
pub trait QueryEngine: Send + Sync {
    /// Submit `sql` and return the execution id.
    async fn start_query(&self, sql: &str) -> Result<String, EngineError>;

    /// Current state of an execution.
    async fn query_status(&self, query_id: &str) -> Result<ExecutionStatus, EngineError>;

    /// Fetch one result page. `next_token` is `None` for the first page.
    async fn result_page(
        &self,
        query_id: &str,
        next_token: Option<&str>,
    ) -> Result<ResultPage, EngineError>;

    /// Ask the service to stop an execution.
    async fn stop_query(&self, query_id: &str) -> Result<(), EngineError>;
}
