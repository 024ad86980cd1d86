pub mod backoff;
pub mod client;
pub mod engine;
pub mod error;
pub mod executor;
pub mod extract;
pub mod gate;
pub mod job;
pub mod materialize;
pub mod orchestrator;
pub mod partition;
pub mod result;
pub mod template;

pub use backoff::RetryPolicy;
pub use client::AthenaEngine;
pub use engine::{EngineError, ExecutionState, ExecutionStatus, QueryEngine, ResultPage};
pub use error::{ExtractError, JobError, QueryError};
pub use executor::{ExecutorSettings, QueryExecutor};
pub use extract::{daily_range, run_extraction, RunSummary, TablePlan};
pub use gate::ConcurrencyGate;
pub use job::{JobState, QueryJob};
pub use materialize::{convert, output_path, persist, read_row_count, WriteError};
pub use orchestrator::{JobOutcome, TableJobOrchestrator, TableSummary};
pub use result::{QueryMetadata, ResultColumn, ResultSet};
pub use template::QueryTemplate;
