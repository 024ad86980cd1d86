//! One query execution request for a table and date.

use std::fmt;

use chrono::NaiveDate;
use tracing::{debug, warn};

/// Per-job lifecycle.
///
/// `Submitted → Polling → {Succeeded | Failed | Cancelled}`,
/// `Succeeded → Materializing → Done`, and any failure ends in `Errored`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Submitted,
    Polling,
    Succeeded,
    Failed,
    Cancelled,
    Materializing,
    Done,
    Errored,
}

impl JobState {
    pub fn can_transition_to(self, next: JobState) -> bool {
        use JobState::*;
        match (self, next) {
            (Pending, Submitted) => true,
            (Submitted, Polling) => true,
            (Polling, Succeeded | Failed | Cancelled) => true,
            (Succeeded, Materializing) => true,
            (Materializing, Done) => true,
            (Done | Errored, _) => false,
            (_, Errored) => true,
            _ => false,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Done | JobState::Errored)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid job transition {from} -> {to}")]
pub struct InvalidTransition {
    pub from: JobState,
    pub to: JobState,
}

/// Query text rendered for one `(table, date)`. Lives only for one
/// execution attempt.
#[derive(Debug, Clone)]
pub struct QueryJob {
    pub table_name: String,
    pub date: NaiveDate,
    pub query_text: String,
    state: JobState,
}

impl QueryJob {
    pub fn new(table_name: impl Into<String>, date: NaiveDate, query_text: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            date,
            query_text: query_text.into(),
            state: JobState::Pending,
        }
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn advance(&mut self, next: JobState) -> Result<(), InvalidTransition> {
        if !self.state.can_transition_to(next) {
            return Err(InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        debug!(table = %self.table_name, date = %self.date, from = %self.state, to = %next, "job transition");
        self.state = next;
        Ok(())
    }

    /// Like [`QueryJob::advance`], logging instead of failing on an invalid
    /// transition.
    pub(crate) fn mark(&mut self, next: JobState) {
        if let Err(e) = self.advance(next) {
            warn!(table = %self.table_name, date = %self.date, error = %e, "Ignoring job transition");
        }
    }

    /// Move to `Errored` unless already terminal.
    pub fn fail(&mut self) {
        if !self.state.is_terminal() {
            self.state = JobState::Errored;
        }
    }
}
