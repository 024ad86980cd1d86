use std::path::PathBuf;

use thiserror::Error;

/// Fatal configuration problems. Never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("unknown table '{0}' (expected one of TableB2C, TableB2B, TableVoucher, TableLog)")]
    UnknownTable(String),

    #[error("no Athena table name configured for {table} (set {key})")]
    TableNotConfigured { table: String, key: &'static str },

    #[error("query template {path} could not be read: {reason}")]
    Template { path: PathBuf, reason: String },
}
