//! Error types for Parquet materialization.

/// Errors that can occur while converting or writing a result set.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    /// A data row does not have one field per column.
    #[error("row {row} has {actual} fields, expected {expected}")]
    ShapeMismatch {
        row: usize,
        expected: usize,
        actual: usize,
    },

    /// Failed to build Arrow arrays from result data.
    #[error("Arrow conversion error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Failed to encode or read a Parquet file.
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// I/O error when creating, renaming or reading the output file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
