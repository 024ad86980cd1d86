//! Build Arrow string arrays from Athena result rows.

use std::sync::Arc;

use arrow::array::{ArrayRef, StringBuilder};

use super::error::WriteError;

/// Reject any row whose field count differs from `num_columns`.
///
/// `row` in the error is the zero-based data row index (header excluded).
pub(crate) fn check_shape(num_columns: usize, rows: &[Vec<Option<String>>]) -> Result<(), WriteError> {
    match rows.iter().position(|r| r.len() != num_columns) {
        Some(row) => Err(WriteError::ShapeMismatch {
            row,
            expected: num_columns,
            actual: rows[row].len(),
        }),
        None => Ok(()),
    }
}

/// Column-major string arrays. NULL fields become empty strings.
pub(crate) fn build_arrays(
    num_columns: usize,
    rows: &[Vec<Option<String>>],
) -> Result<Vec<ArrayRef>, WriteError> {
    check_shape(num_columns, rows)?;

    let num_rows = rows.len();
    let arrays = (0..num_columns)
        .map(|col_idx| {
            let mut builder = StringBuilder::with_capacity(num_rows, num_rows * 16);
            for row in rows {
                builder.append_value(row[col_idx].as_deref().unwrap_or(""));
            }
            Arc::new(builder.finish()) as ArrayRef
        })
        .collect();

    Ok(arrays)
}
