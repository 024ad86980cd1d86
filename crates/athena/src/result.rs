use serde::{Deserialize, Serialize};

/// Column definition returned by an Athena query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultColumn {
    /// Column label as declared in the result set.
    pub name: String,
    /// Athena data type (e.g. "varchar", "bigint", "date").
    pub data_type: String,
}

impl ResultColumn {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

/// Execution metadata for a completed Athena query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryMetadata {
    /// Athena query execution ID.
    pub query_id: String,
    /// Total bytes scanned during execution.
    pub bytes_scanned: u64,
    /// Engine execution time in milliseconds.
    pub execution_time_ms: u64,
}

/// Rows of a completed query exactly as Athena paged them back.
///
/// The first row echoes the column labels and is not data; use
/// [`ResultSet::data_rows`] to skip it. `None` cells are SQL NULL or
/// fields Athena left out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultSet {
    /// Column definitions in result-set order, taken from the first page.
    pub columns: Vec<ResultColumn>,
    /// Every row of every page, header echo included, in arrival order.
    pub rows: Vec<Vec<Option<String>>>,
    pub metadata: QueryMetadata,
}

impl ResultSet {
    /// Rows after the header echo.
    pub fn data_rows(&self) -> &[Vec<Option<String>>] {
        self.rows.get(1..).unwrap_or(&[])
    }

    /// Number of data rows (total rows minus the header echo).
    pub fn data_row_count(&self) -> usize {
        self.rows.len().saturating_sub(1)
    }
}
