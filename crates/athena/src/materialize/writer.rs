//! Public API for writing result sets to Parquet files.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use chrono::NaiveDate;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::format::KeyValue;
use tracing::{debug, warn};

use super::builders::build_arrays;
use super::error::WriteError;
use super::schema::build_schema;
use crate::result::ResultSet;

/// Deterministic output file for one `(table, date)` pair.
pub fn output_path(dir: &Path, table_name: &str, date: NaiveDate) -> PathBuf {
    dir.join(format!("query_result_{}_{}.parquet", date.format("%Y-%m-%d"), table_name))
}

/// Convert the data rows of `result` (header echo excluded) into an Arrow
/// [`RecordBatch`].
pub fn result_to_record_batch(result: &ResultSet) -> Result<RecordBatch, WriteError> {
    let rows = result.data_rows();
    let schema = Arc::new(build_schema(&result.columns));
    let arrays = build_arrays(result.columns.len(), rows)?;
    let options = RecordBatchOptions::new().with_row_count(Some(rows.len()));
    Ok(RecordBatch::try_new_with_options(schema, arrays, &options)?)
}

/// Write `result` to `path`, replacing any existing file, and return the
/// number of data rows written.
///
/// The file is first written as `.{name}.tmp` in the same directory and then
/// renamed over `path`. On failure the temp file is removed and `path` is
/// left untouched.
pub fn convert(result: &ResultSet, path: &Path) -> Result<u64, WriteError> {
    let batch = result_to_record_batch(result)?;
    let row_count = batch.num_rows() as u64;

    // Ensure parent directories exist.
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let tmp_path = temp_path_for(path);
    let written = write_batch(&batch, result, &tmp_path)
        .and_then(|()| fs::rename(&tmp_path, path).map_err(WriteError::from));
    if let Err(e) = written {
        remove_partial(&tmp_path);
        return Err(e);
    }

    debug!(
        path = %path.display(),
        rows = row_count,
        query_id = %result.metadata.query_id,
        "Wrote Parquet file"
    );

    Ok(row_count)
}

/// Row count recorded in the footer of an existing Parquet file.
pub fn read_row_count(path: &Path) -> Result<u64, WriteError> {
    let file = fs::File::open(path)?;
    let reader = SerializedFileReader::new(file)?;
    Ok(reader.metadata().file_metadata().num_rows().max(0) as u64)
}

/// Write `result` to `path` on the blocking pool and read the row count back
/// from the finished file.
pub async fn persist(result: ResultSet, path: PathBuf) -> Result<u64, WriteError> {
    tokio::task::spawn_blocking(move || {
        convert(&result, &path)?;
        read_row_count(&path)
    })
    .await
    .map_err(|e| WriteError::Io(std::io::Error::other(e)))?
}

fn remove_partial(tmp_path: &Path) {
    if let Err(cleanup) = fs::remove_file(tmp_path) {
        if cleanup.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %tmp_path.display(), error = %cleanup, "Failed to remove partial file");
        }
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    path.with_file_name(format!(".{}.tmp", name))
}

fn write_batch(batch: &RecordBatch, result: &ResultSet, path: &Path) -> Result<(), WriteError> {
    let file = fs::File::create(path)?;

    let props = WriterProperties::builder()
        .set_compression(Compression::ZSTD(Default::default()))
        .set_key_value_metadata(Some(vec![
            KeyValue::new("athena.query_id".to_string(), Some(result.metadata.query_id.clone())),
            KeyValue::new(
                "athena.bytes_scanned".to_string(),
                Some(result.metadata.bytes_scanned.to_string()),
            ),
            KeyValue::new(
                "athena.execution_time_ms".to_string(),
                Some(result.metadata.execution_time_ms.to_string()),
            ),
        ]))
        .build();

    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
    writer.write(batch)?;
    writer.close()?;
    Ok(())
}
