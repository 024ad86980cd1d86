//! Persist a completed [`crate::ResultSet`] as a Parquet file.
//!
//! Every column is written as non-null UTF-8: Athena hands back strings,
//! and NULL or missing fields become empty strings. Files are written to a
//! hidden temp file next to the target and renamed into place, so a file at
//! the target path is always complete.

mod builders;
mod error;
pub(crate) mod schema;
mod writer;


pub use error::WriteError;
pub use writer::{convert, output_path, persist, read_row_count, result_to_record_batch};
