//! Per-table SQL templates with a single date placeholder.

use std::fs;
use std::path::Path;

use chrono::NaiveDate;

use tabdump_core::ConfigError;

/// Placeholder replaced by the ISO date (`YYYY-MM-DD`) of each job.
pub const DATE_PLACEHOLDER: &str = "{date_val}";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTemplate {
    text: String,
}

impl QueryTemplate {
    /// Wrap template text. Fails when the date placeholder is missing, since
    /// every date would otherwise run the same query.
    pub fn new(text: impl Into<String>) -> Result<Self, ConfigError> {
        let text = text.into();
        if !text.contains(DATE_PLACEHOLDER) {
            return Err(ConfigError::Invalid {
                key: "query template",
                reason: format!("missing {} placeholder", DATE_PLACEHOLDER),
            });
        }
        Ok(Self { text })
    }

    /// Read a template file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|e| ConfigError::Template {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::new(text.trim()).map_err(|e| ConfigError::Template {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn render(&self, date: NaiveDate) -> String {
        self.text
            .replace(DATE_PLACEHOLDER, &date.format("%Y-%m-%d").to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}
