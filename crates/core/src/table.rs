use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Logical source tables that can be extracted from Athena.
///
/// Each variant maps to exactly one environment key (holding the physical
/// Athena table name) and one query script. The lookups are exhaustive
/// matches, so adding a table is a compile error until every mapping is
/// filled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SourceTable {
    TableB2C,
    TableB2B,
    TableVoucher,
    TableLog,
}

impl SourceTable {
    /// Every table, in extraction order.
    pub const ALL: [SourceTable; 4] = [
        SourceTable::TableB2C,
        SourceTable::TableB2B,
        SourceTable::TableVoucher,
        SourceTable::TableLog,
    ];

    /// Environment key holding the physical Athena table name.
    pub fn env_key(self) -> &'static str {
        match self {
            SourceTable::TableB2C => "ATH_TBL_B2C",
            SourceTable::TableB2B => "ATH_TBL_B2B",
            SourceTable::TableVoucher => "ATH_TBL_VOUCHER",
            SourceTable::TableLog => "ATH_TBL_LOG",
        }
    }

    /// File name of the query template inside the script directory.
    pub fn script_file(self) -> &'static str {
        match self {
            SourceTable::TableB2C => "ATH_TBL_B2C.sql",
            SourceTable::TableB2B => "ATH_TBL_B2B.sql",
            SourceTable::TableVoucher => "ATH_TBL_VOUCHER.sql",
            SourceTable::TableLog => "ATH_TBL_LOG.sql",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SourceTable::TableB2C => "TableB2C",
            SourceTable::TableB2B => "TableB2B",
            SourceTable::TableVoucher => "TableVoucher",
            SourceTable::TableLog => "TableLog",
        }
    }
}

impl fmt::Display for SourceTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceTable {
    type Err = ConfigError;

    /// Accepts the enum name (`TableB2C`) or the env key (`ATH_TBL_B2C`),
    /// case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SourceTable::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s) || t.env_key().eq_ignore_ascii_case(s))
            .ok_or_else(|| ConfigError::UnknownTable(s.to_string()))
    }
}
