use std::env;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::table::SourceTable;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u32(profile: &str, key: &str, default: u32) -> u32 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_u64(profile: &str, key: &str, default: u64) -> u64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

/// Immutable extraction settings, built once at startup and passed to every
/// component. Nothing downstream reads the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Active profile name (empty = default).
    pub profile: String,
    pub aws: AwsConfig,
    pub athena: AthenaSettings,
    pub tables: TableNames,
    pub paths: PathsConfig,
    pub scheduler: SchedulerConfig,
}

impl ExtractConfig {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `EXTRACT_PROFILE`. When set (e.g. `PROD`), every
    /// key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_opt("EXTRACT_PROFILE").unwrap_or_default();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            aws: AwsConfig::from_env_profiled(p),
            athena: AthenaSettings::from_env_profiled(p),
            tables: TableNames::from_env_profiled(p),
            paths: PathsConfig::from_env_profiled(p),
            scheduler: SchedulerConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            access_key_id: self.aws.access_key_id.clone().unwrap_or_default(),
            secret_access_key: self.aws.secret_access_key.clone().unwrap_or_default(),
            session_token: self.aws.session_token.clone(),
            region: self.aws.region.clone().unwrap_or_default(),
        }
    }

    /// Physical Athena table name for `table`.
    pub fn table_name(&self, table: SourceTable) -> Result<&str, ConfigError> {
        self.tables.get(table).ok_or_else(|| ConfigError::TableNotConfigured {
            table: table.to_string(),
            key: table.env_key(),
        })
    }

    /// Path of the query template for `table`.
    pub fn script_path(&self, table: SourceTable) -> PathBuf {
        self.paths.script_dir.join(table.script_file())
    }

    /// Check everything a run over `tables` needs before any remote call.
    pub fn validate(&self, tables: &[SourceTable]) -> Result<(), ConfigError> {
        self.credentials().validate()?;
        if self.athena.staging_dir.is_none() {
            return Err(ConfigError::Missing("S3_STAGING_DIR"));
        }
        self.scheduler.validate()?;
        for table in tables {
            self.table_name(*table)?;
        }
        Ok(())
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  aws:        region={}, access_key={}",
            self.aws.region.as_deref().unwrap_or("(none)"),
            if self.aws.access_key_id.is_some() { "set" } else { "(none)" }
        );
        tracing::info!(
            "  athena:     database={}, workgroup={}, staging={}",
            self.athena.database,
            self.athena.workgroup,
            self.athena.staging_dir.as_deref().unwrap_or("(none)")
        );
        tracing::info!(
            "  paths:      scripts={}, output={}",
            self.paths.script_dir.display(),
            self.paths.output_dir.display()
        );
        tracing::info!(
            "  scheduler:  concurrency={}, batch={}, retries={}, poll={}s, timeout={}s",
            self.scheduler.max_concurrent_queries,
            self.scheduler.batch_size,
            self.scheduler.max_retries,
            self.scheduler.poll_interval_secs,
            self.scheduler.query_timeout_secs
        );
    }
}

// ── AWS ───────────────────────────────────────────────────────

#[derive(Clone, Serialize, Deserialize)]
pub struct AwsConfig {
    pub region: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
}

impl AwsConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            region: profiled_env_opt(p, "AWS_REGION"),
            access_key_id: profiled_env_opt(p, "AWS_ACCESS_KEY"),
            secret_access_key: profiled_env_opt(p, "AWS_SECRET_KEY"),
            session_token: profiled_env_opt(p, "AWS_SESSION_TOKEN"),
        }
    }
}

impl fmt::Debug for AwsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsConfig")
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &self.secret_access_key.as_ref().map(|_| "<redacted>"))
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Static credentials used to sign every Athena request.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
    pub region: String,
}

impl Credentials {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.access_key_id.is_empty() {
            return Err(ConfigError::Missing("AWS_ACCESS_KEY"));
        }
        if self.secret_access_key.is_empty() {
            return Err(ConfigError::Missing("AWS_SECRET_KEY"));
        }
        if self.region.is_empty() {
            return Err(ConfigError::Missing("AWS_REGION"));
        }
        Ok(())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .field("region", &self.region)
            .finish()
    }
}

// ── Athena ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AthenaSettings {
    pub database: String,
    pub workgroup: String,
    /// S3 location Athena writes raw query output to.
    pub staging_dir: Option<String>,
}

impl AthenaSettings {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            database: profiled_env_or(p, "ATH_DB", "default"),
            workgroup: profiled_env_or(p, "ATH_WORKGROUP", "primary"),
            staging_dir: profiled_env_opt(p, "S3_STAGING_DIR"),
        }
    }
}

// ── Table names ───────────────────────────────────────────────

/// Physical Athena table name per [`SourceTable`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableNames {
    pub b2c: Option<String>,
    pub b2b: Option<String>,
    pub voucher: Option<String>,
    pub log: Option<String>,
}

impl TableNames {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            b2c: profiled_env_opt(p, SourceTable::TableB2C.env_key()),
            b2b: profiled_env_opt(p, SourceTable::TableB2B.env_key()),
            voucher: profiled_env_opt(p, SourceTable::TableVoucher.env_key()),
            log: profiled_env_opt(p, SourceTable::TableLog.env_key()),
        }
    }

    pub fn get(&self, table: SourceTable) -> Option<&str> {
        match table {
            SourceTable::TableB2C => self.b2c.as_deref(),
            SourceTable::TableB2B => self.b2b.as_deref(),
            SourceTable::TableVoucher => self.voucher.as_deref(),
            SourceTable::TableLog => self.log.as_deref(),
        }
    }

    pub fn set(&mut self, table: SourceTable, name: impl Into<String>) {
        let slot = match table {
            SourceTable::TableB2C => &mut self.b2c,
            SourceTable::TableB2B => &mut self.b2b,
            SourceTable::TableVoucher => &mut self.voucher,
            SourceTable::TableLog => &mut self.log,
        };
        *slot = Some(name.into());
    }
}

// ── Paths ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory holding the `ATH_TBL_*.sql` query templates.
    pub script_dir: PathBuf,
    /// Directory the Parquet files are written to.
    pub output_dir: PathBuf,
}

impl PathsConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            script_dir: PathBuf::from(profiled_env_or(p, "SCRIPT_LOC", "scripts")),
            output_dir: PathBuf::from(profiled_env_or(p, "RAW_FILES_DIR", "data/raw")),
        }
    }
}

// ── Scheduler ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Upper bound on queries holding a remote execution at once.
    pub max_concurrent_queries: u32,
    /// Dates started together before waiting for the whole batch.
    pub batch_size: u32,
    /// Throttled attempts allowed per job before giving up.
    pub max_retries: u32,
    pub poll_interval_secs: u64,
    /// Deadline for a single query to reach a terminal state.
    pub query_timeout_secs: u64,
    /// Rows requested per result page.
    pub page_size: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_queries: 5,
            batch_size: 20,
            max_retries: 5,
            poll_interval_secs: 2,
            query_timeout_secs: 1800,
            page_size: 1000,
        }
    }
}

impl SchedulerConfig {
    fn from_env_profiled(p: &str) -> Self {
        let d = Self::default();
        Self {
            max_concurrent_queries: profiled_env_u32(p, "ATHENA_MAX_CONCURRENT", d.max_concurrent_queries),
            batch_size: profiled_env_u32(p, "ATHENA_BATCH_SIZE", d.batch_size),
            max_retries: profiled_env_u32(p, "ATHENA_MAX_RETRIES", d.max_retries),
            poll_interval_secs: profiled_env_u64(p, "ATHENA_POLL_INTERVAL_SECS", d.poll_interval_secs),
            query_timeout_secs: profiled_env_u64(p, "ATHENA_QUERY_TIMEOUT_SECS", d.query_timeout_secs),
            page_size: profiled_env_u32(p, "ATHENA_PAGE_SIZE", d.page_size),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent_queries == 0 {
            return Err(ConfigError::Invalid {
                key: "ATHENA_MAX_CONCURRENT",
                reason: "must be at least 1".into(),
            });
        }
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid {
                key: "ATHENA_BATCH_SIZE",
                reason: "must be at least 1".into(),
            });
        }
        if self.max_retries == 0 {
            return Err(ConfigError::Invalid {
                key: "ATHENA_MAX_RETRIES",
                reason: "must be at least 1".into(),
            });
        }
        // Athena caps GetQueryResults at 1000 rows per page.
        if self.page_size == 0 || self.page_size > 1000 {
            return Err(ConfigError::Invalid {
                key: "ATHENA_PAGE_SIZE",
                reason: format!("{} is outside 1..=1000", self.page_size),
            });
        }
        Ok(())
    }
}
