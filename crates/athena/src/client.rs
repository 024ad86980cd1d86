//! AWS Athena implementation of [`QueryEngine`].
//!
//! Wraps the AWS SDK client built from explicit credentials. The SDK's own
//! retry layer is disabled: throttling is surfaced as
//! [`EngineError::Throttled`] so the executor's backoff policy is the only
//! retry loop.

use async_trait::async_trait;
use aws_credential_types::Credentials as AwsCredentials;
use aws_sdk_athena::config::retry::RetryConfig;
use aws_sdk_athena::config::{BehaviorVersion, Region};
use aws_sdk_athena::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_athena::types::{QueryExecutionContext, ResultConfiguration};
use tracing::{debug, info};

use tabdump_core::{ConfigError, ExtractConfig};

use crate::engine::{
    is_throttling_code, EngineError, ExecutionState, ExecutionStatus, QueryEngine, ResultPage,
};
use crate::result::ResultColumn;

/// Athena client bound to one database, workgroup and staging location.
pub struct AthenaEngine {
    client: aws_sdk_athena::Client,
    database: String,
    workgroup: String,
    output_location: String,
    page_size: i32,
}

impl AthenaEngine {
    /// Build the SDK client from validated configuration.
    ///
    /// Fails with [`ConfigError`] before any network access when credentials
    /// or the staging location are missing.
    pub fn new(config: &ExtractConfig) -> Result<Self, ConfigError> {
        let creds = config.credentials();
        creds.validate()?;
        let output_location = config
            .athena
            .staging_dir
            .clone()
            .ok_or(ConfigError::Missing("S3_STAGING_DIR"))?;

        let aws_creds = AwsCredentials::new(
            &creds.access_key_id,
            &creds.secret_access_key,
            creds.session_token.clone(),
            None, // expiry
            "tabdump-athena",
        );

        let sdk_config = aws_sdk_athena::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(creds.region.clone()))
            .credentials_provider(aws_creds)
            .retry_config(RetryConfig::disabled())
            .build();

        info!(
            region = %creds.region,
            database = %config.athena.database,
            workgroup = %config.athena.workgroup,
            "AthenaEngine initialised"
        );

        Ok(Self {
            client: aws_sdk_athena::Client::from_conf(sdk_config),
            database: config.athena.database.clone(),
            workgroup: config.athena.workgroup.clone(),
            output_location,
            page_size: config.scheduler.page_size as i32,
        })
    }
}

/// Map an SDK error to throttled or transport by its service error code.
fn classify<E, R>(err: SdkError<E, R>) -> EngineError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let code = err.code().map(str::to_string);
    let message = DisplayErrorContext(&err).to_string();
    match code {
        Some(code) if is_throttling_code(&code) => EngineError::Throttled(format!("{code}: {message}")),
        _ => EngineError::Transport(message),
    }
}

#[async_trait]
impl QueryEngine for AthenaEngine {
    async fn start_query(&self, sql: &str) -> Result<String, EngineError> {
        let resp = self
            .client
            .start_query_execution()
            .query_string(sql)
            .query_execution_context({
                let mut ctx = QueryExecutionContext::builder();
                if !self.database.is_empty() {
                    ctx = ctx.database(&self.database);
                }
                ctx.build()
            })
            .result_configuration(
                ResultConfiguration::builder()
                    .output_location(&self.output_location)
                    .build(),
            )
            .work_group(&self.workgroup)
            .send()
            .await
            .map_err(classify)?;

        resp.query_execution_id()
            .map(str::to_string)
            .ok_or_else(|| EngineError::Transport("No query execution ID returned".into()))
    }

    async fn query_status(&self, query_id: &str) -> Result<ExecutionStatus, EngineError> {
        let resp = self
            .client
            .get_query_execution()
            .query_execution_id(query_id)
            .send()
            .await
            .map_err(classify)?;

        let qe = resp
            .query_execution()
            .ok_or_else(|| EngineError::Transport("No query execution in response".into()))?;

        let status = qe.status();
        let stats = qe.statistics();

        Ok(ExecutionStatus {
            state: status
                .and_then(|s| s.state())
                .map(|s| ExecutionState::from_athena(s.as_str()))
                .unwrap_or(ExecutionState::Queued),
            reason: status
                .and_then(|s| s.state_change_reason())
                .map(str::to_string),
            bytes_scanned: stats
                .and_then(|s| s.data_scanned_in_bytes())
                .unwrap_or(0) as u64,
            execution_time_ms: stats
                .and_then(|s| s.engine_execution_time_in_millis())
                .unwrap_or(0) as u64,
        })
    }

    async fn result_page(
        &self,
        query_id: &str,
        next_token: Option<&str>,
    ) -> Result<ResultPage, EngineError> {
        let resp = self
            .client
            .get_query_results()
            .query_execution_id(query_id)
            .max_results(self.page_size)
            .set_next_token(next_token.map(str::to_string))
            .send()
            .await
            .map_err(classify)?;

        let mut page = ResultPage {
            next_token: resp.next_token().map(str::to_string),
            ..ResultPage::default()
        };

        if let Some(result_set) = resp.result_set() {
            if let Some(meta) = result_set.result_set_metadata() {
                page.columns = meta
                    .column_info()
                    .iter()
                    .map(|ci| ResultColumn {
                        name: ci.label().unwrap_or_else(|| ci.name()).to_string(),
                        data_type: ci.r#type().to_string(),
                    })
                    .collect();
            }

            page.rows = result_set
                .rows()
                .iter()
                .map(|row| {
                    row.data()
                        .iter()
                        .map(|datum| datum.var_char_value().map(str::to_string))
                        .collect()
                })
                .collect();
        }

        debug!(
            query_id = %query_id,
            rows = page.rows.len(),
            more = page.next_token.is_some(),
            "Fetched result page"
        );

        Ok(page)
    }

    async fn stop_query(&self, query_id: &str) -> Result<(), EngineError> {
        info!(query_id = %query_id, "Cancelling query");

        self.client
            .stop_query_execution()
            .query_execution_id(query_id)
            .send()
            .await
            .map_err(classify)?;

        Ok(())
    }
}
