//! Configuration problems surface before anything is submitted.

use std::fs;
use std::sync::Arc;

use tabdump_athena::*;
use tabdump_core::{ConfigError, SourceTable};

use crate::common::*;

fn config_error(err: ExtractError) -> ConfigError {
    match err {
        ExtractError::Config(e) => e,
        other => panic!("expected a config error, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_access_key_fails_before_any_submit() {
    let mut ws = Workspace::new(&[SourceTable::TableB2C]);
    ws.config.aws.access_key_id = None;
    let engine = Arc::new(FakeAthena::new(1));
    let plans = vec![TablePlan::new(SourceTable::TableB2C, dates(1..=3))];

    let err = config_error(run_extraction(&ws.config, engine.clone(), plans).await.unwrap_err());

    assert_eq!(err, ConfigError::Missing("AWS_ACCESS_KEY"));
    assert_eq!(engine.submits(), 0);
    assert!(ws.written_files().is_empty());
    assert!(!ws.output_dir().exists());
}

#[tokio::test]
async fn missing_staging_dir_is_reported() {
    let mut ws = Workspace::new(&[SourceTable::TableB2C]);
    ws.config.athena.staging_dir = None;
    let engine = Arc::new(FakeAthena::new(1));
    let plans = vec![TablePlan::new(SourceTable::TableB2C, dates(1..=1))];

    let err = config_error(run_extraction(&ws.config, engine.clone(), plans).await.unwrap_err());

    assert_eq!(err, ConfigError::Missing("S3_STAGING_DIR"));
    assert_eq!(engine.submits(), 0);
}

#[tokio::test]
async fn unconfigured_table_is_rejected() {
    let ws = Workspace::new(&[SourceTable::TableB2C]);
    let engine = Arc::new(FakeAthena::new(1));
    let plans = vec![
        TablePlan::new(SourceTable::TableB2C, dates(1..=1)),
        TablePlan::new(SourceTable::TableLog, dates(1..=1)),
    ];

    let err = config_error(run_extraction(&ws.config, engine.clone(), plans).await.unwrap_err());

    assert_eq!(
        err,
        ConfigError::TableNotConfigured {
            table: "TableLog".into(),
            key: "ATH_TBL_LOG",
        }
    );
    assert_eq!(engine.submits(), 0);
}

#[tokio::test]
async fn missing_template_file_is_rejected() {
    let ws = Workspace::new(&[SourceTable::TableB2B]);
    fs::remove_file(ws.config.script_path(SourceTable::TableB2B)).unwrap();
    let engine = Arc::new(FakeAthena::new(1));
    let plans = vec![TablePlan::new(SourceTable::TableB2B, dates(1..=1))];

    let err = config_error(run_extraction(&ws.config, engine.clone(), plans).await.unwrap_err());

    assert!(matches!(err, ConfigError::Template { .. }));
    assert_eq!(engine.submits(), 0);
}

#[tokio::test]
async fn zero_concurrency_is_invalid() {
    let mut ws = Workspace::new(&[SourceTable::TableB2C]);
    ws.config.scheduler.max_concurrent_queries = 0;
    let plans = vec![TablePlan::new(SourceTable::TableB2C, dates(1..=1))];

    let err = config_error(
        run_extraction(&ws.config, Arc::new(FakeAthena::new(1)), plans)
            .await
            .unwrap_err(),
    );

    assert!(matches!(err, ConfigError::Invalid { key: "ATHENA_MAX_CONCURRENT", .. }));
}

#[test]
fn dates_file_format_parses_into_plans() {
    let json = r#"{ "TableB2C": ["2024-01-01", "2024-01-02"], "TableLog": ["2024-01-03"] }"#;
    let map: std::collections::BTreeMap<SourceTable, Vec<chrono::NaiveDate>> =
        serde_json::from_str(json).unwrap();

    let plans = TablePlan::from_map(map, None);

    assert_eq!(
        plans,
        vec![
            TablePlan::new(SourceTable::TableB2C, dates(1..=2)),
            TablePlan::new(SourceTable::TableLog, dates(3..=3)),
        ]
    );
}
