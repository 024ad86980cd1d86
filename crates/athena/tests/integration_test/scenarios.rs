//! End-to-end runs of `run_extraction` against the in-memory engine.

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use tabdump_athena::*;
use tabdump_core::{ExtractConfig, SourceTable};

use crate::common::*;

fn job_error(err: ExtractError) -> JobError {
    match err {
        ExtractError::Job(e) => e,
        other => panic!("expected a job error, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn three_dates_write_three_files() {
    let ws = Workspace::new(&[SourceTable::TableB2C]);
    let engine = Arc::new(FakeAthena::new(3));
    let plans = vec![TablePlan::new(SourceTable::TableB2C, dates(1..=3))];

    let summary = run_extraction(&ws.config, engine.clone(), plans).await.unwrap();

    assert_eq!(engine.submits(), 3);
    assert_eq!(summary.files_written(), 3);
    assert_eq!(summary.rows_written(), 9);
    assert_eq!(summary.tables[0].table_name, "tableb2c_daily");

    for d in dates(1..=3) {
        let path = ws.output_file(SourceTable::TableB2C, d);
        assert!(path.ends_with(format!("query_result_{}_tableb2c_daily.parquet", d)));
        assert_eq!(read_row_count(&path).unwrap(), 3);
    }
    assert_eq!(ws.written_files().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn remote_failure_names_table_date_and_reason() {
    let ws = Workspace::new(&[SourceTable::TableB2C]);
    let engine = Arc::new(
        FakeAthena::new(2).failing("2024-01-02", "INSUFFICIENT_PRIVILEGES: not authorized"),
    );
    let plans = vec![TablePlan::new(SourceTable::TableB2C, dates(1..=3))];

    let err = job_error(run_extraction(&ws.config, engine.clone(), plans).await.unwrap_err());

    assert_eq!(err.table, "tableb2c_daily");
    assert_eq!(err.date, date(2));
    match &err.source {
        QueryError::RemoteFailure { state, reason, .. } => {
            assert_eq!(*state, ExecutionState::Failed);
            assert!(reason.contains("INSUFFICIENT_PRIVILEGES"));
        }
        other => panic!("unexpected error {other:?}"),
    }
    let msg = err.to_string();
    assert!(msg.contains("tableb2c_daily"));
    assert!(msg.contains("2024-01-02"));

    // Remote failures are not resubmitted.
    assert_eq!(engine.submits(), 3);
    // Siblings in the same batch still complete.
    assert!(ws.output_file(SourceTable::TableB2C, date(1)).exists());
    assert!(ws.output_file(SourceTable::TableB2C, date(3)).exists());
    assert!(!ws.output_file(SourceTable::TableB2C, date(2)).exists());
}

#[tokio::test(start_paused = true)]
async fn earliest_failed_date_is_reported() {
    let ws = Workspace::new(&[SourceTable::TableVoucher]);
    let engine = Arc::new(
        FakeAthena::new(1)
            .failing("2024-01-02", "first")
            .failing("2024-01-04", "second")
            .slow("2024-01-02", 8),
    );
    let plans = vec![TablePlan::new(SourceTable::TableVoucher, dates(1..=4))];

    let err = job_error(run_extraction(&ws.config, engine, plans).await.unwrap_err());

    assert_eq!(err.date, date(2));
}

#[tokio::test(start_paused = true)]
async fn next_batch_waits_for_the_whole_previous_batch() {
    let mut ws = Workspace::new(&[SourceTable::TableB2B]);
    ws.config.scheduler.batch_size = 2;
    let engine = Arc::new(FakeAthena::new(1).slow("2024-01-01", 6));
    let plans = vec![TablePlan::new(SourceTable::TableB2B, dates(1..=4))];

    run_extraction(&ws.config, engine.clone(), plans).await.unwrap();

    let events = engine.events();
    let pos = |e: Event| events.iter().position(|x| *x == e).unwrap();
    let first_batch_done = pos(Event::Finished("2024-01-01".into()))
        .max(pos(Event::Finished("2024-01-02".into())));
    assert!(pos(Event::Started("2024-01-03".into())) > first_batch_done);
    assert!(pos(Event::Started("2024-01-04".into())) > first_batch_done);
    assert_eq!(ws.written_files().len(), 4);
}

#[tokio::test(start_paused = true)]
async fn failed_batch_stops_later_batches() {
    let mut ws = Workspace::new(&[SourceTable::TableB2C]);
    ws.config.scheduler.batch_size = 1;
    let engine = Arc::new(FakeAthena::new(1).failing("2024-01-02", "SYNTAX_ERROR"));
    let plans = vec![TablePlan::new(SourceTable::TableB2C, dates(1..=3))];

    let err = job_error(run_extraction(&ws.config, engine.clone(), plans).await.unwrap_err());

    assert_eq!(err.date, date(2));
    assert_eq!(engine.submitted_dates(), vec!["2024-01-01", "2024-01-02"]);
    assert!(ws.output_file(SourceTable::TableB2C, date(1)).exists());
    assert!(!ws.output_file(SourceTable::TableB2C, date(3)).exists());
}

#[tokio::test(start_paused = true)]
async fn failing_table_does_not_cancel_other_tables() {
    let ws = Workspace::new(&[SourceTable::TableB2C, SourceTable::TableB2B]);
    let engine = Arc::new(FakeAthena::new(2).failing("2024-01-05", "HIVE_CURSOR_ERROR"));
    let plans = vec![
        TablePlan::new(SourceTable::TableB2C, dates(5..=5)),
        TablePlan::new(SourceTable::TableB2B, dates(1..=3)),
    ];

    let err = job_error(run_extraction(&ws.config, engine, plans).await.unwrap_err());

    assert_eq!(err.table, physical_name(SourceTable::TableB2C));
    for d in dates(1..=3) {
        assert!(ws.output_file(SourceTable::TableB2B, d).exists());
    }
}

#[tokio::test(start_paused = true)]
async fn exhausted_throttling_fails_without_a_file() {
    let ws = Workspace::new(&[SourceTable::TableLog]);
    let engine = Arc::new(FakeAthena::new(1).throttling("2024-01-01"));
    let plans = vec![TablePlan::new(SourceTable::TableLog, dates(1..=1))];

    let start = tokio::time::Instant::now();
    let err = job_error(run_extraction(&ws.config, engine.clone(), plans).await.unwrap_err());

    match err.source {
        QueryError::ThrottlingExhausted { attempts, .. } => assert_eq!(attempts, 5),
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(engine.submits(), 5);
    // 2 + 4 + 8 + 16 seconds of backoff between the five attempts.
    assert!(start.elapsed() >= Duration::from_secs(30));
    assert!(ws.written_files().is_empty());
}

#[tokio::test(start_paused = true)]
async fn rerun_overwrites_existing_file() {
    let ws = Workspace::new(&[SourceTable::TableB2C]);
    let plan = || vec![TablePlan::new(SourceTable::TableB2C, dates(1..=1))];

    run_extraction(&ws.config, Arc::new(FakeAthena::new(5)), plan()).await.unwrap();
    let path = ws.output_file(SourceTable::TableB2C, date(1));
    assert_eq!(read_row_count(&path).unwrap(), 5);

    run_extraction(&ws.config, Arc::new(FakeAthena::new(1)), plan()).await.unwrap();
    assert_eq!(read_row_count(&path).unwrap(), 1);
    assert_eq!(ws.written_files(), vec![path]);
}

#[tokio::test(start_paused = true)]
async fn header_only_result_writes_empty_file() {
    let ws = Workspace::new(&[SourceTable::TableB2C]);
    let plans = vec![TablePlan::new(SourceTable::TableB2C, dates(1..=1))];

    let summary = run_extraction(&ws.config, Arc::new(FakeAthena::new(0)), plans)
        .await
        .unwrap();

    assert_eq!(summary.rows_written(), 0);
    let path = ws.output_file(SourceTable::TableB2C, date(1));
    assert_eq!(read_row_count(&path).unwrap(), 0);
}

#[tokio::test(start_paused = true)]
async fn empty_plan_only_creates_output_dir() {
    let ws = Workspace::new(&[SourceTable::TableB2C]);
    let engine = Arc::new(FakeAthena::new(1));
    let plans = vec![TablePlan::new(SourceTable::TableB2C, vec![])];

    let summary = run_extraction(&ws.config, engine.clone(), plans).await.unwrap();

    assert_eq!(summary.files_written(), 0);
    assert_eq!(engine.submits(), 0);
    assert!(fs::metadata(ws.output_dir()).unwrap().is_dir());
}

/// Runs one real query. Needs a populated `.env`; set `ATHENA_LIVE_TABLE`
/// and `ATHENA_LIVE_DATE` to choose what to extract.
#[tokio::test]
#[ignore]
async fn live_athena_extraction() {
    tabdump_core::load_dotenv();
    let config = ExtractConfig::from_env();
    let table: SourceTable = std::env::var("ATHENA_LIVE_TABLE")
        .unwrap_or_else(|_| "TableB2C".into())
        .parse()
        .unwrap();
    let day = std::env::var("ATHENA_LIVE_DATE")
        .ok()
        .and_then(|d| d.parse().ok())
        .unwrap_or_else(|| date(1));

    let engine = AthenaEngine::new(&config).unwrap();
    let summary = run_extraction(&config, Arc::new(engine), vec![TablePlan::new(table, vec![day])])
        .await
        .unwrap();

    assert_eq!(summary.files_written(), 1);
    println!("wrote {} rows in {:?}", summary.rows_written(), summary.elapsed);
}
