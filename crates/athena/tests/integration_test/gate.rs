//! Concurrency bounds across tables sharing one gate.

use std::sync::Arc;

use tabdump_athena::*;
use tabdump_core::SourceTable;

use crate::common::*;

#[tokio::test(start_paused = true)]
async fn in_flight_queries_never_exceed_the_limit() {
    let mut ws = Workspace::new(&[SourceTable::TableB2C, SourceTable::TableB2B]);
    ws.config.scheduler.max_concurrent_queries = 2;
    let engine = Arc::new(FakeAthena::new(5));
    let plans = vec![
        TablePlan::new(SourceTable::TableB2C, dates(1..=6)),
        TablePlan::new(SourceTable::TableB2B, dates(1..=6)),
    ];

    let summary = run_extraction(&ws.config, engine.clone(), plans).await.unwrap();

    assert_eq!(summary.files_written(), 12);
    assert_eq!(engine.max_in_flight(), 2);
}

#[tokio::test(start_paused = true)]
async fn orchestrators_share_a_single_gate() {
    let ws = Workspace::new(&[SourceTable::TableB2C, SourceTable::TableVoucher]);
    let engine = Arc::new(FakeAthena::new(1));
    let executor = Arc::new(QueryExecutor::new(
        engine.clone(),
        ws.config.credentials(),
        ExecutorSettings::default(),
    ));
    let orchestrator = TableJobOrchestrator::new(executor, ws.output_dir()).with_batch_size(3);
    let gate = ConcurrencyGate::new(1);
    let b2c = QueryTemplate::new("SELECT * FROM b2c WHERE dt = '{date_val}'").unwrap();
    let voucher = QueryTemplate::new("SELECT * FROM voucher WHERE dt = '{date_val}'").unwrap();

    let (a, b) = tokio::join!(
        orchestrator.run("b2c", dates(1..=3), &b2c, &gate),
        orchestrator.run("voucher", dates(1..=3), &voucher, &gate),
    );

    assert_eq!(a.unwrap().outcomes.len(), 3);
    assert_eq!(b.unwrap().outcomes.len(), 3);
    assert_eq!(engine.max_in_flight(), 1);
    assert_eq!(gate.in_flight(), 0);
}

#[tokio::test(start_paused = true)]
async fn zero_batch_size_is_treated_as_one() {
    let ws = Workspace::new(&[SourceTable::TableB2C]);
    let engine = Arc::new(FakeAthena::new(1));
    let executor = Arc::new(QueryExecutor::new(
        engine.clone(),
        ws.config.credentials(),
        ExecutorSettings::default(),
    ));
    let orchestrator = TableJobOrchestrator::new(executor, ws.output_dir()).with_batch_size(0);
    let template = QueryTemplate::new("SELECT 1 WHERE dt = '{date_val}'").unwrap();

    let summary = orchestrator
        .run("b2c", dates(1..=2), &template, &ConcurrencyGate::default())
        .await
        .unwrap();

    assert_eq!(summary.outcomes.len(), 2);
    assert_eq!(engine.max_in_flight(), 1);
}
