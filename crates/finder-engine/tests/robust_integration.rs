//! 로버스트 랜덤 워크포워드 모드 통합 테스트.

mod common;

use std::sync::Arc;

use common::{dataset, falling, periodic, rising, SilentStrategy};
use finder_core::{FinderConfig, Timeframe};
use finder_engine::{
    cell_seed, CellDecision, FinderInput, FinderRun, FinderRunner, NoopCallbacks, RobustOptions,
    RunStatus,
};
use finder_strategy::{ConfirmationFilter, ConfirmationGate, StrategyHandle};

fn robust_input(closes: Vec<f64>, seed: f64) -> FinderInput {
    let mut input = FinderInput::new(
        vec![dataset(Timeframe::H1, closes)],
        vec![periodic("periodic", 5, 6)],
    );
    input.robust = Some(RobustOptions::with_seed(seed));
    input
}

async fn run(input: FinderInput) -> FinderRun {
    FinderRunner::new(FinderConfig::default())
        .run(input, &NoopCallbacks)
        .await
}

#[tokio::test]
async fn test_missing_seed_aborts_before_any_cell() {
    let mut input = robust_input(rising(600), 1.0);
    input.robust = Some(RobustOptions::default());
    let outcome = run(input).await;

    assert!(matches!(outcome.status, RunStatus::RobustPreconditionFailed { .. }));
    assert!(outcome.results.is_empty());
    assert!(outcome.robust.is_none());
}

#[tokio::test]
async fn test_confirmation_strategies_abort_robust_mode() {
    let mut input = robust_input(rising(600), 1.0);
    input.confirmation = ConfirmationGate::new(
        vec![ConfirmationFilter::new(
            StrategyHandle::classify(Arc::new(SilentStrategy)),
            Default::default(),
        )],
        3,
    );
    let outcome = run(input).await;

    match outcome.status {
        RunStatus::RobustPreconditionFailed { message } => assert!(message.contains("confirmation")),
        other => panic!("unexpected status {other:?}"),
    }
    assert_eq!(outcome.stats.completed, 0);
}

#[tokio::test]
async fn test_steady_edge_passes_with_one_result_per_cell() {
    let outcome = run(robust_input(rising(600), 42.0)).await;
    assert_eq!(outcome.status, RunStatus::Completed);

    let report = outcome.robust.as_ref().unwrap();
    assert_eq!(report.cells.len(), 1);
    let cell = &report.cells[0];
    assert_eq!(cell.decision, CellDecision::Pass, "{:?}", cell);
    assert_eq!(cell.sampled, 6);
    assert_eq!(cell.stage_c_survivors, 6);
    assert_eq!(cell.pass_rate, 1.0);
    assert!(cell.robust_score > 60.0);
    assert!(cell.rejections.is_empty());
    assert_eq!(cell.cell_seed, cell_seed(42.0, "periodic", "1h"));

    assert_eq!(outcome.results.len(), 1);
    let best = &outcome.results[0];
    assert_eq!(best.timeframes, vec![Timeframe::H1]);
    let diagnostics = best.robust.as_ref().unwrap();
    assert_eq!(diagnostics.cell_seed, cell.cell_seed);
    assert!(diagnostics.oos_trades >= 20);
    assert!(best.result.net_profit > 0.0);
}

#[tokio::test]
async fn test_losing_cell_fails_with_rejection_audit() {
    let outcome = run(robust_input(falling(600), 42.0)).await;
    let report = outcome.robust.as_ref().unwrap();
    let cell = &report.cells[0];

    assert_eq!(cell.decision, CellDecision::Fail);
    assert_eq!(cell.stage_a_survivors, 0);
    assert_eq!(cell.rejections.get("stage_a_expectancy"), Some(&6));
    assert!(cell.fail_reason.as_deref().unwrap().starts_with("survivors"));
    assert!(outcome.results.is_empty());
}

#[tokio::test]
async fn test_same_seed_reproduces_report() {
    let first = run(robust_input(rising(600), 7.0)).await;
    let second = run(robust_input(rising(600), 7.0)).await;

    assert_eq!(first.robust, second.robust);
    let params = |run: &FinderRun| run.results.iter().map(|r| r.params.clone()).collect::<Vec<_>>();
    assert_eq!(params(&first), params(&second));

    let other = run(robust_input(rising(600), 8.0)).await;
    assert_ne!(
        first.robust.as_ref().unwrap().cells[0].cell_seed,
        other.robust.as_ref().unwrap().cells[0].cell_seed
    );
}

#[tokio::test]
async fn test_every_cell_is_audited_and_funnel_is_monotonic() {
    let mut input = robust_input(rising(600), 3.0);
    input.datasets.push(dataset(Timeframe::H4, rising(600)));
    input.strategies.push(periodic("slow", 20, 4));
    let outcome = run(input).await;
    let report = outcome.robust.as_ref().unwrap();

    assert_eq!(report.cells.len(), 4);
    for cell in &report.cells {
        assert!(cell.stage_c_survivors <= cell.stage_b_survivors);
        assert!(cell.stage_b_survivors <= cell.stage_a_survivors);
        assert!(cell.stage_a_survivors <= cell.sampled);
        let rejected: usize = cell.rejections.values().sum();
        assert_eq!(rejected + cell.stage_c_survivors, cell.sampled);
    }

    assert_eq!(report.clusters.len(), 2);
    assert_eq!(report.clusters[0].strategy_key, "periodic");
    assert_eq!(report.clusters[0].cells, 2);
    assert_eq!(report.clusters[1].strategy_key, "slow");
    assert_eq!(outcome.results.len(), report.passed_cells().count());
}

#[tokio::test]
async fn test_sampling_budget_bounds_each_cell() {
    let mut input = robust_input(rising(600), 11.0);
    input.strategies = vec![periodic("wide", 5, 300)];
    let outcome = run(input).await;
    let cell = &outcome.robust.as_ref().unwrap().cells[0];
    assert_eq!(cell.candidates, 300);
    assert_eq!(cell.sampled, 120);

    let mut input = robust_input(rising(600), 11.0);
    input.strategies = vec![periodic("wide", 5, 300)];
    input.robust = Some(RobustOptions {
        seed: Some(11.0),
        sample_budget: Some(10),
    });
    let outcome = run(input).await;
    assert_eq!(outcome.robust.as_ref().unwrap().cells[0].sampled, 40);
}
