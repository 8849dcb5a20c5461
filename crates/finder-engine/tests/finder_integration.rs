//! `FinderRunner::run` 통합 테스트.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use common::{dataset, falling, periodic, rising, SilentStrategy};
use finder_core::{Bar, BacktestResult, CapitalSettings, ExitReason, FinderConfig, Timeframe};
use finder_engine::{
    BackendKind, FinderCallbacks, FinderInput, FinderRunner, NoopCallbacks, Progress, RunStatus,
    SortKey, SortMetric, SortPriority,
};
use finder_remote::{BatchItem, BatchResponse, BatchResultEntry, RemoteEngine, RemoteError, RemoteResult};
use finder_strategy::{ConfirmationFilter, ConfirmationGate, StrategyHandle};

fn remote_config() -> FinderConfig {
    let mut config = FinderConfig::default();
    config.remote.enabled = true;
    config
}

fn rising_input(bars: usize) -> FinderInput {
    let mut input = FinderInput::new(
        vec![dataset(Timeframe::H1, rising(bars))],
        vec![periodic("periodic", 5, 6)],
    );
    input.top_n = 10;
    input
}

/// 작업 1은 불일치 결과, 작업 2는 누락, 나머지는 거래 없는 정상 결과를 돌려주는 엔진.
/// `stats_only`면 모든 작업에 거래 목록 없는 통계만 돌려준다.
#[derive(Default)]
struct ScriptedEngine {
    unhealthy: bool,
    fail_batches: bool,
    stats_only: bool,
    cache_calls: AtomicUsize,
    direct_calls: AtomicUsize,
    cached_calls: AtomicUsize,
}

impl ScriptedEngine {
    fn respond(&self, items: &[BatchItem]) -> RemoteResult<BatchResponse> {
        if self.fail_batches {
            return Err(RemoteError::Network("connection refused".to_string()));
        }
        if self.stats_only {
            let results = items
                .iter()
                .map(|item| BatchResultEntry {
                    id: item.id,
                    result: Some(BacktestResult {
                        total_trades: 33,
                        winning_trades: 33,
                        win_rate: 100.0,
                        net_profit: 330.0,
                        avg_trade: 10.0,
                        ..Default::default()
                    }),
                    error: None,
                })
                .collect();
            return Ok(BatchResponse { results });
        }
        let results = items
            .iter()
            .filter(|item| item.id != 2)
            .map(|item| {
                let result = if item.id == 1 {
                    BacktestResult {
                        total_trades: 10,
                        winning_trades: 6,
                        losing_trades: 3,
                        ..Default::default()
                    }
                } else {
                    BacktestResult::default()
                };
                BatchResultEntry {
                    id: item.id,
                    result: Some(result),
                    error: None,
                }
            })
            .collect();
        Ok(BatchResponse { results })
    }
}

#[async_trait]
impl RemoteEngine for ScriptedEngine {
    async fn check_health(&self) -> bool {
        !self.unhealthy
    }

    async fn cache_data(&self, _bars: &[Bar]) -> RemoteResult<Option<String>> {
        self.cache_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Some("cache-1".to_string()))
    }

    async fn run_batch_backtest(
        &self,
        _bars: &[Bar],
        items: &[BatchItem],
        _capital: &CapitalSettings,
    ) -> RemoteResult<BatchResponse> {
        self.direct_calls.fetch_add(1, Ordering::SeqCst);
        self.respond(items)
    }

    async fn run_cached_batch_backtest(
        &self,
        cache_id: &str,
        items: &[BatchItem],
        _capital: &CapitalSettings,
    ) -> RemoteResult<BatchResponse> {
        assert_eq!(cache_id, "cache-1");
        self.cached_calls.fetch_add(1, Ordering::SeqCst);
        self.respond(items)
    }
}

#[derive(Default)]
struct RecordingCallbacks {
    progress: Mutex<Vec<Progress>>,
    statuses: Mutex<Vec<String>>,
}

impl FinderCallbacks for RecordingCallbacks {
    fn on_progress(&self, progress: &Progress) {
        self.progress.lock().unwrap().push(progress.clone());
    }

    fn on_status(&self, status: &str) {
        self.statuses.lock().unwrap().push(status.to_string());
    }
}

#[tokio::test]
async fn test_local_run_ranks_and_reports() {
    let runner = FinderRunner::new(FinderConfig::default());
    let callbacks = RecordingCallbacks::default();
    let run = runner.run(rising_input(300), &callbacks).await;

    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.stats.total_runs, 6);
    assert_eq!(run.stats.completed, 6);
    assert_eq!(run.stats.skipped, 0);
    assert_eq!(run.stats.backend, Some(BackendKind::Local));
    assert_eq!(run.results.len(), 6);

    // 상승장에서 모든 후보가 수익, 기본 정렬은 PF 내림차순
    assert!(run.results.iter().all(|r| r.result.net_profit > 0.0));
    for pair in run.results.windows(2) {
        assert!(pair[0].result.profit_factor >= pair[1].result.profit_factor);
    }

    let progress = callbacks.progress.lock().unwrap();
    let last = progress.last().unwrap();
    assert_eq!(last.completed, 6);
    assert_eq!(last.total, 6);
    assert!(!callbacks.statuses.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_five_five_zero_parameter_sets() {
    let mut input = rising_input(300);
    input.strategies = vec![
        periodic("a", 5, 5),
        periodic("b", 5, 5),
        periodic("c", 5, 0),
    ];
    let run = FinderRunner::new(FinderConfig::default())
        .run(input, &NoopCallbacks)
        .await;

    assert_eq!(run.stats.total_runs, 10);
    assert_eq!(run.stats.completed, 10);
    assert!(run.results.iter().all(|r| r.strategy_key != "c"));
}

#[tokio::test]
async fn test_no_valid_combinations_is_terminal_status() {
    let mut input = rising_input(300);
    input.strategies = vec![periodic("a", 5, 0)];
    let run = FinderRunner::new(FinderConfig::default())
        .run(input, &NoopCallbacks)
        .await;

    assert_eq!(run.status, RunStatus::NoValidCombinations);
    assert!(run.results.is_empty());
}

#[tokio::test]
async fn test_missing_or_short_datasets() {
    let runner = FinderRunner::new(FinderConfig::default());

    let mut input = rising_input(300);
    input.datasets.clear();
    assert_eq!(runner.run(input, &NoopCallbacks).await.status, RunStatus::NoDatasets);

    let run = runner.run(rising_input(20), &NoopCallbacks).await;
    assert_eq!(
        run.status,
        RunStatus::InsufficientBars {
            available: 20,
            required: 50
        }
    );
    assert!(run.results.is_empty());
}

#[tokio::test]
async fn test_failed_jobs_are_skipped() {
    let mut input = rising_input(300);
    // period 1, 2는 hold(2) 이하라 전략 에러
    input.strategies = vec![periodic("periodic", 1, 4)];
    let run = FinderRunner::new(FinderConfig::default())
        .run(input, &NoopCallbacks)
        .await;

    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.stats.skipped, 2);
    assert_eq!(run.stats.completed, 2);
    assert_eq!(run.results.len(), 2);
}

#[tokio::test]
async fn test_trades_closed_on_last_bar_are_removed() {
    // period 9: 진입 33회, 마지막 진입 297은 299(마지막 바)에서 청산되어 제거
    let mut input = rising_input(300);
    input.strategies = vec![periodic("periodic", 9, 1)];
    let run = FinderRunner::new(FinderConfig::default())
        .run(input, &NoopCallbacks)
        .await;

    let candidate = &run.results[0];
    assert!(candidate.endpoint_adjusted);
    assert_eq!(candidate.removed_trades, 1);
    assert_eq!(candidate.result.total_trades, 32);
    assert_eq!(run.stats.adjusted, 1);
}

#[tokio::test]
async fn test_remote_stats_without_trades_recomputed_locally() {
    let engine = Arc::new(ScriptedEngine {
        stats_only: true,
        ..Default::default()
    });
    let mut input = rising_input(300);
    input.strategies = vec![periodic("periodic", 9, 1)];
    let run = FinderRunner::new(remote_config())
        .with_remote(engine)
        .run(input, &NoopCallbacks)
        .await;

    assert_eq!(run.stats.remote_accepted, 0);
    assert_eq!(run.stats.remote_fallbacks, 1);
    let candidate = &run.results[0];
    assert!(candidate.endpoint_adjusted);
    assert_eq!(candidate.removed_trades, 1);
    assert_eq!(candidate.result.total_trades, 32);
    assert_eq!(candidate.result.trades.len(), 32);
}

#[tokio::test]
async fn test_min_trades_filter() {
    let mut input = FinderInput::new(
        vec![dataset(Timeframe::H1, falling(300))],
        vec![periodic("periodic", 5, 3)],
    );
    input.min_trades = 1_000;
    let run = FinderRunner::new(FinderConfig::default())
        .run(input, &NoopCallbacks)
        .await;

    assert!(run.results.is_empty());
    assert_eq!(run.stats.filtered, 3);
}

#[tokio::test]
async fn test_local_runs_are_deterministic() {
    let runner = FinderRunner::new(FinderConfig::default());
    let a = runner.run(rising_input(300), &NoopCallbacks).await;
    let b = runner.run(rising_input(300), &NoopCallbacks).await;

    let summary = |run: &finder_engine::FinderRun| {
        run.results
            .iter()
            .map(|r| (r.params.clone(), r.result.net_profit))
            .collect::<Vec<_>>()
    };
    assert_eq!(summary(&a), summary(&b));
    assert_ne!(a.run_id, b.run_id);
}

#[tokio::test]
async fn test_sort_priority_is_applied() {
    let mut input = rising_input(300);
    input.sort = SortPriority(vec![SortKey::desc(SortMetric::TotalTrades)]);
    input.top_n = 3;
    let run = FinderRunner::new(FinderConfig::default())
        .run(input, &NoopCallbacks)
        .await;

    assert_eq!(run.results.len(), 3);
    // 주기가 짧을수록 거래가 많다
    let periods: Vec<f64> = run.results.iter().map(|r| r.params["period"]).collect();
    assert_eq!(periods, vec![5.0, 6.0, 7.0]);
}

#[tokio::test]
async fn test_remote_inconsistent_and_missing_results_fall_back() {
    let engine = Arc::new(ScriptedEngine::default());
    let runner = FinderRunner::new(remote_config()).with_remote(engine.clone());
    let run = runner.run(rising_input(300), &NoopCallbacks).await;

    assert_eq!(run.stats.backend, Some(BackendKind::Remote));
    assert_eq!(run.stats.completed, 6);
    assert_eq!(run.stats.remote_accepted, 4);
    assert_eq!(run.stats.remote_fallbacks, 2);
    // 원격 정상 결과는 거래가 없어 필터링된다
    assert_eq!(run.stats.filtered, 4);
    assert_eq!(engine.direct_calls.load(Ordering::SeqCst), 1);
    assert_eq!(engine.cache_calls.load(Ordering::SeqCst), 0);

    let mut periods: Vec<f64> = run.results.iter().map(|r| r.params["period"]).collect();
    periods.sort_by(f64::total_cmp);
    assert_eq!(periods, vec![5.0, 6.0]);
}

#[tokio::test]
async fn test_remote_batch_failure_matches_local_run() {
    let engine = Arc::new(ScriptedEngine {
        fail_batches: true,
        ..Default::default()
    });
    let remote_run = FinderRunner::new(remote_config())
        .with_remote(engine)
        .run(rising_input(300), &NoopCallbacks)
        .await;
    let local_run = FinderRunner::new(FinderConfig::default())
        .run(rising_input(300), &NoopCallbacks)
        .await;

    assert_eq!(remote_run.stats.remote_fallbacks, 6);
    assert_eq!(remote_run.stats.remote_accepted, 0);
    let summary = |run: &finder_engine::FinderRun| {
        run.results
            .iter()
            .map(|r| (r.params.clone(), r.result.clone()))
            .collect::<Vec<_>>()
    };
    assert_eq!(summary(&remote_run), summary(&local_run));
}

#[tokio::test]
async fn test_large_dataset_uses_remote_cache() {
    let engine = Arc::new(ScriptedEngine::default());
    let mut config = remote_config();
    config.remote.cache_threshold_bars = 100;
    let run = FinderRunner::new(config)
        .with_remote(engine.clone())
        .run(rising_input(300), &NoopCallbacks)
        .await;

    assert_eq!(run.stats.backend_reason, "remote (cached)");
    assert_eq!(engine.cache_calls.load(Ordering::SeqCst), 1);
    assert_eq!(engine.cached_calls.load(Ordering::SeqCst), 1);
    assert_eq!(engine.direct_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unhealthy_engine_runs_locally() {
    let engine = Arc::new(ScriptedEngine {
        unhealthy: true,
        ..Default::default()
    });
    let run = FinderRunner::new(remote_config())
        .with_remote(engine.clone())
        .run(rising_input(300), &NoopCallbacks)
        .await;

    assert_eq!(run.stats.backend, Some(BackendKind::Local));
    assert_eq!(run.stats.backend_reason, "local (remote health check failed)");
    assert_eq!(engine.direct_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_multi_timeframe_runs_locally_on_aligned_data() {
    let engine = Arc::new(ScriptedEngine::default());
    let mut input = rising_input(300);
    // 4시간봉 100개는 1시간봉 300개보다 늦게 끝나므로 잘린다
    input.datasets.push(dataset(Timeframe::H4, rising(100)));
    let run = FinderRunner::new(remote_config())
        .with_remote(engine.clone())
        .run(input, &NoopCallbacks)
        .await;

    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.stats.backend, Some(BackendKind::Local));
    assert!(run.stats.backend_reason.contains("multi-timeframe"));
    assert_eq!(engine.direct_calls.load(Ordering::SeqCst), 0);
    assert_eq!(run.results[0].timeframes, vec![Timeframe::H1, Timeframe::H4]);
}

#[tokio::test]
async fn test_coarse_timeframe_end_of_data_trade_removed() {
    // 1시간봉 0..=199h, 4시간봉 0..=200h -> 공통 끝 199h, 4시간봉은 196h에서 끝난다.
    // period 8: 4시간봉 48번 진입은 청산 신호 없이 196h에서 강제 청산된다.
    let mut input = FinderInput::new(
        vec![
            dataset(Timeframe::H1, rising(200)),
            dataset(Timeframe::H4, rising(51)),
        ],
        vec![periodic("periodic", 8, 1)],
    );
    input.top_n = 10;
    let run = FinderRunner::new(FinderConfig::default())
        .run(input, &NoopCallbacks)
        .await;

    assert_eq!(run.status, RunStatus::Completed);
    let candidate = &run.results[0];
    assert!(candidate.endpoint_adjusted);
    assert_eq!(candidate.removed_trades, 1);
    assert!(candidate
        .result
        .trades
        .iter()
        .all(|t| t.exit_reason != ExitReason::EndOfData));
    // 1시간봉 24회 + 4시간봉 5회 (8..=40)
    assert_eq!(candidate.result.total_trades, 29);
    assert_eq!(run.stats.adjusted, 1);
}

#[tokio::test]
async fn test_confirmation_gate_filters_entries_and_is_recorded() {
    let mut input = rising_input(300);
    input.min_trades = 0;
    input.confirmation = ConfirmationGate::new(
        vec![ConfirmationFilter::new(
            StrategyHandle::classify(Arc::new(SilentStrategy)),
            Default::default(),
        )],
        3,
    );
    let run = FinderRunner::new(FinderConfig::default())
        .run(input, &NoopCallbacks)
        .await;

    assert_eq!(run.results.len(), 6);
    for candidate in &run.results {
        assert_eq!(candidate.result.total_trades, 0);
        let used = candidate.confirmation_params.as_ref().unwrap();
        assert_eq!(used[0].0, "silent");
    }
}
