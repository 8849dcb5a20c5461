//! 파인더 실행 진입점.
//!
//! [`FinderRunner::run`]은 다음 순서로 실행합니다:
//!
//! 1. 로버스트 모드 전제 조건 확인
//! 2. 타임프레임 데이터셋 정렬과 최소 바 수 확인
//! 3. 작업 스케줄러 생성 (조합이 없으면 종료)
//! 4. 데이터셋 크기 정책 계산
//! 5. 로버스트 모드면 검증기 실행, 아니면 백엔드 선택 후 배치 루프
//! 6. 엔드포인트 보정 → 최소 거래 수 필터 → 랭커
//!
//! 조기 종료는 모두 [`RunStatus`]로 표현되며 에러가 아닙니다.

use std::sync::Arc;
use std::time::Duration;

use finder_core::{finder_span, BacktestSettings, CapitalSettings, FinderConfig, TimeframeDataset};
use finder_remote::RemoteEngine;
use finder_strategy::{ConfirmationGate, GeneratorOptions};
use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

use crate::backtest::BarSimulator;
use crate::callbacks::{FinderCallbacks, Progress, Scheduler, TokioScheduler};
use crate::dispatch::{
    select_backend, BackendChoice, BackendKind, ExecutionBackend, ExecutionContext, JobOutcome,
    LocalBackend, PolicyInput, PreparedDataset, ProgressThrottle, RemoteBackend, RemoteMode,
    ResultSource, YieldPacer,
};
use crate::endpoint::adjust_for_endpoint;
use crate::ranker::{ResultRanker, SortPriority};
use crate::result::{FinderResult, FinderRun, RunStats, RunStatus};
use crate::robust::{RobustOptions, RobustValidator};
use crate::scheduler::{is_heavy_config, FinderDatasetFlags, JobScheduler, StrategySelection};
use crate::timeframe::{align_datasets, AlignedDatasets, MergedTradesAggregator, TimeframeAggregator};

/// 실행 입력.
#[derive(Debug, Clone)]
pub struct FinderInput {
    /// 타임프레임별 데이터셋
    pub datasets: Vec<TimeframeDataset>,
    /// 탐색할 전략과 파라미터 생성기
    pub strategies: Vec<StrategySelection>,
    /// 확인 전략 게이트 (비어 있으면 사용하지 않음)
    pub confirmation: ConfirmationGate,
    pub capital: CapitalSettings,
    pub settings: BacktestSettings,
    pub generator_options: GeneratorOptions,
    /// 랭킹 정렬 우선순위
    pub sort: SortPriority,
    /// 반환할 후보 수
    pub top_n: usize,
    /// 랭킹 전 최소 거래 수
    pub min_trades: usize,
    /// 로버스트 모드 옵션
    pub robust: Option<RobustOptions>,
}

impl FinderInput {
    pub fn new(datasets: Vec<TimeframeDataset>, strategies: Vec<StrategySelection>) -> Self {
        Self {
            datasets,
            strategies,
            confirmation: ConfirmationGate::default(),
            capital: CapitalSettings::default(),
            settings: BacktestSettings::default(),
            generator_options: GeneratorOptions::default(),
            sort: SortPriority::default(),
            top_n: 10,
            min_trades: 1,
            robust: None,
        }
    }
}

/// 파인더 실행기.
///
/// 원격 엔진, 타임프레임 집계 함수, 협력적 스케줄러를 주입받습니다.
/// 실행 상태(작업 커서, 캐시 ID, 랭커)는 `run` 호출마다 새로 만듭니다.
pub struct FinderRunner {
    config: FinderConfig,
    remote: Option<Arc<dyn RemoteEngine>>,
    aggregator: Arc<dyn TimeframeAggregator>,
    scheduler: Arc<dyn Scheduler>,
}

impl FinderRunner {
    pub fn new(config: FinderConfig) -> Self {
        Self {
            config,
            remote: None,
            aggregator: Arc::new(MergedTradesAggregator),
            scheduler: Arc::new(TokioScheduler),
        }
    }

    pub fn with_remote(mut self, engine: Arc<dyn RemoteEngine>) -> Self {
        self.remote = Some(engine);
        self
    }

    pub fn with_aggregator(mut self, aggregator: Arc<dyn TimeframeAggregator>) -> Self {
        self.aggregator = aggregator;
        self
    }

    pub fn with_scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn config(&self) -> &FinderConfig {
        &self.config
    }

    /// 파인더를 실행합니다.
    pub async fn run(&self, input: FinderInput, callbacks: &dyn FinderCallbacks) -> FinderRun {
        let run_id = Uuid::new_v4();
        let span = finder_span!("finder_run", run_id);
        self.run_inner(run_id, input, callbacks).instrument(span).await
    }

    async fn run_inner(
        &self,
        run_id: Uuid,
        input: FinderInput,
        callbacks: &dyn FinderCallbacks,
    ) -> FinderRun {
        let mut stats = RunStats::default();
        let terminate = |status: RunStatus, stats: RunStats| {
            warn!(%status, "Finder run ended early");
            callbacks.on_status(&status.to_string());
            FinderRun::terminated(run_id, status, stats)
        };

        let robust = match &input.robust {
            Some(options) => match options.check_preconditions(input.confirmation.filters().len()) {
                Ok(seed) => Some((seed, options.effective_budget(&self.config.robust))),
                Err(message) => {
                    return terminate(RunStatus::RobustPreconditionFailed { message }, stats)
                }
            },
            None => None,
        };

        if input.datasets.is_empty() {
            return terminate(RunStatus::NoDatasets, stats);
        }
        let required = self.config.engine.min_aligned_bars;
        let aligned = match align_datasets(&input.datasets) {
            Some(aligned) if aligned.min_len() >= required => aligned,
            other => {
                let available = other.map_or(0, |a| a.min_len());
                return terminate(RunStatus::InsufficientBars { available, required }, stats);
            }
        };

        let mut scheduler = JobScheduler::new(
            &input.strategies,
            input.settings.clone(),
            &input.generator_options,
        );
        stats.total_runs = scheduler.total_runs();
        if stats.total_runs == 0 {
            return terminate(RunStatus::NoValidCombinations, stats);
        }

        let heavy = is_heavy_config(
            input.confirmation.filters().len(),
            aligned.datasets.len(),
            &input.settings.realism,
        );
        let flags = FinderDatasetFlags::compute(aligned.max_len(), heavy, &self.config.engine);
        let simulator = BarSimulator::with_compact(flags.should_use_compact_backtest);
        let mut pacer = YieldPacer::new(flags.yield_budget);
        let mut throttle =
            ProgressThrottle::new(Duration::from_millis(self.config.engine.progress_interval_ms));

        info!(
            total_runs = stats.total_runs,
            bars = flags.bar_count,
            timeframes = aligned.datasets.len(),
            batch_size = flags.batch_size,
            compact = flags.should_use_compact_backtest,
            heavy = flags.heavy_config,
            "Finder run started"
        );

        if let Some((seed, budget)) = robust {
            callbacks.on_status("robust validation started");
            let validator = RobustValidator {
                config: &self.config.robust,
                capital: &input.capital,
                simulator: &simulator,
                scheduler: self.scheduler.as_ref(),
            };
            let outcome = validator
                .run(
                    scheduler.plans(),
                    &aligned.datasets,
                    scheduler.base_settings(),
                    seed,
                    budget,
                    input.top_n,
                    callbacks,
                    &mut pacer,
                    &mut throttle,
                )
                .await;

            stats.completed = outcome.report.cells.iter().map(|c| c.sampled).sum();
            stats.backend = Some(BackendKind::Local);
            stats.backend_reason = "robust validation runs locally".to_string();
            callbacks.on_status(&format!(
                "robust validation finished: {}/{} cells passed",
                outcome.report.passed_cells().count(),
                outcome.report.cells.len()
            ));
            return FinderRun {
                run_id,
                results: outcome.results,
                stats,
                status: RunStatus::Completed,
                robust: Some(outcome.report),
            };
        }

        let AlignedDatasets {
            datasets,
            common_end,
        } = aligned;
        let timeframes: Vec<_> = datasets.iter().map(|d| d.timeframe).collect();
        let mut prepared = Vec::with_capacity(datasets.len());
        for dataset in datasets {
            let gate = if input.confirmation.is_empty() {
                None
            } else {
                match input.confirmation.prepare(&dataset.bars) {
                    Ok(gate) => Some(gate),
                    Err(e) => {
                        return terminate(
                            RunStatus::ConfirmationFailed {
                                message: e.to_string(),
                            },
                            stats,
                        )
                    }
                }
            };
            prepared.push(PreparedDataset { dataset, gate });
        }
        let confirmation_params =
            (!input.confirmation.is_empty()).then(|| input.confirmation.params_used());

        let policy = PolicyInput {
            has_engine: self.remote.is_some(),
            realism_requires_local: input.settings.realism.requires_local(),
            bar_count: flags.bar_count,
            compact_mode: flags.should_use_compact_backtest,
            sort_includes_volatility_metric: input.sort.includes_volatility_metric(),
            timeframes: prepared.len(),
        };
        let choice = select_backend(&policy, self.remote.as_deref(), &self.config.remote).await;
        let backend = self.build_backend(&choice, &prepared).await;
        stats.backend = Some(backend.kind());
        stats.backend_reason = choice.to_string();
        info!(backend = %choice, "Execution backend selected");
        callbacks.on_status(&format!("running {} combinations on {}", stats.total_runs, choice));

        let ctx = ExecutionContext {
            datasets: &prepared,
            capital: &input.capital,
            simulator: &simulator,
            aggregator: self.aggregator.as_ref(),
            scheduler: self.scheduler.as_ref(),
        };
        let mut ranker: ResultRanker<FinderResult> =
            ResultRanker::new(input.top_n, input.sort.clone());

        loop {
            let batch = scheduler.next_job_batch(flags.batch_size);
            if batch.is_empty() {
                break;
            }
            let final_batch = scheduler.is_exhausted();
            stats.batches += 1;

            let outcomes = backend.run_batch(&batch, &ctx, &mut pacer, final_batch).await;
            for (job, outcome) in batch.iter().zip(outcomes) {
                let run = match outcome {
                    JobOutcome::Completed(run) => run,
                    JobOutcome::Failed { .. } => {
                        stats.skipped += 1;
                        continue;
                    }
                };
                stats.completed += 1;
                match run.source {
                    ResultSource::Remote => stats.remote_accepted += 1,
                    ResultSource::LocalFallback => stats.remote_fallbacks += 1,
                    ResultSource::Local => {}
                }

                let adjustment =
                    adjust_for_endpoint(run.result, common_end, input.capital.initial_capital);
                let removed_trades = run.removed_trades + adjustment.removed_trades;
                let endpoint_adjusted = removed_trades > 0;
                if endpoint_adjusted {
                    stats.adjusted += 1;
                }
                if adjustment.result.total_trades < input.min_trades {
                    stats.filtered += 1;
                    continue;
                }

                ranker.offer(FinderResult {
                    strategy_key: job.strategy_key.clone(),
                    strategy_name: job.strategy_name.clone(),
                    timeframes: timeframes.clone(),
                    params: job.params.clone(),
                    result: adjustment.result,
                    endpoint_adjusted,
                    removed_trades,
                    confirmation_params: confirmation_params.clone(),
                    entry_stats: run.entry_stats,
                    robust: None,
                });
            }

            debug!(
                batch = stats.batches,
                completed = stats.completed,
                skipped = stats.skipped,
                remaining = scheduler.remaining(),
                "Batch processed"
            );
            if throttle.should_emit(final_batch) {
                callbacks.on_progress(&Progress {
                    completed: stats.completed + stats.skipped,
                    total: stats.total_runs,
                    phase: "backtest".to_string(),
                });
            }
        }

        let results = ranker.into_sorted_vec(input.top_n);
        info!(
            completed = stats.completed,
            skipped = stats.skipped,
            filtered = stats.filtered,
            adjusted = stats.adjusted,
            remote_fallbacks = stats.remote_fallbacks,
            results = results.len(),
            yields = pacer.yields(),
            "Finder run finished"
        );
        callbacks.on_status(&format!(
            "finished: {} candidates from {} runs",
            results.len(),
            stats.completed
        ));

        FinderRun {
            run_id,
            results,
            stats,
            status: RunStatus::Completed,
            robust: None,
        }
    }

    /// 정책 결정에 맞는 백엔드를 만듭니다. 캐시 모드면 데이터를 먼저 올립니다.
    async fn build_backend(
        &self,
        choice: &BackendChoice,
        prepared: &[PreparedDataset],
    ) -> Box<dyn ExecutionBackend> {
        let (mode, engine) = match (choice, &self.remote) {
            (BackendChoice::Remote { mode }, Some(engine)) => (*mode, engine),
            _ => return Box::new(LocalBackend),
        };

        let cache_id = match (mode, prepared.first()) {
            (RemoteMode::Cached, Some(first)) => match engine.cache_data(&first.dataset.bars).await {
                Ok(Some(id)) => {
                    debug!(cache_id = %id, "Dataset cached on remote engine");
                    Some(id)
                }
                Ok(None) => {
                    warn!("Remote engine declined caching, sending data with each batch");
                    None
                }
                Err(e) => {
                    warn!(error = %e, "Remote caching failed, sending data with each batch");
                    None
                }
            },
            _ => None,
        };

        Box::new(RemoteBackend::new(Arc::clone(engine), cache_id))
    }
}
