//! 로버스트 랜덤 워크포워드 검증.
//!
//! 셀(전략 × 타임프레임)마다 파라미터 세트를 시드 기반으로 샘플링하고,
//! 홀드아웃 → 3구간 → 6구간 워크포워드 퍼널을 통과시켜 셀을 PASS/FAIL로
//! 판정합니다. 같은 시드와 입력은 항상 같은 보고서를 만듭니다.
//!
//! PASS 셀마다 최상위 생존자를 전체 데이터로 다시 실행해 결과 하나를
//! 내보내며, 모든 셀의 판정은 [`RobustReport`]에 남습니다.

mod cell;
mod funnel;
mod report;
mod sampling;
mod walk_forward;

pub use cell::{decide, rank_survivors, robust_score, top_count, CellDecision, CellReport, CellVerdict};
pub use funnel::{holdout_score, Funnel, RobustCellCandidate, RobustWfCandidate, WalkForwardStage};
pub use report::{summarize_clusters, ClusterSummary, RobustDiagnostics, RobustReport};
pub use sampling::sample_param_sets;
pub use walk_forward::{holdout_window, plan_folds, run_window, WalkForwardMetrics, Window};

use std::collections::BTreeMap;
use std::sync::Arc;

use finder_core::{BacktestSettings, CapitalSettings, RobustConfig, TimeframeDataset};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span, warn, Instrument};

use crate::backtest::Simulator;
use crate::callbacks::{FinderCallbacks, Progress, Scheduler};
use crate::dispatch::{ProgressThrottle, YieldPacer};
use crate::endpoint::adjust_for_endpoint;
use crate::result::FinderResult;
use crate::scheduler::StrategyPlan;
use crate::seed::cell_seed;

/// 로버스트 모드 옵션.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RobustOptions {
    /// 실행 시드 (필수)
    pub seed: Option<f64>,
    /// 셀당 샘플링 예산 (없으면 설정값)
    pub sample_budget: Option<usize>,
}

impl RobustOptions {
    pub fn with_seed(seed: f64) -> Self {
        Self {
            seed: Some(seed),
            sample_budget: None,
        }
    }

    /// 실행 전제 조건을 확인하고 시드를 반환합니다.
    ///
    /// 확인 전략 게이트가 있거나 시드가 없으면 실행하지 않습니다.
    pub fn check_preconditions(&self, confirmation_filters: usize) -> Result<f64, String> {
        if confirmation_filters > 0 {
            return Err(format!(
                "confirmation strategies are not supported in robust mode ({} configured)",
                confirmation_filters
            ));
        }
        match self.seed {
            Some(seed) if seed.is_finite() => Ok(seed),
            Some(seed) => Err(format!("seed must be a finite number, got {}", seed)),
            None => Err("a seed is required in robust mode".to_string()),
        }
    }

    /// 허용 범위로 제한된 샘플링 예산.
    pub fn effective_budget(&self, config: &RobustConfig) -> usize {
        self.sample_budget
            .unwrap_or(config.sample_budget)
            .clamp(RobustConfig::MIN_SAMPLE_BUDGET, RobustConfig::MAX_SAMPLE_BUDGET)
    }
}

/// 로버스트 실행 결과.
#[derive(Debug, Clone)]
pub struct RobustOutcome {
    /// PASS 셀의 대표 결과 (강건성 점수 내림차순)
    pub results: Vec<FinderResult>,
    pub report: RobustReport,
}

/// 셀 하나의 결과.
struct CellOutcome {
    report: CellReport,
    best: Option<FinderResult>,
}

/// 로버스트 검증기.
pub struct RobustValidator<'a> {
    pub config: &'a RobustConfig,
    pub capital: &'a CapitalSettings,
    pub simulator: &'a dyn Simulator,
    pub scheduler: &'a dyn Scheduler,
}

impl<'a> RobustValidator<'a> {
    /// 모든 셀을 검증합니다. 셀 순서는 전략 선언 순서 × 데이터셋 순서입니다.
    #[allow(clippy::too_many_arguments)]
    pub async fn run(
        &self,
        plans: &[StrategyPlan],
        datasets: &[TimeframeDataset],
        base_settings: &Arc<BacktestSettings>,
        seed: f64,
        budget: usize,
        top_n: usize,
        callbacks: &dyn FinderCallbacks,
        pacer: &mut YieldPacer,
        throttle: &mut ProgressThrottle,
    ) -> RobustOutcome {
        let total_cells = plans.len() * datasets.len();
        let mut cells = Vec::with_capacity(total_cells);
        let mut results = Vec::new();

        for plan in plans {
            for dataset in datasets {
                let span = info_span!("robust_cell", strategy = %plan.key, timeframe = %dataset.timeframe);
                let outcome = self
                    .run_cell(plan, dataset, base_settings, seed, budget, pacer)
                    .instrument(span)
                    .await;

                if let Some(best) = outcome.best {
                    results.push(best);
                }
                cells.push(outcome.report);

                let done = cells.len();
                if throttle.should_emit(done == total_cells) {
                    callbacks.on_progress(&Progress {
                        completed: done,
                        total: total_cells,
                        phase: "robust".to_string(),
                    });
                }
            }
        }

        results.sort_by(|a: &FinderResult, b: &FinderResult| {
            let score = |r: &FinderResult| r.robust.as_ref().map_or(0.0, |d| d.robust_score);
            score(b).total_cmp(&score(a))
        });
        results.truncate(top_n);

        let report = RobustReport::new(seed, budget, cells);
        info!(
            cells = report.cells.len(),
            passed = report.passed_cells().count(),
            results = results.len(),
            "Robust validation finished"
        );
        RobustOutcome { results, report }
    }

    async fn run_cell(
        &self,
        plan: &StrategyPlan,
        dataset: &TimeframeDataset,
        base_settings: &Arc<BacktestSettings>,
        seed: f64,
        budget: usize,
        pacer: &mut YieldPacer,
    ) -> CellOutcome {
        let timeframe = dataset.timeframe;
        let cell_seed = cell_seed(seed, &plan.key, timeframe.as_str());
        let bars = &dataset.bars[..];
        let sampled = sample_param_sets(&plan.param_sets, budget, cell_seed);
        let funnel = Funnel::plan(
            &plan.strategy,
            bars,
            self.simulator,
            self.capital,
            self.config,
            cell_seed,
        );

        let mut rejections: BTreeMap<String, usize> = BTreeMap::new();
        let mut reject = |reason: String| *rejections.entry(reason).or_insert(0) += 1;

        let mut stage_a = Vec::new();
        for params in &sampled {
            let settings = match base_settings.with_overrides(params) {
                Some(settings) => Arc::new(settings),
                None => Arc::clone(base_settings),
            };
            match funnel.stage_a(params.clone(), settings) {
                Ok(candidate) => stage_a.push(candidate),
                Err(reason) => reject(reason),
            }
            pacer.maybe_yield(self.scheduler, false).await;
        }
        let stage_a_survivors = stage_a.len();

        let mut stage_b = Vec::new();
        for candidate in stage_a {
            match funnel.walk_forward(WalkForwardStage::B, candidate) {
                Ok(survivor) => stage_b.push(survivor),
                Err(reason) => reject(reason),
            }
            pacer.maybe_yield(self.scheduler, false).await;
        }
        let stage_b_survivors = stage_b.len();

        let mut stage_c = Vec::new();
        for survivor in stage_b {
            match funnel.walk_forward(WalkForwardStage::C, survivor.candidate) {
                Ok(survivor) => stage_c.push(survivor),
                Err(reason) => reject(reason),
            }
            pacer.maybe_yield(self.scheduler, false).await;
        }
        rank_survivors(&mut stage_c);

        let verdict = decide(
            &stage_c,
            sampled.len(),
            self.capital.initial_capital,
            &self.config.cell,
        );
        let report = CellReport {
            strategy_key: plan.key.clone(),
            strategy_name: plan.name.clone(),
            timeframe,
            cell_seed,
            candidates: plan.param_sets.len(),
            sampled: sampled.len(),
            stage_a_survivors,
            stage_b_survivors,
            stage_c_survivors: stage_c.len(),
            pass_rate: verdict.pass_rate,
            median_oos_expectancy: verdict.median_oos_expectancy,
            profitable_fold_ratio: verdict.profitable_fold_ratio,
            stability_penalty: verdict.stability_penalty,
            breach_rate: verdict.breach_rate,
            robust_score: verdict.robust_score,
            decision: verdict.decision,
            fail_reason: verdict.fail_reason,
            rejections,
        };

        debug!(
            sampled = report.sampled,
            stage_a = report.stage_a_survivors,
            stage_b = report.stage_b_survivors,
            stage_c = report.stage_c_survivors,
            decision = ?report.decision,
            "Cell evaluated"
        );

        let best = match (report.decision, stage_c.first()) {
            (CellDecision::Pass, Some(top)) => self.full_run(plan, dataset, top, &report),
            _ => None,
        };
        CellOutcome { report, best }
    }

    /// 최상위 생존자를 전체 데이터로 실행하고 엔드포인트 보정합니다.
    fn full_run(
        &self,
        plan: &StrategyPlan,
        dataset: &TimeframeDataset,
        top: &RobustWfCandidate,
        cell: &CellReport,
    ) -> Option<FinderResult> {
        let params = &top.candidate.params;
        let run = plan
            .strategy
            .run(&dataset.bars, params)
            .map_err(finder_core::FinderError::from)
            .and_then(|output| {
                let mut result = self.simulator.simulate(
                    &dataset.bars,
                    &output.signals,
                    self.capital,
                    &top.candidate.settings,
                )?;
                result.normalize_sharpe();
                Ok((result, output.entry_stats))
            });

        let (result, entry_stats) = match run {
            Ok(run) => run,
            Err(e) => {
                warn!(error = %e, "Full-dataset run of robust survivor failed");
                return None;
            }
        };

        let adjustment = match dataset.last_bar_time() {
            Some(last) => adjust_for_endpoint(result, last, self.capital.initial_capital),
            None => return None,
        };

        let combined = &top.metrics.combined;
        Some(FinderResult {
            strategy_key: plan.key.clone(),
            strategy_name: plan.name.clone(),
            timeframes: vec![dataset.timeframe],
            params: params.clone(),
            result: adjustment.result,
            endpoint_adjusted: adjustment.adjusted,
            removed_trades: adjustment.removed_trades,
            confirmation_params: None,
            entry_stats,
            robust: Some(RobustDiagnostics::from_cell(
                cell,
                combined.total_trades,
                combined.expectancy,
            )),
        })
    }
}
