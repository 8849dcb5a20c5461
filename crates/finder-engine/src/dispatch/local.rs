//! 로컬 실행 백엔드.

use async_trait::async_trait;
use finder_core::{BacktestResult, Bar, FinderError, Signal};
use tracing::warn;

use crate::dispatch::backend::{
    BackendKind, ExecutionBackend, ExecutionContext, JobOutcome, JobRun, ResultSource,
};
use crate::dispatch::pacing::YieldPacer;
use crate::endpoint::adjust_for_endpoint;
use crate::scheduler::ParamJob;

/// 프로세스 안에서 신호 생성과 시뮬레이션을 모두 수행합니다.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalBackend;

impl LocalBackend {
    /// 이미 생성된 신호를 시뮬레이션하고 샤프를 정규화합니다.
    pub fn simulate(
        &self,
        job: &ParamJob,
        bars: &[Bar],
        signals: &[Signal],
        ctx: &ExecutionContext<'_>,
    ) -> Result<BacktestResult, FinderError> {
        let mut result = ctx
            .simulator
            .simulate(bars, signals, ctx.capital, &job.settings)?;
        result.normalize_sharpe();
        Ok(result)
    }

    /// 작업 하나를 모든 타임프레임에서 실행합니다.
    pub fn run_job(&self, job: &ParamJob, ctx: &ExecutionContext<'_>) -> Result<JobRun, FinderError> {
        let mut per_timeframe = Vec::with_capacity(ctx.datasets.len());
        let mut entry_stats = None;
        let mut removed_trades = 0;
        let multi = ctx.datasets.len() > 1;

        for prepared in ctx.datasets {
            let bars = &prepared.dataset.bars;
            let output = job.strategy.run(bars, &job.params)?;
            let signals = match &prepared.gate {
                Some(gate) => gate.apply(output.signals),
                None => output.signals,
            };
            if entry_stats.is_none() {
                entry_stats = output.entry_stats;
            }
            let mut result = self.simulate(job, bars, &signals, ctx)?;
            // 굵은 타임프레임은 공통 끝보다 먼저 끝날 수 있어 각자의 마지막 바로 보정
            if multi {
                if let Some(last) = prepared.dataset.last_bar_time() {
                    let adjustment = adjust_for_endpoint(result, last, ctx.capital.initial_capital);
                    removed_trades += adjustment.removed_trades;
                    result = adjustment.result;
                }
            }
            per_timeframe.push((prepared.dataset.timeframe, result));
        }

        let result = match per_timeframe.len() {
            0 => return Err(FinderError::Data("데이터셋이 없습니다".to_string())),
            1 => per_timeframe.pop().map(|(_, r)| r).unwrap_or_default(),
            _ => {
                let mut merged = ctx
                    .aggregator
                    .aggregate(&per_timeframe, ctx.capital.initial_capital);
                merged.normalize_sharpe();
                merged
            }
        };

        Ok(JobRun {
            job_id: job.id,
            result,
            entry_stats,
            source: ResultSource::Local,
            removed_trades,
        })
    }
}

#[async_trait]
impl ExecutionBackend for LocalBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    async fn run_batch(
        &self,
        jobs: &[ParamJob],
        ctx: &ExecutionContext<'_>,
        pacer: &mut YieldPacer,
        final_batch: bool,
    ) -> Vec<JobOutcome> {
        let mut outcomes = Vec::with_capacity(jobs.len());
        for (i, job) in jobs.iter().enumerate() {
            let outcome = match self.run_job(job, ctx) {
                Ok(run) => JobOutcome::Completed(run),
                Err(error) => {
                    warn!(job_id = job.id, strategy = %job.strategy_key, error = %error, "Job failed, skipping");
                    JobOutcome::Failed {
                        job_id: job.id,
                        error,
                    }
                }
            };
            outcomes.push(outcome);

            let last = i + 1 == jobs.len();
            pacer.maybe_yield(ctx.scheduler, final_batch && last).await;
        }
        outcomes
    }
}
