//! 원격 실행 백엔드.
//!
//! 신호는 항상 로컬에서 생성하고, 원격 엔진에는 신호 목록만 보내
//! 시뮬레이션을 맡깁니다. 응답에 없는 작업, 일관성 검사를 통과하지 못한
//! 결과, 네트워크 실패는 모두 내부 [`LocalBackend`]로 다시 계산합니다.

use std::sync::Arc;

use async_trait::async_trait;
use finder_core::FinderError;
use finder_remote::{BatchItem, BatchResponse, RemoteEngine, RemoteResult};
use finder_strategy::EntryStats;
use tracing::{debug, error, warn};

use crate::dispatch::backend::{
    BackendKind, ExecutionBackend, ExecutionContext, JobOutcome, JobRun, ResultSource,
};
use crate::dispatch::consistency::check_consistency;
use crate::dispatch::local::LocalBackend;
use crate::dispatch::pacing::YieldPacer;
use crate::scheduler::ParamJob;

/// 원격 엔진 백엔드.
pub struct RemoteBackend {
    local: LocalBackend,
    engine: Arc<dyn RemoteEngine>,
    cache_id: Option<String>,
}

/// 신호 생성이 끝난 작업.
struct PreparedJob<'j> {
    slot: usize,
    job: &'j ParamJob,
    entry_stats: Option<EntryStats>,
}

impl RemoteBackend {
    /// `cache_id`가 있으면 캐시 배치, 없으면 직접 배치를 사용합니다.
    pub fn new(engine: Arc<dyn RemoteEngine>, cache_id: Option<String>) -> Self {
        Self {
            local: LocalBackend,
            engine,
            cache_id,
        }
    }

    pub fn cache_id(&self) -> Option<&str> {
        self.cache_id.as_deref()
    }

    async fn send(&self, items: &[BatchItem], ctx: &ExecutionContext<'_>) -> RemoteResult<BatchResponse> {
        match &self.cache_id {
            Some(cache_id) => {
                self.engine
                    .run_cached_batch_backtest(cache_id, items, ctx.capital)
                    .await
            }
            None => {
                let bars = ctx
                    .datasets
                    .first()
                    .map(|d| &d.dataset.bars[..])
                    .unwrap_or(&[]);
                self.engine.run_batch_backtest(bars, items, ctx.capital).await
            }
        }
    }

    /// 로컬에서 생성한 신호로 다시 계산합니다.
    fn fallback(
        &self,
        prepared: PreparedJob<'_>,
        item: &BatchItem,
        ctx: &ExecutionContext<'_>,
    ) -> JobOutcome {
        let bars = ctx
            .datasets
            .first()
            .map(|d| &d.dataset.bars[..])
            .unwrap_or(&[]);
        match self.local.simulate(prepared.job, bars, &item.signals, ctx) {
            Ok(result) => JobOutcome::Completed(JobRun {
                job_id: prepared.job.id,
                result,
                entry_stats: prepared.entry_stats,
                source: ResultSource::LocalFallback,
                removed_trades: 0,
            }),
            Err(error) => JobOutcome::Failed {
                job_id: prepared.job.id,
                error,
            },
        }
    }
}

#[async_trait]
impl ExecutionBackend for RemoteBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Remote
    }

    async fn run_batch(
        &self,
        jobs: &[ParamJob],
        ctx: &ExecutionContext<'_>,
        pacer: &mut YieldPacer,
        final_batch: bool,
    ) -> Vec<JobOutcome> {
        if ctx.datasets.len() != 1 {
            debug!(datasets = ctx.datasets.len(), "Remote backend needs a single dataset, running locally");
            return self.local.run_batch(jobs, ctx, pacer, final_batch).await;
        }
        let prepared_dataset = &ctx.datasets[0];
        let bars = &prepared_dataset.dataset.bars;

        let mut slots: Vec<Option<JobOutcome>> = Vec::with_capacity(jobs.len());
        let mut prepared = Vec::with_capacity(jobs.len());
        let mut items = Vec::with_capacity(jobs.len());

        for (slot, job) in jobs.iter().enumerate() {
            slots.push(None);
            match job.strategy.run(bars, &job.params) {
                Ok(output) => {
                    let signals = match &prepared_dataset.gate {
                        Some(gate) => gate.apply(output.signals),
                        None => output.signals,
                    };
                    items.push(BatchItem {
                        id: job.id,
                        signals,
                        settings: (*job.settings).clone(),
                    });
                    prepared.push(PreparedJob {
                        slot,
                        job,
                        entry_stats: output.entry_stats,
                    });
                }
                Err(e) => {
                    let error = FinderError::from(e);
                    warn!(job_id = job.id, strategy = %job.strategy_key, error = %error, "Signal generation failed, skipping");
                    slots[slot] = Some(JobOutcome::Failed {
                        job_id: job.id,
                        error,
                    });
                }
            }
        }
        pacer.maybe_yield(ctx.scheduler, final_batch).await;

        if !items.is_empty() {
            match self.send(&items, ctx).await {
                Ok(response) => {
                    for (entry, item) in prepared.into_iter().zip(items.iter()) {
                        let slot = entry.slot;
                        let outcome = match response.result_for(item.id) {
                            Some(remote) => match check_consistency(remote) {
                                Ok(()) => {
                                    let mut result = remote.clone();
                                    result.normalize_sharpe();
                                    JobOutcome::Completed(JobRun {
                                        job_id: item.id,
                                        result,
                                        entry_stats: entry.entry_stats,
                                        source: ResultSource::Remote,
                                        removed_trades: 0,
                                    })
                                }
                                Err(reason) => {
                                    warn!(job_id = item.id, reason = %reason, "Remote result inconsistent, recomputing locally");
                                    self.fallback(entry, item, ctx)
                                }
                            },
                            None => {
                                warn!(job_id = item.id, "Remote result missing, recomputing locally");
                                self.fallback(entry, item, ctx)
                            }
                        };
                        slots[slot] = Some(outcome);
                    }
                }
                Err(e) => {
                    error!(error = %e, jobs = items.len(), "Remote batch failed, falling back to local");
                    for (entry, item) in prepared.into_iter().zip(items.iter()) {
                        let slot = entry.slot;
                        slots[slot] = Some(self.fallback(entry, item, ctx));
                    }
                }
            }
        }

        slots.into_iter().flatten().collect()
    }
}
