//! 실행 백엔드 계약.

use async_trait::async_trait;
use finder_core::{BacktestResult, CapitalSettings, FinderError, TimeframeDataset};
use finder_strategy::{EntryStats, PreparedGate};
use serde::Serialize;

use crate::backtest::Simulator;
use crate::callbacks::Scheduler;
use crate::dispatch::pacing::YieldPacer;
use crate::scheduler::ParamJob;
use crate::timeframe::TimeframeAggregator;

/// 백엔드 종류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Local,
    Remote,
}

/// 결과 출처.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultSource {
    /// 로컬 시뮬레이션
    Local,
    /// 원격 엔진 (일관성 검사 통과)
    Remote,
    /// 원격 실패/불일치 후 로컬 재계산
    LocalFallback,
}

/// 실행 전체에서 한 번 준비되는 데이터셋과 확인 게이트.
#[derive(Debug, Clone)]
pub struct PreparedDataset {
    pub dataset: TimeframeDataset,
    pub gate: Option<PreparedGate>,
}

/// 배치 실행에 필요한 공유 참조.
pub struct ExecutionContext<'a> {
    /// 정렬된 데이터셋 (타임프레임별)
    pub datasets: &'a [PreparedDataset],
    pub capital: &'a CapitalSettings,
    pub simulator: &'a dyn Simulator,
    pub aggregator: &'a dyn TimeframeAggregator,
    pub scheduler: &'a dyn Scheduler,
}

/// 완료된 작업.
#[derive(Debug, Clone)]
pub struct JobRun {
    pub job_id: u64,
    /// 정규화된 결과 (타임프레임이 여럿이면 집계 결과)
    pub result: BacktestResult,
    pub entry_stats: Option<EntryStats>,
    pub source: ResultSource,
    /// 집계 전에 타임프레임별 마지막 바에서 제거한 거래 수
    pub removed_trades: usize,
}

/// 작업 하나의 처리 결과.
#[derive(Debug)]
pub enum JobOutcome {
    Completed(JobRun),
    /// 신호 생성 또는 시뮬레이션 실패. 작업만 건너뜁니다.
    Failed { job_id: u64, error: FinderError },
}

/// 실행 백엔드.
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// 배치를 실행합니다. 결과는 작업 순서와 같습니다.
    ///
    /// 개별 작업 실패는 [`JobOutcome::Failed`]로 돌려주며 배치를 중단하지
    /// 않습니다. `final_batch`면 배치 끝에서 양보를 강제합니다.
    async fn run_batch(
        &self,
        jobs: &[ParamJob],
        ctx: &ExecutionContext<'_>,
        pacer: &mut YieldPacer,
        final_batch: bool,
    ) -> Vec<JobOutcome>;
}
