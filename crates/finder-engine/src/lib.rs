//! 파인더 실행 엔진.
//!
//! 전략 × 파라미터 조합을 대량으로 백테스트하고, 우연히 좋아 보이는 조합과
//! 통계적으로 신뢰할 수 있는 조합을 구분합니다.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - 작업 스케줄러와 데이터셋 크기 정책 ([`scheduler`])
//! - 로컬/원격 실행 백엔드와 일관성 검사 ([`dispatch`])
//! - 엔드포인트 보정 ([`endpoint`])과 상위 N 랭커 ([`ranker`])
//! - 다중 타임프레임 정렬/집계 ([`timeframe`])
//! - 로버스트 랜덤 워크포워드 검증 ([`robust`])
//! - 단일 진입점 [`FinderRunner::run`]
//!
//! # 예제
//!
//! ```rust,ignore
//! use finder_engine::{FinderInput, FinderRunner, NoopCallbacks};
//!
//! let runner = FinderRunner::new(config);
//! let run = runner.run(input, &NoopCallbacks).await;
//! for candidate in &run.results {
//!     println!("{} {:?} PF={:.2}", candidate.strategy_key, candidate.params, candidate.result.profit_factor);
//! }
//! ```

pub mod backtest;
pub mod callbacks;
pub mod dispatch;
pub mod endpoint;
pub mod ranker;
pub mod result;
pub mod robust;
pub mod runner;
pub mod scheduler;
pub mod seed;
pub mod timeframe;

pub use backtest::{BarSimulator, SimulationError, Simulator};
pub use callbacks::{FinderCallbacks, NoopCallbacks, Progress, Scheduler, TokioScheduler};
pub use dispatch::{
    check_consistency, BackendChoice, BackendKind, ExecutionBackend, Inconsistency, LocalBackend,
    LocalReason, RemoteBackend, RemoteMode, ResultSource,
};
pub use endpoint::{adjust_for_endpoint, EndpointAdjustment};
pub use ranker::{Rankable, ResultRanker, SortDirection, SortKey, SortMetric, SortPriority};
pub use result::{FinderResult, FinderRun, RunStats, RunStatus};
pub use robust::{
    CellDecision, CellReport, ClusterSummary, RobustDiagnostics, RobustOptions, RobustOutcome,
    RobustReport, RobustValidator,
};
pub use runner::{FinderInput, FinderRunner};
pub use scheduler::{FinderDatasetFlags, JobScheduler, ParamJob, StrategyPlan, StrategySelection};
pub use seed::{cell_seed, fnv1a_32};
pub use timeframe::{align_datasets, AlignedDatasets, MergedTradesAggregator, TimeframeAggregator};
