//! 실행 디스패처.
//!
//! 실행마다 한 번 정책([`policy`])으로 백엔드를 고르고, 배치를 해당
//! 백엔드([`ExecutionBackend`])로 보냅니다. 원격 백엔드는 내부에 로컬
//! 백엔드를 두고 실패/불일치 시 로컬로 다시 계산합니다.

pub mod backend;
pub mod consistency;
pub mod local;
pub mod pacing;
pub mod policy;
pub mod remote;

pub use backend::{
    BackendKind, ExecutionBackend, ExecutionContext, JobOutcome, JobRun, PreparedDataset,
    ResultSource,
};
pub use consistency::{check_consistency, Inconsistency};
pub use local::LocalBackend;
pub use pacing::{ProgressThrottle, YieldPacer};
pub use policy::{select_backend, BackendChoice, LocalReason, PolicyInput, RemoteMode};
pub use remote::RemoteBackend;
