//! 실행 결과와 보고서 타입.

use std::fmt;

use finder_core::{BacktestResult, ParamSet, Timeframe};
use finder_strategy::EntryStats;
use serde::Serialize;
use uuid::Uuid;

use crate::dispatch::BackendKind;
use crate::ranker::Rankable;
use crate::robust::{RobustDiagnostics, RobustReport};

/// 랭킹된 후보 하나.
#[derive(Debug, Clone, Serialize)]
pub struct FinderResult {
    pub strategy_key: String,
    pub strategy_name: String,
    pub timeframes: Vec<Timeframe>,
    pub params: ParamSet,
    /// 엔드포인트 보정된 결과
    pub result: BacktestResult,
    /// 엔드포인트 보정으로 거래가 제거되었는지 여부
    pub endpoint_adjusted: bool,
    /// 제거된 거래 수
    pub removed_trades: usize,
    /// 이번 실행에 사용된 확인 전략 파라미터 (전략 키, 파라미터)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmation_params: Option<Vec<(String, ParamSet)>>,
    /// 진입 전략의 진입 품질 통계
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_stats: Option<EntryStats>,
    /// 로버스트 모드 진단
    #[serde(skip_serializing_if = "Option::is_none")]
    pub robust: Option<RobustDiagnostics>,
}

impl Rankable for FinderResult {
    fn backtest(&self) -> &BacktestResult {
        &self.result
    }
}

/// 실행 종료 상태.
///
/// 조합이 없거나 데이터가 부족한 경우는 에러가 아니라 정상적인 종료
/// 상태입니다.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    NoValidCombinations,
    NoDatasets,
    InsufficientBars { available: usize, required: usize },
    ConfirmationFailed { message: String },
    RobustPreconditionFailed { message: String },
}

impl RunStatus {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunStatus::Completed)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::NoValidCombinations => write!(f, "no valid combinations"),
            RunStatus::NoDatasets => write!(f, "no datasets for the selected timeframes"),
            RunStatus::InsufficientBars {
                available,
                required,
            } => write!(
                f,
                "not enough aligned bars ({} available, {} required)",
                available, required
            ),
            RunStatus::ConfirmationFailed { message } => {
                write!(f, "confirmation strategy failed: {}", message)
            }
            RunStatus::RobustPreconditionFailed { message } => {
                write!(f, "robust mode unavailable: {}", message)
            }
        }
    }
}

/// 실행 통계.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunStats {
    /// 전체 작업 수
    pub total_runs: usize,
    /// 결과를 얻은 작업 수
    pub completed: usize,
    /// 실패로 건너뛴 작업 수
    pub skipped: usize,
    /// 최소 거래 수 미달로 제외된 후보 수
    pub filtered: usize,
    /// 엔드포인트 보정된 후보 수
    pub adjusted: usize,
    /// 원격 결과를 그대로 받은 작업 수
    pub remote_accepted: usize,
    /// 원격 실패/불일치로 로컬 재계산한 작업 수
    pub remote_fallbacks: usize,
    /// 처리한 배치 수
    pub batches: usize,
    /// 사용한 백엔드
    pub backend: Option<BackendKind>,
    /// 백엔드 선택 사유
    pub backend_reason: String,
}

/// `run` 호출 하나의 결과.
#[derive(Debug, Clone, Serialize)]
pub struct FinderRun {
    pub run_id: Uuid,
    /// 상위 N 후보 (최종 정렬 순서)
    pub results: Vec<FinderResult>,
    pub stats: RunStats,
    pub status: RunStatus,
    /// 로버스트 모드 감사 보고서
    #[serde(skip_serializing_if = "Option::is_none")]
    pub robust: Option<RobustReport>,
}

impl FinderRun {
    /// 결과 없이 종료된 실행.
    pub fn terminated(run_id: Uuid, status: RunStatus, stats: RunStats) -> Self {
        Self {
            run_id,
            results: Vec::new(),
            stats,
            status,
            robust: None,
        }
    }
}
