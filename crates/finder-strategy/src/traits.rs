//! Strategy trait 정의.

use finder_core::{Bar, ParamSet, Signal};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 전략 실행 에러.
#[derive(Debug, Error)]
pub enum StrategyError {
    /// 잘못된 파라미터
    #[error("Invalid parameter: {0}")]
    InvalidParams(String),

    /// 데이터 부족
    #[error("Insufficient data: required={required}, available={available}")]
    InsufficientData { required: usize, available: usize },

    /// 실행 실패
    #[error("Execution failed: {0}")]
    Execution(String),
}

/// 전략 역할.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyRole {
    /// 진입/청산 신호를 모두 생성하는 일반 전략
    #[default]
    Signal,
    /// 진입 시점 품질을 별도로 평가하는 진입 전략
    Entry,
}

/// 진입 전략의 진입 품질 통계.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryStats {
    /// 평가한 진입 수
    pub entries: usize,
    /// 진입 후 평가 구간 평균 수익률 (%)
    pub avg_forward_return_pct: f64,
    /// 평가 구간 수익률이 양수인 비율 (0..=1)
    pub hit_rate: f64,
}

/// 신호 생성 전략.
///
/// 전략은 순수 함수처럼 동작해야 합니다: 같은 바와 파라미터에는 항상 같은
/// 신호를 반환합니다. 파인더는 같은 전략을 수천 개의 파라미터 세트로 호출합니다.
pub trait Strategy: Send + Sync {
    /// 전략 키 (영문, snake_case). 셀 시드 해시의 입력입니다.
    fn key(&self) -> &str;

    /// 표시용 이름.
    fn name(&self) -> &str;

    /// 기본 파라미터.
    fn default_params(&self) -> ParamSet;

    /// 전략 역할. 기본은 일반 신호 전략.
    fn role(&self) -> StrategyRole {
        StrategyRole::Signal
    }

    /// 바 목록과 파라미터로 신호를 생성합니다.
    fn execute(&self, bars: &[Bar], params: &ParamSet) -> Result<Vec<Signal>, StrategyError>;

    /// 생성된 신호의 진입 품질을 평가합니다 (진입 전략 전용).
    fn evaluate(&self, _bars: &[Bar], _params: &ParamSet, _signals: &[Signal]) -> Option<EntryStats> {
        None
    }
}

/// 파라미터 값을 읽고 양의 정수 기간으로 변환합니다.
pub fn period_param(params: &ParamSet, key: &str, default: usize) -> Result<usize, StrategyError> {
    match params.get(key) {
        None => Ok(default),
        Some(v) if v.is_finite() && *v >= 1.0 => Ok(v.round() as usize),
        Some(v) => Err(StrategyError::InvalidParams(format!("{}={}", key, v))),
    }
}

impl From<StrategyError> for finder_core::FinderError {
    fn from(err: StrategyError) -> Self {
        finder_core::FinderError::Strategy(err.to_string())
    }
}
