//! 역할이 태그된 전략 핸들.
//!
//! 전략 역할은 실행마다 다시 확인하지 않고, 실행 계획을 만들 때 한 번만
//! 판별해 핸들의 variant로 고정합니다.

use std::sync::Arc;

use finder_core::{Bar, ParamSet, Signal};

use crate::traits::{EntryStats, Strategy, StrategyError, StrategyRole};

/// 한 번의 전략 실행 결과.
#[derive(Debug, Clone, Default)]
pub struct StrategyOutput {
    /// 생성된 신호
    pub signals: Vec<Signal>,
    /// 진입 전략의 진입 품질 통계
    pub entry_stats: Option<EntryStats>,
}

/// 역할별 전략 핸들.
#[derive(Clone)]
pub enum StrategyHandle {
    /// 진입 전략: 실행 후 `evaluate`를 호출
    Entry(Arc<dyn Strategy>),
    /// 일반 신호 전략
    Signal(Arc<dyn Strategy>),
}

impl StrategyHandle {
    /// 전략의 역할을 읽어 핸들을 만듭니다.
    pub fn classify(strategy: Arc<dyn Strategy>) -> Self {
        match strategy.role() {
            StrategyRole::Entry => StrategyHandle::Entry(strategy),
            StrategyRole::Signal => StrategyHandle::Signal(strategy),
        }
    }

    /// 내부 전략 참조.
    pub fn strategy(&self) -> &Arc<dyn Strategy> {
        match self {
            StrategyHandle::Entry(s) | StrategyHandle::Signal(s) => s,
        }
    }

    /// 전략 키.
    pub fn key(&self) -> &str {
        self.strategy().key()
    }

    /// 전략 이름.
    pub fn name(&self) -> &str {
        self.strategy().name()
    }

    /// 기본 파라미터.
    pub fn default_params(&self) -> ParamSet {
        self.strategy().default_params()
    }

    /// 진입 전략 여부.
    pub fn is_entry(&self) -> bool {
        matches!(self, StrategyHandle::Entry(_))
    }

    /// 신호만 생성합니다.
    pub fn signals(&self, bars: &[Bar], params: &ParamSet) -> Result<Vec<Signal>, StrategyError> {
        self.strategy().execute(bars, params)
    }

    /// 신호를 생성하고, 진입 전략이면 진입 통계를 함께 계산합니다.
    pub fn run(&self, bars: &[Bar], params: &ParamSet) -> Result<StrategyOutput, StrategyError> {
        match self {
            StrategyHandle::Signal(strategy) => Ok(StrategyOutput {
                signals: strategy.execute(bars, params)?,
                entry_stats: None,
            }),
            StrategyHandle::Entry(strategy) => {
                let signals = strategy.execute(bars, params)?;
                let entry_stats = strategy.evaluate(bars, params, &signals);
                Ok(StrategyOutput {
                    signals,
                    entry_stats,
                })
            }
        }
    }
}

impl std::fmt::Debug for StrategyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let role = if self.is_entry() { "Entry" } else { "Signal" };
        f.debug_struct("StrategyHandle")
            .field("role", &role)
            .field("key", &self.key())
            .finish()
    }
}
