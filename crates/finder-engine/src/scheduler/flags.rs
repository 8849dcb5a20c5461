//! 실행 단위 데이터셋 크기/무게 정책.
//!
//! 실행 시작 시 한 번 계산되고 실행 동안 바뀌지 않습니다.

use std::time::Duration;

use finder_core::{EngineConfig, RealismSettings};
use serde::Serialize;

/// 무거운 설정 여부.
///
/// 확인 전략, 다중 타임프레임, 로컬 고정 현실성 설정 중 하나라도 있으면
/// 작업당 비용이 커지므로 배치와 양보 예산을 줄입니다.
pub fn is_heavy_config(confirmations: usize, timeframes: usize, realism: &RealismSettings) -> bool {
    confirmations > 0 || timeframes > 1 || realism.requires_local()
}

/// 데이터셋 크기 정책.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinderDatasetFlags {
    /// 기준 바 개수 (가장 긴 데이터셋)
    pub bar_count: usize,
    pub is_medium_dataset: bool,
    pub is_large_dataset: bool,
    pub is_very_large_dataset: bool,
    /// 무거운 설정 여부
    pub heavy_config: bool,
    /// 컴팩트 백테스트 임계값 (바)
    pub compact_backtest_threshold: usize,
    /// 컴팩트 백테스트 사용 여부
    pub should_use_compact_backtest: bool,
    /// 배치 크기
    pub batch_size: usize,
    /// 양보 예산
    #[serde(skip)]
    pub yield_budget: Duration,
}

impl FinderDatasetFlags {
    /// 바 개수와 설정 무게로 정책을 계산합니다.
    pub fn compute(bar_count: usize, heavy_config: bool, config: &EngineConfig) -> Self {
        let is_medium_dataset = bar_count > config.medium_dataset_bars;
        let is_large_dataset = bar_count > config.large_dataset_bars;
        let is_very_large_dataset = bar_count > config.very_large_dataset_bars;

        let compact_backtest_threshold = if heavy_config {
            config.heavy_compact_backtest_threshold
        } else {
            config.compact_backtest_threshold
        };

        let base_batch = if is_very_large_dataset {
            config.batch_size_very_large
        } else if is_large_dataset {
            config.batch_size_large
        } else if is_medium_dataset {
            config.batch_size_medium
        } else {
            config.batch_size_small
        };
        let batch_size = if heavy_config {
            (base_batch / 2).max(2)
        } else {
            base_batch.max(1)
        };

        let yield_budget = Duration::from_millis(if heavy_config {
            config.heavy_yield_budget_ms
        } else {
            config.yield_budget_ms
        });

        Self {
            bar_count,
            is_medium_dataset,
            is_large_dataset,
            is_very_large_dataset,
            heavy_config,
            compact_backtest_threshold,
            should_use_compact_backtest: bar_count >= compact_backtest_threshold,
            batch_size,
            yield_budget,
        }
    }
}
