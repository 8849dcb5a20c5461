//! 다중 타임프레임 정렬과 결과 집계.
//!
//! 바 시각은 종료 시각입니다. 여러 타임프레임을 함께 실행할 때는 가장 이른
//! 마지막 종료 시각에 맞춰 모든 데이터셋을 잘라, 어떤 타임프레임도 다른
//! 타임프레임이 아직 보지 못한 구간을 사용하지 않게 합니다.

use chrono::{DateTime, Utc};
use finder_core::{BacktestResult, Timeframe, TimeframeDataset};

/// 공통 종료 시각으로 자른 데이터셋 묶음.
#[derive(Debug, Clone)]
pub struct AlignedDatasets {
    pub datasets: Vec<TimeframeDataset>,
    /// 공통 마지막 바 시각
    pub common_end: DateTime<Utc>,
}

impl AlignedDatasets {
    /// 가장 짧은 데이터셋의 바 개수.
    pub fn min_len(&self) -> usize {
        self.datasets.iter().map(TimeframeDataset::len).min().unwrap_or(0)
    }

    /// 가장 긴 데이터셋의 바 개수.
    pub fn max_len(&self) -> usize {
        self.datasets.iter().map(TimeframeDataset::len).max().unwrap_or(0)
    }

    pub fn timeframes(&self) -> Vec<Timeframe> {
        self.datasets.iter().map(|d| d.timeframe).collect()
    }
}

/// 데이터셋을 공통 마지막 바 시각으로 자릅니다.
///
/// 데이터셋이 없거나 하나라도 비어 있으면 `None`.
pub fn align_datasets(datasets: &[TimeframeDataset]) -> Option<AlignedDatasets> {
    let common_end = datasets
        .iter()
        .map(TimeframeDataset::last_bar_time)
        .collect::<Option<Vec<_>>>()?
        .into_iter()
        .min()?;

    Some(AlignedDatasets {
        datasets: datasets.iter().map(|d| d.truncated_at(common_end)).collect(),
        common_end,
    })
}

/// 타임프레임별 결과를 하나의 후보 결과로 합칩니다.
pub trait TimeframeAggregator: Send + Sync {
    fn aggregate(&self, results: &[(Timeframe, BacktestResult)], initial_capital: f64) -> BacktestResult;
}

/// 모든 타임프레임의 거래를 청산 시각 순서로 합쳐 다시 집계합니다.
#[derive(Debug, Clone, Copy, Default)]
pub struct MergedTradesAggregator;

impl TimeframeAggregator for MergedTradesAggregator {
    fn aggregate(&self, results: &[(Timeframe, BacktestResult)], initial_capital: f64) -> BacktestResult {
        let mut trades: Vec<_> = results
            .iter()
            .flat_map(|(_, r)| r.trades.iter().cloned())
            .collect();
        trades.sort_by_key(|t| t.exit_time);
        BacktestResult::from_trades(trades, initial_capital)
    }
}
