//! 홀드아웃/워크포워드 구간 계획과 구간 실행.
//!
//! 구간의 신호는 구간 끝까지의 데이터로 생성하고, 구간 시작 이전 신호는
//! 버립니다. 앞부분은 지표 워밍업으로만 쓰입니다.

use finder_core::{
    median, sample_std_dev, BacktestResult, BacktestSettings, Bar, CapitalSettings, FinderError,
    FoldLayout, HoldoutThresholds, ParamSet,
};
use finder_strategy::StrategyHandle;
use rand::rngs::StdRng;
use rand::Rng;
use serde::Serialize;

use crate::backtest::Simulator;

/// 검증 구간 `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Window {
    pub start: usize,
    pub end: usize,
}

impl Window {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// 데이터 끝쪽 홀드아웃 구간. 워밍업을 남길 수 없으면 `None`.
pub fn holdout_window(len: usize, thresholds: &HoldoutThresholds) -> Option<Window> {
    let by_fraction = (len as f64 * thresholds.holdout_fraction).ceil() as usize;
    let hold = by_fraction.max(thresholds.min_holdout_bars);
    if hold >= len {
        return None;
    }
    Some(Window {
        start: len - hold,
        end: len,
    })
}

/// 워크포워드 검증 구간을 계획합니다.
///
/// 워밍업 이후 구간을 `folds`개로 나누고, 내부 경계를 구간 길이의
/// `boundary_jitter` 비율 안에서 흔듭니다. 각 구간은 `min_fold_bars` 이상이며,
/// 남은 데이터가 부족하면 빈 목록을 반환합니다.
pub fn plan_folds(len: usize, folds: usize, layout: &FoldLayout, rng: &mut StdRng) -> Vec<Window> {
    let warmup = (len as f64 * layout.warmup_fraction).floor() as usize;
    let region = len.saturating_sub(warmup);
    let min_fold = layout.min_fold_bars.max(1);
    if folds == 0 || region < folds * min_fold {
        return Vec::new();
    }

    let segment = region as f64 / folds as f64;
    let mut boundaries = Vec::with_capacity(folds + 1);
    boundaries.push(warmup);
    for k in 1..folds {
        let nominal = warmup as f64 + segment * k as f64;
        let jitter = rng.gen_range(-1.0..=1.0) * layout.boundary_jitter * segment;
        let lo = boundaries[k - 1] + min_fold;
        let hi = len - (folds - k) * min_fold;
        let boundary = (nominal + jitter).round().max(0.0) as usize;
        boundaries.push(boundary.clamp(lo, hi));
    }
    boundaries.push(len);

    boundaries
        .windows(2)
        .map(|w| Window {
            start: w[0],
            end: w[1],
        })
        .collect()
}

/// 구간 하나를 실행합니다.
pub fn run_window(
    strategy: &StrategyHandle,
    bars: &[Bar],
    params: &ParamSet,
    window: Window,
    simulator: &dyn Simulator,
    capital: &CapitalSettings,
    settings: &BacktestSettings,
) -> Result<BacktestResult, FinderError> {
    let signals = strategy.signals(&bars[..window.end], params)?;
    let shifted: Vec<_> = signals
        .into_iter()
        .filter(|s| s.bar_index < window.end)
        .filter_map(|s| s.shifted_back(window.start))
        .collect();

    let mut result = simulator.simulate(&bars[window.start..window.end], &shifted, capital, settings)?;
    result.normalize_sharpe();
    Ok(result)
}

/// 워크포워드 구간별 결과 요약.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WalkForwardMetrics {
    /// 구간별 기대값
    pub fold_expectancies: Vec<f64>,
    /// 구간 기대값 중앙값 (OOS)
    pub median_expectancy: f64,
    /// 기대값과 순손익이 모두 양수인 구간 비율
    pub profitable_fold_ratio: f64,
    /// 낙폭 한도를 넘은 구간 비율
    pub breach_rate: f64,
    /// 구간 기대값 표준편차 / (|중앙값| + 1)
    pub stability_penalty: f64,
    /// 모든 구간 거래를 합친 OOS 결과
    #[serde(skip)]
    pub combined: BacktestResult,
}

impl WalkForwardMetrics {
    /// 구간 결과를 요약합니다. `folds`는 비어 있지 않아야 의미가 있습니다.
    pub fn from_folds(folds: Vec<BacktestResult>, initial_capital: f64, drawdown_cap_pct: f64) -> Self {
        let count = folds.len().max(1) as f64;
        let fold_expectancies: Vec<f64> = folds.iter().map(|f| f.expectancy).collect();
        let median_expectancy = median(&fold_expectancies);
        let profitable = folds
            .iter()
            .filter(|f| f.expectancy > 0.0 && f.net_profit > 0.0)
            .count();
        let breaches = folds
            .iter()
            .filter(|f| f.max_drawdown_percent > drawdown_cap_pct)
            .count();

        let trades = folds.into_iter().flat_map(|f| f.trades).collect();
        Self {
            stability_penalty: sample_std_dev(&fold_expectancies) / (median_expectancy.abs() + 1.0),
            fold_expectancies,
            median_expectancy,
            profitable_fold_ratio: profitable as f64 / count,
            breach_rate: breaches as f64 / count,
            combined: BacktestResult::from_trades(trades, initial_capital),
        }
    }
}
