//! 엔드포인트 보정.
//!
//! 데이터의 마지막 바에서 청산된 거래는 경계에서 강제로 닫힌 미완결 거래라
//! 결과를 부풀리거나 왜곡할 수 있습니다. 청산 시각이 마지막 바보다 앞서지
//! 않는 거래를 모두 제거하고, 남은 거래로 통계를 다시 집계합니다.

use chrono::{DateTime, Utc};
use finder_core::BacktestResult;

/// 보정 결과.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointAdjustment {
    /// 보정된 결과 (제거된 거래가 없으면 원본)
    pub result: BacktestResult,
    /// 거래가 하나라도 제거되었는지 여부
    pub adjusted: bool,
    /// 제거된 거래 수
    pub removed_trades: usize,
}

/// 마지막 바 시각 이후(같은 시각 포함)에 청산된 거래를 제거합니다.
///
/// 통계는 [`BacktestResult::from_trades`]로 남은 거래만 다시 집계하며,
/// 낙폭과 자산 곡선은 원본 값을 유지합니다. 같은 마지막 바 시각으로 다시
/// 적용하면 아무것도 바뀌지 않습니다.
pub fn adjust_for_endpoint(
    result: BacktestResult,
    last_bar_time: DateTime<Utc>,
    initial_capital: f64,
) -> EndpointAdjustment {
    let removed_trades = result
        .trades
        .iter()
        .filter(|t| t.exit_time >= last_bar_time)
        .count();
    if removed_trades == 0 {
        return EndpointAdjustment {
            result,
            adjusted: false,
            removed_trades: 0,
        };
    }

    let BacktestResult {
        trades,
        max_drawdown,
        max_drawdown_percent,
        equity_curve,
        ..
    } = result;
    let kept: Vec<_> = trades
        .into_iter()
        .filter(|t| t.exit_time < last_bar_time)
        .collect();

    let mut adjusted = BacktestResult::from_trades(kept, initial_capital);
    adjusted.max_drawdown = max_drawdown;
    adjusted.max_drawdown_percent = max_drawdown_percent;
    adjusted.equity_curve = equity_curve;

    EndpointAdjustment {
        result: adjusted,
        adjusted: true,
        removed_trades,
    }
}
