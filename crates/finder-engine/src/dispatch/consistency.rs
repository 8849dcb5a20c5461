//! 원격 결과 일관성 검사.
//!
//! 원격 엔진 결과가 내부적으로 모순되면 받아들이지 않고 로컬로 다시
//! 계산합니다.

use finder_core::BacktestResult;
use thiserror::Error;

/// 허용 가능한 샤프 비율 절댓값 상한.
pub const MAX_ABS_SHARPE: f64 = 8.0;

/// 일관성 위반 사유.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Inconsistency {
    #[error("거래 수 불일치: total={total}, wins={wins}, losses={losses}")]
    CountMismatch {
        total: usize,
        wins: usize,
        losses: usize,
    },

    #[error("거래 목록 불일치: total={total}, listed={listed}")]
    TradeList { total: usize, listed: usize },

    #[error("승률 불일치: reported={reported:.4}, expected={expected:.4}")]
    WinRate { reported: f64, expected: f64 },

    #[error("평균 손익 불일치: reported={reported:.4}, expected={expected:.4}")]
    AvgTrade { reported: f64, expected: f64 },

    #[error("샤프 비율 범위 초과: {0}")]
    Sharpe(f64),
}

/// 결과가 일관적이면 `Ok(())`.
pub fn check_consistency(result: &BacktestResult) -> Result<(), Inconsistency> {
    let total = result.total_trades;
    if total != result.winning_trades + result.losing_trades {
        return Err(Inconsistency::CountMismatch {
            total,
            wins: result.winning_trades,
            losses: result.losing_trades,
        });
    }

    // 거래 목록 없이 통계만 오면 종료 시점 보정을 할 수 없다
    if result.trades.len() != total {
        return Err(Inconsistency::TradeList {
            total,
            listed: result.trades.len(),
        });
    }

    if total > 0 {
        let expected = result.winning_trades as f64 / total as f64 * 100.0;
        if (expected - result.win_rate).abs() > 1.0 {
            return Err(Inconsistency::WinRate {
                reported: result.win_rate,
                expected,
            });
        }

        let expected = result.net_profit / total as f64;
        let tolerance = (expected.abs() * 0.15).max(0.01);
        if (expected - result.avg_trade).abs() > tolerance {
            return Err(Inconsistency::AvgTrade {
                reported: result.avg_trade,
                expected,
            });
        }
    }

    if !result.sharpe_ratio.is_finite() || result.sharpe_ratio.abs() > MAX_ABS_SHARPE {
        return Err(Inconsistency::Sharpe(result.sharpe_ratio));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use finder_core::{ExitReason, Side, Trade};

    fn trade(index: usize, pnl: f64) -> Trade {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Trade {
            side: Side::Long,
            entry_index: index,
            exit_index: index + 1,
            entry_time: start + Duration::hours(index as i64),
            exit_time: start + Duration::hours(index as i64 + 1),
            entry_price: 100.0,
            exit_price: 100.0 + pnl,
            size: 1.0,
            pnl,
            pnl_percent: pnl,
            fees: 0.0,
            exit_reason: ExitReason::Signal,
        }
    }

    fn consistent() -> BacktestResult {
        let trades = (0..10)
            .map(|i| trade(i * 2, if i < 6 { 20.0 } else { -5.0 }))
            .collect();
        BacktestResult {
            trades,
            total_trades: 10,
            winning_trades: 6,
            losing_trades: 4,
            win_rate: 60.0,
            net_profit: 100.0,
            avg_trade: 10.0,
            sharpe_ratio: 1.2,
            ..Default::default()
        }
    }

    #[test]
    fn test_consistent_result_passes() {
        assert_eq!(check_consistency(&consistent()), Ok(()));
        assert_eq!(check_consistency(&BacktestResult::default()), Ok(()));
    }

    #[test]
    fn test_count_mismatch_rejected() {
        let result = BacktestResult {
            losing_trades: 3,
            ..consistent()
        };
        assert!(matches!(
            check_consistency(&result),
            Err(Inconsistency::CountMismatch { total: 10, wins: 6, losses: 3 })
        ));
    }

    #[test]
    fn test_stats_without_trade_list_rejected() {
        let result = BacktestResult {
            trades: Vec::new(),
            ..consistent()
        };
        assert_eq!(
            check_consistency(&result),
            Err(Inconsistency::TradeList { total: 10, listed: 0 })
        );

        let mut partial = consistent();
        partial.trades.truncate(9);
        assert!(matches!(
            check_consistency(&partial),
            Err(Inconsistency::TradeList { total: 10, listed: 9 })
        ));
    }

    #[test]
    fn test_win_rate_tolerance() {
        let within = BacktestResult {
            win_rate: 60.9,
            ..consistent()
        };
        assert!(check_consistency(&within).is_ok());
        let outside = BacktestResult {
            win_rate: 58.5,
            ..consistent()
        };
        assert!(matches!(check_consistency(&outside), Err(Inconsistency::WinRate { .. })));
    }

    #[test]
    fn test_avg_trade_tolerance() {
        // 허용 오차 max(0.01, 10 × 15%) = 1.5
        let within = BacktestResult {
            avg_trade: 11.4,
            ..consistent()
        };
        assert!(check_consistency(&within).is_ok());
        let outside = BacktestResult {
            avg_trade: 11.6,
            ..consistent()
        };
        assert!(matches!(check_consistency(&outside), Err(Inconsistency::AvgTrade { .. })));

        // 순손익 0이면 최소 허용 오차 0.01
        let zero = BacktestResult {
            net_profit: 0.0,
            avg_trade: 0.02,
            ..consistent()
        };
        assert!(check_consistency(&zero).is_err());
    }

    #[test]
    fn test_sharpe_bounds() {
        for sharpe in [f64::NAN, f64::INFINITY, 8.5, -9.0] {
            let result = BacktestResult {
                sharpe_ratio: sharpe,
                ..consistent()
            };
            assert!(matches!(check_consistency(&result), Err(Inconsistency::Sharpe(_))));
        }
    }
}
