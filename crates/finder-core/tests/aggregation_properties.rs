//! 거래 목록 집계의 성질 테스트
//!
//! 임의의 손익 목록에 대해 집계 통계가 서로 모순되지 않는지 확인합니다.

use chrono::{Duration, TimeZone, Utc};
use finder_core::{BacktestResult, ExitReason, Side, Trade};
use proptest::prelude::*;

fn trades_from_pnls(pnls: &[f64]) -> Vec<Trade> {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    pnls.iter()
        .enumerate()
        .map(|(i, &pnl)| Trade {
            side: Side::Long,
            entry_index: i * 2,
            exit_index: i * 2 + 1,
            entry_time: start + Duration::hours(i as i64 * 2),
            exit_time: start + Duration::hours(i as i64 * 2 + 1),
            entry_price: 100.0,
            exit_price: 100.0 + pnl,
            size: 1.0,
            pnl,
            pnl_percent: pnl,
            fees: 0.0,
            exit_reason: ExitReason::Signal,
        })
        .collect()
}

proptest! {
    #[test]
    fn counts_and_sums_are_consistent(pnls in prop::collection::vec(-500.0f64..500.0, 0..60)) {
        let result = BacktestResult::from_trades(trades_from_pnls(&pnls), 10_000.0);

        prop_assert_eq!(result.total_trades, pnls.len());
        prop_assert_eq!(result.total_trades, result.winning_trades + result.losing_trades);

        let sum: f64 = pnls.iter().sum();
        prop_assert!((result.net_profit - sum).abs() < 1e-6);

        if result.total_trades > 0 {
            let per_trade = result.net_profit / result.total_trades as f64;
            prop_assert!((per_trade - result.avg_trade).abs() < 1e-9);
            prop_assert!((result.win_rate + result.loss_rate - 100.0).abs() < 1e-9);
            // 기대값은 거래당 평균 손익과 같다
            prop_assert!((result.expectancy - result.avg_trade).abs() < 1e-6);
        }
        prop_assert!(result.profit_factor >= 0.0);
        prop_assert!(result.max_drawdown_percent >= 0.0);
    }
}
