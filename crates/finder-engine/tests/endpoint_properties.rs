//! 엔드포인트 보정 성질 테스트

use chrono::{DateTime, Duration, TimeZone, Utc};
use finder_core::{BacktestResult, ExitReason, Side, Trade};
use finder_engine::adjust_for_endpoint;
use proptest::prelude::*;

const CAPITAL: f64 = 10_000.0;

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

/// (청산 시각 오프셋, 손익) 목록으로 거래를 만듭니다.
fn trades(specs: &[(i64, f64)]) -> Vec<Trade> {
    specs
        .iter()
        .enumerate()
        .map(|(i, &(exit_hour, pnl))| Trade {
            side: Side::Long,
            entry_index: i,
            exit_index: exit_hour as usize,
            entry_time: start() + Duration::hours(exit_hour - 1),
            exit_time: start() + Duration::hours(exit_hour),
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
    fn matches_manual_recompute_over_kept_trades(
        specs in prop::collection::vec((1i64..=50, -200.0f64..200.0), 0..40)
    ) {
        let last_bar = start() + Duration::hours(50);
        let result = BacktestResult::from_trades(trades(&specs), CAPITAL);
        let adjustment = adjust_for_endpoint(result, last_bar, CAPITAL);

        let kept: Vec<(i64, f64)> = specs.iter().copied().filter(|(h, _)| *h < 50).collect();
        let expected = BacktestResult::from_trades(trades(&kept), CAPITAL);

        prop_assert_eq!(adjustment.removed_trades, specs.len() - kept.len());
        prop_assert_eq!(adjustment.adjusted, kept.len() < specs.len());
        prop_assert_eq!(adjustment.result.total_trades, expected.total_trades);
        prop_assert!((adjustment.result.net_profit - expected.net_profit).abs() < 1e-9);
        prop_assert!((adjustment.result.expectancy - expected.expectancy).abs() < 1e-9);
        prop_assert_eq!(adjustment.result.win_rate.to_bits(), expected.win_rate.to_bits());
        prop_assert_eq!(
            adjustment.result.profit_factor.to_bits(),
            expected.profit_factor.to_bits()
        );
    }

    #[test]
    fn reapplying_is_a_no_op(
        specs in prop::collection::vec((1i64..=50, -200.0f64..200.0), 0..40)
    ) {
        let last_bar = start() + Duration::hours(50);
        let first = adjust_for_endpoint(
            BacktestResult::from_trades(trades(&specs), CAPITAL),
            last_bar,
            CAPITAL,
        );
        let second = adjust_for_endpoint(first.result.clone(), last_bar, CAPITAL);

        prop_assert!(!second.adjusted);
        prop_assert_eq!(second.removed_trades, 0);
        prop_assert_eq!(second.result, first.result);
    }
}
