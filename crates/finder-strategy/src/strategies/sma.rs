//! 단순 이동평균 크로스오버 전략.
//!
//! # 전략 로직
//! - 골든 크로스 (단기 SMA가 장기 SMA를 상향 돌파): 롱 진입
//! - 데드 크로스 (하향 돌파): 롱 청산, `allow_short`이면 숏 진입

use finder_core::{Bar, ParamSet, Side, Signal};

use super::sma;
use crate::traits::{period_param, Strategy, StrategyError};

/// SMA 크로스오버 전략. 상태가 없으며 파라미터는 모두 `ParamSet`으로 받습니다.
#[derive(Debug, Clone, Copy, Default)]
pub struct SmaCrossStrategy;

const DEFAULT_FAST: usize = 10;
const DEFAULT_SLOW: usize = 30;

impl Strategy for SmaCrossStrategy {
    fn key(&self) -> &str {
        "sma_cross"
    }

    fn name(&self) -> &str {
        "SMA Crossover"
    }

    fn default_params(&self) -> ParamSet {
        let mut params = ParamSet::new();
        params.insert("fast".to_string(), DEFAULT_FAST as f64);
        params.insert("slow".to_string(), DEFAULT_SLOW as f64);
        params.insert("allow_short".to_string(), 0.0);
        params
    }

    fn execute(&self, bars: &[Bar], params: &ParamSet) -> Result<Vec<Signal>, StrategyError> {
        let fast = period_param(params, "fast", DEFAULT_FAST)?;
        let slow = period_param(params, "slow", DEFAULT_SLOW)?;
        if fast >= slow {
            return Err(StrategyError::InvalidParams(format!(
                "fast({}) must be shorter than slow({})",
                fast, slow
            )));
        }
        let allow_short = params.get("allow_short").is_some_and(|v| *v > 0.0);

        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let fast_sma = sma(&closes, fast);
        let slow_sma = sma(&closes, slow);

        let mut signals = Vec::new();
        let mut position: Option<Side> = None;
        for i in 1..closes.len() {
            let (Some(pf), Some(ps), Some(cf), Some(cs)) =
                (fast_sma[i - 1], slow_sma[i - 1], fast_sma[i], slow_sma[i])
            else {
                continue;
            };

            if pf <= ps && cf > cs {
                if position == Some(Side::Short) {
                    signals.push(Signal::exit(i, Side::Short));
                }
                signals.push(Signal::entry(i, Side::Long));
                position = Some(Side::Long);
            } else if pf >= ps && cf < cs {
                if position == Some(Side::Long) {
                    signals.push(Signal::exit(i, Side::Long));
                    position = None;
                }
                if allow_short {
                    signals.push(Signal::entry(i, Side::Short));
                    position = Some(Side::Short);
                }
            }
        }
        Ok(signals)
    }
}
