//! 채널 돌파 진입 전략.
//!
//! 종가가 직전 `lookback` 바의 최고가를 넘으면 롱 진입, 직전 `exit_lookback`
//! 바의 최저가 아래로 내려가면 청산합니다. 진입 전략이므로 각 진입 후
//! `hold` 바 수익률로 진입 품질을 평가합니다.

use finder_core::{Bar, ParamSet, Side, Signal};

use crate::traits::{period_param, EntryStats, Strategy, StrategyError, StrategyRole};

/// 채널 돌파 전략.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChannelBreakoutStrategy;

const DEFAULT_LOOKBACK: usize = 20;
const DEFAULT_EXIT_LOOKBACK: usize = 10;
const DEFAULT_HOLD: usize = 10;

impl Strategy for ChannelBreakoutStrategy {
    fn key(&self) -> &str {
        "channel_breakout"
    }

    fn name(&self) -> &str {
        "Channel Breakout"
    }

    fn default_params(&self) -> ParamSet {
        let mut params = ParamSet::new();
        params.insert("lookback".to_string(), DEFAULT_LOOKBACK as f64);
        params.insert("exit_lookback".to_string(), DEFAULT_EXIT_LOOKBACK as f64);
        params.insert("hold".to_string(), DEFAULT_HOLD as f64);
        params
    }

    fn role(&self) -> StrategyRole {
        StrategyRole::Entry
    }

    fn execute(&self, bars: &[Bar], params: &ParamSet) -> Result<Vec<Signal>, StrategyError> {
        let lookback = period_param(params, "lookback", DEFAULT_LOOKBACK)?;
        let exit_lookback = period_param(params, "exit_lookback", DEFAULT_EXIT_LOOKBACK)?;

        let start = lookback.max(exit_lookback);
        let mut signals = Vec::new();
        let mut in_position = false;
        for i in start..bars.len() {
            let close = bars[i].close;
            if !in_position {
                let upper = bars[i - lookback..i]
                    .iter()
                    .map(|b| b.high)
                    .fold(f64::MIN, f64::max);
                if close > upper {
                    signals.push(Signal::entry(i, Side::Long));
                    in_position = true;
                }
            } else {
                let lower = bars[i - exit_lookback..i]
                    .iter()
                    .map(|b| b.low)
                    .fold(f64::MAX, f64::min);
                if close < lower {
                    signals.push(Signal::exit(i, Side::Long));
                    in_position = false;
                }
            }
        }
        Ok(signals)
    }

    fn evaluate(&self, bars: &[Bar], params: &ParamSet, signals: &[Signal]) -> Option<EntryStats> {
        let hold = period_param(params, "hold", DEFAULT_HOLD).ok()?;
        let returns: Vec<f64> = signals
            .iter()
            .filter(|s| s.is_entry() && s.bar_index + hold < bars.len())
            .filter_map(|s| {
                let entry = bars[s.bar_index].close;
                (entry > 0.0).then(|| {
                    (bars[s.bar_index + hold].close / entry - 1.0) * 100.0 * s.side.sign()
                })
            })
            .collect();
        if returns.is_empty() {
            return None;
        }

        let hits = returns.iter().filter(|r| **r > 0.0).count();
        Some(EntryStats {
            entries: returns.len(),
            avg_forward_return_pct: returns.iter().sum::<f64>() / returns.len() as f64,
            hit_rate: hits as f64 / returns.len() as f64,
        })
    }
}
