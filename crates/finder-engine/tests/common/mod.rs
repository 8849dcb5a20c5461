//! 엔진 통합 테스트 공용 도구.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use finder_core::{Bar, ParamSet, Side, Signal, Timeframe, TimeframeDataset};
use finder_engine::StrategySelection;
use finder_strategy::{GeneratorOptions, Strategy, StrategyError, StrategyHandle};

/// `period`의 배수 바마다 롱 진입, `hold` 바 뒤 청산.
pub struct PeriodicStrategy {
    pub key: &'static str,
}

impl Strategy for PeriodicStrategy {
    fn key(&self) -> &str {
        self.key
    }

    fn name(&self) -> &str {
        "Periodic"
    }

    fn default_params(&self) -> ParamSet {
        ParamSet::from([("period".to_string(), 6.0), ("hold".to_string(), 2.0)])
    }

    fn execute(&self, bars: &[Bar], params: &ParamSet) -> Result<Vec<Signal>, StrategyError> {
        let period = params.get("period").copied().unwrap_or(6.0) as usize;
        let hold = params.get("hold").copied().unwrap_or(2.0) as usize;
        if period == 0 || hold == 0 || hold >= period {
            return Err(StrategyError::InvalidParams(format!(
                "period {} / hold {}",
                period, hold
            )));
        }

        let mut signals = Vec::new();
        let mut i = period;
        while i < bars.len() {
            signals.push(Signal::entry(i, Side::Long));
            if i + hold < bars.len() {
                signals.push(Signal::exit(i + hold, Side::Long));
            }
            i += period;
        }
        Ok(signals)
    }
}

/// 진입 신호를 전혀 내지 않는 확인용 전략.
pub struct SilentStrategy;

impl Strategy for SilentStrategy {
    fn key(&self) -> &str {
        "silent"
    }

    fn name(&self) -> &str {
        "Silent"
    }

    fn default_params(&self) -> ParamSet {
        ParamSet::new()
    }

    fn execute(&self, _bars: &[Bar], _params: &ParamSet) -> Result<Vec<Signal>, StrategyError> {
        Ok(Vec::new())
    }
}

pub fn handle(key: &'static str) -> StrategyHandle {
    StrategyHandle::classify(Arc::new(PeriodicStrategy { key }))
}

/// `period`가 `first..first + count`인 파라미터 세트를 만드는 전략 선택.
pub fn periodic(key: &'static str, first: usize, count: usize) -> StrategySelection {
    let generator = move |defaults: &ParamSet, _: &GeneratorOptions| -> Vec<ParamSet> {
        (first..first + count)
            .map(|period| {
                let mut params = defaults.clone();
                params.insert("period".to_string(), period as f64);
                params
            })
            .collect()
    };
    StrategySelection::new(handle(key), Arc::new(generator))
}

/// 시가=종가, 고가/저가 ±0.5인 바.
pub fn bars_from(closes: impl IntoIterator<Item = f64>, step_hours: i64) -> Vec<Bar> {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    closes
        .into_iter()
        .enumerate()
        .map(|(i, c)| {
            Bar::new(
                start + Duration::hours(i as i64 * step_hours),
                c,
                c + 0.5,
                c - 0.5,
                c,
                1_000.0,
            )
        })
        .collect()
}

/// 바마다 1%씩 오르는 시계열.
pub fn rising(count: usize) -> Vec<f64> {
    (0..count).map(|i| 100.0 * 1.01f64.powi(i as i32)).collect()
}

/// 바마다 1%씩 내리는 시계열.
pub fn falling(count: usize) -> Vec<f64> {
    (0..count).map(|i| 100.0 * 0.99f64.powi(i as i32)).collect()
}

pub fn dataset(timeframe: Timeframe, closes: Vec<f64>) -> TimeframeDataset {
    let step = match timeframe {
        Timeframe::H4 => 4,
        Timeframe::D1 => 24,
        _ => 1,
    };
    TimeframeDataset::new(timeframe, bars_from(closes, step))
}
