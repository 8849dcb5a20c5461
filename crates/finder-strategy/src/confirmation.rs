//! 확인 전략 게이팅.
//!
//! 확인 전략이 설정되면, 주 전략의 진입 신호는 모든 확인 전략이 같은 방향의
//! 진입을 `lookback` 바 이내(같은 바 포함)에 낸 경우에만 유지됩니다.
//! 청산 신호는 항상 통과합니다.

use finder_core::{Bar, ParamSet, Side, Signal};
use tracing::debug;

use crate::generator::{GeneratorOptions, ParamSetGenerator};
use crate::handle::StrategyHandle;
use crate::traits::StrategyError;

/// 확인 전략 하나와 그 실행 파라미터.
#[derive(Debug, Clone)]
pub struct ConfirmationFilter {
    pub strategy: StrategyHandle,
    pub params: ParamSet,
}

impl ConfirmationFilter {
    pub fn new(strategy: StrategyHandle, params: ParamSet) -> Self {
        Self { strategy, params }
    }

    /// 생성기의 첫 번째 파라미터 세트를 사용합니다. 생성 결과가 없으면 기본값.
    pub fn from_generator(
        strategy: StrategyHandle,
        generator: &dyn ParamSetGenerator,
        options: &GeneratorOptions,
    ) -> Self {
        let defaults = strategy.default_params();
        let params = generator
            .generate(&defaults, options)
            .into_iter()
            .next()
            .unwrap_or(defaults);
        Self { strategy, params }
    }
}

/// 확인 전략 게이트.
#[derive(Debug, Clone, Default)]
pub struct ConfirmationGate {
    filters: Vec<ConfirmationFilter>,
    lookback: usize,
}

impl ConfirmationGate {
    pub fn new(filters: Vec<ConfirmationFilter>, lookback: usize) -> Self {
        Self { filters, lookback }
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn filters(&self) -> &[ConfirmationFilter] {
        &self.filters
    }

    /// 결과에 기록할 확인 전략 파라미터 (전략 키 → 파라미터).
    pub fn params_used(&self) -> Vec<(String, ParamSet)> {
        self.filters
            .iter()
            .map(|f| (f.strategy.key().to_string(), f.params.clone()))
            .collect()
    }

    /// 확인 전략의 진입 위치를 계산합니다. 데이터마다 한 번만 호출하면 됩니다.
    pub fn prepare(&self, bars: &[Bar]) -> Result<PreparedGate, StrategyError> {
        let mut marks = Vec::with_capacity(self.filters.len());
        for filter in &self.filters {
            let signals = filter.strategy.signals(bars, &filter.params)?;
            let mut long = vec![false; bars.len()];
            let mut short = vec![false; bars.len()];
            for signal in signals.iter().filter(|s| s.is_entry()) {
                if signal.bar_index < bars.len() {
                    match signal.side {
                        Side::Long => long[signal.bar_index] = true,
                        Side::Short => short[signal.bar_index] = true,
                    }
                }
            }
            marks.push(EntryMarks {
                long: last_seen(&long),
                short: last_seen(&short),
            });
        }
        Ok(PreparedGate {
            marks,
            lookback: self.lookback,
        })
    }

    /// 신호 목록을 게이팅합니다.
    pub fn apply(&self, bars: &[Bar], signals: Vec<Signal>) -> Result<Vec<Signal>, StrategyError> {
        if self.is_empty() {
            return Ok(signals);
        }
        Ok(self.prepare(bars)?.apply(signals))
    }
}

/// 바마다 해당 바 이하에서 마지막으로 진입이 나온 인덱스.
fn last_seen(flags: &[bool]) -> Vec<Option<usize>> {
    let mut last = None;
    flags
        .iter()
        .enumerate()
        .map(|(i, &flag)| {
            if flag {
                last = Some(i);
            }
            last
        })
        .collect()
}

#[derive(Debug, Clone)]
struct EntryMarks {
    long: Vec<Option<usize>>,
    short: Vec<Option<usize>>,
}

/// 확인 전략 실행이 끝난 게이트.
#[derive(Debug, Clone)]
pub struct PreparedGate {
    marks: Vec<EntryMarks>,
    lookback: usize,
}

impl PreparedGate {
    fn confirms(&self, signal: &Signal) -> bool {
        self.marks.iter().all(|marks| {
            let seen = match signal.side {
                Side::Long => &marks.long,
                Side::Short => &marks.short,
            };
            seen.get(signal.bar_index)
                .copied()
                .flatten()
                .is_some_and(|at| signal.bar_index - at <= self.lookback)
        })
    }

    pub fn apply(&self, signals: Vec<Signal>) -> Vec<Signal> {
        let before = signals.len();
        let kept: Vec<Signal> = signals
            .into_iter()
            .filter(|s| !s.is_entry() || self.confirms(s))
            .collect();
        debug!(before, after = kept.len(), "Confirmation gate applied");
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::Strategy;
    use chrono::{Duration, TimeZone, Utc};
    use std::sync::Arc;

    /// 고정된 신호를 반환하는 테스트 전략.
    struct FixedSignals(Vec<Signal>);

    impl Strategy for FixedSignals {
        fn key(&self) -> &str {
            "fixed"
        }
        fn name(&self) -> &str {
            "Fixed"
        }
        fn default_params(&self) -> ParamSet {
            ParamSet::new()
        }
        fn execute(&self, _bars: &[Bar], _params: &ParamSet) -> Result<Vec<Signal>, StrategyError> {
            Ok(self.0.clone())
        }
    }

    fn bars(n: usize) -> Vec<Bar> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..n)
            .map(|i| Bar::new(start + Duration::hours(i as i64), 100.0, 101.0, 99.0, 100.0, 1.0))
            .collect()
    }

    fn gate(confirm: Vec<Signal>, lookback: usize) -> ConfirmationGate {
        let handle = StrategyHandle::classify(Arc::new(FixedSignals(confirm)));
        ConfirmationGate::new(vec![ConfirmationFilter::new(handle, ParamSet::new())], lookback)
    }

    #[test]
    fn test_entries_need_recent_same_side_confirmation() {
        let gate = gate(vec![Signal::entry(3, Side::Long), Signal::entry(8, Side::Short)], 2);
        let signals = vec![
            Signal::entry(4, Side::Long),  // 1바 전 확인 → 유지
            Signal::entry(7, Side::Long),  // 4바 전 확인 → 제거
            Signal::entry(9, Side::Short), // 숏 확인 → 유지
            Signal::entry(2, Side::Long),  // 확인 이전 → 제거
            Signal::exit(5, Side::Long),   // 청산은 통과
        ];

        let kept = gate.apply(&bars(12), signals).unwrap();
        assert_eq!(
            kept,
            vec![
                Signal::entry(4, Side::Long),
                Signal::entry(9, Side::Short),
                Signal::exit(5, Side::Long),
            ]
        );
    }

    #[test]
    fn test_same_bar_confirms() {
        let gate = gate(vec![Signal::entry(5, Side::Long)], 0);
        let kept = gate.apply(&bars(10), vec![Signal::entry(5, Side::Long)]).unwrap();
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn test_empty_gate_passes_everything() {
        let gate = ConfirmationGate::default();
        let signals = vec![Signal::entry(1, Side::Long)];
        assert_eq!(gate.apply(&bars(3), signals.clone()).unwrap(), signals);
    }

    #[test]
    fn test_from_generator_uses_first_set() {
        let handle = StrategyHandle::classify(Arc::new(FixedSignals(vec![])));
        let generator = |_: &ParamSet, _: &GeneratorOptions| {
            let mut first = ParamSet::new();
            first.insert("period".to_string(), 14.0);
            vec![first, ParamSet::new()]
        };
        let filter =
            ConfirmationFilter::from_generator(handle, &generator, &GeneratorOptions::default());
        assert_eq!(filter.params.get("period"), Some(&14.0));
    }
}
