//! 파라미터 세트 생성기.
//!
//! 생성기는 (기본 파라미터, 옵션) → 파라미터 세트 목록의 순수 함수입니다.
//! 클로저도 그대로 생성기로 쓸 수 있습니다.

use std::collections::BTreeMap;

use finder_core::ParamSet;
use serde::{Deserialize, Serialize};

/// 생성기 옵션.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorOptions {
    /// 최대 조합 수 (0이면 무제한)
    #[serde(default)]
    pub max_combinations: usize,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            max_combinations: 10_000,
        }
    }
}

/// 파라미터 세트 생성기.
pub trait ParamSetGenerator: Send + Sync {
    /// 기본 파라미터를 바탕으로 탐색할 파라미터 세트 목록을 만듭니다.
    fn generate(&self, defaults: &ParamSet, options: &GeneratorOptions) -> Vec<ParamSet>;
}

impl<F> ParamSetGenerator for F
where
    F: Fn(&ParamSet, &GeneratorOptions) -> Vec<ParamSet> + Send + Sync,
{
    fn generate(&self, defaults: &ParamSet, options: &GeneratorOptions) -> Vec<ParamSet> {
        self(defaults, options)
    }
}

/// 파라미터 탐색 범위 (양 끝 포함).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamRange {
    pub start: f64,
    pub end: f64,
    pub step: f64,
}

impl ParamRange {
    pub fn new(start: f64, end: f64, step: f64) -> Self {
        Self { start, end, step }
    }

    /// 범위 안의 값 목록. 잘못된 범위는 시작값 하나만 반환합니다.
    pub fn values(&self) -> Vec<f64> {
        if self.step.is_nan() || self.step <= 0.0 || self.end < self.start {
            return vec![self.start];
        }
        let count = ((self.end - self.start) / self.step + 1e-9).floor() as usize + 1;
        (0..count)
            .map(|i| self.start + self.step * i as f64)
            .collect()
    }
}

/// 범위의 데카르트 곱을 만드는 격자 생성기.
///
/// 범위가 지정되지 않은 키는 기본값을 그대로 씁니다. 조합 순서는 키 이름
/// 순서로 고정됩니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GridGenerator {
    #[serde(default)]
    ranges: BTreeMap<String, ParamRange>,
}

impl GridGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 탐색 범위를 추가합니다.
    pub fn with_range(mut self, key: impl Into<String>, range: ParamRange) -> Self {
        self.ranges.insert(key.into(), range);
        self
    }

    /// 범위 맵에서 생성합니다.
    pub fn from_ranges(ranges: BTreeMap<String, ParamRange>) -> Self {
        Self { ranges }
    }
}

impl ParamSetGenerator for GridGenerator {
    fn generate(&self, defaults: &ParamSet, options: &GeneratorOptions) -> Vec<ParamSet> {
        let mut sets = vec![defaults.clone()];
        for (key, range) in &self.ranges {
            let values = range.values();
            let mut next = Vec::with_capacity(sets.len() * values.len());
            for set in &sets {
                for value in &values {
                    let mut expanded = set.clone();
                    expanded.insert(key.clone(), *value);
                    next.push(expanded);
                }
            }
            sets = next;
        }
        if options.max_combinations > 0 {
            sets.truncate(options.max_combinations);
        }
        sets
    }
}
