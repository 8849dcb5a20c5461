//! 셀 판정과 강건성 점수.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use finder_core::{median, CellThresholds, Timeframe};
use serde::Serialize;

use super::funnel::RobustWfCandidate;

/// 셀 판정.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CellDecision {
    Pass,
    Fail,
}

/// 셀(전략 × 타임프레임) 감사 기록.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellReport {
    pub strategy_key: String,
    pub strategy_name: String,
    pub timeframe: Timeframe,
    pub cell_seed: u32,
    /// 전체 파라미터 세트 수
    pub candidates: usize,
    /// 샘플링된 세트 수
    pub sampled: usize,
    pub stage_a_survivors: usize,
    pub stage_b_survivors: usize,
    pub stage_c_survivors: usize,
    /// Stage C 생존 / 샘플링 (0..=1)
    pub pass_rate: f64,
    /// 상위 생존자 OOS 기대값 중앙값
    pub median_oos_expectancy: f64,
    pub profitable_fold_ratio: f64,
    pub stability_penalty: f64,
    pub breach_rate: f64,
    pub robust_score: f64,
    pub decision: CellDecision,
    pub fail_reason: Option<String>,
    /// 탈락 사유 코드별 건수
    pub rejections: BTreeMap<String, usize>,
}

/// 상위 생존자 요약과 판정.
#[derive(Debug, Clone, PartialEq)]
pub struct CellVerdict {
    pub pass_rate: f64,
    pub median_oos_expectancy: f64,
    pub profitable_fold_ratio: f64,
    pub stability_penalty: f64,
    pub breach_rate: f64,
    pub robust_score: f64,
    pub decision: CellDecision,
    pub fail_reason: Option<String>,
}

/// 생존자 정렬: OOS 기대값 중앙값 ↓, 수익 구간 비율 ↓, 안정성 페널티 ↑,
/// 홀드아웃 점수 ↓.
pub fn rank_survivors(survivors: &mut [RobustWfCandidate]) {
    survivors.sort_by(|a, b| {
        b.metrics
            .median_expectancy
            .total_cmp(&a.metrics.median_expectancy)
            .then_with(|| {
                b.metrics
                    .profitable_fold_ratio
                    .total_cmp(&a.metrics.profitable_fold_ratio)
            })
            .then_with(|| {
                a.metrics
                    .stability_penalty
                    .total_cmp(&b.metrics.stability_penalty)
            })
            .then_with(|| {
                b.candidate
                    .holdout_score
                    .partial_cmp(&a.candidate.holdout_score)
                    .unwrap_or(Ordering::Equal)
            })
    });
}

/// 상위 비율에 해당하는 생존자 수 (최소 1).
pub fn top_count(survivors: usize, fraction: f64) -> usize {
    if survivors == 0 {
        return 0;
    }
    ((survivors as f64 * fraction).ceil() as usize).clamp(1, survivors)
}

fn clamp_score(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 100.0)
}

/// 강건성 점수 (0..=100).
///
/// 0.6 × 통과율 + 0.2 × 수익 구간 비율 + 0.1 × 안정성 점수 + 0.1 × 엣지 점수.
/// 안정성 점수는 페널티가 한도에 가까울수록 0, 엣지 점수는 기대값의 자본 대비
/// 베이시스 포인트입니다.
pub fn robust_score(
    pass_rate: f64,
    profitable_fold_ratio: f64,
    stability_penalty: f64,
    median_expectancy: f64,
    initial_capital: f64,
    thresholds: &CellThresholds,
) -> f64 {
    let stability_score =
        clamp_score(100.0 * (1.0 - stability_penalty / thresholds.max_stability_penalty));
    let edge_score = if initial_capital > 0.0 {
        clamp_score(median_expectancy / initial_capital * 10_000.0)
    } else {
        0.0
    };

    0.6 * clamp_score(pass_rate * 100.0)
        + 0.2 * clamp_score(profitable_fold_ratio * 100.0)
        + 0.1 * stability_score
        + 0.1 * edge_score
}

/// 정렬된 생존자로 셀을 판정합니다.
pub fn decide(
    ranked: &[RobustWfCandidate],
    sampled: usize,
    initial_capital: f64,
    thresholds: &CellThresholds,
) -> CellVerdict {
    let pass_rate = if sampled == 0 {
        0.0
    } else {
        ranked.len() as f64 / sampled as f64
    };

    let top = &ranked[..top_count(ranked.len(), thresholds.top_fraction)];
    let collect = |f: fn(&RobustWfCandidate) -> f64| median(&top.iter().map(f).collect::<Vec<_>>());
    let median_oos_expectancy = collect(|c| c.metrics.median_expectancy);
    let profitable_fold_ratio = collect(|c| c.metrics.profitable_fold_ratio);
    let stability_penalty = collect(|c| c.metrics.stability_penalty);
    let breach_rate = collect(|c| c.metrics.breach_rate);

    let fail_reason = if ranked.len() < thresholds.min_survivors {
        Some(format!(
            "survivors {} < {}",
            ranked.len(),
            thresholds.min_survivors
        ))
    } else if pass_rate < thresholds.min_pass_rate {
        Some(format!(
            "pass rate {:.2}% < {:.2}%",
            pass_rate * 100.0,
            thresholds.min_pass_rate * 100.0
        ))
    } else if breach_rate > thresholds.max_breach_rate {
        Some(format!(
            "breach rate {:.2} > {:.2}",
            breach_rate, thresholds.max_breach_rate
        ))
    } else if stability_penalty > thresholds.max_stability_penalty {
        Some(format!(
            "stability penalty {:.2} > {:.2}",
            stability_penalty, thresholds.max_stability_penalty
        ))
    } else {
        None
    };

    CellVerdict {
        pass_rate,
        median_oos_expectancy,
        profitable_fold_ratio,
        stability_penalty,
        breach_rate,
        // 생존자가 없으면 중앙값을 낼 상위 구간이 없다
        robust_score: if ranked.is_empty() {
            0.0
        } else {
            robust_score(
                pass_rate,
                profitable_fold_ratio,
                stability_penalty,
                median_oos_expectancy,
                initial_capital,
                thresholds,
            )
        },
        decision: if fail_reason.is_none() {
            CellDecision::Pass
        } else {
            CellDecision::Fail
        },
        fail_reason,
    }
}
