//! 로버스트 실행 감사 보고서.

use std::collections::BTreeMap;

use serde::Serialize;

use super::cell::{CellDecision, CellReport};

/// PASS 셀에서 나온 결과에 붙는 진단 정보.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RobustDiagnostics {
    pub cell_seed: u32,
    pub robust_score: f64,
    pub pass_rate: f64,
    pub median_oos_expectancy: f64,
    pub profitable_fold_ratio: f64,
    pub stability_penalty: f64,
    pub breach_rate: f64,
    /// 선택된 생존자의 합산 OOS 거래 수
    pub oos_trades: usize,
    /// 선택된 생존자의 합산 OOS 기대값
    pub oos_expectancy: f64,
}

impl RobustDiagnostics {
    pub(crate) fn from_cell(cell: &CellReport, oos_trades: usize, oos_expectancy: f64) -> Self {
        Self {
            cell_seed: cell.cell_seed,
            robust_score: cell.robust_score,
            pass_rate: cell.pass_rate,
            median_oos_expectancy: cell.median_oos_expectancy,
            profitable_fold_ratio: cell.profitable_fold_ratio,
            stability_penalty: cell.stability_penalty,
            breach_rate: cell.breach_rate,
            oos_trades,
            oos_expectancy,
        }
    }
}

/// 전략별 셀 요약.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterSummary {
    pub strategy_key: String,
    pub cells: usize,
    pub passes: usize,
    /// PASS 셀 비율 (0..=1)
    pub pass_rate: f64,
    /// 셀 강건성 점수 평균
    pub mean_score: f64,
    /// 점수가 가장 높은 PASS 셀의 타임프레임
    pub best_timeframe: Option<String>,
}

/// 로버스트 실행 보고서. 통과 여부와 관계없이 모든 셀을 담습니다.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RobustReport {
    pub seed: f64,
    pub sample_budget: usize,
    pub cells: Vec<CellReport>,
    pub clusters: Vec<ClusterSummary>,
}

impl RobustReport {
    pub fn new(seed: f64, sample_budget: usize, cells: Vec<CellReport>) -> Self {
        let clusters = summarize_clusters(&cells);
        Self {
            seed,
            sample_budget,
            cells,
            clusters,
        }
    }

    pub fn passed_cells(&self) -> impl Iterator<Item = &CellReport> {
        self.cells
            .iter()
            .filter(|c| c.decision == CellDecision::Pass)
    }

    /// 전체 셀의 탈락 사유 합계.
    pub fn rejection_totals(&self) -> BTreeMap<String, usize> {
        let mut totals = BTreeMap::new();
        for cell in &self.cells {
            for (reason, count) in &cell.rejections {
                *totals.entry(reason.clone()).or_insert(0) += count;
            }
        }
        totals
    }
}

/// 전략 키별로 셀을 묶습니다. 순서는 셀이 처음 나온 순서입니다.
pub fn summarize_clusters(cells: &[CellReport]) -> Vec<ClusterSummary> {
    let mut order: Vec<&str> = Vec::new();
    for cell in cells {
        if !order.contains(&cell.strategy_key.as_str()) {
            order.push(&cell.strategy_key);
        }
    }

    order
        .into_iter()
        .map(|key| {
            let members: Vec<&CellReport> =
                cells.iter().filter(|c| c.strategy_key == key).collect();
            let passes = members
                .iter()
                .filter(|c| c.decision == CellDecision::Pass)
                .count();
            let mean_score =
                members.iter().map(|c| c.robust_score).sum::<f64>() / members.len() as f64;
            let best_timeframe = members
                .iter()
                .filter(|c| c.decision == CellDecision::Pass)
                .max_by(|a, b| a.robust_score.total_cmp(&b.robust_score))
                .map(|c| c.timeframe.to_string());

            ClusterSummary {
                strategy_key: key.to_string(),
                cells: members.len(),
                passes,
                pass_rate: passes as f64 / members.len() as f64,
                mean_score,
                best_timeframe,
            }
        })
        .collect()
}
