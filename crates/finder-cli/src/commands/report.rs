//! 실행 결과 출력과 저장.

use std::path::Path;

use anyhow::{Context, Result};
use finder_core::ParamSet;
use finder_engine::{CellDecision, FinderRun, RobustReport};

/// 파라미터 세트를 `key=value` 목록으로 표시합니다.
pub fn format_params(params: &ParamSet) -> String {
    params
        .iter()
        .map(|(k, v)| {
            if v.fract() == 0.0 {
                format!("{}={}", k, *v as i64)
            } else {
                format!("{}={:.4}", k, v)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// 상위 후보 표.
pub fn format_results(run: &FinderRun) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "{:<4} {:<18} {:<10} {:>7} {:>8} {:>12} {:>8} {:>8}  {}\n",
        "#", "Strategy", "TF", "Trades", "Win%", "Net Profit", "PF", "MDD%", "Params"
    ));
    output.push_str(&"-".repeat(100));
    output.push('\n');

    for (rank, candidate) in run.results.iter().enumerate() {
        let tfs = candidate
            .timeframes
            .iter()
            .map(|tf| tf.to_string())
            .collect::<Vec<_>>()
            .join("+");
        let r = &candidate.result;
        let pf = if r.profit_factor.is_infinite() {
            "inf".to_string()
        } else {
            format!("{:.2}", r.profit_factor)
        };
        let marker = if candidate.endpoint_adjusted { "*" } else { "" };
        output.push_str(&format!(
            "{:<4} {:<18} {:<10} {:>7} {:>8.2} {:>12.2} {:>8} {:>8.2}  {}{}\n",
            rank + 1,
            candidate.strategy_key,
            tfs,
            r.total_trades,
            r.win_rate,
            r.net_profit,
            pf,
            r.max_drawdown_percent,
            format_params(&candidate.params),
            marker
        ));
    }

    let stats = &run.stats;
    output.push_str(&format!(
        "\nTotal: {} runs, {} completed, {} skipped, {} filtered, {} endpoint-adjusted\n",
        stats.total_runs, stats.completed, stats.skipped, stats.filtered, stats.adjusted
    ));
    if let Some(backend) = stats.backend {
        output.push_str(&format!(
            "Backend: {:?} ({}), remote accepted {}, fallbacks {}\n",
            backend, stats.backend_reason, stats.remote_accepted, stats.remote_fallbacks
        ));
    }
    output
}

/// 로버스트 감사 표.
pub fn format_robust(report: &RobustReport) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "Robust audit (seed {}, budget {})\n",
        report.seed, report.sample_budget
    ));
    output.push_str(&format!(
        "{:<18} {:<5} {:>7} {:>5} {:>5} {:>5} {:>7} {:>7}  {}\n",
        "Strategy", "TF", "Sampled", "A", "B", "C", "Score", "Result", "Reason"
    ));
    output.push_str(&"-".repeat(90));
    output.push('\n');

    for cell in &report.cells {
        let decision = match cell.decision {
            CellDecision::Pass => "PASS",
            CellDecision::Fail => "FAIL",
        };
        output.push_str(&format!(
            "{:<18} {:<5} {:>7} {:>5} {:>5} {:>5} {:>7.1} {:>7}  {}\n",
            cell.strategy_key,
            cell.timeframe.to_string(),
            cell.sampled,
            cell.stage_a_survivors,
            cell.stage_b_survivors,
            cell.stage_c_survivors,
            cell.robust_score,
            decision,
            cell.fail_reason.as_deref().unwrap_or("")
        ));
    }

    output.push('\n');
    for cluster in &report.clusters {
        output.push_str(&format!(
            "{:<18} passes {}/{} ({:.0}%), mean score {:.1}, best {}\n",
            cluster.strategy_key,
            cluster.passes,
            cluster.cells,
            cluster.pass_rate * 100.0,
            cluster.mean_score,
            cluster.best_timeframe.as_deref().unwrap_or("-")
        ));
    }

    let rejections = report.rejection_totals();
    if !rejections.is_empty() {
        output.push_str("\nRejections:\n");
        for (reason, count) in rejections {
            output.push_str(&format!("  {:<32} {}\n", reason, count));
        }
    }
    output
}

/// 실행 결과를 JSON으로 저장합니다.
pub fn save_run(run: &FinderRun, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
    }
    let json = serde_json::to_string_pretty(run).context("Failed to serialize finder run")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write report: {}", path.display()))?;
    Ok(())
}
