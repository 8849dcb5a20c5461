//! 3단계 검증 퍼널.
//!
//! - Stage A: 데이터 후반부 홀드아웃에서 최소 거래 수, 기대값, 낙폭 검사
//! - Stage B: 3구간 워크포워드
//! - Stage C: 6구간 워크포워드 (최종 생존자)
//!
//! 탈락 사유는 `stage_a_min_trades` 같은 코드 문자열로 남습니다.

use std::sync::Arc;

use finder_core::{
    BacktestResult, BacktestSettings, Bar, CapitalSettings, HoldoutThresholds, ParamSet,
    RobustConfig, WalkForwardThresholds,
};
use finder_strategy::StrategyHandle;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

use super::walk_forward::{holdout_window, plan_folds, run_window, WalkForwardMetrics, Window};
use crate::backtest::Simulator;

/// 워크포워드 단계.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkForwardStage {
    B,
    C,
}

impl WalkForwardStage {
    fn code(&self, reason: &str) -> String {
        match self {
            Self::B => format!("stage_b_{}", reason),
            Self::C => format!("stage_c_{}", reason),
        }
    }

    fn salt(&self) -> u64 {
        match self {
            Self::B => 0x5747_0b0b,
            Self::C => 0x5747_0c0c,
        }
    }
}

/// Stage A 생존자.
#[derive(Debug, Clone)]
pub struct RobustCellCandidate {
    pub params: ParamSet,
    pub settings: Arc<BacktestSettings>,
    /// 홀드아웃 점수
    pub holdout_score: f64,
    pub holdout: BacktestResult,
}

/// 워크포워드 단계 생존자.
#[derive(Debug, Clone)]
pub struct RobustWfCandidate {
    pub candidate: RobustCellCandidate,
    pub metrics: WalkForwardMetrics,
}

/// 홀드아웃 점수: 기대값 + min(상한, PF) − 낙폭% × 가중치.
pub fn holdout_score(result: &BacktestResult, thresholds: &HoldoutThresholds) -> f64 {
    result.expectancy + result.profit_factor.min(thresholds.profit_factor_cap)
        - result.max_drawdown_percent * thresholds.drawdown_weight
}

/// 한 셀(전략 × 타임프레임)의 퍼널 실행 문맥.
pub struct Funnel<'a> {
    pub strategy: &'a StrategyHandle,
    pub bars: &'a [Bar],
    pub simulator: &'a dyn Simulator,
    pub capital: &'a CapitalSettings,
    pub config: &'a RobustConfig,
    pub holdout: Option<Window>,
    pub stage_b_folds: Vec<Window>,
    pub stage_c_folds: Vec<Window>,
}

impl<'a> Funnel<'a> {
    /// 셀 시드로 홀드아웃과 구간을 계획합니다.
    pub fn plan(
        strategy: &'a StrategyHandle,
        bars: &'a [Bar],
        simulator: &'a dyn Simulator,
        capital: &'a CapitalSettings,
        config: &'a RobustConfig,
        cell_seed: u32,
    ) -> Self {
        let folds_for = |stage: WalkForwardStage, thresholds: &WalkForwardThresholds| {
            let mut rng = StdRng::seed_from_u64(u64::from(cell_seed) ^ stage.salt());
            plan_folds(bars.len(), thresholds.folds, &config.folds, &mut rng)
        };

        Self {
            strategy,
            bars,
            simulator,
            capital,
            config,
            holdout: holdout_window(bars.len(), &config.holdout),
            stage_b_folds: folds_for(WalkForwardStage::B, &config.stage_b),
            stage_c_folds: folds_for(WalkForwardStage::C, &config.stage_c),
        }
    }

    /// Stage A: 홀드아웃 검사.
    pub fn stage_a(
        &self,
        params: ParamSet,
        settings: Arc<BacktestSettings>,
    ) -> Result<RobustCellCandidate, String> {
        let thresholds = &self.config.holdout;
        let window = self
            .holdout
            .ok_or_else(|| "stage_a_insufficient_data".to_string())?;

        let result = run_window(
            self.strategy,
            self.bars,
            &params,
            window,
            self.simulator,
            self.capital,
            &settings,
        )
        .map_err(|e| {
            debug!(error = %e, "Holdout run failed");
            "stage_a_error".to_string()
        })?;

        if result.total_trades < thresholds.min_trades {
            return Err("stage_a_min_trades".to_string());
        }
        if result.expectancy <= 0.0 {
            return Err("stage_a_expectancy".to_string());
        }
        if result.max_drawdown_percent > thresholds.max_drawdown_pct {
            return Err("stage_a_drawdown".to_string());
        }

        Ok(RobustCellCandidate {
            holdout_score: holdout_score(&result, thresholds),
            params,
            settings,
            holdout: result,
        })
    }

    /// Stage B 또는 C: 워크포워드 검사.
    pub fn walk_forward(
        &self,
        stage: WalkForwardStage,
        candidate: RobustCellCandidate,
    ) -> Result<RobustWfCandidate, String> {
        let (folds, thresholds) = match stage {
            WalkForwardStage::B => (&self.stage_b_folds, &self.config.stage_b),
            WalkForwardStage::C => (&self.stage_c_folds, &self.config.stage_c),
        };
        if folds.is_empty() {
            return Err(stage.code("insufficient_data"));
        }

        let mut results = Vec::with_capacity(folds.len());
        for window in folds {
            let result = run_window(
                self.strategy,
                self.bars,
                &candidate.params,
                *window,
                self.simulator,
                self.capital,
                &candidate.settings,
            )
            .map_err(|e| {
                debug!(error = %e, "Walk-forward fold failed");
                stage.code("error")
            })?;
            results.push(result);
        }

        let metrics = WalkForwardMetrics::from_folds(
            results,
            self.capital.initial_capital,
            thresholds.fold_drawdown_cap_pct,
        );
        check_walk_forward(&metrics, thresholds).map_err(|reason| stage.code(reason))?;

        Ok(RobustWfCandidate { candidate, metrics })
    }
}

fn check_walk_forward(
    metrics: &WalkForwardMetrics,
    thresholds: &WalkForwardThresholds,
) -> Result<(), &'static str> {
    let combined = &metrics.combined;
    if combined.total_trades < thresholds.min_trades {
        return Err("min_trades");
    }
    if metrics.median_expectancy <= 0.0 {
        return Err("expectancy");
    }
    if metrics.profitable_fold_ratio < thresholds.min_profitable_fold_ratio {
        return Err("fold_ratio");
    }
    if metrics.breach_rate > thresholds.max_breach_rate {
        return Err("breach_rate");
    }
    if combined.max_drawdown_percent > thresholds.max_combined_drawdown_pct {
        return Err("drawdown");
    }
    if metrics.stability_penalty > thresholds.max_stability_penalty {
        return Err("stability");
    }
    Ok(())
}
