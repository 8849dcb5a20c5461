//! 백테스트 결과와 거래 목록 집계.
//!
//! [`BacktestResult::from_trades`]는 거래 목록에서 모든 통계를 계산하는 유일한
//! 집계 함수입니다. 시뮬레이터, 엔드포인트 보정, 워크포워드 구간 합산이 모두
//! 이 함수를 사용하므로 같은 거래 목록은 항상 같은 통계를 만듭니다.
//!
//! # 계산 공식
//!
//! - 승률: 수익 거래 / 총 거래 × 100 (손익 0 이하는 손실 거래)
//! - 기대값: 승률 × 평균 수익 − 패률 × 평균 손실
//! - 프로핏 팩터: 총 수익 / 총 손실 (손실 0이고 수익 > 0이면 `+∞`, 그 외 0)
//! - 샤프 비율: 거래별 수익률(%)의 평균 / 표본 표준편차 (연율화하지 않음)

use serde::{Deserialize, Serialize};

use crate::domain::Trade;

/// 단일 백테스트 결과.
///
/// 원격 엔진이 일부 필드를 생략할 수 있어 누락 필드는 기본값으로 채웁니다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestResult {
    /// 완료된 거래 목록
    pub trades: Vec<Trade>,
    /// 순손익
    pub net_profit: f64,
    /// 초기 자본 대비 순손익 (%)
    pub net_profit_percent: f64,
    /// 총 거래 수
    pub total_trades: usize,
    /// 수익 거래 수
    pub winning_trades: usize,
    /// 손실 거래 수
    pub losing_trades: usize,
    /// 승률 (%)
    pub win_rate: f64,
    /// 패률 (%)
    pub loss_rate: f64,
    /// 총 수익 (수익 거래 합계)
    pub total_profit: f64,
    /// 총 손실 (손실 거래 합계, 양수)
    pub total_loss: f64,
    /// 평균 수익
    pub avg_win: f64,
    /// 평균 손실 (양수)
    pub avg_loss: f64,
    /// 거래당 평균 손익
    pub avg_trade: f64,
    /// 기대값
    pub expectancy: f64,
    /// 프로핏 팩터
    #[serde(with = "crate::types::lenient_f64")]
    pub profit_factor: f64,
    /// 최대 낙폭 (금액)
    pub max_drawdown: f64,
    /// 최대 낙폭 (%)
    pub max_drawdown_percent: f64,
    /// 샤프 비율
    #[serde(with = "crate::types::lenient_f64")]
    pub sharpe_ratio: f64,
    /// 바 단위 자산 곡선 (컴팩트 모드에서는 비어 있음)
    pub equity_curve: Vec<f64>,
}

impl BacktestResult {
    /// 거래 목록에서 모든 통계를 계산합니다.
    ///
    /// 낙폭은 거래 순서대로 실현 손익을 누적한 자산 기준입니다. 자산 곡선은
    /// 비워 두며, 바 단위 곡선이 있는 호출자는 [`Self::with_equity_curve`]로
    /// 교체합니다.
    pub fn from_trades(trades: Vec<Trade>, initial_capital: f64) -> Self {
        let total_trades = trades.len();
        let mut winning_trades = 0usize;
        let mut total_profit = 0.0;
        let mut total_loss = 0.0;

        for trade in &trades {
            if trade.is_winner() {
                winning_trades += 1;
                total_profit += trade.pnl;
            } else {
                total_loss += -trade.pnl;
            }
        }
        let losing_trades = total_trades - winning_trades;

        let ratio = |count: usize| {
            if total_trades > 0 {
                count as f64 / total_trades as f64 * 100.0
            } else {
                0.0
            }
        };
        let win_rate = ratio(winning_trades);
        let loss_rate = ratio(losing_trades);

        let avg_win = if winning_trades > 0 {
            total_profit / winning_trades as f64
        } else {
            0.0
        };
        let avg_loss = if losing_trades > 0 {
            total_loss / losing_trades as f64
        } else {
            0.0
        };

        let net_profit = total_profit - total_loss;
        let net_profit_percent = if initial_capital > 0.0 {
            net_profit / initial_capital * 100.0
        } else {
            0.0
        };
        let avg_trade = if total_trades > 0 {
            net_profit / total_trades as f64
        } else {
            0.0
        };
        let expectancy = (win_rate / 100.0) * avg_win - (loss_rate / 100.0) * avg_loss;

        let returns: Vec<f64> = trades.iter().map(|t| t.pnl_percent).collect();
        let (max_drawdown, max_drawdown_percent) =
            realized_drawdown(trades.iter().map(|t| t.pnl), initial_capital);

        Self {
            net_profit,
            net_profit_percent,
            total_trades,
            winning_trades,
            losing_trades,
            win_rate,
            loss_rate,
            total_profit,
            total_loss,
            avg_win,
            avg_loss,
            avg_trade,
            expectancy,
            profit_factor: profit_factor(total_profit, total_loss),
            max_drawdown,
            max_drawdown_percent,
            sharpe_ratio: sharpe_from_returns(&returns),
            equity_curve: Vec::new(),
            trades,
        }
    }

    /// 바 단위 자산 곡선을 설정하고 낙폭을 곡선 기준으로 다시 계산합니다.
    pub fn with_equity_curve(mut self, equity_curve: Vec<f64>) -> Self {
        if !equity_curve.is_empty() {
            let (dd, dd_pct) = curve_drawdown(&equity_curve);
            self.max_drawdown = dd;
            self.max_drawdown_percent = dd_pct;
        }
        self.equity_curve = equity_curve;
        self
    }

    /// 샤프 비율을 거래 수익률(또는 자산 곡선 수익률)에서 다시 계산합니다.
    ///
    /// 출처가 다른 결과(로컬 컴팩트, 원격 엔진)의 샤프 계산 방식을 통일합니다.
    pub fn normalize_sharpe(&mut self) {
        self.sharpe_ratio = if self.trades.len() >= 2 {
            let returns: Vec<f64> = self.trades.iter().map(|t| t.pnl_percent).collect();
            sharpe_from_returns(&returns)
        } else if self.equity_curve.len() >= 3 {
            let returns: Vec<f64> = self
                .equity_curve
                .windows(2)
                .filter(|w| w[0] > 0.0)
                .map(|w| (w[1] / w[0] - 1.0) * 100.0)
                .collect();
            sharpe_from_returns(&returns)
        } else if self.trades.is_empty() && self.total_trades > 0 {
            // 거래 목록 없이 통계만 받은 결과
            self.sharpe_ratio
        } else {
            0.0
        };
    }

    /// 수익 여부.
    pub fn is_profitable(&self) -> bool {
        self.net_profit > 0.0
    }
}

/// 프로핏 팩터. 손실이 없으면 수익 여부에 따라 `+∞` 또는 0.
pub fn profit_factor(total_profit: f64, total_loss: f64) -> f64 {
    if total_loss > 0.0 {
        total_profit / total_loss
    } else if total_profit > 0.0 {
        f64::INFINITY
    } else {
        0.0
    }
}

/// 수익률 목록의 샤프 비율 (평균 / 표본 표준편차).
///
/// 표본이 2개 미만이거나 분산이 0이면 0을 반환합니다.
pub fn sharpe_from_returns(returns: &[f64]) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let mean = mean(returns);
    let std = sample_std_dev(returns);
    if std > 0.0 && std.is_finite() {
        mean / std
    } else {
        0.0
    }
}

/// 산술 평균. 빈 목록은 0.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// 표본 표준편차 (n − 1). 표본이 2개 미만이면 0.
pub fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

/// 중앙값. 빈 목록은 0.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// 실현 손익을 순서대로 누적한 자산의 최대 낙폭 (금액, %).
pub fn realized_drawdown(pnls: impl IntoIterator<Item = f64>, initial_capital: f64) -> (f64, f64) {
    let mut equity = initial_capital;
    let mut peak = initial_capital;
    let mut max_dd = 0.0f64;
    let mut max_dd_pct = 0.0f64;

    for pnl in pnls {
        equity += pnl;
        peak = peak.max(equity);
        let dd = peak - equity;
        max_dd = max_dd.max(dd);
        if peak > 0.0 {
            max_dd_pct = max_dd_pct.max(dd / peak * 100.0);
        }
    }
    (max_dd, max_dd_pct)
}

/// 자산 곡선의 최대 낙폭 (금액, %).
pub fn curve_drawdown(curve: &[f64]) -> (f64, f64) {
    let Some(&first) = curve.first() else {
        return (0.0, 0.0);
    };
    let mut peak = first;
    let mut max_dd = 0.0f64;
    let mut max_dd_pct = 0.0f64;

    for &equity in curve {
        peak = peak.max(equity);
        let dd = peak - equity;
        max_dd = max_dd.max(dd);
        if peak > 0.0 {
            max_dd_pct = max_dd_pct.max(dd / peak * 100.0);
        }
    }
    (max_dd, max_dd_pct)
}
