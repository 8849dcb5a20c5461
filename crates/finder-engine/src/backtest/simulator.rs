//! 신호 목록 기반 바 시뮬레이터.
//!
//! 단일 포지션만 보유하며 다음 규칙으로 체결합니다:
//! - 기본 체결가는 신호 바 종가, `next_bar_execution`이면 다음 바 시가
//! - 손절/익절은 진입 다음 바부터 고가/저가로 판정 (둘 다 닿으면 손절 우선)
//! - 반대 방향 진입 신호는 기존 포지션을 청산한 뒤 진입
//! - 수수료는 진입/청산 명목 금액에 각각 부과
//! - 데이터 끝까지 열린 포지션은 마지막 바 종가로 강제 청산
//!
//! 컴팩트 모드는 바 단위 자산 곡선을 만들지 않아 대용량 데이터에서 메모리를
//! 아끼며, 낙폭은 실현 손익 기준으로 계산됩니다.

use finder_core::{
    BacktestResult, BacktestSettings, Bar, CapitalSettings, ExitReason, FinderError, Side, Signal,
    SignalType, SizingMode, Trade,
};
use thiserror::Error;

/// 시뮬레이션 오류
#[derive(Debug, Error)]
pub enum SimulationError {
    /// 설정 오류
    #[error("시뮬레이션 설정 오류: {0}")]
    InvalidSettings(String),

    /// 데이터 범위를 벗어난 신호
    #[error("신호 인덱스 범위 초과: index={index}, bars={bars}")]
    SignalOutOfRange { index: usize, bars: usize },
}

impl From<SimulationError> for FinderError {
    fn from(err: SimulationError) -> Self {
        FinderError::Simulation(err.to_string())
    }
}

/// 단일 백테스트 시뮬레이터 계약.
pub trait Simulator: Send + Sync {
    /// 바와 신호로 백테스트 결과를 계산합니다.
    fn simulate(
        &self,
        bars: &[Bar],
        signals: &[Signal],
        capital: &CapitalSettings,
        settings: &BacktestSettings,
    ) -> Result<BacktestResult, SimulationError>;

    /// 자산 곡선을 생략하는 컴팩트 모드인지 여부.
    fn is_compact(&self) -> bool {
        false
    }
}

/// 참조 바 시뮬레이터.
#[derive(Debug, Clone, Copy, Default)]
pub struct BarSimulator {
    compact: bool,
}

impl BarSimulator {
    /// 자산 곡선을 포함하는 일반 시뮬레이터.
    pub fn full() -> Self {
        Self { compact: false }
    }

    /// 자산 곡선을 생략하는 컴팩트 시뮬레이터.
    pub fn compact() -> Self {
        Self { compact: true }
    }

    /// 모드를 지정해 생성합니다.
    pub fn with_compact(compact: bool) -> Self {
        Self { compact }
    }
}

#[derive(Debug, Clone, Copy)]
struct OpenPosition {
    side: Side,
    entry_index: usize,
    entry_price: f64,
    quantity: f64,
    entry_fee: f64,
}

/// 한 번의 시뮬레이션 상태.
struct Run<'a> {
    bars: &'a [Bar],
    capital: &'a CapitalSettings,
    settings: &'a BacktestSettings,
    fee_rate: f64,
    slippage: f64,
    equity: f64,
    position: Option<OpenPosition>,
    trades: Vec<Trade>,
}

impl<'a> Run<'a> {
    /// 신호 바 기준 체결 위치와 가격.
    fn fill_point(&self, index: usize) -> Option<(usize, f64)> {
        if self.settings.realism.next_bar_execution {
            self.bars.get(index + 1).map(|b| (index + 1, b.open))
        } else {
            Some((index, self.bars[index].close))
        }
    }

    /// 슬리피지를 불리한 방향으로 적용한 가격.
    fn slipped(&self, price: f64, side: Side, entering: bool) -> f64 {
        let adverse = if entering { side.sign() } else { -side.sign() };
        price * (1.0 + adverse * self.slippage)
    }

    fn open(&mut self, side: Side, index: usize, price: f64) {
        if self.equity <= 0.0 {
            return;
        }
        let entry_price = self.slipped(price, side, true);
        if entry_price <= 0.0 {
            return;
        }
        let notional = match self.capital.sizing {
            SizingMode::PercentOfEquity => self.equity * self.capital.position_size.min(1.0),
            SizingMode::FixedNotional => self.capital.position_size,
        };
        self.position = Some(OpenPosition {
            side,
            entry_index: index,
            entry_price,
            quantity: notional / entry_price,
            entry_fee: notional * self.fee_rate,
        });
    }

    fn close(&mut self, index: usize, price: f64, reason: ExitReason) {
        let Some(pos) = self.position.take() else {
            return;
        };
        let exit_price = self.slipped(price, pos.side, false);
        let exit_fee = exit_price * pos.quantity * self.fee_rate;
        let gross = pos.side.sign() * (exit_price - pos.entry_price) * pos.quantity;
        let fees = pos.entry_fee + exit_fee;
        let pnl = gross - fees;
        let notional = pos.entry_price * pos.quantity;
        self.equity += pnl;

        self.trades.push(Trade {
            side: pos.side,
            entry_index: pos.entry_index,
            exit_index: index,
            entry_time: self.bars[pos.entry_index].time,
            exit_time: self.bars[index].time,
            entry_price: pos.entry_price,
            exit_price,
            size: pos.quantity,
            pnl,
            pnl_percent: if notional > 0.0 { pnl / notional * 100.0 } else { 0.0 },
            fees,
            exit_reason: reason,
        });
    }

    /// 손절/익절 체결가.
    fn risk_exit(&self, pos: &OpenPosition, bar: &Bar) -> Option<(f64, ExitReason)> {
        let stop = self.settings.stop_loss_pct.map(|pct| pct / 100.0);
        let target = self.settings.take_profit_pct.map(|pct| pct / 100.0);
        match pos.side {
            Side::Long => {
                if let Some(sl) = stop.map(|s| pos.entry_price * (1.0 - s)) {
                    if bar.low <= sl {
                        return Some((sl.min(bar.open), ExitReason::StopLoss));
                    }
                }
                if let Some(tp) = target.map(|t| pos.entry_price * (1.0 + t)) {
                    if bar.high >= tp {
                        return Some((tp.max(bar.open), ExitReason::TakeProfit));
                    }
                }
            }
            Side::Short => {
                if let Some(sl) = stop.map(|s| pos.entry_price * (1.0 + s)) {
                    if bar.high >= sl {
                        return Some((sl.max(bar.open), ExitReason::StopLoss));
                    }
                }
                if let Some(tp) = target.map(|t| pos.entry_price * (1.0 - t)) {
                    if bar.low <= tp {
                        return Some((tp.min(bar.open), ExitReason::TakeProfit));
                    }
                }
            }
        }
        None
    }

    fn on_signal(&mut self, signal: &Signal) {
        let i = signal.bar_index;
        let fill = self.fill_point(i);
        // 다음 바가 없는 청산은 현재 바 종가로 체결
        let exit_fill = fill.unwrap_or((i, self.bars[i].close));

        match signal.signal_type {
            SignalType::Exit => {
                if self.position.is_some_and(|p| p.side == signal.side) {
                    self.close(exit_fill.0, exit_fill.1, ExitReason::Signal);
                }
            }
            SignalType::Entry => {
                match self.position {
                    Some(p) if p.side == signal.side => return,
                    Some(_) => self.close(exit_fill.0, exit_fill.1, ExitReason::Reverse),
                    None => {}
                }
                if signal.side == Side::Short && !self.settings.allow_short {
                    return;
                }
                if let Some((index, price)) = fill {
                    self.open(signal.side, index, price);
                }
            }
        }
    }

    fn mark_to_market(&self, index: usize) -> f64 {
        match self.position {
            Some(p) if p.entry_index <= index => {
                let price = self.bars[index].close;
                self.equity + p.side.sign() * (price - p.entry_price) * p.quantity - p.entry_fee
            }
            _ => self.equity,
        }
    }
}

fn validate(capital: &CapitalSettings) -> Result<(), SimulationError> {
    if !(capital.initial_capital.is_finite() && capital.initial_capital > 0.0) {
        return Err(SimulationError::InvalidSettings(format!(
            "초기 자본은 양수여야 합니다: {}",
            capital.initial_capital
        )));
    }
    if !(capital.position_size.is_finite() && capital.position_size > 0.0) {
        return Err(SimulationError::InvalidSettings(format!(
            "포지션 크기는 양수여야 합니다: {}",
            capital.position_size
        )));
    }
    if !(capital.commission_pct.is_finite() && capital.commission_pct >= 0.0) {
        return Err(SimulationError::InvalidSettings(format!(
            "수수료율은 0 이상이어야 합니다: {}",
            capital.commission_pct
        )));
    }
    Ok(())
}

impl Simulator for BarSimulator {
    fn simulate(
        &self,
        bars: &[Bar],
        signals: &[Signal],
        capital: &CapitalSettings,
        settings: &BacktestSettings,
    ) -> Result<BacktestResult, SimulationError> {
        validate(capital)?;
        if let Some(bad) = signals.iter().find(|s| s.bar_index >= bars.len()) {
            return Err(SimulationError::SignalOutOfRange {
                index: bad.bar_index,
                bars: bars.len(),
            });
        }

        let mut ordered = signals.to_vec();
        ordered.sort_by_key(|s| s.bar_index);

        let mut run = Run {
            bars,
            capital,
            settings,
            fee_rate: capital.commission_pct / 100.0,
            slippage: settings.realism.slippage_pct.max(0.0) / 100.0,
            equity: capital.initial_capital,
            position: None,
            trades: Vec::new(),
        };
        let mut curve = if self.compact {
            Vec::new()
        } else {
            Vec::with_capacity(bars.len())
        };

        let mut cursor = 0;
        for (i, bar) in bars.iter().enumerate() {
            if let Some(pos) = run.position {
                if i > pos.entry_index {
                    if let Some((price, reason)) = run.risk_exit(&pos, bar) {
                        run.close(i, price, reason);
                    }
                }
            }

            while let Some(signal) = ordered.get(cursor).filter(|s| s.bar_index == i) {
                run.on_signal(signal);
                cursor += 1;
            }

            if !self.compact {
                curve.push(run.mark_to_market(i));
            }
        }

        if run.position.is_some() {
            let last = bars.len() - 1;
            run.close(last, bars[last].close, ExitReason::EndOfData);
            if let Some(point) = curve.last_mut() {
                *point = run.equity;
            }
        }

        let result = BacktestResult::from_trades(run.trades, capital.initial_capital);
        Ok(if self.compact {
            result
        } else {
            result.with_equity_curve(curve)
        })
    }

    fn is_compact(&self) -> bool {
        self.compact
    }
}
