//! 완료된 거래.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::Side;

/// 청산 사유.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    /// 전략 청산 신호
    Signal,
    /// 반대 방향 진입으로 인한 청산
    Reverse,
    /// 손절
    StopLoss,
    /// 익절
    TakeProfit,
    /// 데이터 끝에서 강제 청산
    EndOfData,
}

/// 진입부터 청산까지 완료된 거래.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// 방향
    pub side: Side,
    /// 진입 바 인덱스
    pub entry_index: usize,
    /// 청산 바 인덱스
    pub exit_index: usize,
    /// 진입 시각
    pub entry_time: DateTime<Utc>,
    /// 청산 시각
    pub exit_time: DateTime<Utc>,
    /// 진입 가격
    pub entry_price: f64,
    /// 청산 가격
    pub exit_price: f64,
    /// 수량
    pub size: f64,
    /// 수수료 차감 후 손익
    pub pnl: f64,
    /// 진입 명목가 대비 손익률 (%)
    pub pnl_percent: f64,
    /// 진입 + 청산 수수료
    #[serde(default)]
    pub fees: f64,
    /// 청산 사유
    pub exit_reason: ExitReason,
}

impl Trade {
    /// 수익 거래 여부 (손익 > 0).
    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }

    /// 진입 명목가.
    pub fn entry_notional(&self) -> f64 {
        self.entry_price * self.size
    }
}
