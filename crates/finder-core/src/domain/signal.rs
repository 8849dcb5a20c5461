//! 전략의 트레이딩 신호.
//!
//! 신호는 바 인덱스로 위치를 가리킵니다. 원격 엔진에는 신호 목록만
//! 전송되므로 직렬화 형식은 원격 계약의 일부입니다.

use serde::{Deserialize, Serialize};

/// 포지션 방향.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// 롱 (가격 상승 시 수익)
    Long,
    /// 숏 (가격 하락 시 수익)
    Short,
}

impl Side {
    /// 부호 (롱 = 1, 숏 = -1).
    pub fn sign(&self) -> f64 {
        match self {
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }
}

/// 신호 유형.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalType {
    /// 새 포지션 진입
    Entry,
    /// 기존 포지션 청산
    Exit,
}

/// 전략이 생성한 트레이딩 신호.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signal {
    /// 신호가 발생한 바 인덱스
    pub bar_index: usize,
    /// 신호 유형
    pub signal_type: SignalType,
    /// 방향 (청산 신호는 청산할 포지션의 방향)
    pub side: Side,
}

impl Signal {
    /// 진입 신호를 생성합니다.
    pub fn entry(bar_index: usize, side: Side) -> Self {
        Self {
            bar_index,
            signal_type: SignalType::Entry,
            side,
        }
    }

    /// 청산 신호를 생성합니다.
    pub fn exit(bar_index: usize, side: Side) -> Self {
        Self {
            bar_index,
            signal_type: SignalType::Exit,
            side,
        }
    }

    /// 진입 신호 여부.
    pub fn is_entry(&self) -> bool {
        self.signal_type == SignalType::Entry
    }

    /// 바 인덱스를 `offset`만큼 당긴 신호. 범위를 벗어나면 `None`.
    pub fn shifted_back(&self, offset: usize) -> Option<Self> {
        self.bar_index.checked_sub(offset).map(|bar_index| Self {
            bar_index,
            ..*self
        })
    }
}
