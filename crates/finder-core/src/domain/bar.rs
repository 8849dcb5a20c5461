//! 가격 바와 데이터셋.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::types::Timeframe;

/// OHLCV 가격 바.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// 바 종료 시각 (UTC)
    pub time: DateTime<Utc>,
    /// 시가
    pub open: f64,
    /// 고가
    pub high: f64,
    /// 저가
    pub low: f64,
    /// 종가
    pub close: f64,
    /// 거래량
    #[serde(default)]
    pub volume: f64,
}

impl Bar {
    /// 새 바를 생성합니다.
    pub fn new(time: DateTime<Utc>, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            time,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

/// 하나의 타임프레임에 대한 가격 시계열.
///
/// 바 목록은 `Arc`로 공유되어 배치마다 복사되지 않습니다.
#[derive(Debug, Clone)]
pub struct TimeframeDataset {
    /// 타임프레임
    pub timeframe: Timeframe,
    /// 시간순으로 정렬된 바
    pub bars: Arc<[Bar]>,
}

impl TimeframeDataset {
    /// 새 데이터셋을 생성합니다.
    pub fn new(timeframe: Timeframe, bars: impl Into<Arc<[Bar]>>) -> Self {
        Self {
            timeframe,
            bars: bars.into(),
        }
    }

    /// 바 개수.
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// 비어 있는지 여부.
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// 마지막 바 시각.
    pub fn last_bar_time(&self) -> Option<DateTime<Utc>> {
        self.bars.last().map(|b| b.time)
    }

    /// 주어진 시각 이후의 바를 잘라낸 데이터셋을 반환합니다.
    pub fn truncated_at(&self, end: DateTime<Utc>) -> Self {
        let keep = self.bars.partition_point(|b| b.time <= end);
        if keep == self.bars.len() {
            return self.clone();
        }
        Self {
            timeframe: self.timeframe,
            bars: self.bars[..keep].to_vec().into(),
        }
    }

    /// 시간순 정렬 여부 확인.
    pub fn is_sorted(&self) -> bool {
        self.bars.windows(2).all(|w| w[0].time <= w[1].time)
    }
}
