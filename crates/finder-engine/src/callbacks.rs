//! 호스트 콜백과 협력적 스케줄러.
//!
//! 엔진은 병렬 실행을 하지 않습니다. 긴 실행 중에 호스트가 다른 일을 할 수
//! 있도록 [`Scheduler::yield_control`]을 명시적으로 호출해 제어를 넘깁니다.

use async_trait::async_trait;
use serde::Serialize;

/// 진행 상황.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Progress {
    /// 처리한 작업 (또는 셀) 수
    pub completed: usize,
    /// 전체 작업 (또는 셀) 수
    pub total: usize,
    /// 현재 단계 설명
    pub phase: String,
}

impl Progress {
    /// 진행률 (0..=1).
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            (self.completed as f64 / self.total as f64).min(1.0)
        }
    }
}

/// 진행/상태 콜백. 진행 콜백은 최소 간격을 두고 호출됩니다.
pub trait FinderCallbacks: Send + Sync {
    fn on_progress(&self, _progress: &Progress) {}

    fn on_status(&self, _status: &str) {}
}

/// 아무것도 하지 않는 콜백.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCallbacks;

impl FinderCallbacks for NoopCallbacks {}

/// 호스트 협력적 스케줄러.
#[async_trait]
pub trait Scheduler: Send + Sync {
    /// 호스트에 제어를 넘깁니다.
    async fn yield_control(&self);
}

/// Tokio 태스크 양보.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

#[async_trait]
impl Scheduler for TokioScheduler {
    async fn yield_control(&self) {
        tokio::task::yield_now().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_fraction() {
        let progress = Progress {
            completed: 5,
            total: 20,
            phase: "backtest".to_string(),
        };
        assert_eq!(progress.fraction(), 0.25);
        assert_eq!(Progress::default().fraction(), 1.0);
    }
}
