//! 양보 예산과 진행 콜백 간격.

use std::time::{Duration, Instant};

use crate::callbacks::Scheduler;

/// 경과 시간이 예산을 넘으면 호스트에 제어를 넘깁니다.
#[derive(Debug)]
pub struct YieldPacer {
    budget: Duration,
    last_yield: Instant,
    yields: usize,
}

impl YieldPacer {
    pub fn new(budget: Duration) -> Self {
        Self {
            budget,
            last_yield: Instant::now(),
            yields: 0,
        }
    }

    /// 예산을 넘었거나 `force`면 양보합니다. 양보했으면 `true`.
    pub async fn maybe_yield(&mut self, scheduler: &dyn Scheduler, force: bool) -> bool {
        if !force && self.last_yield.elapsed() < self.budget {
            return false;
        }
        scheduler.yield_control().await;
        self.last_yield = Instant::now();
        self.yields += 1;
        true
    }

    /// 지금까지 양보한 횟수.
    pub fn yields(&self) -> usize {
        self.yields
    }
}

/// 진행 콜백 최소 간격 제한.
#[derive(Debug)]
pub struct ProgressThrottle {
    interval: Duration,
    last_emit: Option<Instant>,
}

impl ProgressThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_emit: None,
        }
    }

    /// 이번에 콜백을 호출해도 되는지 확인하고, 호출한다면 시각을 기록합니다.
    ///
    /// 첫 호출과 `force`는 항상 통과합니다.
    pub fn should_emit(&mut self, force: bool) -> bool {
        let due = match self.last_emit {
            None => true,
            Some(at) => at.elapsed() >= self.interval,
        };
        if due || force {
            self.last_emit = Some(Instant::now());
        }
        due || force
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callbacks::Scheduler;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingScheduler(AtomicUsize);

    #[async_trait]
    impl Scheduler for CountingScheduler {
        async fn yield_control(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_forced_yield_ignores_budget() {
        let scheduler = CountingScheduler::default();
        let mut pacer = YieldPacer::new(Duration::from_secs(3600));

        assert!(!pacer.maybe_yield(&scheduler, false).await);
        assert!(pacer.maybe_yield(&scheduler, true).await);
        assert_eq!(scheduler.0.load(Ordering::SeqCst), 1);
        assert_eq!(pacer.yields(), 1);
    }

    #[tokio::test]
    async fn test_zero_budget_always_yields() {
        let scheduler = CountingScheduler::default();
        let mut pacer = YieldPacer::new(Duration::ZERO);
        for _ in 0..3 {
            assert!(pacer.maybe_yield(&scheduler, false).await);
        }
        assert_eq!(scheduler.0.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_throttle() {
        let mut throttle = ProgressThrottle::new(Duration::from_secs(3600));
        assert!(throttle.should_emit(false));
        assert!(!throttle.should_emit(false));
        assert!(throttle.should_emit(true));
    }
}
