//! 랭커 용량/정렬 성질 테스트

use finder_core::BacktestResult;
use finder_engine::{ResultRanker, SortPriority};
use proptest::prelude::*;
use std::cmp::Ordering;

fn result(pf: f64, trades: usize) -> BacktestResult {
    BacktestResult {
        profit_factor: pf,
        total_trades: trades,
        ..Default::default()
    }
}

proptest! {
    #[test]
    fn ranker_holds_exactly_k_sorted(
        values in prop::collection::vec((0.0f64..10.0, 0usize..100), 51..200)
    ) {
        let priority = SortPriority::default();
        let mut ranker = ResultRanker::new(5, priority.clone());
        for (pf, trades) in &values {
            ranker.offer(result(*pf, *trades));
        }

        prop_assert_eq!(ranker.len(), 50);
        let sorted = ranker.to_sorted_vec(50);
        for pair in sorted.windows(2) {
            prop_assert_ne!(priority.compare(&pair[0], &pair[1]), Ordering::Greater);
        }

        // 전체를 정렬했을 때의 상위 50개와 같은 지표 값
        let mut all: Vec<BacktestResult> = values.iter().map(|(pf, t)| result(*pf, *t)).collect();
        all.sort_by(|a, b| priority.compare(a, b));
        for (kept, expected) in sorted.iter().zip(all.iter()) {
            prop_assert_eq!(priority.compare(kept, expected), Ordering::Equal);
        }
    }

    #[test]
    fn worse_than_worst_leaves_set_unchanged(
        values in prop::collection::vec(1.0f64..10.0, 50..80)
    ) {
        let mut ranker = ResultRanker::new(50, SortPriority::default());
        for pf in &values {
            ranker.offer(result(*pf, 10));
        }
        let before = ranker.to_sorted_vec(50);

        prop_assert!(!ranker.offer(result(0.5, 10)));
        prop_assert_eq!(ranker.to_sorted_vec(50), before);
    }
}
