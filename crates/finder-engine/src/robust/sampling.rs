//! 셀 파라미터 표본 추출.

use finder_core::ParamSet;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// 예산보다 많으면 셀 시드로 표본을 뽑고, 스케줄러 순서로 되돌립니다.
pub fn sample_param_sets(sets: &[ParamSet], budget: usize, seed: u32) -> Vec<ParamSet> {
    if sets.len() <= budget {
        return sets.to_vec();
    }

    let mut rng = StdRng::seed_from_u64(u64::from(seed));
    let mut indices: Vec<usize> = (0..sets.len()).collect();
    // 앞쪽 budget개만 섞는 부분 Fisher–Yates
    for i in 0..budget {
        let j = rng.gen_range(i..indices.len());
        indices.swap(i, j);
    }
    let mut chosen = indices[..budget].to_vec();
    chosen.sort_unstable();
    chosen.into_iter().map(|i| sets[i].clone()).collect()
}
