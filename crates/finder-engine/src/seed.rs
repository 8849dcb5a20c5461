//! 재현 가능한 셀 시드.

/// 32비트 FNV-1a 해시.
pub fn fnv1a_32(bytes: &[u8]) -> u32 {
    const OFFSET_BASIS: u32 = 0x811c_9dc5;
    const PRIME: u32 = 0x0100_0193;

    bytes.iter().fold(OFFSET_BASIS, |hash, &byte| {
        (hash ^ u32::from(byte)).wrapping_mul(PRIME)
    })
}

/// (실행 시드, 전략 키, 타임프레임)에서 셀 시드를 만듭니다.
///
/// 같은 입력은 항상 같은 시드를 만들므로 같은 시드의 반복 실행은 같은
/// 표본과 같은 폴드 경계를 사용합니다.
pub fn cell_seed(run_seed: f64, strategy_key: &str, timeframe: &str) -> u32 {
    fnv1a_32(format!("{}|{}|{}", run_seed, strategy_key, timeframe).as_bytes())
}
