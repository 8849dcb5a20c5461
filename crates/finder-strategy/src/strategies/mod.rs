//! 참조 전략 구현.

pub mod breakout;
pub mod sma;

pub use breakout::ChannelBreakoutStrategy;
pub use sma::SmaCrossStrategy;

/// 종가 단순 이동평균. 기간이 채워지기 전은 `None`.
pub(crate) fn sma(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; closes.len()];
    if period == 0 || closes.len() < period {
        return out;
    }
    let mut sum: f64 = closes[..period].iter().sum();
    out[period - 1] = Some(sum / period as f64);
    for i in period..closes.len() {
        sum += closes[i] - closes[i - period];
        out[i] = Some(sum / period as f64);
    }
    out
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sma_rolling() {
        let values = sma(&[1.0, 2.0, 3.0, 4.0, 5.0], 3);
        assert_eq!(values[..2], [None, None]);
        assert_eq!(values[2], Some(2.0));
        assert_eq!(values[4], Some(4.0));
    }

    #[test]
    fn test_sma_short_input() {
        assert!(sma(&[1.0, 2.0], 5).iter().all(Option::is_none));
    }
}
