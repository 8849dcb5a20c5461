//! 파인더 전반에서 사용되는 공통 타입.

mod float;
mod timeframe;

pub use float::*;
pub use timeframe::*;
