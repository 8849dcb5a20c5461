//! 파인더 도메인 모델.
//!
//! - `bar`: 가격 바와 타임프레임별 데이터셋
//! - `signal`: 전략이 생성하는 진입/청산 신호
//! - `trade`: 시뮬레이션으로 완료된 거래
//! - `backtest`: 백테스트 결과와 거래 목록 집계
//! - `params`: 파라미터 세트와 백테스트 설정

pub mod backtest;
pub mod bar;
pub mod params;
pub mod signal;
pub mod trade;

pub use backtest::*;
pub use bar::*;
pub use params::*;
pub use signal::*;
pub use trade::*;
