//! # Finder Core
//!
//! 전략 파인더의 핵심 도메인 모델 및 타입을 제공합니다.
//!
//! 이 크레이트는 파인더 전반에서 사용되는 기본 타입을 제공합니다:
//! - 가격 바(OHLCV) 및 타임프레임
//! - 전략 신호와 완료된 거래
//! - 백테스트 결과와 통계 집계
//! - 파라미터 세트 및 백테스트 설정
//! - 설정 관리
//! - 로깅 인프라

pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod types;

pub use config::*;
pub use domain::*;
pub use error::*;
pub use logging::*;
pub use types::*;
