//! 전략 계약과 파라미터 생성기.
//!
//! 이 크레이트가 제공하는 기능:
//! - 신호 생성 함수 계약인 [`Strategy`] trait
//! - 역할(`Entry` / `Signal`)을 한 번만 판별해 두는 [`StrategyHandle`]
//! - 파라미터 세트 생성기 [`ParamSetGenerator`]와 격자 생성기 [`GridGenerator`]
//! - 확인 전략으로 진입 신호를 거르는 [`ConfirmationGate`]
//! - 참조 전략 (SMA 크로스오버, 채널 돌파)
//!
//! # 예제
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use finder_strategy::{GridGenerator, ParamRange, SmaCrossStrategy, StrategyHandle};
//!
//! let handle = StrategyHandle::classify(Arc::new(SmaCrossStrategy));
//! let generator = GridGenerator::new()
//!     .with_range("fast", ParamRange::new(5.0, 20.0, 5.0))
//!     .with_range("slow", ParamRange::new(30.0, 90.0, 30.0));
//! ```

pub mod confirmation;
pub mod generator;
pub mod handle;
pub mod strategies;
pub mod traits;

pub use confirmation::{ConfirmationFilter, ConfirmationGate, PreparedGate};
pub use generator::{GeneratorOptions, GridGenerator, ParamRange, ParamSetGenerator};
pub use handle::{StrategyHandle, StrategyOutput};
pub use strategies::{ChannelBreakoutStrategy, SmaCrossStrategy};
pub use traits::{EntryStats, Strategy, StrategyError, StrategyRole};
