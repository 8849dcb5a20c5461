//! 단일 백테스트 시뮬레이터.

pub mod simulator;

pub use simulator::{BarSimulator, SimulationError, Simulator};
