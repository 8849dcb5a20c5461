//! 원격 백테스트 엔진.
//!
//! 원격 엔진은 신호 목록을 받아 시뮬레이션만 수행하는 네트워크 협력자입니다.
//! 전략 실행은 항상 로컬에서 이루어지고, 여기서는 다음을 제공합니다:
//! - 엔진 계약 [`RemoteEngine`] (헬스 체크, 데이터 캐싱, 배치 백테스트)
//! - 요청/응답 와이어 타입
//! - `reqwest` 기반 HTTP 구현 [`HttpRemoteEngine`]

pub mod error;
pub mod http;
pub mod traits;
pub mod wire;

pub use error::{RemoteError, RemoteResult};
pub use http::{HttpRemoteConfig, HttpRemoteEngine};
pub use traits::RemoteEngine;
pub use wire::*;
