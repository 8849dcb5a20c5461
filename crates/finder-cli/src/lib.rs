//! 전략 파인더 CLI 라이브러리.
//!
//! CSV 가격 데이터와 탐색 설정 파일을 읽어 파인더를 실행하고, 결과를 표와
//! JSON 보고서로 출력합니다.

pub mod commands;

pub use commands::*;
