//! 파인더의 에러 타입.
//!
//! 실행을 중단시키는 진짜 실패만 에러로 표현합니다. 조합이 없거나
//! 데이터가 부족한 경우처럼 예상 가능한 종료 상태는 실행 결과의 상태 값으로
//! 전달됩니다.

use thiserror::Error;

/// 핵심 파인더 에러.
#[derive(Debug, Error)]
pub enum FinderError {
    /// 설정 에러
    #[error("설정 에러: {0}")]
    Config(String),

    /// 데이터 에러
    #[error("데이터 에러: {0}")]
    Data(String),

    /// 전략 에러
    #[error("전략 에러: {0}")]
    Strategy(String),

    /// 시뮬레이션 에러
    #[error("시뮬레이션 에러: {0}")]
    Simulation(String),

    /// 원격 엔진 에러
    #[error("원격 엔진 에러: {0}")]
    Remote(String),

    /// 직렬화 에러
    #[error("직렬화 에러: {0}")]
    Serialization(String),

    /// 잘못된 입력
    #[error("잘못된 입력: {0}")]
    InvalidInput(String),

    /// 내부 에러
    #[error("내부 에러: {0}")]
    Internal(String),
}

/// 파인더 작업을 위한 Result 타입.
pub type EngineResult<T> = Result<T, FinderError>;

impl FinderError {
    /// 작업 하나만 건너뛰고 실행을 계속할 수 있는 에러인지 확인합니다.
    pub fn is_job_local(&self) -> bool {
        matches!(
            self,
            FinderError::Strategy(_) | FinderError::Simulation(_) | FinderError::Remote(_)
        )
    }
}

impl From<serde_json::Error> for FinderError {
    fn from(err: serde_json::Error) -> Self {
        FinderError::Serialization(err.to_string())
    }
}

impl From<config::ConfigError> for FinderError {
    fn from(err: config::ConfigError) -> Self {
        FinderError::Config(err.to_string())
    }
}
