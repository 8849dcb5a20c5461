//! 원격 엔진 에러 타입.

use thiserror::Error;

/// 원격 엔진 에러.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// 네트워크/연결 에러
    #[error("Network error: {0}")]
    Network(String),

    /// 타임아웃
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// 2xx가 아닌 HTTP 상태
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// 파싱/역직렬화 에러
    #[error("Parse error: {0}")]
    Parse(String),

    /// 응답 형식이 계약과 다름
    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// 원격 엔진 작업을 위한 Result 타입.
pub type RemoteResult<T> = Result<T, RemoteError>;

impl RemoteError {
    /// 재시도 가능한 에러인지 확인.
    pub fn is_retryable(&self) -> bool {
        match self {
            RemoteError::Network(_) | RemoteError::Timeout(_) => true,
            RemoteError::Http { status, .. } => *status == 429 || *status >= 500,
            RemoteError::Parse(_) | RemoteError::Protocol(_) => false,
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RemoteError::Timeout(err.to_string())
        } else if err.is_decode() {
            RemoteError::Parse(err.to_string())
        } else if let Some(status) = err.status() {
            RemoteError::Http {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            RemoteError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for RemoteError {
    fn from(err: serde_json::Error) -> Self {
        RemoteError::Parse(err.to_string())
    }
}

impl From<RemoteError> for finder_core::FinderError {
    fn from(err: RemoteError) -> Self {
        finder_core::FinderError::Remote(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable() {
        assert!(RemoteError::Network("reset".into()).is_retryable());
        assert!(RemoteError::Timeout("60s".into()).is_retryable());
        assert!(RemoteError::Http { status: 503, message: String::new() }.is_retryable());
        assert!(!RemoteError::Http { status: 400, message: String::new() }.is_retryable());
        assert!(!RemoteError::Protocol("missing results".into()).is_retryable());
    }

    #[test]
    fn test_from_serde_error() {
        let err: RemoteError = serde_json::from_str::<u32>("oops").unwrap_err().into();
        assert!(matches!(err, RemoteError::Parse(_)));
    }
}
