//! 원격 엔진 요청/응답 형식.
//!
//! 결과의 `profit_factor`와 `sharpe_ratio`는 무한대를 문자열
//! (`"Infinity"`)로 주고받습니다.

use finder_core::{BacktestResult, BacktestSettings, Bar, CapitalSettings, Signal};
use serde::{Deserialize, Serialize};

/// 배치 안의 작업 하나: 로컬에서 생성한 신호와 작업별 설정.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItem {
    /// 작업 ID (응답 매칭용)
    pub id: u64,
    /// 시뮬레이션할 신호
    pub signals: Vec<Signal>,
    /// 작업별 백테스트 설정
    pub settings: BacktestSettings,
}

/// 인라인 데이터 배치 요청.
#[derive(Debug, Serialize)]
pub struct BatchRequest<'a> {
    pub data: &'a [Bar],
    pub items: &'a [BatchItem],
    pub capital: &'a CapitalSettings,
}

/// 캐시된 데이터 배치 요청.
#[derive(Debug, Serialize)]
pub struct CachedBatchRequest<'a> {
    pub cache_id: &'a str,
    pub items: &'a [BatchItem],
    pub capital: &'a CapitalSettings,
}

/// 데이터 캐시 요청.
#[derive(Debug, Serialize)]
pub struct CacheRequest<'a> {
    pub data: &'a [Bar],
}

/// 데이터 캐시 응답. 엔진이 캐시를 거절하면 `cache_id`가 없습니다.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheResponse {
    #[serde(default)]
    pub cache_id: Option<String>,
}

/// 작업 하나의 응답.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResultEntry {
    pub id: u64,
    #[serde(default)]
    pub result: Option<BacktestResult>,
    #[serde(default)]
    pub error: Option<String>,
}

/// 배치 응답. 요청한 모든 작업이 포함된다는 보장은 없습니다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchResponse {
    #[serde(default)]
    pub results: Vec<BatchResultEntry>,
}

impl BatchResponse {
    /// 작업 ID로 성공한 결과를 찾습니다.
    pub fn result_for(&self, id: u64) -> Option<&BacktestResult> {
        self.results
            .iter()
            .find(|entry| entry.id == id)
            .and_then(|entry| entry.result.as_ref())
    }
}

/// 헬스 체크 응답.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthResponse {
    #[serde(default)]
    pub status: String,
}

impl HealthResponse {
    pub fn is_ok(&self) -> bool {
        matches!(self.status.to_lowercase().as_str(), "ok" | "healthy" | "up")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_response_with_infinite_profit_factor() {
        let json = r#"{
            "results": [
                {"id": 1, "result": {"total_trades": 2, "winning_trades": 2, "profit_factor": "Infinity"}},
                {"id": 2, "error": "simulation failed"}
            ]
        }"#;
        let response: BatchResponse = serde_json::from_str(json).unwrap();

        let first = response.result_for(1).unwrap();
        assert!(first.profit_factor.is_infinite());
        assert!(response.result_for(2).is_none());
        assert!(response.result_for(3).is_none());
    }

    #[test]
    fn test_health_status() {
        let ok: HealthResponse = serde_json::from_str(r#"{"status":"OK"}"#).unwrap();
        let down: HealthResponse = serde_json::from_str(r#"{"status":"degraded"}"#).unwrap();
        assert!(ok.is_ok());
        assert!(!down.is_ok());
    }
}
