//! HTTP 원격 엔진 클라이언트.
//!
//! # 엔드포인트
//! - `GET  /health`
//! - `POST /cache`
//! - `POST /backtest/batch`
//! - `POST /backtest/batch/cached`

use std::time::Duration;

use async_trait::async_trait;
use finder_core::{Bar, CapitalSettings, RemoteConfig};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{RemoteError, RemoteResult};
use crate::traits::RemoteEngine;
use crate::wire::{
    BatchItem, BatchRequest, BatchResponse, CacheRequest, CacheResponse, CachedBatchRequest,
    HealthResponse,
};

/// HTTP 클라이언트 설정.
#[derive(Debug, Clone)]
pub struct HttpRemoteConfig {
    /// 엔진 기본 URL (끝의 `/`는 무시)
    pub base_url: String,
    /// 배치 요청 타임아웃 (초)
    pub timeout_secs: u64,
    /// 헬스 체크 타임아웃 (초)
    pub health_timeout_secs: u64,
}

impl From<&RemoteConfig> for HttpRemoteConfig {
    fn from(config: &RemoteConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            timeout_secs: config.timeout_secs,
            health_timeout_secs: config.health_timeout_secs,
        }
    }
}

/// `reqwest` 기반 원격 엔진.
pub struct HttpRemoteEngine {
    config: HttpRemoteConfig,
    client: Client,
}

impl HttpRemoteEngine {
    /// 새 클라이언트 생성.
    ///
    /// # Errors
    /// HTTP 클라이언트 생성에 실패하면 `RemoteError::Network`를 반환합니다.
    pub fn new(config: HttpRemoteConfig) -> RemoteResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RemoteError::Network(format!("HTTP 클라이언트 생성 실패: {}", e)))?;

        Ok(Self { config, client })
    }

    /// 설정 파일의 `[remote]` 섹션에서 생성합니다.
    pub fn from_config(config: &RemoteConfig) -> RemoteResult<Self> {
        Self::new(HttpRemoteConfig::from(config))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> RemoteResult<T> {
        let response = self.client.post(self.url(path)).json(body).send().await?;
        Self::parse(response).await
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> RemoteResult<T> {
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(RemoteError::Http {
                status: status.as_u16(),
                message: text,
            });
        }
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl RemoteEngine for HttpRemoteEngine {
    async fn check_health(&self) -> bool {
        let request = self
            .client
            .get(self.url("/health"))
            .timeout(Duration::from_secs(self.config.health_timeout_secs));

        match request.send().await {
            Ok(response) => match Self::parse::<HealthResponse>(response).await {
                Ok(health) => health.is_ok(),
                Err(e) => {
                    debug!(error = %e, "Remote health response rejected");
                    false
                }
            },
            Err(e) => {
                debug!(error = %e, "Remote health probe failed");
                false
            }
        }
    }

    async fn cache_data(&self, bars: &[Bar]) -> RemoteResult<Option<String>> {
        let response: CacheResponse = self.post("/cache", &CacheRequest { data: bars }).await?;
        if response.cache_id.is_none() {
            warn!(bars = bars.len(), "Remote engine declined to cache dataset");
        }
        Ok(response.cache_id)
    }

    async fn run_batch_backtest(
        &self,
        bars: &[Bar],
        items: &[BatchItem],
        capital: &CapitalSettings,
    ) -> RemoteResult<BatchResponse> {
        debug!(items = items.len(), bars = bars.len(), "Sending direct batch");
        self.post(
            "/backtest/batch",
            &BatchRequest {
                data: bars,
                items,
                capital,
            },
        )
        .await
    }

    async fn run_cached_batch_backtest(
        &self,
        cache_id: &str,
        items: &[BatchItem],
        capital: &CapitalSettings,
    ) -> RemoteResult<BatchResponse> {
        debug!(items = items.len(), cache_id, "Sending cached batch");
        self.post(
            "/backtest/batch/cached",
            &CachedBatchRequest {
                cache_id,
                items,
                capital,
            },
        )
        .await
    }
}
