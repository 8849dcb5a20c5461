//! 원격 엔진 trait.

use async_trait::async_trait;
use finder_core::{Bar, CapitalSettings};

use crate::error::RemoteResult;
use crate::wire::{BatchItem, BatchResponse};

/// 원격 백테스트 엔진.
///
/// 호출은 모두 순차적으로 이루어지며, 배치 응답 전체를 받은 뒤 다음 배치로
/// 넘어갑니다.
#[async_trait]
pub trait RemoteEngine: Send + Sync {
    /// 엔진이 요청을 받을 수 있는지 확인합니다. 실패는 `false`로 취급합니다.
    async fn check_health(&self) -> bool;

    /// 데이터를 원격에 캐시하고 캐시 ID를 반환합니다.
    ///
    /// 엔진이 캐시를 거절하면 `Ok(None)`.
    async fn cache_data(&self, bars: &[Bar]) -> RemoteResult<Option<String>>;

    /// 데이터를 함께 보내는 배치 백테스트.
    async fn run_batch_backtest(
        &self,
        bars: &[Bar],
        items: &[BatchItem],
        capital: &CapitalSettings,
    ) -> RemoteResult<BatchResponse>;

    /// 캐시된 데이터를 참조하는 배치 백테스트.
    async fn run_cached_batch_backtest(
        &self,
        cache_id: &str,
        items: &[BatchItem],
        capital: &CapitalSettings,
    ) -> RemoteResult<BatchResponse>;
}
