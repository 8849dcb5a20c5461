//! 백엔드 선택 정책.
//!
//! 실행마다 한 번 평가합니다. 정적 조건을 먼저 확인하고, 모두 통과해야
//! 헬스 체크를 보냅니다.

use std::fmt;

use finder_core::RemoteConfig;
use finder_remote::RemoteEngine;
use serde::Serialize;

/// 원격 데이터 전달 방식.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteMode {
    /// 배치마다 데이터를 함께 전송
    Direct,
    /// 한 번 업로드 후 캐시 ID로 참조
    Cached,
}

/// 로컬 실행을 선택한 사유.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LocalReason {
    Disabled,
    NoEngine,
    RealismRequiresLocal,
    ExtremeDataset { bars: usize, limit: usize },
    VolatilityMetricInCompactMode,
    MultiTimeframe,
    HealthCheckFailed,
}

impl fmt::Display for LocalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocalReason::Disabled => write!(f, "remote engine disabled"),
            LocalReason::NoEngine => write!(f, "no remote engine configured"),
            LocalReason::RealismRequiresLocal => write!(f, "realism settings require local execution"),
            LocalReason::ExtremeDataset { bars, limit } => {
                write!(f, "dataset too large for remote ({} > {} bars)", bars, limit)
            }
            LocalReason::VolatilityMetricInCompactMode => {
                write!(f, "volatility-sensitive sort metric in compact mode")
            }
            LocalReason::MultiTimeframe => write!(f, "multi-timeframe runs execute locally"),
            LocalReason::HealthCheckFailed => write!(f, "remote health check failed"),
        }
    }
}

/// 정책 결정.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum BackendChoice {
    Local { reason: LocalReason },
    Remote { mode: RemoteMode },
}

impl fmt::Display for BackendChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendChoice::Local { reason } => write!(f, "local ({})", reason),
            BackendChoice::Remote { mode: RemoteMode::Direct } => write!(f, "remote (direct)"),
            BackendChoice::Remote { mode: RemoteMode::Cached } => write!(f, "remote (cached)"),
        }
    }
}

/// 정책 입력.
#[derive(Debug, Clone, Default)]
pub struct PolicyInput {
    pub has_engine: bool,
    pub realism_requires_local: bool,
    pub bar_count: usize,
    pub compact_mode: bool,
    pub sort_includes_volatility_metric: bool,
    pub timeframes: usize,
}

/// 헬스 체크 이전의 정적 판정.
pub fn static_decision(input: &PolicyInput, config: &RemoteConfig) -> Result<RemoteMode, LocalReason> {
    if !config.enabled {
        return Err(LocalReason::Disabled);
    }
    if !input.has_engine {
        return Err(LocalReason::NoEngine);
    }
    if input.realism_requires_local {
        return Err(LocalReason::RealismRequiresLocal);
    }
    if input.bar_count > config.extreme_threshold_bars {
        return Err(LocalReason::ExtremeDataset {
            bars: input.bar_count,
            limit: config.extreme_threshold_bars,
        });
    }
    if input.compact_mode && input.sort_includes_volatility_metric {
        return Err(LocalReason::VolatilityMetricInCompactMode);
    }
    if input.timeframes > 1 {
        return Err(LocalReason::MultiTimeframe);
    }

    Ok(if input.bar_count > config.cache_threshold_bars {
        RemoteMode::Cached
    } else {
        RemoteMode::Direct
    })
}

/// 백엔드를 선택합니다. 정적 조건을 통과하면 헬스 체크를 보냅니다.
pub async fn select_backend(
    input: &PolicyInput,
    engine: Option<&dyn RemoteEngine>,
    config: &RemoteConfig,
) -> BackendChoice {
    let input = PolicyInput {
        has_engine: input.has_engine && engine.is_some(),
        ..input.clone()
    };
    let mode = match static_decision(&input, config) {
        Ok(mode) => mode,
        Err(reason) => return BackendChoice::Local { reason },
    };

    match engine {
        Some(engine) if engine.check_health().await => BackendChoice::Remote { mode },
        _ => BackendChoice::Local {
            reason: LocalReason::HealthCheckFailed,
        },
    }
}
