//! 설정 관리.
//!
//! 파인더 실행의 정책 상수(데이터셋 크기 등급, 배치 크기, 원격 엔진 선택
//! 기준, 강건성 검증 임계값)를 이름 있는 기본값으로 정의합니다. 값은 TOML
//! 파일과 `FINDER__` 접두사 환경 변수로 덮어쓸 수 있습니다.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// 파인더 전체 설정.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FinderConfig {
    /// 로깅 설정
    #[serde(default)]
    pub logging: LoggingConfig,
    /// 실행 엔진 설정
    #[serde(default)]
    pub engine: EngineConfig,
    /// 원격 백테스트 엔진 설정
    #[serde(default)]
    pub remote: RemoteConfig,
    /// 강건성(랜덤 워크포워드) 검증 설정
    #[serde(default)]
    pub robust: RobustConfig,
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// 로그 레벨
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    pub format: String,
    /// span 종료 이벤트 기록 여부
    #[serde(default)]
    pub span_events: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            span_events: false,
        }
    }
}

/// 실행 엔진 설정.
///
/// 데이터셋 크기 등급과 배치 크기, 협력적 양보 예산을 결정합니다.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// 이 바 수를 넘으면 중간 크기 데이터셋
    pub medium_dataset_bars: usize,
    /// 이 바 수를 넘으면 대형 데이터셋
    pub large_dataset_bars: usize,
    /// 이 바 수를 넘으면 초대형 데이터셋
    pub very_large_dataset_bars: usize,
    /// 이 바 수 이상이면 컴팩트 백테스트 사용
    pub compact_backtest_threshold: usize,
    /// 무거운 설정일 때의 컴팩트 백테스트 임계값
    pub heavy_compact_backtest_threshold: usize,
    /// 소형 데이터셋 배치 크기
    pub batch_size_small: usize,
    /// 중간 크기 데이터셋 배치 크기
    pub batch_size_medium: usize,
    /// 대형 데이터셋 배치 크기
    pub batch_size_large: usize,
    /// 초대형 데이터셋 배치 크기
    pub batch_size_very_large: usize,
    /// 양보 예산 (밀리초)
    pub yield_budget_ms: u64,
    /// 무거운 설정일 때의 양보 예산 (밀리초)
    pub heavy_yield_budget_ms: u64,
    /// 진행률 콜백 최소 간격 (밀리초)
    pub progress_interval_ms: u64,
    /// 다중 타임프레임 정렬 후 필요한 최소 바 수
    pub min_aligned_bars: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            medium_dataset_bars: 50_000,
            large_dataset_bars: 200_000,
            very_large_dataset_bars: 1_000_000,
            compact_backtest_threshold: 500_000,
            heavy_compact_backtest_threshold: 250_000,
            batch_size_small: 32,
            batch_size_medium: 16,
            batch_size_large: 8,
            batch_size_very_large: 4,
            yield_budget_ms: 30,
            heavy_yield_budget_ms: 15,
            progress_interval_ms: 120,
            min_aligned_bars: 50,
        }
    }
}

/// 원격 백테스트 엔진 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// 원격 엔진 사용 여부
    pub enabled: bool,
    /// 원격 엔진 기본 URL
    pub base_url: String,
    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,
    /// 상태 확인 타임아웃 (초)
    pub health_timeout_secs: u64,
    /// 이 바 수를 넘으면 데이터셋을 원격에 캐시하고 참조로 전달
    pub cache_threshold_bars: usize,
    /// 이 바 수를 넘으면 메모리 보호를 위해 원격 엔진 비활성화
    pub extreme_threshold_bars: usize,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: "http://127.0.0.1:8787".to_string(),
            timeout_secs: 60,
            health_timeout_secs: 2,
            cache_threshold_bars: 20_000,
            extreme_threshold_bars: 2_000_000,
        }
    }
}

/// 강건성 검증 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RobustConfig {
    /// 셀당 샘플링할 파라미터 세트 수 (40..=240으로 제한)
    pub sample_budget: usize,
    /// Stage A: 홀드아웃 검사
    pub holdout: HoldoutThresholds,
    /// Stage B: 3구간 워크포워드
    pub stage_b: WalkForwardThresholds,
    /// Stage C: 6구간 워크포워드
    pub stage_c: WalkForwardThresholds,
    /// 셀 판정 기준
    pub cell: CellThresholds,
    /// 워크포워드 구간 배치
    pub folds: FoldLayout,
}

impl RobustConfig {
    /// 샘플링 예산 하한
    pub const MIN_SAMPLE_BUDGET: usize = 40;
    /// 샘플링 예산 상한
    pub const MAX_SAMPLE_BUDGET: usize = 240;

    /// 허용 범위로 제한된 샘플링 예산.
    pub fn effective_sample_budget(&self) -> usize {
        self.sample_budget
            .clamp(Self::MIN_SAMPLE_BUDGET, Self::MAX_SAMPLE_BUDGET)
    }
}

impl Default for RobustConfig {
    fn default() -> Self {
        Self {
            sample_budget: 120,
            holdout: HoldoutThresholds::default(),
            stage_b: WalkForwardThresholds::stage_b(),
            stage_c: WalkForwardThresholds::stage_c(),
            cell: CellThresholds::default(),
            folds: FoldLayout::default(),
        }
    }
}

/// Stage A 홀드아웃 검사 임계값.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HoldoutThresholds {
    /// 홀드아웃으로 쓰는 데이터셋 후반부 비율
    pub holdout_fraction: f64,
    /// 홀드아웃 최소 바 수
    pub min_holdout_bars: usize,
    /// 최소 거래 수
    pub min_trades: usize,
    /// 허용 최대 낙폭 (%)
    pub max_drawdown_pct: f64,
    /// 점수 계산 시 프로핏 팩터 상한
    pub profit_factor_cap: f64,
    /// 점수 계산 시 낙폭(%) 가중치
    pub drawdown_weight: f64,
}

impl Default for HoldoutThresholds {
    fn default() -> Self {
        Self {
            holdout_fraction: 0.30,
            min_holdout_bars: 40,
            min_trades: 8,
            max_drawdown_pct: 35.0,
            profit_factor_cap: 4.0,
            drawdown_weight: 0.05,
        }
    }
}

/// 워크포워드 단계(Stage B/C) 임계값.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WalkForwardThresholds {
    /// 테스트 구간 수
    pub folds: usize,
    /// 전체 OOS 최소 거래 수
    pub min_trades: usize,
    /// 수익 구간 비율 하한
    pub min_profitable_fold_ratio: f64,
    /// 구간 낙폭 초과 비율 상한
    pub max_breach_rate: f64,
    /// 전체 OOS 낙폭 상한 (%)
    pub max_combined_drawdown_pct: f64,
    /// 구간 안정성 페널티 상한
    pub max_stability_penalty: f64,
    /// 구간별 낙폭 한도 (%)
    pub fold_drawdown_cap_pct: f64,
}

impl WalkForwardThresholds {
    /// Stage B 기본값.
    pub fn stage_b() -> Self {
        Self {
            folds: 3,
            min_trades: 10,
            min_profitable_fold_ratio: 0.50,
            max_breach_rate: 0.34,
            max_combined_drawdown_pct: 35.0,
            max_stability_penalty: 2.5,
            fold_drawdown_cap_pct: 30.0,
        }
    }

    /// Stage C 기본값.
    pub fn stage_c() -> Self {
        Self {
            folds: 6,
            min_trades: 20,
            min_profitable_fold_ratio: 0.60,
            max_breach_rate: 0.20,
            max_combined_drawdown_pct: 30.0,
            max_stability_penalty: 1.8,
            fold_drawdown_cap_pct: 25.0,
        }
    }
}

impl Default for WalkForwardThresholds {
    fn default() -> Self {
        Self::stage_b()
    }
}

/// 셀 PASS/FAIL 판정 기준.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CellThresholds {
    /// Stage C 최소 생존 수
    pub min_survivors: usize,
    /// 최소 통과율 (0.01 = 1%)
    pub min_pass_rate: f64,
    /// 상위 10% 낙폭 초과 비율 상한
    pub max_breach_rate: f64,
    /// 상위 10% 안정성 페널티 상한
    pub max_stability_penalty: f64,
    /// 셀 중앙값 계산에 쓰는 상위 비율
    pub top_fraction: f64,
}

impl Default for CellThresholds {
    fn default() -> Self {
        Self {
            min_survivors: 2,
            min_pass_rate: 0.01,
            max_breach_rate: 0.20,
            max_stability_penalty: 1.8,
            top_fraction: 0.10,
        }
    }
}

/// 워크포워드 구간 배치.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FoldLayout {
    /// 첫 테스트 구간 이전의 워밍업 비율
    pub warmup_fraction: f64,
    /// 구간 경계 흔들림 (구간 길이 대비 비율)
    pub boundary_jitter: f64,
    /// 테스트 구간 최소 바 수
    pub min_fold_bars: usize,
}

impl Default for FoldLayout {
    fn default() -> Self {
        Self {
            warmup_fraction: 0.40,
            boundary_jitter: 0.10,
            min_fold_bars: 20,
        }
    }
}

impl FinderConfig {
    /// 파일과 환경 변수에서 설정을 로드합니다.
    ///
    /// 파일에 없는 항목은 기본값을 사용합니다.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .add_source(config::File::from(path.as_ref()).required(false))
            .add_source(
                config::Environment::with_prefix("FINDER")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// 기본 경로에서 설정을 로드합니다.
    pub fn load_default() -> Result<Self, config::ConfigError> {
        Self::load("config/default.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_budget_clamped() {
        let mut config = RobustConfig::default();
        assert_eq!(config.effective_sample_budget(), 120);

        config.sample_budget = 5;
        assert_eq!(config.effective_sample_budget(), 40);

        config.sample_budget = 10_000;
        assert_eq!(config.effective_sample_budget(), 240);
    }

    #[test]
    fn test_stage_defaults_are_stricter_in_c() {
        let b = WalkForwardThresholds::stage_b();
        let c = WalkForwardThresholds::stage_c();

        assert!(c.folds > b.folds);
        assert!(c.min_trades > b.min_trades);
        assert!(c.max_breach_rate < b.max_breach_rate);
        assert!(c.max_stability_penalty < b.max_stability_penalty);
        assert!(c.fold_drawdown_cap_pct < b.fold_drawdown_cap_pct);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: FinderConfig = from_json(
            r#"{ "engine": { "batch_size_large": 6 }, "robust": { "sample_budget": 60 } }"#,
        );
        assert_eq!(config.engine.batch_size_large, 6);
        assert_eq!(config.engine.compact_backtest_threshold, 500_000);
        assert_eq!(config.robust.sample_budget, 60);
        assert_eq!(config.robust.stage_c.folds, 6);
    }

    fn from_json(json: &str) -> FinderConfig {
        serde_json::from_str(json).unwrap()
    }
}
