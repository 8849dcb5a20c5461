//! 파라미터 세트와 백테스트 설정.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 전략 파라미터 세트 (이름 → 값).
///
/// `BTreeMap`이라 키 순서가 고정되며, 같은 세트는 항상 같은 방식으로
/// 직렬화·비교됩니다.
pub type ParamSet = BTreeMap<String, f64>;

/// 손절 비율 오버라이드 키.
pub const STOP_LOSS_KEY: &str = "stop_loss_pct";
/// 익절 비율 오버라이드 키.
pub const TAKE_PROFIT_KEY: &str = "take_profit_pct";

/// 리스크 설정 방식.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskMode {
    /// 설정에 고정된 손절/익절만 사용
    #[default]
    Fixed,
    /// 손절/익절 비율을 파라미터로 탐색
    Percentage,
}

/// 포지션 크기 산정 방식.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizingMode {
    /// 현재 자산 대비 비율 (`position_size`는 0..=1)
    #[default]
    PercentOfEquity,
    /// 고정 명목 금액 (`position_size`는 금액)
    FixedNotional,
}

/// 자본과 비용 설정.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapitalSettings {
    /// 초기 자본금
    pub initial_capital: f64,
    /// 포지션 크기 (산정 방식에 따라 비율 또는 금액)
    pub position_size: f64,
    /// 편도 수수료율 (%)
    pub commission_pct: f64,
    /// 포지션 크기 산정 방식
    #[serde(default)]
    pub sizing: SizingMode,
}

impl Default for CapitalSettings {
    fn default() -> Self {
        Self {
            initial_capital: 10_000.0,
            position_size: 1.0,
            commission_pct: 0.1,
            sizing: SizingMode::PercentOfEquity,
        }
    }
}

/// 체결 현실성 설정.
///
/// 원격 엔진은 이 설정들을 지원하지 않으므로, 하나라도 켜지면 실행은 로컬로
/// 고정됩니다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RealismSettings {
    /// 신호 다음 바 시가에 체결
    #[serde(default)]
    pub next_bar_execution: bool,
    /// 편도 슬리피지 (%)
    #[serde(default)]
    pub slippage_pct: f64,
}

impl RealismSettings {
    /// 로컬 실행이 보장되어야 하는지 여부.
    pub fn requires_local(&self) -> bool {
        self.next_bar_execution || self.slippage_pct > 0.0
    }
}

/// 작업 단위 백테스트 설정.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BacktestSettings {
    /// 리스크 설정 방식
    #[serde(default)]
    pub risk_mode: RiskMode,
    /// 손절 비율 (%)
    #[serde(default)]
    pub stop_loss_pct: Option<f64>,
    /// 익절 비율 (%)
    #[serde(default)]
    pub take_profit_pct: Option<f64>,
    /// 숏 포지션 허용 여부
    #[serde(default)]
    pub allow_short: bool,
    /// 체결 현실성
    #[serde(default)]
    pub realism: RealismSettings,
}

impl BacktestSettings {
    /// 퍼센트 리스크 모드에서 파라미터 기본값에 추가할 손절/익절 기본값.
    pub fn risk_override_defaults(&self) -> ParamSet {
        let mut defaults = ParamSet::new();
        if self.risk_mode == RiskMode::Percentage {
            defaults.insert(
                STOP_LOSS_KEY.to_string(),
                self.stop_loss_pct.unwrap_or(5.0),
            );
            defaults.insert(
                TAKE_PROFIT_KEY.to_string(),
                self.take_profit_pct.unwrap_or(10.0),
            );
        }
        defaults
    }

    /// 파라미터 세트에 손절/익절 오버라이드가 있으면 적용된 복사본을 반환합니다.
    ///
    /// 오버라이드가 없으면 `None`이며, 호출자는 공유 설정을 그대로 씁니다.
    pub fn with_overrides(&self, params: &ParamSet) -> Option<Self> {
        let stop_loss = params.get(STOP_LOSS_KEY).copied();
        let take_profit = params.get(TAKE_PROFIT_KEY).copied();
        if stop_loss.is_none() && take_profit.is_none() {
            return None;
        }

        let mut settings = self.clone();
        if let Some(sl) = stop_loss {
            settings.stop_loss_pct = (sl > 0.0).then_some(sl);
        }
        if let Some(tp) = take_profit {
            settings.take_profit_pct = (tp > 0.0).then_some(tp);
        }
        Some(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_override_defaults_only_in_percentage_mode() {
        let fixed = BacktestSettings::default();
        assert!(fixed.risk_override_defaults().is_empty());

        let pct = BacktestSettings {
            risk_mode: RiskMode::Percentage,
            stop_loss_pct: Some(3.0),
            ..Default::default()
        };
        let defaults = pct.risk_override_defaults();
        assert_eq!(defaults.get(STOP_LOSS_KEY), Some(&3.0));
        assert_eq!(defaults.get(TAKE_PROFIT_KEY), Some(&10.0));
    }

    #[test]
    fn test_with_overrides() {
        let base = BacktestSettings::default();
        let mut params = ParamSet::new();
        params.insert("fast".to_string(), 10.0);
        assert!(base.with_overrides(&params).is_none());

        params.insert(STOP_LOSS_KEY.to_string(), 2.5);
        params.insert(TAKE_PROFIT_KEY.to_string(), 0.0);
        let overridden = base.with_overrides(&params).unwrap();
        assert_eq!(overridden.stop_loss_pct, Some(2.5));
        assert_eq!(overridden.take_profit_pct, None);
    }

    #[test]
    fn test_realism_requires_local() {
        assert!(!RealismSettings::default().requires_local());
        let realism = RealismSettings {
            slippage_pct: 0.05,
            ..Default::default()
        };
        assert!(realism.requires_local());
    }
}
