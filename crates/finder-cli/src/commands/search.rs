//! 탐색 설정 파일과 전략 레지스트리.
//!
//! 탐색 파일(TOML 또는 JSON)은 전략별 파라미터 범위, 확인 전략, 자본/백테스트
//! 설정을 담습니다.
//!
//! ```toml
//! confirmation_lookback = 3
//!
//! [strategies.sma_cross]
//! fast = { start = 5, end = 20, step = 5 }
//! slow = { start = 30, end = 90, step = 30 }
//!
//! [[confirmations]]
//! strategy = "channel_breakout"
//! params = { lookback = 20 }
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use finder_core::{BacktestSettings, CapitalSettings, ParamSet};
use finder_engine::StrategySelection;
use finder_strategy::{
    ChannelBreakoutStrategy, ConfirmationFilter, ConfirmationGate, GeneratorOptions, GridGenerator,
    ParamRange, SmaCrossStrategy, StrategyHandle,
};
use serde::Deserialize;

/// 등록된 전략 전체.
pub fn registry() -> Vec<StrategyHandle> {
    vec![
        StrategyHandle::classify(Arc::new(SmaCrossStrategy)),
        StrategyHandle::classify(Arc::new(ChannelBreakoutStrategy)),
    ]
}

/// 키로 전략을 찾습니다.
pub fn find_strategy(key: &str) -> Result<StrategyHandle> {
    registry()
        .into_iter()
        .find(|s| s.key() == key)
        .ok_or_else(|| anyhow!("Unknown strategy: {}", key))
}

/// 확인 전략 항목.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmationSpec {
    pub strategy: String,
    #[serde(default)]
    pub params: ParamSet,
}

/// 탐색 설정 파일.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchFile {
    /// 전략 키 → (파라미터 이름 → 범위)
    #[serde(default)]
    pub strategies: BTreeMap<String, BTreeMap<String, ParamRange>>,
    #[serde(default)]
    pub confirmations: Vec<ConfirmationSpec>,
    #[serde(default = "default_confirmation_lookback")]
    pub confirmation_lookback: usize,
    #[serde(default)]
    pub generator: Option<GeneratorOptions>,
    #[serde(default)]
    pub capital: Option<CapitalSettings>,
    #[serde(default)]
    pub settings: Option<BacktestSettings>,
}

fn default_confirmation_lookback() -> usize {
    3
}

impl Default for SearchFile {
    /// 등록된 두 전략의 기본 탐색 범위.
    fn default() -> Self {
        let mut strategies = BTreeMap::new();
        strategies.insert(
            "sma_cross".to_string(),
            BTreeMap::from([
                ("fast".to_string(), ParamRange::new(5.0, 20.0, 5.0)),
                ("slow".to_string(), ParamRange::new(30.0, 90.0, 15.0)),
            ]),
        );
        strategies.insert(
            "channel_breakout".to_string(),
            BTreeMap::from([
                ("lookback".to_string(), ParamRange::new(10.0, 50.0, 10.0)),
                ("exit_lookback".to_string(), ParamRange::new(5.0, 20.0, 5.0)),
            ]),
        );
        Self {
            strategies,
            confirmations: Vec::new(),
            confirmation_lookback: default_confirmation_lookback(),
            generator: None,
            capital: None,
            settings: None,
        }
    }
}

impl SearchFile {
    /// 확장자로 형식을 판별해 읽습니다 (`.json`이면 JSON, 그 외 TOML).
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read search file: {}", path.display()))?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");
        let file = if ext.eq_ignore_ascii_case("json") {
            serde_json::from_str(&content).context("Failed to parse JSON search file")?
        } else {
            toml::from_str(&content).context("Failed to parse TOML search file")?
        };
        Ok(file)
    }

    /// 전략 선택 목록. `only`가 비어 있지 않으면 해당 키만 남깁니다.
    pub fn selections(&self, only: &[String]) -> Result<Vec<StrategySelection>> {
        for key in only {
            if !self.strategies.contains_key(key) {
                find_strategy(key)?;
            }
        }

        let mut selections = Vec::new();
        for (key, ranges) in &self.strategies {
            if !only.is_empty() && !only.contains(key) {
                continue;
            }
            let strategy = find_strategy(key)?;
            let generator = GridGenerator::from_ranges(ranges.clone());
            selections.push(StrategySelection::new(strategy, Arc::new(generator)));
        }
        // 범위 없이 지정된 전략은 기본 파라미터로 한 번 실행
        for key in only {
            if !self.strategies.contains_key(key) {
                let strategy = find_strategy(key)?;
                selections.push(StrategySelection::new(
                    strategy,
                    Arc::new(GridGenerator::new()),
                ));
            }
        }
        Ok(selections)
    }

    /// 확인 전략 게이트.
    pub fn confirmation_gate(&self) -> Result<ConfirmationGate> {
        let filters = self
            .confirmations
            .iter()
            .map(|spec| {
                let strategy = find_strategy(&spec.strategy)?;
                let mut params = strategy.default_params();
                params.extend(spec.params.iter().map(|(k, v)| (k.clone(), *v)));
                Ok(ConfirmationFilter::new(strategy, params))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(ConfirmationGate::new(filters, self.confirmation_lookback))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_toml_search_file() {
        let file: SearchFile = toml::from_str(
            r#"
            confirmation_lookback = 2

            [strategies.sma_cross]
            fast = { start = 5, end = 10, step = 5 }

            [[confirmations]]
            strategy = "channel_breakout"
            params = { lookback = 15 }
            "#,
        )
        .unwrap();

        assert_eq!(file.strategies.len(), 1);
        assert_eq!(file.confirmation_lookback, 2);

        let selections = file.selections(&[]).unwrap();
        assert_eq!(selections.len(), 1);
        assert_eq!(selections[0].strategy.key(), "sma_cross");

        let gate = file.confirmation_gate().unwrap();
        assert_eq!(gate.filters().len(), 1);
        assert_eq!(gate.filters()[0].params.get("lookback"), Some(&15.0));
    }

    #[test]
    fn test_unknown_strategy_rejected() {
        let file: SearchFile = toml::from_str(
            r#"
            [strategies.martingale]
            size = { start = 1, end = 2, step = 1 }
            "#,
        )
        .unwrap();
        assert!(file.selections(&[]).is_err());
        assert!(SearchFile::default()
            .selections(&["martingale".to_string()])
            .is_err());
    }

    #[test]
    fn test_default_search_filters_by_key() {
        let file = SearchFile::default();
        assert_eq!(file.selections(&[]).unwrap().len(), 2);

        let only = file.selections(&["channel_breakout".to_string()]).unwrap();
        assert_eq!(only.len(), 1);
        assert_eq!(only[0].strategy.key(), "channel_breakout");
        assert!(file.confirmation_gate().unwrap().is_empty());
    }
}
