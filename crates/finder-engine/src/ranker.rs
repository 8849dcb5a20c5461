//! 상위 N 결과 랭커.
//!
//! 수천 개의 조합을 훑는 동안 메모리에는 `K = max(요청 N, 50)`개만 유지합니다.
//! 후보는 정렬 위치에 삽입되고, 용량을 넘으면 가장 낮은 순위가 밀려납니다.
//! 같은 순위의 후보는 먼저 들어온 쪽이 앞섭니다.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use finder_core::BacktestResult;
use serde::{Deserialize, Serialize};

/// 최소 유지 용량.
pub const MIN_RANKER_CAPACITY: usize = 50;

/// 정렬 지표.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMetric {
    ProfitFactor,
    NetProfit,
    NetProfitPercent,
    WinRate,
    Expectancy,
    AvgTrade,
    SharpeRatio,
    TotalTrades,
    MaxDrawdownPercent,
}

impl SortMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortMetric::ProfitFactor => "profit_factor",
            SortMetric::NetProfit => "net_profit",
            SortMetric::NetProfitPercent => "net_profit_percent",
            SortMetric::WinRate => "win_rate",
            SortMetric::Expectancy => "expectancy",
            SortMetric::AvgTrade => "avg_trade",
            SortMetric::SharpeRatio => "sharpe_ratio",
            SortMetric::TotalTrades => "total_trades",
            SortMetric::MaxDrawdownPercent => "max_drawdown_percent",
        }
    }

    /// 변동성에 민감한 지표인지 여부 (계산 방식이 백엔드마다 다를 수 있음).
    pub fn is_volatility_sensitive(&self) -> bool {
        matches!(self, SortMetric::SharpeRatio)
    }

    /// 결과에서 지표 값을 읽습니다.
    pub fn value(&self, result: &BacktestResult) -> f64 {
        match self {
            SortMetric::ProfitFactor => result.profit_factor,
            SortMetric::NetProfit => result.net_profit,
            SortMetric::NetProfitPercent => result.net_profit_percent,
            SortMetric::WinRate => result.win_rate,
            SortMetric::Expectancy => result.expectancy,
            SortMetric::AvgTrade => result.avg_trade,
            SortMetric::SharpeRatio => result.sharpe_ratio,
            SortMetric::TotalTrades => result.total_trades as f64,
            SortMetric::MaxDrawdownPercent => result.max_drawdown_percent,
        }
    }
}

impl FromStr for SortMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "profit_factor" | "pf" => Ok(SortMetric::ProfitFactor),
            "net_profit" => Ok(SortMetric::NetProfit),
            "net_profit_percent" => Ok(SortMetric::NetProfitPercent),
            "win_rate" => Ok(SortMetric::WinRate),
            "expectancy" => Ok(SortMetric::Expectancy),
            "avg_trade" => Ok(SortMetric::AvgTrade),
            "sharpe_ratio" | "sharpe" => Ok(SortMetric::SharpeRatio),
            "total_trades" | "trades" => Ok(SortMetric::TotalTrades),
            "max_drawdown_percent" | "drawdown" => Ok(SortMetric::MaxDrawdownPercent),
            _ => Err(format!("Unknown sort metric: {}", s)),
        }
    }
}

/// 정렬 방향.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

/// 정렬 키 하나.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub metric: SortMetric,
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortKey {
    pub fn desc(metric: SortMetric) -> Self {
        Self {
            metric,
            direction: SortDirection::Desc,
        }
    }

    pub fn asc(metric: SortMetric) -> Self {
        Self {
            metric,
            direction: SortDirection::Asc,
        }
    }

    /// `a`가 앞 순위면 `Less`. NaN은 방향과 무관하게 가장 뒤로 갑니다.
    fn compare(&self, a: f64, b: f64) -> Ordering {
        let worst = match self.direction {
            SortDirection::Desc => f64::NEG_INFINITY,
            SortDirection::Asc => f64::INFINITY,
        };
        let a = if a.is_nan() { worst } else { a };
        let b = if b.is_nan() { worst } else { b };
        match self.direction {
            SortDirection::Desc => b.total_cmp(&a),
            SortDirection::Asc => a.total_cmp(&b),
        }
    }
}

/// `metric` 또는 `metric:asc|desc` 형식.
impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (metric, direction) = match s.split_once(':') {
            Some((m, d)) => (m, d.trim().to_lowercase()),
            None => (s, "desc".to_string()),
        };
        let direction = match direction.as_str() {
            "desc" => SortDirection::Desc,
            "asc" => SortDirection::Asc,
            other => return Err(format!("Unknown sort direction: {}", other)),
        };
        Ok(Self {
            metric: metric.parse()?,
            direction,
        })
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dir = match self.direction {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        };
        write!(f, "{}:{}", self.metric.as_str(), dir)
    }
}

/// 다중 키 정렬 우선순위.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortPriority(pub Vec<SortKey>);

impl Default for SortPriority {
    /// 프로핏 팩터 내림차순, 총 거래 수 내림차순.
    fn default() -> Self {
        Self(vec![
            SortKey::desc(SortMetric::ProfitFactor),
            SortKey::desc(SortMetric::TotalTrades),
        ])
    }
}

impl SortPriority {
    /// 변동성 민감 지표 포함 여부.
    pub fn includes_volatility_metric(&self) -> bool {
        self.0.iter().any(|k| k.metric.is_volatility_sensitive())
    }

    /// 두 결과를 비교합니다. `a`가 앞 순위면 `Less`.
    pub fn compare(&self, a: &BacktestResult, b: &BacktestResult) -> Ordering {
        self.0
            .iter()
            .map(|key| key.compare(key.metric.value(a), key.metric.value(b)))
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}

/// 쉼표로 구분된 정렬 키 목록 (예: `profit_factor:desc,total_trades`).
impl FromStr for SortPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let keys = s
            .split(',')
            .filter(|part| !part.trim().is_empty())
            .map(str::parse)
            .collect::<Result<Vec<SortKey>, _>>()?;
        if keys.is_empty() {
            return Err("Empty sort priority".to_string());
        }
        Ok(Self(keys))
    }
}

/// 랭킹 대상.
pub trait Rankable {
    fn backtest(&self) -> &BacktestResult;
}

impl Rankable for BacktestResult {
    fn backtest(&self) -> &BacktestResult {
        self
    }
}

/// 용량이 제한된 정렬 컬렉션.
#[derive(Debug, Clone)]
pub struct ResultRanker<T> {
    capacity: usize,
    priority: SortPriority,
    items: Vec<T>,
}

impl<T: Rankable> ResultRanker<T> {
    /// 요청 N에 맞춰 `max(N, 50)` 용량으로 생성합니다.
    pub fn new(top_n: usize, priority: SortPriority) -> Self {
        Self::with_capacity(top_n.max(MIN_RANKER_CAPACITY), priority)
    }

    /// 정확한 용량으로 생성합니다 (최소 1).
    pub fn with_capacity(capacity: usize, priority: SortPriority) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            priority,
            items: Vec::with_capacity(capacity.min(1_024) + 1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn priority(&self) -> &SortPriority {
        &self.priority
    }

    /// 현재 가장 낮은 순위.
    pub fn worst(&self) -> Option<&T> {
        self.items.last()
    }

    /// 후보를 정렬 위치에 넣습니다. 유지되면 `true`.
    ///
    /// 가득 찬 상태에서 최하위보다 나쁘거나 같은 후보는 넣지 않습니다.
    pub fn offer(&mut self, candidate: T) -> bool {
        let position = self.items.partition_point(|existing| {
            self.priority
                .compare(existing.backtest(), candidate.backtest())
                != Ordering::Greater
        });
        if position >= self.capacity {
            return false;
        }
        self.items.insert(position, candidate);
        self.items.truncate(self.capacity);
        true
    }

    /// 상위 `n`개를 최종 순서로 반환합니다.
    pub fn into_sorted_vec(mut self, n: usize) -> Vec<T> {
        self.items.truncate(n.min(self.capacity));
        self.items
    }

    /// 상위 `n`개의 복사본.
    pub fn to_sorted_vec(&self, n: usize) -> Vec<T>
    where
        T: Clone,
    {
        self.items.iter().take(n).cloned().collect()
    }
}
