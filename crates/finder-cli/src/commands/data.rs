//! CSV 가격 데이터 로드.
//!
//! 열 순서는 `time,open,high,low,close[,volume]`입니다. 첫 줄이 숫자로
//! 시작하지 않으면 헤더로 보고 건너뜁니다. `#` 주석 줄과 빈 줄은 무시합니다. 시각은 바 종료 시각이며 다음
//! 형식을 받습니다:
//! - RFC 3339 (`2024-01-01T00:00:00Z`)
//! - `YYYY-MM-DD HH:MM:SS` / `YYYY-MM-DD` (UTC)
//! - 유닉스 초 또는 밀리초

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use finder_core::{Bar, Timeframe, TimeframeDataset};
use serde::Deserialize;
use tracing::{debug, warn};

/// `--data` 인자: `경로` 또는 `타임프레임=경로`.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSpec {
    pub timeframe: Option<Timeframe>,
    pub path: PathBuf,
}

impl FromStr for DataSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((tf, path)) => Ok(Self {
                timeframe: Some(tf.trim().parse()?),
                path: PathBuf::from(path.trim()),
            }),
            None => Ok(Self {
                timeframe: None,
                path: PathBuf::from(s),
            }),
        }
    }
}

/// CSV 파일을 읽어 데이터셋을 만듭니다.
pub fn load_dataset(path: &Path, timeframe: Timeframe) -> Result<TimeframeDataset> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read data file: {}", path.display()))?;
    let bars = parse_csv(&content)
        .with_context(|| format!("Failed to parse data file: {}", path.display()))?;
    debug!(path = %path.display(), %timeframe, bars = bars.len(), "Loaded dataset");
    Ok(TimeframeDataset::new(timeframe, bars))
}

/// 위치 기반 CSV 행. 헤더 이름은 보지 않습니다.
#[derive(Debug, Deserialize)]
struct CsvRow {
    time: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: Option<f64>,
}

impl CsvRow {
    fn into_bar(self) -> Result<Bar> {
        let time = parse_time(&self.time)?;
        Ok(Bar::new(
            time,
            self.open,
            self.high,
            self.low,
            self.close,
            self.volume.unwrap_or(0.0),
        ))
    }
}

/// CSV 본문을 바 목록으로 변환합니다. 결과는 시각 순서로 정렬됩니다.
pub fn parse_csv(content: &str) -> Result<Vec<Bar>> {
    let has_headers = content
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with('#'))
        .is_some_and(|line| !starts_with_digit(line));

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(has_headers)
        .flexible(true)
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(content.as_bytes());

    let mut bars = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| {
            let line = e.position().map_or(0, |p| p.line());
            anyhow!(e).context(format!("line {}", line))
        })?;
        let line = record.position().map_or(0, |p| p.line());
        if record.len() < 5 {
            bail!("line {}: expected at least 5 columns, got {}", line, record.len());
        }
        let bar = record
            .deserialize::<CsvRow>(None)
            .map_err(anyhow::Error::from)
            .and_then(CsvRow::into_bar)
            .with_context(|| format!("line {}", line))?;
        bars.push(bar);
    }

    if bars.windows(2).any(|w| w[0].time > w[1].time) {
        warn!("Rows are not in time order, sorting");
        bars.sort_by_key(|b| b.time);
    }
    Ok(bars)
}

fn starts_with_digit(line: &str) -> bool {
    line.chars().next().is_some_and(|c| c.is_ascii_digit())
}

/// 시각 문자열을 UTC로 변환합니다.
pub fn parse_time(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = s.parse::<i64>() {
        // 10^11 이상은 밀리초로 본다
        let parsed = if ts.abs() >= 100_000_000_000 {
            Utc.timestamp_millis_opt(ts).single()
        } else {
            Utc.timestamp_opt(ts, 0).single()
        };
        return parsed.ok_or_else(|| anyhow!("timestamp out of range: {}", s));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Ok(dt.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(dt) = date.and_hms_opt(0, 0, 0) {
            return Ok(dt.and_utc());
        }
    }
    Err(anyhow!("unrecognized time format: {}", s))
}
