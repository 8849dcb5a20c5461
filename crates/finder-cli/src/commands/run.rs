//! `run` 명령: 데이터 로드 → 파인더 실행 → 결과 출력.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use finder_core::{FinderConfig, Timeframe, TimeframeDataset};
use finder_engine::{
    FinderCallbacks, FinderInput, FinderRun, FinderRunner, Progress, RobustOptions, SortPriority,
};
use finder_remote::HttpRemoteEngine;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use super::data::{load_dataset, DataSpec};
use super::report::{format_results, format_robust, save_run};
use super::search::SearchFile;

/// `run` 명령 옵션.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub data: Vec<DataSpec>,
    /// 타임프레임이 지정되지 않은 데이터 파일의 타임프레임
    pub default_timeframe: Timeframe,
    pub search: Option<PathBuf>,
    /// 실행할 전략 키 (비어 있으면 탐색 파일의 전체)
    pub strategies: Vec<String>,
    pub top: usize,
    pub min_trades: usize,
    pub sort: Option<SortPriority>,
    pub max_combinations: Option<usize>,
    pub robust: bool,
    pub seed: Option<f64>,
    pub budget: Option<usize>,
    pub remote_url: Option<String>,
    pub output: Option<PathBuf>,
    pub quiet: bool,
}

/// indicatif 진행 표시줄 콜백.
pub struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    pub fn new(hidden: bool) -> Result<Self> {
        let bar = if hidden {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(0)
        };
        bar.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg} ({eta})",
                )?
                .progress_chars("#>-"),
        );
        Ok(Self { bar })
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl FinderCallbacks for ProgressReporter {
    fn on_progress(&self, progress: &Progress) {
        self.bar.set_length(progress.total as u64);
        self.bar.set_position(progress.completed as u64);
        self.bar.set_message(progress.phase.clone());
    }

    fn on_status(&self, status: &str) {
        self.bar.println(status);
    }
}

/// 데이터 파일들을 읽습니다. 같은 타임프레임이 두 번 지정되면 에러입니다.
pub fn load_datasets(specs: &[DataSpec], default_timeframe: Timeframe) -> Result<Vec<TimeframeDataset>> {
    if specs.is_empty() {
        bail!("At least one --data file is required");
    }
    let mut datasets: Vec<TimeframeDataset> = Vec::with_capacity(specs.len());
    for spec in specs {
        let timeframe = spec.timeframe.unwrap_or(default_timeframe);
        if datasets.iter().any(|d| d.timeframe == timeframe) {
            bail!("Timeframe {} given more than once", timeframe);
        }
        datasets.push(load_dataset(&spec.path, timeframe)?);
    }
    Ok(datasets)
}

/// 옵션으로 파인더 입력을 구성합니다.
pub fn build_input(options: &RunOptions, search: &SearchFile) -> Result<FinderInput> {
    let datasets = load_datasets(&options.data, options.default_timeframe)?;
    let strategies = search.selections(&options.strategies)?;
    if strategies.is_empty() {
        bail!("No strategies selected");
    }

    let mut input = FinderInput::new(datasets, strategies);
    input.confirmation = search.confirmation_gate()?;
    if let Some(capital) = &search.capital {
        input.capital = capital.clone();
    }
    if let Some(settings) = &search.settings {
        input.settings = settings.clone();
    }
    if let Some(generator) = &search.generator {
        input.generator_options = generator.clone();
    }
    if let Some(max) = options.max_combinations {
        input.generator_options.max_combinations = max;
    }
    if let Some(sort) = &options.sort {
        input.sort = sort.clone();
    }
    input.top_n = options.top;
    input.min_trades = options.min_trades;
    if options.robust {
        input.robust = Some(RobustOptions {
            seed: options.seed,
            sample_budget: options.budget,
        });
    }
    Ok(input)
}

/// 설정에 따라 실행기를 만듭니다. 원격 URL이 있으면 HTTP 엔진을 붙입니다.
pub fn build_runner(mut config: FinderConfig, remote_url: Option<&str>) -> Result<FinderRunner> {
    if let Some(url) = remote_url {
        config.remote.base_url = url.to_string();
        config.remote.enabled = true;
    }
    let remote = if config.remote.enabled {
        let engine = HttpRemoteEngine::from_config(&config.remote)
            .context("Failed to create remote engine client")?;
        info!(url = %config.remote.base_url, "Remote engine configured");
        Some(engine)
    } else {
        None
    };

    let mut runner = FinderRunner::new(config);
    if let Some(engine) = remote {
        runner = runner.with_remote(Arc::new(engine));
    }
    Ok(runner)
}

/// `run` 명령 실행.
pub async fn run_finder(config: FinderConfig, options: RunOptions) -> Result<FinderRun> {
    let search = match &options.search {
        Some(path) => SearchFile::load(path)?,
        None => SearchFile::default(),
    };
    let input = build_input(&options, &search)?;
    info!(
        datasets = input.datasets.len(),
        strategies = input.strategies.len(),
        robust = input.robust.is_some(),
        "Starting finder run"
    );

    let runner = build_runner(config, options.remote_url.as_deref())?;
    let reporter = ProgressReporter::new(options.quiet)?;
    let run = runner.run(input, &reporter).await;
    reporter.finish();

    if !run.status.is_completed() {
        warn!(status = %run.status, "Finder run did not complete");
        println!("Run ended: {}", run.status);
    } else {
        println!("{}", format_results(&run));
        if let Some(report) = &run.robust {
            println!("{}", format_robust(report));
        }
    }

    if let Some(path) = &options.output {
        save_run(&run, path)?;
        println!("Report saved to {}", path.display());
    }

    Ok(run)
}
