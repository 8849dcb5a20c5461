//! 전략 파인더 CLI.
//!
//! # 사용 예시
//!
//! ```bash
//! # 1시간봉 데이터로 기본 탐색 범위 실행
//! finder run -d data/btc_1h.csv
//!
//! # 1시간봉 + 4시간봉, SMA 크로스만, 순수익 기준 정렬
//! finder run -d 1h=data/btc_1h.csv -d 4h=data/btc_4h.csv -s sma_cross --sort net_profit
//!
//! # 로버스트 랜덤 워크포워드 검증
//! finder run -d data/btc_1h.csv --robust --seed 42 -o reports/robust.json
//!
//! # 등록된 전략 목록
//! finder strategies
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use finder_cli::commands::report::format_params;
use finder_cli::commands::{registry, run_finder, DataSpec, RunOptions};
use finder_core::{init_logging, FinderConfig, LogConfig, Timeframe};
use finder_engine::SortPriority;
use tracing::error;

#[derive(Parser)]
#[command(name = "finder")]
#[command(about = "Strategy finder - 전략 × 파라미터 대량 백테스트와 로버스트 검증", long_about = None)]
#[command(version)]
struct Cli {
    /// 설정 파일 경로
    #[arg(short, long, global = true, default_value = "config/default.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 전략 파인더 실행
    Run {
        /// 데이터 CSV (`경로` 또는 `타임프레임=경로`, 여러 번 지정 가능)
        #[arg(short, long = "data", required = true)]
        data: Vec<DataSpec>,

        /// 타임프레임이 없는 데이터 파일의 타임프레임
        #[arg(short, long, default_value = "1h")]
        timeframe: Timeframe,

        /// 탐색 설정 파일 (TOML/JSON, 없으면 기본 범위)
        #[arg(long)]
        search: Option<PathBuf>,

        /// 실행할 전략 키 (여러 번 지정 가능)
        #[arg(short, long = "strategy")]
        strategies: Vec<String>,

        /// 출력할 상위 후보 수
        #[arg(long, default_value = "10")]
        top: usize,

        /// 랭킹 전 최소 거래 수
        #[arg(long, default_value = "1")]
        min_trades: usize,

        /// 정렬 우선순위 (예: profit_factor:desc,total_trades)
        #[arg(long)]
        sort: Option<SortPriority>,

        /// 전략당 최대 조합 수
        #[arg(long)]
        max_combinations: Option<usize>,

        /// 로버스트 랜덤 워크포워드 검증 사용
        #[arg(long)]
        robust: bool,

        /// 로버스트 모드 시드
        #[arg(long)]
        seed: Option<f64>,

        /// 셀당 샘플링 예산
        #[arg(long)]
        budget: Option<usize>,

        /// 원격 엔진 URL (지정하면 원격 실행 활성화)
        #[arg(long)]
        remote_url: Option<String>,

        /// 결과 JSON 저장 경로
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 진행 표시줄 숨기기
        #[arg(short, long)]
        quiet: bool,
    },

    /// 등록된 전략과 기본 파라미터 목록
    Strategies,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = FinderConfig::load(&cli.config)
        .with_context(|| format!("Failed to load config: {}", cli.config.display()))?;

    if let Err(e) = init_logging(LogConfig::from_section(&config.logging)) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    match cli.command {
        Commands::Run {
            data,
            timeframe,
            search,
            strategies,
            top,
            min_trades,
            sort,
            max_combinations,
            robust,
            seed,
            budget,
            remote_url,
            output,
            quiet,
        } => {
            let options = RunOptions {
                data,
                default_timeframe: timeframe,
                search,
                strategies,
                top,
                min_trades,
                sort,
                max_combinations,
                robust,
                seed,
                budget,
                remote_url,
                output,
                quiet,
            };

            match run_finder(config, options).await {
                Ok(run) if run.status.is_completed() => {}
                Ok(_) => std::process::exit(2),
                Err(e) => {
                    error!("Finder run failed: {:#}", e);
                    return Err(e);
                }
            }
        }
        Commands::Strategies => {
            println!("{:<18} {:<20} {:<8} {}", "Key", "Name", "Role", "Defaults");
            println!("{}", "-".repeat(80));
            for strategy in registry() {
                let role = if strategy.is_entry() { "entry" } else { "signal" };
                println!(
                    "{:<18} {:<20} {:<8} {}",
                    strategy.key(),
                    strategy.name(),
                    role,
                    format_params(&strategy.default_params())
                );
            }
        }
    }

    Ok(())
}
