//! CLI 명령 모듈.

pub mod data;
pub mod report;
pub mod run;
pub mod search;

pub use data::{load_dataset, parse_csv, DataSpec};
pub use report::{format_params, format_results, format_robust, save_run};
pub use run::{build_input, build_runner, load_datasets, run_finder, ProgressReporter, RunOptions};
pub use search::{find_strategy, registry, SearchFile};
