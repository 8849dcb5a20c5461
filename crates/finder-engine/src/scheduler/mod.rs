//! 작업 스케줄러와 데이터셋 크기 정책.

pub mod flags;
pub mod jobs;

pub use flags::{is_heavy_config, FinderDatasetFlags};
pub use jobs::{JobScheduler, ParamJob, StrategyPlan, StrategySelection};
