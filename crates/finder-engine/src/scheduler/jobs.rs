//! 전략 × 파라미터 세트 작업 스케줄러.
//!
//! 전략마다 파라미터 세트 큐([`StrategyPlan`])를 한 번 만들고, 선언 순서대로
//! 커서를 전진시키며 작업을 배치 단위로 꺼냅니다. 작업 ID와 커서는 실행마다
//! 새로 만드는 스케줄러 인스턴스의 필드입니다.

use std::sync::Arc;

use finder_core::{BacktestSettings, ParamSet};
use finder_strategy::{GeneratorOptions, ParamSetGenerator, StrategyHandle};
use tracing::debug;

/// 호출자가 선택한 전략과 그 파라미터 생성기.
#[derive(Clone)]
pub struct StrategySelection {
    pub strategy: StrategyHandle,
    pub generator: Arc<dyn ParamSetGenerator>,
}

impl StrategySelection {
    pub fn new(strategy: StrategyHandle, generator: Arc<dyn ParamSetGenerator>) -> Self {
        Self {
            strategy,
            generator,
        }
    }
}

impl std::fmt::Debug for StrategySelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategySelection")
            .field("strategy", &self.strategy)
            .finish_non_exhaustive()
    }
}

/// 전략 하나의 파라미터 세트 큐.
#[derive(Debug, Clone)]
pub struct StrategyPlan {
    pub key: String,
    pub name: String,
    pub strategy: StrategyHandle,
    pub param_sets: Vec<ParamSet>,
}

impl StrategyPlan {
    /// 생성기를 실행해 계획을 만듭니다.
    ///
    /// 기본 파라미터에는 퍼센트 리스크 모드의 손절/익절 기본값이 추가됩니다.
    pub fn build(
        selection: &StrategySelection,
        settings: &BacktestSettings,
        options: &GeneratorOptions,
    ) -> Self {
        let mut defaults = selection.strategy.default_params();
        for (key, value) in settings.risk_override_defaults() {
            defaults.entry(key).or_insert(value);
        }
        let param_sets = selection.generator.generate(&defaults, options);

        Self {
            key: selection.strategy.key().to_string(),
            name: selection.strategy.name().to_string(),
            strategy: selection.strategy.clone(),
            param_sets,
        }
    }
}

/// 실행 단위 작업 하나. 생성 후 변경되지 않습니다.
#[derive(Debug, Clone)]
pub struct ParamJob {
    /// 실행 내 단조 증가 ID
    pub id: u64,
    pub strategy_key: String,
    pub strategy_name: String,
    pub params: ParamSet,
    /// 작업별 설정. 오버라이드가 없으면 실행 기본 설정을 공유합니다.
    pub settings: Arc<BacktestSettings>,
    pub strategy: StrategyHandle,
}

/// 당기기 방식의 작업 스케줄러.
#[derive(Debug)]
pub struct JobScheduler {
    plans: Vec<StrategyPlan>,
    base_settings: Arc<BacktestSettings>,
    plan_cursor: usize,
    set_cursor: usize,
    next_id: u64,
    total: usize,
    emitted: usize,
}

impl JobScheduler {
    /// 전략 선택 목록에서 스케줄러를 만듭니다.
    pub fn new(
        selections: &[StrategySelection],
        settings: BacktestSettings,
        options: &GeneratorOptions,
    ) -> Self {
        let plans = selections
            .iter()
            .map(|s| StrategyPlan::build(s, &settings, options))
            .collect();
        Self::from_plans(plans, settings)
    }

    /// 이미 만든 계획으로 스케줄러를 만듭니다. 빈 계획은 버립니다.
    pub fn from_plans(plans: Vec<StrategyPlan>, settings: BacktestSettings) -> Self {
        let plans: Vec<StrategyPlan> = plans
            .into_iter()
            .filter(|plan| {
                if plan.param_sets.is_empty() {
                    debug!(strategy = %plan.key, "Dropping plan without parameter sets");
                }
                !plan.param_sets.is_empty()
            })
            .collect();
        let total = plans.iter().map(|p| p.param_sets.len()).sum();

        Self {
            plans,
            base_settings: Arc::new(settings),
            plan_cursor: 0,
            set_cursor: 0,
            next_id: 1,
            total,
            emitted: 0,
        }
    }

    /// 전체 작업 수.
    pub fn total_runs(&self) -> usize {
        self.total
    }

    /// 아직 꺼내지 않은 작업 수.
    pub fn remaining(&self) -> usize {
        self.total - self.emitted
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    pub fn plans(&self) -> &[StrategyPlan] {
        &self.plans
    }

    pub fn base_settings(&self) -> &Arc<BacktestSettings> {
        &self.base_settings
    }

    /// 파라미터 세트에 맞는 작업 설정 (오버라이드가 있을 때만 복사).
    pub fn settings_for(&self, params: &ParamSet) -> Arc<BacktestSettings> {
        match self.base_settings.with_overrides(params) {
            Some(settings) => Arc::new(settings),
            None => Arc::clone(&self.base_settings),
        }
    }

    /// 최대 `batch_size`개의 작업을 꺼냅니다.
    ///
    /// 모든 계획이 소진된 경우에만 요청보다 적게 반환합니다.
    pub fn next_job_batch(&mut self, batch_size: usize) -> Vec<ParamJob> {
        let mut batch = Vec::with_capacity(batch_size.min(self.remaining()));

        while batch.len() < batch_size {
            let Some(plan) = self.plans.get(self.plan_cursor) else {
                break;
            };
            let Some(params) = plan.param_sets.get(self.set_cursor) else {
                self.plan_cursor += 1;
                self.set_cursor = 0;
                continue;
            };

            let job = ParamJob {
                id: self.next_id,
                strategy_key: plan.key.clone(),
                strategy_name: plan.name.clone(),
                params: params.clone(),
                settings: self.settings_for(params),
                strategy: plan.strategy.clone(),
            };
            self.next_id += 1;
            self.set_cursor += 1;
            self.emitted += 1;
            batch.push(job);
        }

        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use finder_core::{RiskMode, STOP_LOSS_KEY, TAKE_PROFIT_KEY};
    use finder_strategy::{ChannelBreakoutStrategy, SmaCrossStrategy};

    fn fixed_count(count: usize) -> Arc<dyn ParamSetGenerator> {
        Arc::new(move |defaults: &ParamSet, _: &GeneratorOptions| {
            (0..count)
                .map(|i| {
                    let mut set = defaults.clone();
                    set.insert("variant".to_string(), i as f64);
                    set
                })
                .collect::<Vec<_>>()
        })
    }

    fn selection(count: usize) -> StrategySelection {
        StrategySelection::new(
            StrategyHandle::classify(Arc::new(SmaCrossStrategy)),
            fixed_count(count),
        )
    }

    #[test]
    fn test_batches_across_plans() {
        let selections = vec![selection(5), selection(5), selection(0)];
        let mut scheduler =
            JobScheduler::new(&selections, BacktestSettings::default(), &GeneratorOptions::default());

        assert_eq!(scheduler.total_runs(), 10);
        assert_eq!(scheduler.plans().len(), 2);

        let sizes: Vec<usize> = (0..4).map(|_| scheduler.next_job_batch(4).len()).collect();
        assert_eq!(sizes, vec![4, 4, 2, 0]);
        assert!(scheduler.is_exhausted());
    }

    #[test]
    fn test_job_ids_strictly_increase() {
        let selections = vec![selection(3), selection(4)];
        let mut scheduler =
            JobScheduler::new(&selections, BacktestSettings::default(), &GeneratorOptions::default());

        let mut ids = Vec::new();
        loop {
            let batch = scheduler.next_job_batch(3);
            if batch.is_empty() {
                break;
            }
            ids.extend(batch.iter().map(|j| j.id));
        }
        assert_eq!(ids, (1..=7).collect::<Vec<u64>>());
    }

    #[test]
    fn test_settings_shared_unless_overridden() {
        let plans = vec![StrategyPlan {
            key: "sma_cross".to_string(),
            name: "SMA".to_string(),
            strategy: StrategyHandle::classify(Arc::new(SmaCrossStrategy)),
            param_sets: vec![
                ParamSet::from([("fast".to_string(), 5.0)]),
                ParamSet::from([(STOP_LOSS_KEY.to_string(), 2.0)]),
            ],
        }];
        let mut scheduler = JobScheduler::from_plans(plans, BacktestSettings::default());
        let jobs = scheduler.next_job_batch(2);

        assert!(Arc::ptr_eq(&jobs[0].settings, scheduler.base_settings()));
        assert!(!Arc::ptr_eq(&jobs[1].settings, scheduler.base_settings()));
        assert_eq!(jobs[1].settings.stop_loss_pct, Some(2.0));
    }

    #[test]
    fn test_percentage_risk_defaults_extend_strategy_defaults() {
        let settings = BacktestSettings {
            risk_mode: RiskMode::Percentage,
            ..Default::default()
        };
        let selection = StrategySelection::new(
            StrategyHandle::classify(Arc::new(ChannelBreakoutStrategy)),
            Arc::new(|d: &ParamSet, _: &GeneratorOptions| vec![d.clone()]),
        );
        let plan = StrategyPlan::build(&selection, &settings, &GeneratorOptions::default());

        let params = &plan.param_sets[0];
        assert_eq!(params.get(STOP_LOSS_KEY), Some(&5.0));
        assert_eq!(params.get(TAKE_PROFIT_KEY), Some(&10.0));
        assert!(params.contains_key("lookback"));
    }

    #[test]
    fn test_empty_scheduler() {
        let mut scheduler = JobScheduler::new(
            &[selection(0)],
            BacktestSettings::default(),
            &GeneratorOptions::default(),
        );
        assert_eq!(scheduler.total_runs(), 0);
        assert!(scheduler.next_job_batch(8).is_empty());
    }
}
