//! 配置管理器与模块测试

mod module_tests;

use config_abstractions::{CronScheduler, Loader, ScheduleOptions, ScheduledTask, VariableBag};
use infrastructure_common::{BoxError, ConfigError};
use mockall::mock;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

mock! {
    pub Scheduler {}

    impl CronScheduler for Scheduler {
        fn validate(&self, expression: &str) -> bool;

        fn schedule(
            &self,
            expression: &str,
            task: ScheduledTask,
            options: ScheduleOptions,
        ) -> Result<(), ConfigError>;
    }
}

/// 不允许任何调用的调度器
fn strict_scheduler() -> Arc<dyn CronScheduler> {
    Arc::new(MockScheduler::new())
}

fn bag(value: Value) -> VariableBag {
    match value {
        Value::Object(map) => map,
        other => panic!("not an object: {other}"),
    }
}

/// 每次调用把 `key` 设为当前调用次数
fn counting_loader(calls: &Arc<AtomicUsize>, key: &'static str) -> Loader {
    let calls = Arc::clone(calls);
    Loader::from_sync_fn(move |_| {
        let count = calls.fetch_add(1, Ordering::SeqCst) + 1;
        let mut variables = VariableBag::new();
        variables.insert(key.to_string(), json!(count));
        Ok(variables)
    })
}

fn failing_loader(message: &'static str) -> Loader {
    Loader::from_sync_fn(move |_| Err::<VariableBag, BoxError>(message.into()))
}
