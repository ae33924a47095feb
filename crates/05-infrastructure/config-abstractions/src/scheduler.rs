//! 调度器适配接口
//!
//! 配置管理器只负责校验表达式和注册回调，cron 的解析与触发时机由调度器实现负责。

use futures::future::BoxFuture;
use infrastructure_common::ConfigError;
use std::sync::Arc;

/// 调度回调，每次触发时执行一次
pub type ScheduledTask = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// 调度选项
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleOptions {
    /// 时区，为空时由调度器决定
    pub timezone: Option<String>,
}

impl ScheduleOptions {
    /// 创建指定时区的调度选项
    pub fn with_timezone(timezone: Option<String>) -> Self {
        Self { timezone }
    }
}

/// cron 调度器
pub trait CronScheduler: Send + Sync {
    /// 校验 cron 表达式
    fn validate(&self, expression: &str) -> bool;

    /// 注册周期执行的回调
    fn schedule(
        &self,
        expression: &str,
        task: ScheduledTask,
        options: ScheduleOptions,
    ) -> Result<(), ConfigError>;
}
