//! 配置加载策略描述符

use crate::capability::{Loader, Transformer, Validator};
use infrastructure_common::StrategyIdentifier;
use serde_json::Value;

/// 配置加载策略
///
/// 描述一个变量来源：如何加载、是否验证与转换、结果存放位置，以及重载和调度策略。
#[derive(Debug, Clone)]
pub struct ConfigLoaderStrategy {
    /// 加载器
    pub loader: Loader,
    /// 策略标识，用于日志和按标识重载
    pub identifier: Option<StrategyIdentifier>,
    /// 为 `true` 时完全跳过此策略
    pub disable: bool,
    /// 传给加载器的选项
    pub options: Option<Value>,
    /// 首次加载后是否允许重载或按调度重新执行
    pub reloadable: bool,
    /// cron 调度表达式，仅在可重载时生效
    pub schedule: Option<String>,
    /// 调度时区
    pub schedule_timezone: Option<String>,
    /// 设置后整个变量集合存放在此键下，否则逐键展开存放
    pub register_as: Option<String>,
    /// 转换器
    pub transformer: Option<Transformer>,
    /// 验证器
    pub validator: Option<Validator>,
}

impl ConfigLoaderStrategy {
    /// 使用加载器创建策略，其余属性取默认值
    pub fn new(loader: Loader) -> Self {
        Self {
            loader,
            identifier: None,
            disable: false,
            options: None,
            reloadable: false,
            schedule: None,
            schedule_timezone: None,
            register_as: None,
            transformer: None,
            validator: None,
        }
    }

    /// 设置标识
    pub fn with_identifier(mut self, identifier: impl Into<StrategyIdentifier>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    /// 设置是否禁用
    pub fn with_disable(mut self, disable: bool) -> Self {
        self.disable = disable;
        self
    }

    /// 设置加载器选项
    pub fn with_options(mut self, options: Value) -> Self {
        self.options = Some(options);
        self
    }

    /// 设置是否可重载
    pub fn with_reloadable(mut self, reloadable: bool) -> Self {
        self.reloadable = reloadable;
        self
    }

    /// 设置调度表达式
    pub fn with_schedule(mut self, schedule: impl Into<String>) -> Self {
        self.schedule = Some(schedule.into());
        self
    }

    /// 设置调度时区
    pub fn with_schedule_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.schedule_timezone = Some(timezone.into());
        self
    }

    /// 设置注册键
    pub fn with_register_as(mut self, key: impl Into<String>) -> Self {
        self.register_as = Some(key.into());
        self
    }

    /// 设置转换器
    pub fn with_transformer(mut self, transformer: Transformer) -> Self {
        self.transformer = Some(transformer);
        self
    }

    /// 设置验证器
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }

    /// 返回需要注册到调度器的表达式
    ///
    /// 仅当策略未禁用、可重载且表达式非空时返回。
    pub fn schedulable_expression(&self) -> Option<&str> {
        if self.disable || !self.reloadable {
            return None;
        }

        self.schedule
            .as_deref()
            .filter(|expression| !expression.trim().is_empty())
    }

    /// 是否匹配给定标识
    pub fn is_identified_by(&self, identifier: &StrategyIdentifier) -> bool {
        self.identifier.as_ref() == Some(identifier)
    }
}
