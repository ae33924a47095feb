//! 加载过程调试日志

use infrastructure_common::{StrategyIdentifier, NOT_IDENTIFIED};
use tracing::debug;

pub(crate) const ALL_STRATEGIES: &str = "ALL";
pub(crate) const FIRST_LOAD_REQUESTED: &str = "开始加载变量";
pub(crate) const LOAD_REQUEST_IGNORED_DUE_ALREADY_LOADED: &str = "变量已经加载完成，忽略本次加载请求";
pub(crate) const LOAD_REQUEST_IGNORED_DUE_IN_PROGRESS: &str = "已有加载过程正在进行，忽略本次加载请求";
pub(crate) const STARTING_STRATEGY: &str = "开始执行策略";
pub(crate) const STARTING_RELOAD: &str = "开始重载变量";
pub(crate) const LOADING_VARIABLES: &str = "正在通过策略加载器加载变量";
pub(crate) const VALIDATING_VARIABLES: &str = "正在通过策略验证器验证变量";
pub(crate) const TRANSFORMING_VARIABLES: &str = "正在通过策略转换器转换变量";
pub(crate) const RELOADING_BY_SCHEDULER: &str = "调度器触发，正在重新加载策略变量";
pub(crate) const ASSIGNING_TO_CACHE: &str = "将加载的变量写入内存缓存";
pub(crate) const ASSIGNING_TO_PROCESS_ENV: &str = "将加载的变量写入进程环境变量";
pub(crate) const NOT_LOADED_STRATEGY_DISABLED: &str = "策略已禁用，未加载变量";
pub(crate) const INVALID_VARIABLES: &str = "变量未通过策略验证器的验证";

/// 调试日志输出器
///
/// 仅在启用调试时输出，不影响控制流。
#[derive(Debug, Clone, Copy, Default)]
pub struct DebugTracer {
    enabled: bool,
}

impl DebugTracer {
    /// 创建调试日志输出器
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// 是否启用
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// 输出与某个策略相关的调试信息
    pub fn trace(&self, message: &str, identifier: Option<&StrategyIdentifier>) {
        if self.enabled {
            match identifier {
                Some(identifier) => debug!("[Extended Config Module] {}: {}", identifier, message),
                None => debug!("[Extended Config Module] {}: {}", NOT_IDENTIFIED, message),
            }
        }
    }

    /// 输出与全部策略相关的调试信息
    pub fn trace_all(&self, message: &str) {
        if self.enabled {
            debug!("[Extended Config Module] {}: {}", ALL_STRATEGIES, message);
        }
    }
}
