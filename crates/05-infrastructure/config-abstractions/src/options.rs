//! 配置管理器选项

use crate::strategy::ConfigLoaderStrategy;

/// 配置管理器选项
#[derive(Debug, Clone)]
pub struct ConfigManagerOptions {
    /// 为 `true` 时变量只保存在内存缓存中，否则写入进程环境变量
    pub cache: bool,
    /// 为 `true` 时输出加载过程的调试日志
    pub debug: bool,
    /// 按声明顺序执行的策略
    pub strategies: Vec<ConfigLoaderStrategy>,
}

impl ConfigManagerOptions {
    /// 创建默认选项
    pub fn new() -> Self {
        Self {
            cache: true,
            debug: false,
            strategies: Vec::new(),
        }
    }

    /// 设置是否启用缓存
    pub fn with_cache(mut self, cache: bool) -> Self {
        self.cache = cache;
        self
    }

    /// 设置是否输出调试日志
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// 追加策略
    pub fn with_strategy(mut self, strategy: ConfigLoaderStrategy) -> Self {
        self.strategies.push(strategy);
        self
    }

    /// 追加多个策略
    pub fn with_strategies(mut self, strategies: impl IntoIterator<Item = ConfigLoaderStrategy>) -> Self {
        self.strategies.extend(strategies);
        self
    }
}

impl Default for ConfigManagerOptions {
    fn default() -> Self {
        Self::new()
    }
}
