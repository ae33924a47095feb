//! 配置模块启动

use crate::manager::StrategyConfigManager;
use config_abstractions::{ConfigManagerOptions, CronScheduler};
use infrastructure_common::ConfigResult;
use std::future::Future;
use std::sync::Arc;
use tracing::info;

/// 模块选项
#[derive(Debug, Clone, Default)]
pub struct ModuleOptions {
    /// 配置管理器选项
    pub manager: ConfigManagerOptions,
    /// 为 `true` 时在交出管理器之前完成加载
    pub preload: bool,
}

impl ModuleOptions {
    /// 创建不预加载的模块选项
    pub fn new(manager: ConfigManagerOptions) -> Self {
        Self {
            manager,
            preload: false,
        }
    }

    /// 设置是否预加载
    pub fn with_preload(mut self, preload: bool) -> Self {
        self.preload = preload;
        self
    }
}

/// 配置模块
///
/// 持有应用唯一的 [`StrategyConfigManager`]，其他组件通过 [`ConfigModule::manager`]
/// 取得共享句柄。
#[derive(Debug, Clone)]
pub struct ConfigModule {
    manager: StrategyConfigManager,
}

impl ConfigModule {
    /// 使用同步选项创建模块
    ///
    /// 开启预加载时，策略在模块创建过程中执行并注册调度；否则由模块初始化钩子
    /// 完成首次加载。两种情况下返回的管理器都已加载完成。
    pub async fn for_root(
        options: ModuleOptions,
        scheduler: Arc<dyn CronScheduler>,
    ) -> ConfigResult<Self> {
        let ModuleOptions { manager, preload } = options;
        let module = Self {
            manager: StrategyConfigManager::new(manager, scheduler),
        };

        if preload {
            info!("预加载配置变量");
            module.manager.load(false).await?;
        }

        module.on_module_init().await?;
        Ok(module)
    }

    /// 使用异步工厂创建模块，不支持预加载
    pub async fn for_root_async<F, Fut>(
        factory: F,
        scheduler: Arc<dyn CronScheduler>,
    ) -> ConfigResult<Self>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ConfigResult<ConfigManagerOptions>>,
    {
        let options = factory().await?;
        let module = Self {
            manager: StrategyConfigManager::new(options, scheduler),
        };

        module.on_module_init().await?;
        Ok(module)
    }

    /// 模块初始化钩子，等待首次加载完成
    pub async fn on_module_init(&self) -> ConfigResult<()> {
        self.manager.load(true).await
    }

    /// 共享的配置管理器
    pub fn manager(&self) -> &StrategyConfigManager {
        &self.manager
    }

    /// 取出配置管理器
    pub fn into_manager(self) -> StrategyConfigManager {
        self.manager
    }
}
