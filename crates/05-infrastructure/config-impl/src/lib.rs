//! # Configuration Implementation
//!
//! 基于策略的配置加载实现。
//!
//! ## 主要组件
//!
//! - [`StrategyConfigManager`] - 首次加载状态机、重载与调度注册
//! - [`ConfigModule`] - 模块启动（预加载与初始化）
//! - [`CacheStore`] / [`ProcessEnvironmentStore`] - 变量存储
//! - [`TokioCronScheduler`] - 基于 tokio 的 cron 调度器
//! - [`DotEnvLoader`] / [`EnvironmentLoader`] / [`FileLoader`] - 内置加载器
//! - [`ConfigDefinition`] / [`CapabilityRegistry`] - 声明式策略定义

pub mod definition;
pub mod loaders;
pub mod manager;
pub mod module;
pub mod pipeline;
pub mod scheduler;
pub mod stores;
pub mod view;

mod tracer;

#[cfg(test)]
mod tests;

pub use definition::*;
pub use loaders::*;
pub use manager::*;
pub use module::*;
pub use scheduler::*;
pub use stores::*;
pub use tracer::DebugTracer;
pub use view::*;
