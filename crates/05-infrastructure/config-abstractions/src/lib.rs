//! # Configuration Abstractions
//!
//! 基于策略的配置加载抽象层，定义配置加载的核心接口和约定。
//!
//! ## 核心接口
//!
//! - [`ConfigLoaderStrategy`] - 配置加载策略描述符
//! - [`Capability`] - 加载器、验证器、转换器的函数/对象两种形式
//! - [`VariableStore`] - 变量存储接口
//! - [`CronScheduler`] - 调度器适配接口

pub mod capability;
pub mod options;
pub mod path;
pub mod scheduler;
pub mod state;
pub mod store;
pub mod strategy;

pub use capability::*;
pub use options::*;
pub use scheduler::*;
pub use state::*;
pub use store::*;
pub use strategy::*;
