//! # Infrastructure Common
//!
//! 这个 crate 提供了配置加载基础设施共用的错误类型、策略标识和日志初始化。
//!
//! ## 核心组件
//!
//! - [`ConfigError`] - 配置加载错误
//! - [`StrategyIdentifier`] - 策略标识
//! - [`init_tracing`] - 日志订阅者初始化

pub mod errors;
pub mod identifier;
pub mod logging;

pub use errors::*;
pub use identifier::*;
pub use logging::*;
