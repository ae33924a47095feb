//! 错误类型定义

use crate::identifier::{display_identifier, StrategyIdentifier};
use thiserror::Error;

/// 由加载器、验证器、转换器抛出的原始错误
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{} 策略的加载器既不是加载函数也不是加载器对象", display_identifier(.identifier))]
    InvalidLoader {
        identifier: Option<StrategyIdentifier>,
    },

    #[error("{} 策略的验证器既不是验证函数也不是验证器对象", display_identifier(.identifier))]
    InvalidValidator {
        identifier: Option<StrategyIdentifier>,
    },

    #[error("{} 策略的转换器既不是转换函数也不是转换器对象", display_identifier(.identifier))]
    InvalidTransformer {
        identifier: Option<StrategyIdentifier>,
    },

    #[error("{} 策略的加载器无法加载变量: \"{reason}\"", display_identifier(.identifier))]
    LoadingFailed {
        identifier: Option<StrategyIdentifier>,
        #[source]
        reason: BoxError,
    },

    #[error("{} 策略加载的变量未通过验证: \"{reason}\"", display_identifier(.identifier))]
    ValidationFailed {
        identifier: Option<StrategyIdentifier>,
        #[source]
        reason: BoxError,
    },

    #[error("{} 策略的转换器无法转换变量: \"{reason}\"", display_identifier(.identifier))]
    TransformationFailed {
        identifier: Option<StrategyIdentifier>,
        #[source]
        reason: BoxError,
    },

    #[error("{} 策略的调度表达式不是有效的 cron 语法", display_identifier(.identifier))]
    InvalidSchedule {
        identifier: Option<StrategyIdentifier>,
    },

    #[error("无法识别的调度时区: {timezone}")]
    InvalidTimezone { timezone: String },

    #[error("调度器不可用: {message}")]
    SchedulerUnavailable { message: String },

    #[error("正在进行的配置加载失败，等待已中断")]
    LoadInterrupted,

    #[error("配置文件不存在: {path}")]
    FileNotFound { path: String },

    #[error("配置文件读取失败: {source}")]
    FileReadError {
        #[from]
        source: std::io::Error,
    },

    #[error("配置解析失败: {source}")]
    ParseError { source: BoxError },

    #[error("配置序列化失败: {source}")]
    SerializationError {
        #[from]
        source: serde_json::Error,
    },

    #[error("配置类型转换失败: {message}")]
    TypeConversionError { message: String },
}

impl ConfigError {
    /// 把任意错误包装为加载失败
    pub fn loading(identifier: Option<StrategyIdentifier>, reason: impl Into<BoxError>) -> Self {
        Self::LoadingFailed {
            identifier,
            reason: reason.into(),
        }
    }

    /// 把任意错误包装为验证失败
    pub fn validation(identifier: Option<StrategyIdentifier>, reason: impl Into<BoxError>) -> Self {
        Self::ValidationFailed {
            identifier,
            reason: reason.into(),
        }
    }

    /// 把任意错误包装为转换失败
    pub fn transformation(
        identifier: Option<StrategyIdentifier>,
        reason: impl Into<BoxError>,
    ) -> Self {
        Self::TransformationFailed {
            identifier,
            reason: reason.into(),
        }
    }

    /// 创建解析错误
    pub fn parse(source: impl Into<BoxError>) -> Self {
        Self::ParseError {
            source: source.into(),
        }
    }

    /// 出错的策略标识（如果错误与某个策略相关）
    pub fn identifier(&self) -> Option<&StrategyIdentifier> {
        match self {
            Self::InvalidLoader { identifier }
            | Self::InvalidValidator { identifier }
            | Self::InvalidTransformer { identifier }
            | Self::InvalidSchedule { identifier }
            | Self::LoadingFailed { identifier, .. }
            | Self::ValidationFailed { identifier, .. }
            | Self::TransformationFailed { identifier, .. } => identifier.as_ref(),
            _ => None,
        }
    }
}

/// 结果类型别名
pub type ConfigResult<T> = Result<T, ConfigError>;
