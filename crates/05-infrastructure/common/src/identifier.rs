//! 策略标识

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// 策略没有标识时在日志和错误中使用的名称
pub const NOT_IDENTIFIED: &str = "Not identified";

/// 策略标识
///
/// 可以是普通字符串，也可以是进程内唯一的符号。标识不要求唯一，
/// 按标识重载时只取第一个匹配的策略。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StrategyIdentifier {
    /// 字符串标识
    Name(String),
    /// 唯一符号
    Symbol(Uuid),
}

impl StrategyIdentifier {
    /// 创建新的唯一符号标识
    pub fn symbol() -> Self {
        Self::Symbol(Uuid::new_v4())
    }
}

impl fmt::Display for StrategyIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Symbol(id) => write!(f, "Symbol({id})"),
        }
    }
}

impl From<&str> for StrategyIdentifier {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for StrategyIdentifier {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

/// 格式化可选标识，缺失时返回 [`NOT_IDENTIFIED`]
pub fn display_identifier(identifier: &Option<StrategyIdentifier>) -> String {
    identifier
        .as_ref()
        .map_or_else(|| NOT_IDENTIFIED.to_string(), ToString::to_string)
}
