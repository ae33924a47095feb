//! 变量存储抽象

use serde_json::Value;
use std::fmt::Debug;

/// 变量存储
///
/// 以路径读写变量。实现有内存缓存和进程环境变量两种，构造时选定，之后不再切换。
pub trait VariableStore: Send + Sync + Debug {
    /// 按路径读取变量
    fn get(&self, path: &str) -> Option<Value>;

    /// 路径上是否存在变量
    fn has(&self, path: &str) -> bool;

    /// 按路径写入变量，覆盖已有值
    fn set(&self, path: &str, value: Value);

    /// 存储名称
    fn name(&self) -> &str;
}
