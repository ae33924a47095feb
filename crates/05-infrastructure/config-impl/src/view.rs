//! 变量视图

use config_abstractions::path::get_path;
use config_abstractions::VariableStore;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// 变量视图
///
/// 对象值得到 [`ConfigView::Live`]，其他值得到调用时的快照。
#[derive(Debug, Clone)]
pub enum ConfigView {
    /// 每次访问都重新解析路径
    Live(LiveView),
    /// 调用时的值
    Snapshot(Value),
}

impl ConfigView {
    /// 当前值
    pub fn value(&self) -> Value {
        match self {
            Self::Live(view) => view.value(),
            Self::Snapshot(value) => value.clone(),
        }
    }

    /// 读取子路径
    pub fn get(&self, path: &str) -> Option<Value> {
        match self {
            Self::Live(view) => view.get(path),
            Self::Snapshot(value) => get_path(value, path).cloned(),
        }
    }

    /// 是否为实时视图
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Live(_))
    }
}

/// 实时视图
#[derive(Clone)]
pub struct LiveView {
    store: Arc<dyn VariableStore>,
    path: String,
    default: Option<Value>,
}

impl LiveView {
    pub(crate) fn new(store: Arc<dyn VariableStore>, path: &str, default: Option<Value>) -> Self {
        Self {
            store,
            path: path.to_string(),
            default,
        }
    }

    /// 视图对应的路径
    pub fn path(&self) -> &str {
        &self.path
    }

    /// 当前值，路径不存在时返回默认值
    pub fn value(&self) -> Value {
        self.store
            .get(&self.path)
            .or_else(|| self.default.clone())
            .unwrap_or(Value::Null)
    }

    /// 读取子路径
    pub fn get(&self, path: &str) -> Option<Value> {
        self.store
            .get(&format!("{}.{}", self.path, path))
            .or_else(|| {
                self.default
                    .as_ref()
                    .and_then(|default| get_path(default, path).cloned())
            })
    }

    /// 子路径上是否存在变量
    pub fn has(&self, path: &str) -> bool {
        self.get(path).is_some()
    }
}

impl fmt::Debug for LiveView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveView")
            .field("store", &self.store.name())
            .field("path", &self.path)
            .finish()
    }
}
