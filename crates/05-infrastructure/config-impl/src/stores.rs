//! 变量存储实现

use config_abstractions::path::{get_path, segments, set_path};
use config_abstractions::VariableStore;
use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::warn;

/// 根据缓存开关选择存储
pub fn store_for(cache_enabled: bool) -> Arc<dyn VariableStore> {
    if cache_enabled {
        Arc::new(CacheStore::new())
    } else {
        Arc::new(ProcessEnvironmentStore::new())
    }
}

/// 内存缓存存储
///
/// 变量保存在一棵 JSON 树中，支持任意嵌套值。
#[derive(Debug)]
pub struct CacheStore {
    root: RwLock<Value>,
}

impl CacheStore {
    /// 创建空缓存
    pub fn new() -> Self {
        Self {
            root: RwLock::new(Value::Object(Map::new())),
        }
    }

    /// 使用已有变量创建缓存
    pub fn with_variables(variables: Map<String, Value>) -> Self {
        Self {
            root: RwLock::new(Value::Object(variables)),
        }
    }

    /// 当前缓存内容的快照
    pub fn snapshot(&self) -> Value {
        self.root.read().clone()
    }
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new()
    }
}

impl VariableStore for CacheStore {
    fn get(&self, path: &str) -> Option<Value> {
        get_path(&self.root.read(), path).cloned()
    }

    fn has(&self, path: &str) -> bool {
        get_path(&self.root.read(), path).is_some()
    }

    fn set(&self, path: &str, value: Value) {
        set_path(&mut self.root.write(), path, value);
    }

    fn name(&self) -> &str {
        "CacheStore"
    }
}

/// 进程环境变量存储
///
/// 路径第一段是环境变量名。字符串原样写入，其他值写成 JSON 文本；
/// 更深的路径段通过解析该变量的 JSON 文本读取和写入。读取顶层变量总是得到字符串。
#[derive(Debug, Default)]
pub struct ProcessEnvironmentStore {
    write_lock: Mutex<()>,
}

impl ProcessEnvironmentStore {
    /// 创建进程环境变量存储
    pub fn new() -> Self {
        Self::default()
    }

    fn parse_nested(raw: &str) -> Option<Value> {
        serde_json::from_str::<Value>(raw)
            .ok()
            .filter(|value| value.is_object() || value.is_array())
    }

    fn to_env_text(value: &Value) -> String {
        match value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }

    fn is_valid_name(name: &str) -> bool {
        !name.is_empty() && !name.contains('=') && !name.contains('\0')
    }
}

impl VariableStore for ProcessEnvironmentStore {
    fn get(&self, path: &str) -> Option<Value> {
        let parts = segments(path);
        let (name, rest) = parts.split_first()?;
        let raw = std::env::var(name).ok()?;

        if rest.is_empty() {
            return Some(Value::String(raw));
        }

        let nested = Self::parse_nested(&raw)?;
        get_path(&nested, &rest.join(".")).cloned()
    }

    fn has(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    fn set(&self, path: &str, value: Value) {
        let parts = segments(path);
        let Some((name, rest)) = parts.split_first() else {
            return;
        };

        if !Self::is_valid_name(name) {
            warn!("无法写入环境变量，变量名无效: {}", name);
            return;
        }

        let _guard = self.write_lock.lock();
        let text = if rest.is_empty() {
            Self::to_env_text(&value)
        } else {
            let mut nested = std::env::var(name)
                .ok()
                .and_then(|raw| Self::parse_nested(&raw))
                .unwrap_or(Value::Null);
            set_path(&mut nested, &rest.join("."), value);
            nested.to_string()
        };

        if text.contains('\0') {
            warn!("无法写入环境变量，值包含 NUL 字符: {}", name);
            return;
        }

        std::env::set_var(name, text);
    }

    fn name(&self) -> &str {
        "ProcessEnvironmentStore"
    }
}
