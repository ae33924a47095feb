//! 点号/方括号路径访问
//!
//! 支持 `database.host`、`servers[0].port` 这样的路径。

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

static SEGMENT_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\[.\]]+").expect("valid pattern"));

/// 拆分路径为段
pub fn segments(path: &str) -> Vec<&str> {
    SEGMENT_PATTERN.find_iter(path).map(|m| m.as_str()).collect()
}

/// 按路径读取值
pub fn get_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let parts = segments(path);
    if parts.is_empty() {
        return None;
    }

    parts.into_iter().try_fold(root, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|index| items.get(index)),
        _ => None,
    })
}

/// 路径上是否存在值
pub fn has_path(root: &Value, path: &str) -> bool {
    get_path(root, path).is_some()
}

/// 按路径写入值，缺失的中间节点自动创建
///
/// 下一段是数字时创建数组，否则创建对象；不是容器的中间值会被替换。
pub fn set_path(root: &mut Value, path: &str, value: Value) {
    let parts = segments(path);
    if parts.is_empty() {
        return;
    }

    set_in(root, &parts, value);
}

fn set_in(current: &mut Value, parts: &[&str], value: Value) {
    let Some((head, rest)) = parts.split_first() else {
        *current = value;
        return;
    };

    let index = head.parse::<usize>().ok();
    let replacement = match (&*current, index) {
        (Value::Object(_), _) | (Value::Array(_), Some(_)) => None,
        (Value::Array(items), None) => Some(Value::Object(
            items
                .iter()
                .enumerate()
                .map(|(i, item)| (i.to_string(), item.clone()))
                .collect(),
        )),
        (_, Some(_)) => Some(Value::Array(Vec::new())),
        (_, None) => Some(Value::Object(Map::new())),
    };
    if let Some(replacement) = replacement {
        *current = replacement;
    }

    let slot = match (current, index) {
        (Value::Array(items), Some(index)) => {
            if items.len() <= index {
                items.resize(index + 1, Value::Null);
            }
            &mut items[index]
        }
        (Value::Object(map), _) => map.entry((*head).to_string()).or_insert(Value::Null),
        _ => return,
    };

    set_in(slot, rest, value);
}
