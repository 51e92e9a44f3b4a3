//! # Value 模块
//!
//! 预设 JSON 值的合并工具。
//!
//! 配置值统一使用 [`serde_json::Value`]（标量 | 映射 | 序列 的判别联合），
//! 合并逻辑按变体分派：
//!
//! - 两侧都是映射：逐键递归合并
//! - 其他情况：覆盖值整体替换基础值
//!
//! 以 `_` 开头的键是 JSON 注释约定，合并时会被剥离。

use serde_json::{Map, Value};

/// 是否为注释键（以 `_` 开头）
pub fn is_comment_key(key: &str) -> bool {
    key.starts_with('_')
}

/// 把 `overlay` 深度合并到 `base` 上，`overlay` 优先
pub fn deep_merge(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            merge_maps(base_map, overlay_map);
        }
        (base, overlay) => {
            *base = strip_comments(overlay);
        }
    }
}

/// 映射版本的 [`deep_merge`]
pub fn merge_maps(base: &mut Map<String, Value>, overlay: &Map<String, Value>) {
    for (key, value) in overlay {
        if is_comment_key(key) {
            continue;
        }
        match base.get_mut(key) {
            Some(existing) => deep_merge(existing, value),
            None => {
                base.insert(key.clone(), strip_comments(value));
            }
        }
    }
}

/// 返回去除所有注释键后的副本（递归）
pub fn strip_comments(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(key, _)| !is_comment_key(key))
                .map(|(key, value)| (key.clone(), strip_comments(value)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(strip_comments).collect()),
        other => other.clone(),
    }
}

/// 读取 `extends` 字段：单个名称或名称列表，保持声明顺序
pub fn extends_list(record: &Value) -> Vec<String> {
    match record.get("extends") {
        Some(Value::String(name)) => vec![name.clone()],
        Some(Value::Array(names)) => names
            .iter()
            .filter_map(|n| n.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}
