//! 场景预设继承解析
//!
//! 深度优先遍历 `extends` 链：父预设按声明顺序依次合并到累加器，
//! 最后合并子预设自身字段（子预设总是优先）。
//!
//! 环检测使用**按分支复制**的访问集合：兄弟分支之间互不影响，
//! 因此菱形继承中的公共祖先不会在第二个分支里被误判为环而丢失。

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::value::{deep_merge, extends_list, strip_comments};

/// 解析表中所有记录
///
/// 返回的记录不含 `extends` 与注释键，保持原表顺序。
pub fn resolve_all(records: &Map<String, Value>) -> Map<String, Value> {
    records
        .keys()
        .map(|name| (name.clone(), resolve(name, records)))
        .collect()
}

/// 解析单个记录，名称不存在时返回空映射
pub fn resolve(name: &str, records: &Map<String, Value>) -> Value {
    resolve_branch(name, records, &HashSet::new())
}

fn resolve_branch(name: &str, records: &Map<String, Value>, visited: &HashSet<String>) -> Value {
    let Some(record) = records.get(name) else {
        return Value::Object(Map::new());
    };

    if visited.contains(name) {
        tracing::warn!(preset = %name, "检测到循环继承，使用未解析的原始记录");
        return own_fields(record);
    }

    let mut branch = visited.clone();
    branch.insert(name.to_string());

    let mut resolved = Value::Object(Map::new());
    for parent in extends_list(record) {
        if !records.contains_key(&parent) {
            tracing::warn!(preset = %name, parent = %parent, "父预设不存在，已跳过");
            continue;
        }
        deep_merge(&mut resolved, &resolve_branch(&parent, records, &branch));
    }
    deep_merge(&mut resolved, &own_fields(record));
    resolved
}

/// 记录自身字段（去掉 `extends` 与注释键）
fn own_fields(record: &Value) -> Value {
    let mut own = strip_comments(record);
    if let Value::Object(map) = &mut own {
        map.remove("extends");
    }
    own
}
