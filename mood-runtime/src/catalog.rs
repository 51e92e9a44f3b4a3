//! # Catalog 模块
//!
//! 可编辑的预设文档（过渡 + 着色器），供预设编辑工具使用。
//!
//! ## 设计原则
//!
//! - 文档中除预设表以外的顶层键（如 `defaults`）原样保留
//! - 以 `_` 开头的注释键不出现在名称列表中，重排时保持在最前
//! - 每次修改前对两份预设表做快照，支持撤销/重做（最多 50 级）
//! - 保存为 4 空格缩进的 JSON，非 ASCII 字符不转义

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::CatalogError;
use crate::value::is_comment_key;

/// 撤销栈上限
pub const MAX_UNDO_LEVELS: usize = 50;

/// 预设表
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    /// 过渡预设（`presets`）
    Transitions,
    /// 着色器预设（`shader_presets`）
    Shaders,
}

impl Section {
    pub fn key(&self) -> &'static str {
        match self {
            Section::Transitions => "presets",
            Section::Shaders => "shader_presets",
        }
    }
}

/// 移动方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Top,
    Up,
    Down,
    Bottom,
}

/// 单份预设文档
#[derive(Debug, Clone, Default)]
struct Document {
    path: Option<PathBuf>,
    /// 顶层对象（预设表之外的键）
    root: Map<String, Value>,
    /// 预设表
    presets: Map<String, Value>,
}

impl Document {
    fn open(path: &Path, section: Section) -> Result<Self, CatalogError> {
        let content = fs::read_to_string(path).map_err(|e| CatalogError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let mut document = Self::parse(&content, section)?;
        document.path = Some(path.to_path_buf());
        Ok(document)
    }

    fn parse(content: &str, section: Section) -> Result<Self, CatalogError> {
        let root: Map<String, Value> =
            serde_json::from_str(content).map_err(|e| CatalogError::Serialize(e.to_string()))?;
        Ok(Self::from_root(root, section))
    }

    fn from_root(root: Map<String, Value>, section: Section) -> Self {
        let presets = match root.get(section.key()) {
            Some(Value::Object(presets)) => presets.clone(),
            _ => Map::new(),
        };
        Self {
            path: None,
            root,
            presets,
        }
    }

    fn to_value(&self, section: Section) -> Value {
        let mut root = self.root.clone();
        root.insert(section.key().to_string(), Value::Object(self.presets.clone()));
        Value::Object(root)
    }

    fn save(&self, section: Section) -> Result<(), CatalogError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let json = to_pretty_json(&self.to_value(section))?;
        fs::write(path, json).map_err(|e| CatalogError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }
}

/// 4 空格缩进的 JSON
fn to_pretty_json(value: &Value) -> Result<String, CatalogError> {
    let mut buffer = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    value
        .serialize(&mut serializer)
        .map_err(|e| CatalogError::Serialize(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| CatalogError::Serialize(e.to_string()))
}

/// 修改前的快照
#[derive(Debug, Clone)]
struct Snapshot {
    transitions: Map<String, Value>,
    shaders: Map<String, Value>,
    description: String,
}

/// 可编辑的预设目录
#[derive(Debug, Clone, Default)]
pub struct PresetCatalog {
    transitions: Document,
    shaders: Document,
    undo_stack: Vec<Snapshot>,
    redo_stack: Vec<Snapshot>,
}

impl PresetCatalog {
    /// 打开两份预设文件
    pub fn open(
        transitions_path: impl AsRef<Path>,
        shaders_path: impl AsRef<Path>,
    ) -> Result<Self, CatalogError> {
        let catalog = Self {
            transitions: Document::open(transitions_path.as_ref(), Section::Transitions)?,
            shaders: Document::open(shaders_path.as_ref(), Section::Shaders)?,
            ..Default::default()
        };
        tracing::info!(
            transitions = catalog.transitions.presets.len(),
            shaders = catalog.shaders.presets.len(),
            "预设目录已打开"
        );
        Ok(catalog)
    }

    /// 从内存中的文档构建（不关联文件）
    pub fn from_documents(transitions: Value, shaders: Value) -> Self {
        let root = |value: Value| match value {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            transitions: Document::from_root(root(transitions), Section::Transitions),
            shaders: Document::from_root(root(shaders), Section::Shaders),
            ..Default::default()
        }
    }

    /// 写回文件
    pub fn save(&self) -> Result<(), CatalogError> {
        self.transitions.save(Section::Transitions)?;
        self.shaders.save(Section::Shaders)?;
        tracing::info!("预设目录已保存");
        Ok(())
    }

    /// 完整文档（含预设表之外的顶层键）
    pub fn document(&self, section: Section) -> Value {
        self.doc(section).to_value(section)
    }

    fn doc(&self, section: Section) -> &Document {
        match section {
            Section::Transitions => &self.transitions,
            Section::Shaders => &self.shaders,
        }
    }

    fn presets_mut(&mut self, section: Section) -> &mut Map<String, Value> {
        match section {
            Section::Transitions => &mut self.transitions.presets,
            Section::Shaders => &mut self.shaders.presets,
        }
    }

    // =========================================================================
    // 查询
    // =========================================================================

    /// 预设名（跳过注释键，保持文档顺序）
    pub fn names(&self, section: Section) -> Vec<String> {
        self.doc(section)
            .presets
            .keys()
            .filter(|name| !is_comment_key(name))
            .cloned()
            .collect()
    }

    pub fn get(&self, section: Section, name: &str) -> Option<&Value> {
        self.doc(section).presets.get(name)
    }

    pub fn contains(&self, section: Section, name: &str) -> bool {
        self.get(section, name).is_some()
    }

    /// 生成不重复的名称：`base`、`base_1`、`base_2`……
    pub fn unique_name(&self, section: Section, base: &str) -> String {
        let mut name = base.to_string();
        let mut counter = 1;
        while self.contains(section, &name) {
            name = format!("{}_{}", base, counter);
            counter += 1;
        }
        name
    }

    // =========================================================================
    // 修改
    // =========================================================================

    /// 写入预设（已存在则原位替换）
    pub fn set(&mut self, section: Section, name: &str, data: Value) {
        self.push_undo(format!("set {}", name));
        self.presets_mut(section).insert(name.to_string(), data);
    }

    /// 新增预设
    pub fn add(&mut self, section: Section, name: &str, data: Value) -> Result<(), CatalogError> {
        if self.contains(section, name) {
            return Err(CatalogError::DuplicateName(name.to_string()));
        }
        self.push_undo(format!("add {}", name));
        self.presets_mut(section).insert(name.to_string(), data);
        Ok(())
    }

    /// 删除预设
    pub fn delete(&mut self, section: Section, name: &str) -> Result<(), CatalogError> {
        if !self.contains(section, name) {
            return Err(CatalogError::NotFound(name.to_string()));
        }
        self.push_undo(format!("delete {}", name));
        retain_presets(self.presets_mut(section), |key| key != name);
        Ok(())
    }

    /// 批量删除，返回实际删除的数量（只占一级撤销）
    pub fn delete_many(&mut self, section: Section, names: &[String]) -> usize {
        let existing = names
            .iter()
            .filter(|name| self.contains(section, name))
            .count();
        if existing == 0 {
            return 0;
        }
        self.push_undo(format!("delete {} presets", existing));
        retain_presets(self.presets_mut(section), |key| {
            !names.iter().any(|name| name == key)
        });
        existing
    }

    /// 重命名（保持原位置）
    pub fn rename(&mut self, section: Section, old: &str, new: &str) -> Result<(), CatalogError> {
        if !self.contains(section, old) {
            return Err(CatalogError::NotFound(old.to_string()));
        }
        if self.contains(section, new) {
            return Err(CatalogError::DuplicateName(new.to_string()));
        }
        self.push_undo(format!("rename {} -> {}", old, new));

        let presets = self.presets_mut(section);
        *presets = std::mem::take(presets)
            .into_iter()
            .map(|(key, value)| {
                if key == old {
                    (new.to_string(), value)
                } else {
                    (key, value)
                }
            })
            .collect();
        Ok(())
    }

    /// 复制预设（深拷贝，追加到末尾）
    pub fn duplicate(&mut self, section: Section, name: &str, new_name: &str) -> Result<(), CatalogError> {
        let data = self
            .get(section, name)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(name.to_string()))?;
        if self.contains(section, new_name) {
            return Err(CatalogError::DuplicateName(new_name.to_string()));
        }
        self.push_undo(format!("duplicate {}", name));
        self.presets_mut(section).insert(new_name.to_string(), data);
        Ok(())
    }

    /// 调整顺序
    ///
    /// 名称不存在或移动无效果（已在顶部/底部）时返回 `false`。
    pub fn move_preset(&mut self, section: Section, name: &str, direction: MoveDirection) -> bool {
        let mut names = self.names(section);
        let Some(idx) = names.iter().position(|n| n == name) else {
            return false;
        };
        let last = names.len() - 1;

        match direction {
            MoveDirection::Top if idx > 0 => {
                let moved = names.remove(idx);
                names.insert(0, moved);
            }
            MoveDirection::Up if idx > 0 => names.swap(idx, idx - 1),
            MoveDirection::Down if idx < last => names.swap(idx, idx + 1),
            MoveDirection::Bottom if idx < last => {
                let moved = names.remove(idx);
                names.push(moved);
            }
            _ => return false,
        }

        self.push_undo(format!("move {:?} {}", direction, name));
        let presets = self.presets_mut(section);
        let mut old = std::mem::take(presets);

        // 注释键保持在最前
        for (key, value) in old.iter().filter(|(key, _)| is_comment_key(key)) {
            presets.insert(key.clone(), value.clone());
        }
        for name in names {
            if let Some(value) = old.remove(&name) {
                presets.insert(name, value);
            }
        }
        true
    }

    // =========================================================================
    // 撤销 / 重做
    // =========================================================================

    fn snapshot(&self, description: String) -> Snapshot {
        Snapshot {
            transitions: self.transitions.presets.clone(),
            shaders: self.shaders.presets.clone(),
            description,
        }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.transitions.presets = snapshot.transitions;
        self.shaders.presets = snapshot.shaders;
    }

    fn push_undo(&mut self, description: String) {
        let snapshot = self.snapshot(description);
        self.undo_stack.push(snapshot);
        if self.undo_stack.len() > MAX_UNDO_LEVELS {
            self.undo_stack.remove(0);
        }
        self.redo_stack.clear();
    }

    /// 撤销最近一次修改
    pub fn undo(&mut self) -> bool {
        let Some(snapshot) = self.undo_stack.pop() else {
            return false;
        };
        tracing::debug!(action = %snapshot.description, "撤销");
        let current = self.snapshot(snapshot.description.clone());
        self.redo_stack.push(current);
        self.restore(snapshot);
        true
    }

    /// 重做最近一次撤销
    pub fn redo(&mut self) -> bool {
        let Some(snapshot) = self.redo_stack.pop() else {
            return false;
        };
        tracing::debug!(action = %snapshot.description, "重做");
        let current = self.snapshot(snapshot.description.clone());
        self.undo_stack.push(current);
        self.restore(snapshot);
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }
}

/// 按键过滤，保持剩余键的顺序
fn retain_presets(presets: &mut Map<String, Value>, keep: impl Fn(&str) -> bool) {
    *presets = std::mem::take(presets)
        .into_iter()
        .filter(|(key, _)| keep(key))
        .collect();
}
