//! # Store 模块
//!
//! 预设文档的加载与索引。
//!
//! ## 三类文档
//!
//! | 类型 | 顶层键 | 加载时处理 |
//! |------|--------|-----------|
//! | 过渡 | `presets`（另有 `defaults`） | 合并到默认骨架 |
//! | 着色器 | `shader_presets` | 原样保存，编译时惰性校验 |
//! | 场景 | `presets` | 解析 `extends` 继承链 |
//!
//! 以 `_` 开头的键（注释约定）和非映射值都会被跳过。
//!
//! ## 失败策略
//!
//! [`PresetStore::load`] 不向调用方抛错：文件缺失或格式错误时记录日志、
//! 返回 `false`，该类型的表保持为空。加载是幂等的，只有成功后才会
//! 标记为已加载，失败的加载可以重试。同一类型连续失败时只有第一次
//! 记录为错误，之后降为 debug。

pub mod inheritance;
mod validate;

pub use validate::PresetWarning;

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use serde_json::{Map, Value};

use crate::config::MoodConfig;
use crate::error::{PresetError, PresetKind, PresetResult};
use crate::preset::{ScenePreset, ShaderPreset, TransformPreset};
use crate::value::is_comment_key;

/// 预设仓库
#[derive(Debug, Clone, Default)]
pub struct PresetStore {
    /// 各类型的预设表（过渡已规范化、场景已解析继承）
    tables: HashMap<PresetKind, Map<String, Value>>,
    /// 解析继承前的场景记录（用于校验 `extends`）
    raw_scenes: Map<String, Value>,
    /// 已成功加载的类型
    loaded: HashSet<PresetKind>,
    /// 各类型自上次成功以来的连续失败次数
    failures: HashMap<PresetKind, u32>,
}

impl PresetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从文件加载一类预设
    ///
    /// 已加载过的类型直接返回 `true`，不会重复读取。
    pub fn load(&mut self, kind: PresetKind, path: impl AsRef<Path>) -> bool {
        if self.is_loaded(kind) {
            return true;
        }

        let path = path.as_ref();
        match self.try_load(kind, path) {
            Ok(count) => {
                self.failures.remove(&kind);
                tracing::info!(kind = %kind, path = %path.display(), count, "预设加载完成");
                true
            }
            Err(e) => {
                let attempts = self.failures.entry(kind).or_insert(0);
                *attempts += 1;
                if *attempts == 1 {
                    tracing::error!(kind = %kind, error = %e, "预设加载失败");
                } else {
                    tracing::debug!(kind = %kind, attempts = *attempts, error = %e, "预设加载再次失败");
                }
                false
            }
        }
    }

    fn try_load(&mut self, kind: PresetKind, path: &Path) -> PresetResult<usize> {
        let display = path.display().to_string();
        if !path.exists() {
            return Err(PresetError::ConfigNotFound { path: display });
        }
        let content = fs::read_to_string(path).map_err(|e| PresetError::Io {
            path: display.clone(),
            message: e.to_string(),
        })?;
        self.load_str(kind, &content, &display)
    }

    /// 从 JSON 文本加载一类预设
    ///
    /// `origin` 只用于错误信息。会替换该类型已有的表。
    pub fn load_str(&mut self, kind: PresetKind, content: &str, origin: &str) -> PresetResult<usize> {
        let document: Value =
            serde_json::from_str(content).map_err(|e| PresetError::ConfigParse {
                path: origin.to_string(),
                message: e.to_string(),
            })?;
        Ok(self.load_value(kind, &document))
    }

    /// 从已解析的文档加载一类预设，返回预设数量
    pub fn load_value(&mut self, kind: PresetKind, document: &Value) -> usize {
        let records = section_records(kind, document);

        let table = match kind {
            PresetKind::Transition => {
                let defaults = document.get("defaults");
                records
                    .iter()
                    .map(|(name, raw)| {
                        (name.clone(), TransformPreset::normalize_value(raw, defaults))
                    })
                    .collect()
            }
            PresetKind::Shader => records,
            PresetKind::Scene => {
                let resolved = inheritance::resolve_all(&records);
                self.raw_scenes = records;
                resolved
            }
        };

        let count = table.len();
        self.tables.insert(kind, table);
        self.loaded.insert(kind);
        count
    }

    /// 按配置加载全部三类预设，全部成功时返回 `true`
    pub fn load_from_config(&mut self, config: &MoodConfig) -> bool {
        let transitions = self.load(PresetKind::Transition, config.transitions_full_path());
        let shaders = self.load(PresetKind::Shader, config.shaders_full_path());
        let scenes = self.load(PresetKind::Scene, config.scenes_full_path());
        transitions && shaders && scenes
    }

    /// 该类型是否已成功加载
    pub fn is_loaded(&self, kind: PresetKind) -> bool {
        self.loaded.contains(&kind)
    }

    /// 该类型自上次成功以来的连续加载失败次数
    pub fn load_failures(&self, kind: PresetKind) -> u32 {
        self.failures.get(&kind).copied().unwrap_or(0)
    }

    /// 查找原始（已规范化/已解析）记录
    pub fn get_preset(&self, kind: PresetKind, name: &str) -> Option<&Value> {
        self.tables.get(&kind)?.get(name)
    }

    /// 预设名列表（保持文档中的书写顺序）
    pub fn list_presets(&self, kind: PresetKind) -> Vec<String> {
        self.tables
            .get(&kind)
            .map(|table| table.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// 是否存在指定预设
    pub fn contains(&self, kind: PresetKind, name: &str) -> bool {
        self.get_preset(kind, name).is_some()
    }

    fn typed<T>(
        &self,
        kind: PresetKind,
        name: &str,
        parse: impl FnOnce(&Value) -> Result<T, serde_json::Error>,
    ) -> PresetResult<T> {
        let raw = self
            .get_preset(kind, name)
            .ok_or_else(|| PresetError::PresetNotFound {
                kind,
                name: name.to_string(),
            })?;
        parse(raw).map_err(|e| PresetError::InvalidRecord {
            kind,
            name: name.to_string(),
            message: e.to_string(),
        })
    }

    /// 过渡预设
    pub fn transition(&self, name: &str) -> PresetResult<TransformPreset> {
        self.typed(PresetKind::Transition, name, |raw| {
            serde_json::from_value(raw.clone())
        })
    }

    /// 着色器预设
    pub fn shader(&self, name: &str) -> PresetResult<ShaderPreset> {
        self.typed(PresetKind::Shader, name, ShaderPreset::from_value)
    }

    /// 场景预设
    pub fn scene(&self, name: &str) -> PresetResult<ScenePreset> {
        self.typed(PresetKind::Scene, name, ScenePreset::from_value)
    }

    /// 场景预设，查找或解析失败时记录警告并返回 `None`
    pub fn get_scene_preset(&self, name: &str) -> Option<ScenePreset> {
        self.scene(name)
            .inspect_err(|e| tracing::warn!(error = %e, "场景预设不可用"))
            .ok()
    }

    /// 解析继承前的场景记录
    pub(crate) fn raw_scenes(&self) -> &Map<String, Value> {
        &self.raw_scenes
    }
}

/// 取出文档中的预设表，跳过注释键与非映射值
fn section_records(kind: PresetKind, document: &Value) -> Map<String, Value> {
    let Some(section) = document.get(kind.section_key()) else {
        tracing::warn!(kind = %kind, key = kind.section_key(), "文档缺少预设表");
        return Map::new();
    };
    let Some(section) = section.as_object() else {
        tracing::warn!(kind = %kind, key = kind.section_key(), "预设表不是映射");
        return Map::new();
    };

    section
        .iter()
        .filter(|(name, _)| !is_comment_key(name))
        .filter_map(|(name, record)| {
            if record.is_object() {
                Some((name.clone(), record.clone()))
            } else {
                tracing::warn!(kind = %kind, preset = %name, "预设记录不是映射，已跳过");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn transitions_doc() -> Value {
        json!({
            "defaults": {"duration": 0.6, "easing": "ease"},
            "presets": {
                "_comment": "过渡预设",
                "slide_left_enter": {
                    "start_position": {"xoffset": -200},
                    "end_position": {"xoffset": 0},
                    "alpha": {"start": 0.0}
                },
                "fast_fade": {"alpha": {"start": 1.0, "end": 0.0}, "duration": 0.2},
                "broken": 42
            }
        })
    }

    #[test]
    fn test_transition_normalized_with_defaults() {
        let mut store = PresetStore::new();
        assert_eq!(store.load_value(PresetKind::Transition, &transitions_doc()), 2);

        let slide = store.transition("slide_left_enter").unwrap();
        assert_eq!(slide.duration, 0.6);
        assert_eq!(slide.easing, "ease");
        assert_eq!(slide.alpha.start, 0.0);
        assert_eq!(slide.alpha.end, 1.0);
        assert_eq!(slide.scale.start, 1.0);

        let fade = store.transition("fast_fade").unwrap();
        assert_eq!(fade.duration, 0.2);
    }

    #[test]
    fn test_list_skips_comments_and_non_objects() {
        let mut store = PresetStore::new();
        store.load_value(PresetKind::Transition, &transitions_doc());
        assert_eq!(
            store.list_presets(PresetKind::Transition),
            vec!["slide_left_enter", "fast_fade"]
        );
        assert!(store.get_preset(PresetKind::Transition, "broken").is_none());
        assert!(store.list_presets(PresetKind::Shader).is_empty());
    }

    #[test]
    fn test_shader_passed_through() {
        let mut store = PresetStore::new();
        store.load_value(
            PresetKind::Shader,
            &json!({"shader_presets": {"glow": {"shader": "shader.glow", "params": {"u_strength": 0.5}, "custom": true}}}),
        );
        assert_eq!(
            store.get_preset(PresetKind::Shader, "glow").unwrap()["custom"],
            json!(true)
        );
        assert_eq!(store.shader("glow").unwrap().shader, "shader.glow");
    }

    #[test]
    fn test_scene_inheritance_resolved_on_load() {
        let mut store = PresetStore::new();
        store.load_value(
            PresetKind::Scene,
            &json!({"presets": {
                "default": {"active": {"ambient": {"sound": ""}}},
                "rainy": {"extends": "default", "active": {"ambient": {"sound": "rain.ogg"}}}
            }}),
        );
        let rainy = store.scene("rainy").unwrap();
        assert_eq!(rainy.active.ambient.unwrap().sound, "rain.ogg");
        assert!(store.get_preset(PresetKind::Scene, "rainy").unwrap().get("extends").is_none());
        assert!(store.raw_scenes()["rainy"].get("extends").is_some());
    }

    #[test]
    fn test_lookup_errors() {
        let mut store = PresetStore::new();
        store.load_value(
            PresetKind::Transition,
            &json!({"presets": {"bad": {"duration": "slow"}}}),
        );
        assert!(matches!(
            store.transition("missing"),
            Err(PresetError::PresetNotFound { kind: PresetKind::Transition, .. })
        ));
        assert!(matches!(
            store.transition("bad"),
            Err(PresetError::InvalidRecord { .. })
        ));
        assert!(store.get_scene_preset("nonexistent").is_none());
    }

    #[test]
    fn test_load_missing_file_returns_false() {
        let mut store = PresetStore::new();
        assert!(!store.load(PresetKind::Scene, "/no/such/mood_presets.json"));
        assert!(!store.is_loaded(PresetKind::Scene));
        assert!(store.list_presets(PresetKind::Scene).is_empty());
    }

    #[test]
    fn test_load_malformed_json_returns_false_then_retries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shader_presets.json");
        fs::write(&path, "{ \"shader_presets\": ").unwrap();

        let mut store = PresetStore::new();
        assert!(!store.load(PresetKind::Shader, &path));
        assert!(!store.load(PresetKind::Shader, &path));
        assert_eq!(store.load_failures(PresetKind::Shader), 2);

        // 失败不会标记为已加载，修复文件后可以重试
        fs::write(&path, r#"{"shader_presets": {"blur": {"shader": "shader.blur"}}}"#).unwrap();
        assert!(store.load(PresetKind::Shader, &path));
        assert_eq!(store.list_presets(PresetKind::Shader), vec!["blur"]);
        assert_eq!(store.load_failures(PresetKind::Shader), 0);
    }

    #[test]
    fn test_load_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transition_presets.json");
        fs::write(&path, r#"{"presets": {"a": {}}}"#).unwrap();

        let mut store = PresetStore::new();
        assert!(store.load(PresetKind::Transition, &path));

        // 已加载后不再读取文件
        fs::write(&path, r#"{"presets": {"a": {}, "b": {}}}"#).unwrap();
        assert!(store.load(PresetKind::Transition, &path));
        assert_eq!(store.list_presets(PresetKind::Transition), vec!["a"]);
    }

    #[test]
    fn test_parse_error_variant() {
        let mut store = PresetStore::new();
        let err = store
            .load_str(PresetKind::Scene, "[1, 2", "inline.json")
            .unwrap_err();
        assert!(matches!(err, PresetError::ConfigParse { ref path, .. } if path == "inline.json"));
    }
}
