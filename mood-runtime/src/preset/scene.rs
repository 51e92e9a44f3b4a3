//! 场景（mood）预设记录
//!
//! 场景预设在 [`PresetStore`](crate::store::PresetStore) 加载时已经完成继承解析，
//! 这里的类型只描述**扁平**记录，不含 `extends`。

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::transform::{DEFAULT_DURATION, PositionSpec, Range, TransformPreset};
use crate::shader::color::hex_to_color;

/// 着色器淡入淡出默认时长（秒）
pub const DEFAULT_SHADER_FADE: f32 = 0.5;
/// 场景切换默认时长（秒）
pub const DEFAULT_SCREEN_TRANSITION_DURATION: f32 = 0.5;

/// 场景预设
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenePreset {
    /// 场景激活时的副作用（环境音）
    #[serde(default)]
    pub active: ActiveConfig,
    /// 角色编排（角色名 -> 出入场配置）
    #[serde(default)]
    pub characters: HashMap<String, CharacterChoreography>,
    /// 场景进入/退出的屏幕过渡
    #[serde(default)]
    pub transition: SceneTransitions,
    /// 对话框配置（原样透传）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialogbox: Option<Value>,
}

impl ScenePreset {
    /// 从已解析的记录构建
    ///
    /// 无法解析的角色条目记录警告后跳过，不影响场景的其余部分。
    pub fn from_value(resolved: &Value) -> Result<Self, serde_json::Error> {
        let (scene, rejected) = Self::parse(resolved)?;
        for (character, message) in &rejected {
            tracing::warn!(character = %character, error = %message, "角色编排无效，已跳过");
        }
        Ok(scene)
    }

    /// 解析记录，同时返回被跳过的角色条目 `(角色名, 原因)`
    pub fn parse(resolved: &Value) -> Result<(Self, Vec<(String, String)>), serde_json::Error> {
        let mut record = resolved.clone();
        let characters = record
            .as_object_mut()
            .and_then(|map| map.remove("characters"));
        let mut scene: Self = serde_json::from_value(record)?;

        let mut rejected = Vec::new();
        match characters {
            None | Some(Value::Null) => {}
            Some(Value::Object(entries)) => {
                for (character, entry) in entries {
                    match serde_json::from_value(entry) {
                        Ok(choreography) => {
                            scene.characters.insert(character, choreography);
                        }
                        Err(e) => rejected.push((character, e.to_string())),
                    }
                }
            }
            Some(_) => rejected.push(("characters".to_string(), "不是映射".to_string())),
        }
        Ok((scene, rejected))
    }

    /// 查找角色某一阶段的配置
    ///
    /// 角色自身没有该阶段时回退到 `"default"` 角色条目的同一阶段。
    pub fn lead_for(
        &self,
        character: &str,
        select: impl Fn(&CharacterChoreography) -> Option<&LeadConfig>,
    ) -> Option<&LeadConfig> {
        self.characters
            .get(character)
            .and_then(&select)
            .or_else(|| self.characters.get("default").and_then(&select))
    }
}

/// 场景激活配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActiveConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ambient: Option<AmbientConfig>,
}

/// 环境音配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmbientConfig {
    /// 音频路径，空字符串表示无环境音
    #[serde(default)]
    pub sound: String,
    /// 音量 (0.0 - 1.0)
    #[serde(default = "default_volume")]
    pub volume: f32,
    /// 淡入时长（秒）
    #[serde(default)]
    pub fadein: f32,
    /// 是否循环
    #[serde(default = "default_loop", rename = "loop")]
    pub looping: bool,
}

fn default_volume() -> f32 {
    1.0
}

fn default_loop() -> bool {
    true
}

impl AmbientConfig {
    /// 是否没有可播放的声音
    pub fn is_silent(&self) -> bool {
        self.sound.trim().is_empty()
    }
}

/// 单个角色的出入场配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CharacterChoreography {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_in: Option<LeadConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_out: Option<LeadConfig>,
}

/// 出场/入场配置
///
/// 规范形式：`{transition, shader}`，按名称引用过渡预设。
///
/// 旧形式：`{start, end, speed, delay, easing, alpha, sound, shader}`，
/// 直接给出起止对齐坐标，由 [`LeadConfig::inline_preset`] 编译为内联过渡预设。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadConfig {
    /// 过渡预设名
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition: Option<String>,
    /// 附加的着色器
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shader: Option<ShaderAttachment>,
    /// 旧形式：起点 `[xalign, yalign]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<[f32; 2]>,
    /// 旧形式：终点 `[xalign, yalign]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<[f32; 2]>,
    /// 旧形式：时长（秒）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f32>,
    /// 旧形式：延迟（秒）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<f32>,
    /// 旧形式：缓动名称
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub easing: Option<String>,
    /// 旧形式：透明度，缺失的一端取 1.0
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "partial_alpha"
    )]
    pub alpha: Option<Range>,
    /// 旧形式：开始时播放的音效
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sound: Option<String>,
}

fn partial_alpha<'de, D>(deserializer: D) -> Result<Option<Range>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Partial {
        start: Option<f32>,
        end: Option<f32>,
    }

    let partial = Option::<Partial>::deserialize(deserializer)?;
    Ok(partial.map(|p| Range {
        start: p.start.unwrap_or(1.0),
        end: p.end.unwrap_or(1.0),
    }))
}

impl LeadConfig {
    /// 仅引用过渡预设的配置
    pub fn named(transition: impl Into<String>) -> Self {
        Self {
            transition: Some(transition.into()),
            ..Default::default()
        }
    }

    /// 是否为旧形式（内联坐标）
    pub fn is_inline(&self) -> bool {
        self.transition.is_none() && (self.start.is_some() || self.end.is_some())
    }

    /// 把旧形式编译为内联过渡预设
    pub fn inline_preset(&self) -> TransformPreset {
        let to_position = |pair: Option<[f32; 2]>| {
            pair.map(|[x, y]| PositionSpec::align(x, y))
                .unwrap_or_default()
        };
        let mut preset = TransformPreset {
            start_position: to_position(self.start),
            end_position: to_position(self.end),
            duration: self.speed.unwrap_or(DEFAULT_DURATION),
            delay: self.delay.unwrap_or(0.0).max(0.0),
            ..Default::default()
        };
        if let Some(easing) = &self.easing {
            preset.easing = easing.clone();
        }
        if let Some(alpha) = self.alpha {
            preset.alpha = alpha;
        }
        preset
    }
}

/// 着色器附加配置
///
/// 可以写成完整对象，也可以只写预设名字符串。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ShaderAttachmentRepr")]
pub struct ShaderAttachment {
    /// 着色器预设名
    pub preset: String,
    /// 强度过渡时长（秒）
    pub fade_duration: f32,
    /// 参数覆盖
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub params: Map<String, Value>,
}

impl ShaderAttachment {
    pub fn new(preset: impl Into<String>, fade_duration: f32) -> Self {
        Self {
            preset: preset.into(),
            fade_duration,
            params: Map::new(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ShaderAttachmentRepr {
    Name(String),
    Full {
        preset: String,
        #[serde(default = "default_shader_fade")]
        fade_duration: f32,
        #[serde(default)]
        params: Map<String, Value>,
    },
}

fn default_shader_fade() -> f32 {
    DEFAULT_SHADER_FADE
}

impl From<ShaderAttachmentRepr> for ShaderAttachment {
    fn from(repr: ShaderAttachmentRepr) -> Self {
        match repr {
            ShaderAttachmentRepr::Name(preset) => Self::new(preset, DEFAULT_SHADER_FADE),
            ShaderAttachmentRepr::Full {
                preset,
                fade_duration,
                params,
            } => Self {
                preset,
                fade_duration,
                params,
            },
        }
    }
}

/// 场景进入/退出过渡
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneTransitions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enter: Option<ScreenTransition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit: Option<ScreenTransition>,
}

/// 屏幕过渡
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenTransition {
    /// 过渡类型（`dissolve` / `fade` / ...）
    #[serde(rename = "type", default = "default_transition_kind")]
    pub kind: String,
    /// 时长（秒）
    #[serde(default = "default_transition_duration")]
    pub duration: f32,
    /// 遮罩颜色（`#RRGGBB`）
    #[serde(default = "default_transition_color")]
    pub color: String,
}

fn default_transition_kind() -> String {
    "dissolve".to_string()
}

fn default_transition_duration() -> f32 {
    DEFAULT_SCREEN_TRANSITION_DURATION
}

fn default_transition_color() -> String {
    "#000000".to_string()
}

impl Default for ScreenTransition {
    fn default() -> Self {
        Self {
            kind: default_transition_kind(),
            duration: default_transition_duration(),
            color: default_transition_color(),
        }
    }
}

impl ScreenTransition {
    /// 遮罩颜色（归一化 RGBA），无效颜色降级为黑色
    pub fn color_rgba(&self) -> [f32; 4] {
        hex_to_color(&self.color).unwrap_or_else(|e| {
            tracing::warn!(color = %self.color, error = %e, "屏幕过渡颜色无效，使用黑色");
            [0.0, 0.0, 0.0, 1.0]
        })
    }
}
