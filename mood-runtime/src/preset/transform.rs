//! 过渡预设记录

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// 默认时长（秒）
pub const DEFAULT_DURATION: f32 = 0.4;
/// 默认缓动
pub const DEFAULT_EASING: &str = "easeout";

/// 位置描述
///
/// 各轴相互独立，只有在起点与终点**都**出现的轴才会被插值。
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionSpec {
    /// 水平对齐（归一化，0.0 - 1.0）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xalign: Option<f32>,
    /// 垂直对齐（归一化，0.0 - 1.0）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yalign: Option<f32>,
    /// 水平像素偏移
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xoffset: Option<f32>,
    /// 垂直像素偏移
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yoffset: Option<f32>,
    /// 绝对水平位置（像素）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f32>,
    /// 绝对垂直位置（像素）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f32>,
}

impl PositionSpec {
    /// 只含对齐值的位置
    pub fn align(xalign: f32, yalign: f32) -> Self {
        Self {
            xalign: Some(xalign),
            yalign: Some(yalign),
            ..Default::default()
        }
    }
}

/// 起止数值对
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub start: f32,
    pub end: f32,
}

impl Range {
    /// 起止相同的恒定值
    pub const fn constant(value: f32) -> Self {
        Self {
            start: value,
            end: value,
        }
    }

    fn identity_one() -> Self {
        Self::constant(1.0)
    }

    fn identity_zero() -> Self {
        Self::constant(0.0)
    }
}

/// 过渡预设
///
/// 通过 [`TransformPreset::normalize`] 从原始 JSON 构建，保证所有字段都已填充。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformPreset {
    #[serde(default)]
    pub start_position: PositionSpec,
    #[serde(default)]
    pub end_position: PositionSpec,
    #[serde(default = "Range::identity_one")]
    pub alpha: Range,
    #[serde(default = "Range::identity_zero")]
    pub rotation: Range,
    #[serde(default = "Range::identity_one")]
    pub scale: Range,
    /// 时长（秒）
    #[serde(default = "default_duration")]
    pub duration: f32,
    /// 缓动名称（编译时解析，未知名称降级为线性）
    #[serde(default = "default_easing")]
    pub easing: String,
    /// 启动延迟（秒）
    #[serde(default)]
    pub delay: f32,
}

fn default_duration() -> f32 {
    DEFAULT_DURATION
}

fn default_easing() -> String {
    DEFAULT_EASING.to_string()
}

impl Default for TransformPreset {
    fn default() -> Self {
        Self {
            start_position: PositionSpec::default(),
            end_position: PositionSpec::default(),
            alpha: Range::identity_one(),
            rotation: Range::identity_zero(),
            scale: Range::identity_one(),
            duration: DEFAULT_DURATION,
            easing: default_easing(),
            delay: 0.0,
        }
    }
}

impl TransformPreset {
    /// 无任何变化、立即结束的预设
    pub fn identity() -> Self {
        Self {
            duration: 0.0,
            easing: "linear".to_string(),
            ..Default::default()
        }
    }

    /// 默认骨架（JSON 形式）
    ///
    /// `defaults` 为文档级默认值（`{"duration", "easing"}`），会覆盖内置默认值。
    pub fn skeleton(defaults: Option<&Value>) -> Value {
        let mut skeleton = json!({
            "start_position": {},
            "end_position": {},
            "alpha": {"start": 1.0, "end": 1.0},
            "rotation": {"start": 0.0, "end": 0.0},
            "scale": {"start": 1.0, "end": 1.0},
            "duration": DEFAULT_DURATION,
            "easing": DEFAULT_EASING,
        });
        if let Some(Value::Object(defaults)) = defaults {
            for key in ["duration", "easing"] {
                if let Some(value) = defaults.get(key) {
                    skeleton[key] = value.clone();
                }
            }
        }
        skeleton
    }

    /// 把原始记录合并到默认骨架上，得到规范化的 JSON
    pub fn normalize_value(raw: &Value, defaults: Option<&Value>) -> Value {
        let mut normalized = Self::skeleton(defaults);
        crate::value::deep_merge(&mut normalized, raw);
        normalized
    }

    /// 从原始记录构建规范化的预设
    pub fn normalize(raw: &Value, defaults: Option<&Value>) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Self::normalize_value(raw, defaults))
    }
}
