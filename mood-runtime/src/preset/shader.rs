//! 着色器预设记录

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 网格内边距
///
/// 发光/模糊等效果会绘制到原图边界之外，需要为离屏纹理预留空间。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MeshPad {
    /// 四边相同
    Uniform(i32),
    /// 左、上、右、下
    Sides([i32; 4]),
}

impl Default for MeshPad {
    fn default() -> Self {
        Self::Uniform(0)
    }
}

impl MeshPad {
    /// 展开为 `[left, top, right, bottom]`
    pub fn sides(&self) -> [i32; 4] {
        match *self {
            Self::Uniform(pad) => [pad; 4],
            Self::Sides(sides) => sides,
        }
    }

    /// 是否无内边距
    pub fn is_zero(&self) -> bool {
        self.sides() == [0; 4]
    }
}

/// 着色器预设
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShaderPreset {
    /// 着色器名称（如 `shader.glow`）
    #[serde(default)]
    pub shader: String,
    /// 参数表（标量 / `#RRGGBB` 颜色 / 数组向量）
    #[serde(default)]
    pub params: Map<String, Value>,
    /// 是否需要逐帧重新求值
    #[serde(default)]
    pub animated: bool,
    /// 网格内边距
    #[serde(default)]
    pub mesh_pad: MeshPad,
    /// 叠加的其他着色器预设名（目前只使用第一个）
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stack: Vec<String>,
}

impl ShaderPreset {
    /// 从原始记录解析（惰性校验，编译时调用）
    pub fn from_value(raw: &Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(crate::value::strip_comments(raw))
    }

    /// 是否为叠加预设
    pub fn is_stacked(&self) -> bool {
        !self.stack.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mesh_pad_forms() {
        let preset = ShaderPreset::from_value(&json!({"shader": "s", "mesh_pad": 16})).unwrap();
        assert_eq!(preset.mesh_pad, MeshPad::Uniform(16));
        assert_eq!(preset.mesh_pad.sides(), [16, 16, 16, 16]);

        let preset =
            ShaderPreset::from_value(&json!({"shader": "s", "mesh_pad": [1, 2, 3, 4]})).unwrap();
        assert_eq!(preset.mesh_pad.sides(), [1, 2, 3, 4]);
    }

    #[test]
    fn test_defaults() {
        let preset = ShaderPreset::from_value(&json!({"shader": "shader.glow"})).unwrap();
        assert!(!preset.animated);
        assert!(preset.params.is_empty());
        assert!(preset.mesh_pad.is_zero());
        assert!(!preset.is_stacked());
    }

    #[test]
    fn test_comment_params_dropped() {
        let preset = ShaderPreset::from_value(&json!({
            "shader": "s",
            "params": {"_doc": "说明", "u_amount": 0.5}
        }))
        .unwrap();
        assert_eq!(preset.params.len(), 1);
    }
}
