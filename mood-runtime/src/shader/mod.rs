//! # Shader 模块
//!
//! 把着色器预设编译为逐帧步进器 [`ShaderStepper`]。
//!
//! ## 参数转换
//!
//! | JSON 值 | Uniform |
//! |---------|---------|
//! | 数字 | `Float` |
//! | 布尔 | `Bool` |
//! | `#RRGGBB` / `#RRGGBBAA` | `Color([r, g, b, a])`（归一化） |
//! | 长度 2/3/4 的数字数组 | `Vec2` / `Vec3` / `Vec4`（定长） |
//! | 其他字符串 | `Text`（如纹理名） |
//!
//! 无法转换的参数记录警告后丢弃。
//!
//! ## 网格渲染前提
//!
//! 附加着色器的可显示对象**必须**开启网格（离屏）渲染，否则着色器采样不到
//! 像素，效果会静默消失。步进器输出的 [`VisualState`] 在附加着色器时总是
//! 带 `mesh = true` 与 `mesh_pad`。
//!
//! ## 叠加预设
//!
//! `stack` 中的每个预设都会被编译（用于发现错误），但目前只使用第一个。
//! 真正的多着色器叠加需要多次离屏渲染的合成，不能用简单的函数串联表达。

pub mod annotations;
pub mod color;

use std::collections::HashSet;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{PresetError, PresetKind, PresetResult};
use crate::frame::{Frame, FrameSignal, FrameStepper, VisualState};
use crate::preset::{MeshPad, ShaderPreset};
use crate::store::PresetStore;
use color::{hex_to_color, looks_like_hex_color};

/// 受强度缩放的参数名（去掉 `u_` 前缀后比较）
pub const INTENSITY_SCALED_PARAMS: &[&str] = &[
    "amount",
    "strength",
    "intensity",
    "blur",
    "radius",
    "glow_inner",
    "glow_outer",
];

/// 参数是否受强度缩放
pub fn is_intensity_param(name: &str) -> bool {
    let lower = name.to_ascii_lowercase().replace('-', "_");
    let bare = lower.strip_prefix("u_").unwrap_or(&lower);
    INTENSITY_SCALED_PARAMS.contains(&bare)
}

/// 着色器 uniform 值
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum UniformValue {
    Float(f32),
    Bool(bool),
    Color([f32; 4]),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Text(String),
}

impl UniformValue {
    /// 从 JSON 参数转换
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_f64().map(|v| Self::Float(v as f32)),
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::String(s) if looks_like_hex_color(s) => hex_to_color(s).ok().map(Self::Color),
            Value::String(s) => Some(Self::Text(s.clone())),
            Value::Array(items) => {
                let floats = items
                    .iter()
                    .map(|v| v.as_f64().map(|f| f as f32))
                    .collect::<Option<Vec<f32>>>()?;
                match floats.as_slice() {
                    [a, b] => Some(Self::Vec2([*a, *b])),
                    [a, b, c] => Some(Self::Vec3([*a, *b, *c])),
                    [a, b, c, d] => Some(Self::Vec4([*a, *b, *c, *d])),
                    _ => None,
                }
            }
            Value::Null | Value::Object(_) => None,
        }
    }

    /// 乘以强度（只影响标量）
    pub fn scaled(&self, factor: f32) -> Self {
        match self {
            Self::Float(v) => Self::Float(v * factor),
            other => other.clone(),
        }
    }

    /// 标量值
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }
}

/// 单帧的着色器应用结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShaderApplication {
    /// 着色器名
    pub shader: String,
    /// 已按强度缩放的 uniform
    pub uniforms: Vec<(String, UniformValue)>,
    /// 网格内边距
    pub mesh_pad: MeshPad,
    /// 当前强度
    pub intensity: f32,
}

impl ShaderApplication {
    /// 按名称查找 uniform
    pub fn uniform(&self, name: &str) -> Option<&UniformValue> {
        self.uniforms
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }
}

/// 着色器步进器
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderStepper {
    shader: String,
    uniforms: Vec<(String, UniformValue)>,
    animated: bool,
    mesh_pad: MeshPad,
    intensity: f32,
}

impl ShaderStepper {
    /// 着色器名
    pub fn shader(&self) -> &str {
        &self.shader
    }

    /// 是否需要逐帧求值
    pub fn is_animated(&self) -> bool {
        self.animated
    }

    /// 当前强度 (0.0 - 1.0)
    pub fn intensity(&self) -> f32 {
        self.intensity
    }

    /// 设置强度
    pub fn set_intensity(&mut self, intensity: f32) {
        self.intensity = intensity.clamp(0.0, 1.0);
    }

    /// 网格内边距
    pub fn mesh_pad(&self) -> MeshPad {
        self.mesh_pad
    }

    /// 以当前强度生成应用结果
    pub fn application(&self) -> ShaderApplication {
        let uniforms = self
            .uniforms
            .iter()
            .map(|(name, value)| {
                let value = if is_intensity_param(name) {
                    value.scaled(self.intensity)
                } else {
                    value.clone()
                };
                (name.clone(), value)
            })
            .collect();

        ShaderApplication {
            shader: self.shader.clone(),
            uniforms,
            mesh_pad: self.mesh_pad,
            intensity: self.intensity,
        }
    }
}

impl FrameStepper for ShaderStepper {
    /// 静态着色器应用一次即结束；动画着色器每帧继续
    fn advance(&mut self, _elapsed: f32) -> Frame {
        let mut state = VisualState::default();
        state.attach_shader(self.application());
        Frame::new(state, FrameSignal::continue_if(self.animated))
    }
}

/// 编译单个（非叠加）预设
///
/// `overrides` 覆盖预设中的同名参数。
pub fn compile(
    name: &str,
    preset: &ShaderPreset,
    overrides: &Map<String, Value>,
) -> PresetResult<ShaderStepper> {
    if preset.shader.trim().is_empty() {
        return Err(PresetError::InvalidRecord {
            kind: PresetKind::Shader,
            name: name.to_string(),
            message: "缺少 shader 字段".to_string(),
        });
    }

    let mut params = preset.params.clone();
    crate::value::merge_maps(&mut params, overrides);

    let uniforms = params
        .iter()
        .filter(|(key, _)| !crate::value::is_comment_key(key))
        .filter_map(|(key, value)| match UniformValue::from_json(value) {
            Some(uniform) => Some((key.clone(), uniform)),
            None => {
                tracing::warn!(preset = %name, param = %key, value = %value, "着色器参数无法转换，已忽略");
                None
            }
        })
        .collect();

    Ok(ShaderStepper {
        shader: preset.shader.clone(),
        uniforms,
        animated: preset.animated,
        mesh_pad: preset.mesh_pad,
        intensity: 1.0,
    })
}

/// 基于 [`PresetStore`] 的着色器编译器
///
/// 负责按名称查找预设、展开 `stack`。
pub struct ShaderCompiler<'a> {
    store: &'a PresetStore,
}

impl<'a> ShaderCompiler<'a> {
    pub fn new(store: &'a PresetStore) -> Self {
        Self { store }
    }

    /// 按名称编译
    pub fn compile_named(
        &self,
        name: &str,
        overrides: &Map<String, Value>,
    ) -> PresetResult<ShaderStepper> {
        self.compile_guarded(name, overrides, &mut HashSet::new())
    }

    /// 编译已取得的预设（处理 `stack`）
    pub fn compile(
        &self,
        name: &str,
        preset: &ShaderPreset,
        overrides: &Map<String, Value>,
    ) -> PresetResult<ShaderStepper> {
        let mut visited = HashSet::from([name.to_string()]);
        self.compile_preset(name, preset, overrides, &mut visited)
    }

    fn compile_guarded(
        &self,
        name: &str,
        overrides: &Map<String, Value>,
        visited: &mut HashSet<String>,
    ) -> PresetResult<ShaderStepper> {
        if !visited.insert(name.to_string()) {
            return Err(PresetError::UnresolvedInheritance {
                name: name.to_string(),
                parent: name.to_string(),
            });
        }
        let preset = self.store.shader(name)?;
        self.compile_preset(name, &preset, overrides, visited)
    }

    fn compile_preset(
        &self,
        name: &str,
        preset: &ShaderPreset,
        overrides: &Map<String, Value>,
        visited: &mut HashSet<String>,
    ) -> PresetResult<ShaderStepper> {
        if !preset.is_stacked() {
            return compile(name, preset, overrides);
        }

        let mut compiled = Vec::with_capacity(preset.stack.len());
        for member in &preset.stack {
            let result = self.compile_guarded(member, overrides, &mut visited.clone());
            if let Err(e) = &result {
                tracing::warn!(preset = %name, member = %member, error = %e, "叠加着色器编译失败");
            }
            compiled.push(result);
        }
        if compiled.len() > 1 {
            tracing::debug!(preset = %name, count = compiled.len(), "叠加预设目前只使用第一个着色器");
        }

        compiled
            .into_iter()
            .next()
            .unwrap_or_else(|| compile(name, preset, overrides))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn glow() -> ShaderPreset {
        ShaderPreset::from_value(&json!({
            "shader": "shader.glow",
            "params": {
                "u_glow_color": "#FF8800",
                "u_strength": 0.8,
                "u_scale": 2.0,
                "u_offset": [1.0, 2.0],
                "u_tint": [0.1, 0.2, 0.3, 0.4],
                "u_bad": {"nested": true}
            },
            "mesh_pad": 24
        }))
        .unwrap()
    }

    #[test]
    fn test_param_conversion() {
        let stepper = compile("glow", &glow(), &Map::new()).unwrap();
        let app = stepper.application();
        assert!(matches!(app.uniform("u_glow_color"), Some(UniformValue::Color(c)) if (c[1] - 0.533).abs() < 1e-2));
        assert_eq!(app.uniform("u_offset"), Some(&UniformValue::Vec2([1.0, 2.0])));
        assert_eq!(
            app.uniform("u_tint"),
            Some(&UniformValue::Vec4([0.1, 0.2, 0.3, 0.4]))
        );
        assert_eq!(app.uniform("u_bad"), None);
        assert_eq!(app.mesh_pad, MeshPad::Uniform(24));
    }

    #[test]
    fn test_intensity_scales_allow_list_only() {
        let mut stepper = compile("glow", &glow(), &Map::new()).unwrap();
        stepper.set_intensity(0.5);
        let app = stepper.application();
        assert_eq!(app.uniform("u_strength").and_then(UniformValue::as_f32), Some(0.4));
        // 不在白名单中的参数不缩放
        assert_eq!(app.uniform("u_scale").and_then(UniformValue::as_f32), Some(2.0));
    }

    #[test]
    fn test_is_intensity_param() {
        assert!(is_intensity_param("u_amount"));
        assert!(is_intensity_param("blur"));
        assert!(is_intensity_param("u_glow-inner"));
        assert!(is_intensity_param("U_RADIUS"));
        assert!(!is_intensity_param("u_scale"));
        assert!(!is_intensity_param("u_outer_strength"));
    }

    #[test]
    fn test_static_done_animated_continue() {
        let mut stepper = compile("glow", &glow(), &Map::new()).unwrap();
        let frame = stepper.advance(0.0);
        assert!(frame.is_done());
        assert!(frame.state.mesh);
        assert!(frame.state.shader.is_some());

        let mut animated = glow();
        animated.animated = true;
        let mut stepper = compile("glow", &animated, &Map::new()).unwrap();
        assert_eq!(stepper.advance(10.0).signal, FrameSignal::Continue);
    }

    #[test]
    fn test_overrides_win() {
        let overrides = json!({"u_strength": 0.2});
        let stepper = compile("glow", &glow(), overrides.as_object().unwrap()).unwrap();
        assert_eq!(
            stepper.application().uniform("u_strength"),
            Some(&UniformValue::Float(0.2))
        );
    }

    #[test]
    fn test_missing_shader_name_is_error() {
        let preset = ShaderPreset::default();
        assert!(matches!(
            compile("empty", &preset, &Map::new()),
            Err(PresetError::InvalidRecord { .. })
        ));
    }

    #[test]
    fn test_intensity_clamped() {
        let mut stepper = compile("glow", &glow(), &Map::new()).unwrap();
        stepper.set_intensity(3.0);
        assert_eq!(stepper.intensity(), 1.0);
        stepper.set_intensity(-1.0);
        assert_eq!(stepper.intensity(), 0.0);
    }
}
