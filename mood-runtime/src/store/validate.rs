//! 预设引用与取值校验
//!
//! 校验只产出警告，不阻止加载：作者手工编辑 JSON，
//! 运行时对这些问题都有降级路径，这里负责把它们提前暴露出来。

use std::fmt;

use serde_json::Value;

use super::PresetStore;
use crate::easing::Easing;
use crate::error::PresetKind;
use crate::preset::{LeadConfig, ScenePreset, ScreenTransition, ShaderPreset};
use crate::shader::color::{hex_to_color, looks_like_hex_color};
use crate::value::extends_list;

/// 预设警告
#[derive(Debug, Clone, PartialEq)]
pub enum PresetWarning {
    /// 未知缓动名称（运行时降级为线性）
    UnknownEasing { context: String, easing: String },
    /// 着色器预设缺少 `shader` 字段
    MissingShaderName { preset: String },
    /// `stack` 引用了不存在的着色器预设
    MissingStackMember { preset: String, member: String },
    /// `extends` 引用了不存在的场景预设
    MissingParent { preset: String, parent: String },
    /// 出入场配置引用了不存在的过渡预设
    MissingTransition { context: String, transition: String },
    /// 出入场配置引用了不存在的着色器预设
    MissingShaderPreset { context: String, preset: String },
    /// 无效的十六进制颜色
    InvalidColor {
        context: String,
        color: String,
        reason: String,
    },
    /// 角色编排条目无法解析（运行时跳过该条目）
    InvalidCharacter {
        preset: String,
        character: String,
        message: String,
    },
    /// 记录结构无法解析
    InvalidRecord {
        kind: PresetKind,
        name: String,
        message: String,
    },
}

impl fmt::Display for PresetWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PresetWarning::UnknownEasing { context, easing } => {
                write!(f, "{}: 未知缓动 '{}'，将按线性处理", context, easing)
            }
            PresetWarning::MissingShaderName { preset } => {
                write!(f, "着色器预设 '{}' 缺少 shader 字段", preset)
            }
            PresetWarning::MissingStackMember { preset, member } => {
                write!(f, "着色器预设 '{}' 的 stack 引用了不存在的 '{}'", preset, member)
            }
            PresetWarning::MissingParent { preset, parent } => {
                write!(f, "场景预设 '{}' 继承了不存在的 '{}'", preset, parent)
            }
            PresetWarning::MissingTransition {
                context,
                transition,
            } => write!(f, "{}: 过渡预设 '{}' 不存在", context, transition),
            PresetWarning::MissingShaderPreset { context, preset } => {
                write!(f, "{}: 着色器预设 '{}' 不存在", context, preset)
            }
            PresetWarning::InvalidColor {
                context,
                color,
                reason,
            } => write!(f, "{}: 颜色 '{}' 无效 ({})", context, color, reason),
            PresetWarning::InvalidCharacter {
                preset,
                character,
                message,
            } => write!(f, "场景预设 '{}' 的角色 '{}' 无效，已跳过: {}", preset, character, message),
            PresetWarning::InvalidRecord {
                kind,
                name,
                message,
            } => write!(f, "{} 预设 '{}' 结构无效: {}", kind, name, message),
        }
    }
}

impl PresetStore {
    /// 校验已加载的全部预设
    pub fn validate(&self) -> Vec<PresetWarning> {
        let mut warnings = Vec::new();
        self.validate_transitions(&mut warnings);
        self.validate_shaders(&mut warnings);
        self.validate_scenes(&mut warnings);
        warnings
    }

    /// 校验并把警告写入日志
    pub fn validate_and_log(&self) -> Vec<PresetWarning> {
        let warnings = self.validate();
        for warning in &warnings {
            tracing::warn!(warning = %warning, "预设警告");
        }
        warnings
    }

    fn validate_transitions(&self, warnings: &mut Vec<PresetWarning>) {
        for name in self.list_presets(PresetKind::Transition) {
            match self.transition(&name) {
                Ok(preset) => check_easing(&format!("transition.{}", name), &preset.easing, warnings),
                Err(e) => warnings.push(invalid_record(PresetKind::Transition, &name, e)),
            }
        }
    }

    fn validate_shaders(&self, warnings: &mut Vec<PresetWarning>) {
        for name in self.list_presets(PresetKind::Shader) {
            let preset = match self.shader(&name) {
                Ok(preset) => preset,
                Err(e) => {
                    warnings.push(invalid_record(PresetKind::Shader, &name, e));
                    continue;
                }
            };

            if preset.shader.trim().is_empty() && !preset.is_stacked() {
                warnings.push(PresetWarning::MissingShaderName {
                    preset: name.clone(),
                });
            }
            for member in &preset.stack {
                if !self.contains(PresetKind::Shader, member) {
                    warnings.push(PresetWarning::MissingStackMember {
                        preset: name.clone(),
                        member: member.clone(),
                    });
                }
            }
            check_param_colors(&format!("shader.{}", name), &preset, warnings);
        }
    }

    fn validate_scenes(&self, warnings: &mut Vec<PresetWarning>) {
        for (name, raw) in self.raw_scenes() {
            for parent in extends_list(raw) {
                if !self.raw_scenes().contains_key(&parent) {
                    warnings.push(PresetWarning::MissingParent {
                        preset: name.clone(),
                        parent,
                    });
                }
            }
        }

        for name in self.list_presets(PresetKind::Scene) {
            let Some(resolved) = self.get_preset(PresetKind::Scene, &name) else {
                continue;
            };
            let (scene, rejected) = match ScenePreset::parse(resolved) {
                Ok(parsed) => parsed,
                Err(e) => {
                    warnings.push(PresetWarning::InvalidRecord {
                        kind: PresetKind::Scene,
                        name: name.clone(),
                        message: e.to_string(),
                    });
                    continue;
                }
            };
            for (character, message) in rejected {
                warnings.push(PresetWarning::InvalidCharacter {
                    preset: name.clone(),
                    character,
                    message,
                });
            }
            self.check_scene(&name, &scene, warnings);
        }
    }

    fn check_scene(&self, name: &str, scene: &ScenePreset, warnings: &mut Vec<PresetWarning>) {
        let mut characters: Vec<_> = scene.characters.iter().collect();
        characters.sort_by(|a, b| a.0.cmp(b.0));

        for (character, choreography) in characters {
            let leads = [
                ("lead_in", &choreography.lead_in),
                ("lead_out", &choreography.lead_out),
            ];
            for (slot, lead) in leads {
                if let Some(lead) = lead {
                    let context = format!("scene.{}.{}.{}", name, character, slot);
                    self.check_lead(&context, lead, warnings);
                }
            }
        }

        let screens = [
            ("enter", &scene.transition.enter),
            ("exit", &scene.transition.exit),
        ];
        for (slot, screen) in screens {
            if let Some(ScreenTransition { color, .. }) = screen
                && let Err(e) = hex_to_color(color)
            {
                warnings.push(PresetWarning::InvalidColor {
                    context: format!("scene.{}.transition.{}", name, slot),
                    color: color.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    fn check_lead(&self, context: &str, lead: &LeadConfig, warnings: &mut Vec<PresetWarning>) {
        if let Some(transition) = &lead.transition
            && !self.contains(PresetKind::Transition, transition)
        {
            warnings.push(PresetWarning::MissingTransition {
                context: context.to_string(),
                transition: transition.clone(),
            });
        }
        if let Some(easing) = &lead.easing {
            check_easing(context, easing, warnings);
        }
        if let Some(shader) = &lead.shader
            && !self.contains(PresetKind::Shader, &shader.preset)
        {
            warnings.push(PresetWarning::MissingShaderPreset {
                context: context.to_string(),
                preset: shader.preset.clone(),
            });
        }
    }
}

fn check_easing(context: &str, easing: &str, warnings: &mut Vec<PresetWarning>) {
    if Easing::from_name(easing).is_none() {
        warnings.push(PresetWarning::UnknownEasing {
            context: context.to_string(),
            easing: easing.to_string(),
        });
    }
}

fn check_param_colors(context: &str, preset: &ShaderPreset, warnings: &mut Vec<PresetWarning>) {
    for (param, value) in &preset.params {
        if let Value::String(text) = value
            && looks_like_hex_color(text)
            && let Err(e) = hex_to_color(text)
        {
            warnings.push(PresetWarning::InvalidColor {
                context: format!("{}.{}", context, param),
                color: text.clone(),
                reason: e.to_string(),
            });
        }
    }
}

fn invalid_record(kind: PresetKind, name: &str, error: crate::error::PresetError) -> PresetWarning {
    PresetWarning::InvalidRecord {
        kind,
        name: name.to_string(),
        message: error.to_string(),
    }
}
