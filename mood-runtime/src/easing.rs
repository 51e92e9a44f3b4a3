//! # Easing 模块
//!
//! 缓动函数库，把归一化进度 (0.0 - 1.0) 映射为缓动后的进度。
//!
//! 预设文件中的缓动名称由作者手写，未知名称降级为线性，绝不中断播放。

use std::f32::consts::PI;

/// 缓动函数类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Easing {
    /// 线性（匀速）
    Linear,
    /// 缓入：`t²`
    EaseIn,
    /// 缓出：`1 - (1 - t)²`
    #[default]
    EaseOut,
    /// 缓入缓出（smoothstep）：`t²(3 - 2t)`
    Ease,
    /// 弹跳
    Bounce,
    /// 弹性
    Elastic,
}

impl Easing {
    /// 按名称查找缓动函数
    ///
    /// `ease_in_out` 是 `ease` 的别名。未知名称返回 `None`。
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "linear" => Some(Self::Linear),
            "easein" => Some(Self::EaseIn),
            "easeout" => Some(Self::EaseOut),
            "ease" | "ease_in_out" => Some(Self::Ease),
            "bounce" => Some(Self::Bounce),
            "elastic" => Some(Self::Elastic),
            _ => None,
        }
    }

    /// 按名称查找，未知名称降级为线性并记录警告
    pub fn from_name_or_linear(name: &str) -> Self {
        Self::from_name(name).unwrap_or_else(|| {
            tracing::warn!(easing = %name, "未知缓动名称，降级为 linear");
            Self::Linear
        })
    }

    /// 规范名称
    pub fn name(&self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::EaseIn => "easein",
            Self::EaseOut => "easeout",
            Self::Ease => "ease",
            Self::Bounce => "bounce",
            Self::Elastic => "elastic",
        }
    }

    /// 计算缓动值
    ///
    /// # 参数
    /// - `t`: 时间进度，调用方应先按 `min(1, elapsed / duration)` 截断
    ///
    /// # 返回
    /// - 缓动后的进度值
    pub fn apply(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);

        match self {
            Self::Linear => t,
            Self::EaseIn => t * t,
            Self::EaseOut => 1.0 - (1.0 - t) * (1.0 - t),
            Self::Ease => t * t * (3.0 - 2.0 * t),
            Self::Bounce => bounce(t),
            Self::Elastic => elastic(t),
        }
    }
}

/// 按名称计算缓动值，未知名称按线性处理
pub fn ease(name: &str, t: f32) -> f32 {
    Easing::from_name(name).unwrap_or(Easing::Linear).apply(t)
}

/// 弹跳：前半段加速，后半段回弹
fn bounce(t: f32) -> f32 {
    if t == 0.0 || t == 1.0 {
        t
    } else if t < 0.5 {
        2.0 * t * t
    } else {
        1.0 - 2.0 * (t - 0.75).powi(2)
    }
}

/// 弹性
fn elastic(t: f32) -> f32 {
    if t == 0.0 || t == 1.0 {
        t
    } else {
        2.0_f32.powf(-10.0 * t) * ((t - 0.1) * 5.0 * PI).sin() + 1.0
    }
}
