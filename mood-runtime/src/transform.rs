//! # Transform 模块
//!
//! 把过渡预设编译为逐帧步进器 [`TransformStepper`]。
//!
//! ## 编译规则
//!
//! 1. 起点与终点**都**给出的位置轴，在编译时预计算 `Δ = end - start`
//! 2. 只出现在一侧或完全缺失的轴不插值：有调用方覆盖值时恒定为覆盖值，
//!    否则对齐轴恒定为默认值（水平居中、底部对齐），其余轴不输出
//! 3. alpha / rotation / scale 始终插值（默认值使其成为恒等变换）
//!
//! ## 每帧求值
//!
//! ```text
//! progress = duration > 0 ? min(1, (elapsed - delay) / duration) : 1
//! eased    = easing(progress)
//! value    = start + Δ * eased
//! ```
//!
//! `progress >= 1` 时返回 [`FrameSignal::Done`]。

use crate::easing::Easing;
use crate::frame::{Frame, FrameSignal, FrameStepper, VisualState};
use crate::preset::{PositionSpec, Range, TransformPreset};

/// 默认水平对齐（居中）
pub const DEFAULT_XALIGN: f32 = 0.5;
/// 默认垂直对齐（底部）
pub const DEFAULT_YALIGN: f32 = 1.0;

/// 调用方提供的位置覆盖值
///
/// 只作用于预设中**没有**插值的轴。
pub type PositionOverride = PositionSpec;

/// 位置轴
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    XAlign,
    YAlign,
    XOffset,
    YOffset,
    XPos,
    YPos,
}

impl Axis {
    const ALL: [Axis; 6] = [
        Axis::XAlign,
        Axis::YAlign,
        Axis::XOffset,
        Axis::YOffset,
        Axis::XPos,
        Axis::YPos,
    ];

    fn read(&self, spec: &PositionSpec) -> Option<f32> {
        match self {
            Axis::XAlign => spec.xalign,
            Axis::YAlign => spec.yalign,
            Axis::XOffset => spec.xoffset,
            Axis::YOffset => spec.yoffset,
            Axis::XPos => spec.x,
            Axis::YPos => spec.y,
        }
    }

    fn fallback(&self) -> Option<f32> {
        match self {
            Axis::XAlign => Some(DEFAULT_XALIGN),
            Axis::YAlign => Some(DEFAULT_YALIGN),
            _ => None,
        }
    }

    fn write(&self, state: &mut VisualState, value: f32) {
        let slot = match self {
            Axis::XAlign => &mut state.xalign,
            Axis::YAlign => &mut state.yalign,
            Axis::XOffset => &mut state.xoffset,
            Axis::YOffset => &mut state.yoffset,
            Axis::XPos => &mut state.xpos,
            Axis::YPos => &mut state.ypos,
        };
        *slot = Some(value);
    }
}

/// 预计算的插值轨道
#[derive(Debug, Clone, Copy, PartialEq)]
struct Track {
    start: f32,
    delta: f32,
}

impl Track {
    fn new(start: f32, end: f32) -> Self {
        Self {
            start,
            delta: end - start,
        }
    }

    fn at(&self, eased: f32) -> f32 {
        self.start + self.delta * eased
    }
}

impl From<Range> for Track {
    fn from(range: Range) -> Self {
        Self::new(range.start, range.end)
    }
}

/// 过渡步进器
///
/// 只持有编译期计算好的不可变数据，`advance` 不修改任何状态，
/// 因此可以在任意时间点重复求值。
#[derive(Debug, Clone, PartialEq)]
pub struct TransformStepper {
    interpolated: Vec<(Axis, Track)>,
    held: Vec<(Axis, f32)>,
    alpha: Track,
    rotation: Track,
    scale: Track,
    duration: f32,
    delay: f32,
    easing: Easing,
}

/// 编译过渡预设
pub fn compile(preset: &TransformPreset, overrides: &PositionOverride) -> TransformStepper {
    let mut interpolated = Vec::new();
    let mut held = Vec::new();

    for axis in Axis::ALL {
        match (
            axis.read(&preset.start_position),
            axis.read(&preset.end_position),
        ) {
            (Some(start), Some(end)) => interpolated.push((axis, Track::new(start, end))),
            _ => {
                if let Some(value) = axis.read(overrides).or_else(|| axis.fallback()) {
                    held.push((axis, value));
                }
            }
        }
    }

    TransformStepper {
        interpolated,
        held,
        alpha: preset.alpha.into(),
        rotation: preset.rotation.into(),
        scale: preset.scale.into(),
        duration: preset.duration.max(0.0),
        delay: preset.delay.max(0.0),
        easing: Easing::from_name_or_linear(&preset.easing),
    }
}

impl TransformStepper {
    /// 时长（秒，不含延迟）
    pub fn duration(&self) -> f32 {
        self.duration
    }

    /// 延迟（秒）
    pub fn delay(&self) -> f32 {
        self.delay
    }

    /// 缓动函数
    pub fn easing(&self) -> Easing {
        self.easing
    }

    /// 指定时间点的线性进度 (0.0 - 1.0)
    pub fn progress_at(&self, elapsed: f32) -> f32 {
        if elapsed < self.delay {
            0.0
        } else if self.duration > 0.0 {
            ((elapsed - self.delay) / self.duration).min(1.0)
        } else {
            1.0
        }
    }

    /// 指定线性进度下的视觉状态
    pub fn state_at_progress(&self, progress: f32) -> VisualState {
        let eased = self.easing.apply(progress);
        let mut state = VisualState::default();

        for (axis, value) in &self.held {
            axis.write(&mut state, *value);
        }
        for (axis, track) in &self.interpolated {
            axis.write(&mut state, track.at(eased));
        }

        state.alpha = Some(self.alpha.at(eased));
        state.rotation = Some(self.rotation.at(eased));
        state.scale = Some(self.scale.at(eased));
        state
    }

    /// 终态
    pub fn final_state(&self) -> VisualState {
        self.state_at_progress(1.0)
    }

    /// 终态对齐坐标（用于记录角色位置）
    pub fn final_align(&self) -> (f32, f32) {
        let state = self.final_state();
        (
            state.xalign.unwrap_or(DEFAULT_XALIGN),
            state.yalign.unwrap_or(DEFAULT_YALIGN),
        )
    }
}

impl FrameStepper for TransformStepper {
    fn advance(&mut self, elapsed: f32) -> Frame {
        let progress = self.progress_at(elapsed);
        Frame::new(
            self.state_at_progress(progress),
            FrameSignal::continue_if(progress < 1.0),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn preset(raw: serde_json::Value) -> TransformPreset {
        TransformPreset::normalize(&raw, None).unwrap()
    }

    fn approx(a: Option<f32>, b: f32) -> bool {
        a.is_some_and(|a| (a - b).abs() < 1e-4)
    }

    #[test]
    fn test_scale_linear_midpoint() {
        let mut stepper = compile(
            &preset(json!({"scale": {"start": 1.0, "end": 0.5}, "duration": 1.0, "easing": "linear"})),
            &PositionOverride::default(),
        );
        let frame = stepper.advance(0.5);
        assert!(approx(frame.state.scale, 0.75));
        assert_eq!(frame.signal, FrameSignal::Continue);
    }

    #[test]
    fn test_done_at_duration() {
        let mut stepper = compile(
            &preset(json!({"duration": 0.4})),
            &PositionOverride::default(),
        );
        assert_eq!(stepper.progress_at(0.4), 1.0);
        assert!(stepper.advance(0.4).is_done());
        assert!(!stepper.advance(0.2).is_done());
    }

    #[test]
    fn test_zero_duration_snaps() {
        let mut stepper = compile(
            &preset(json!({
                "duration": 0.0,
                "start_position": {"xalign": 0.0},
                "end_position": {"xalign": 1.0}
            })),
            &PositionOverride::default(),
        );
        let frame = stepper.advance(0.0);
        assert!(frame.is_done());
        assert!(approx(frame.state.xalign, 1.0));
    }

    #[test]
    fn test_interpolates_only_axes_in_both() {
        let mut stepper = compile(
            &preset(json!({
                "start_position": {"xalign": 0.0, "xoffset": -100.0},
                "end_position": {"xalign": 0.5, "yoffset": 20.0},
                "duration": 1.0,
                "easing": "linear"
            })),
            &PositionOverride::default(),
        );
        let state = stepper.advance(0.5).state;
        assert!(approx(state.xalign, 0.25));
        // 只在一侧出现的偏移轴不输出
        assert_eq!(state.xoffset, None);
        assert_eq!(state.yoffset, None);
        // 未给出的对齐轴使用默认值
        assert!(approx(state.yalign, DEFAULT_YALIGN));
    }

    #[test]
    fn test_override_held_constant() {
        let mut stepper = compile(
            &preset(json!({
                "start_position": {"xoffset": -200.0},
                "end_position": {"xoffset": 0.0},
                "duration": 1.0
            })),
            &PositionOverride::align(0.2, 0.9),
        );
        for t in [0.0, 0.5, 1.0] {
            let state = stepper.advance(t).state;
            assert!(approx(state.xalign, 0.2));
            assert!(approx(state.yalign, 0.9));
        }
    }

    #[test]
    fn test_override_does_not_replace_animated_axis() {
        let stepper = compile(
            &preset(json!({
                "start_position": {"xalign": 0.0},
                "end_position": {"xalign": 1.0},
            })),
            &PositionOverride::align(0.3, 0.9),
        );
        assert_eq!(stepper.final_align(), (1.0, 0.9));
    }

    #[test]
    fn test_absolute_axes_drive_pos() {
        let mut stepper = compile(
            &preset(json!({
                "start_position": {"x": 0.0, "y": 100.0},
                "end_position": {"x": 400.0, "y": 100.0},
                "duration": 2.0,
                "easing": "linear"
            })),
            &PositionOverride::default(),
        );
        let state = stepper.advance(1.0).state;
        assert!(approx(state.xpos, 200.0));
        assert!(approx(state.ypos, 100.0));
    }

    #[test]
    fn test_alpha_rotation_defaults_are_identity() {
        let mut stepper = compile(&preset(json!({})), &PositionOverride::default());
        let state = stepper.advance(0.1).state;
        assert!(approx(state.alpha, 1.0));
        assert!(approx(state.rotation, 0.0));
        assert!(approx(state.scale, 1.0));
    }

    #[test]
    fn test_delay_holds_start() {
        let mut stepper = compile(
            &preset(json!({
                "alpha": {"start": 0.0, "end": 1.0},
                "duration": 1.0,
                "delay": 0.5,
                "easing": "linear"
            })),
            &PositionOverride::default(),
        );
        assert!(approx(stepper.advance(0.25).state.alpha, 0.0));
        assert!(approx(stepper.advance(1.0).state.alpha, 0.5));
        assert!(stepper.advance(1.5).is_done());
    }

    #[test]
    fn test_unknown_easing_is_linear() {
        let stepper = compile(
            &preset(json!({"easing": "wobble"})),
            &PositionOverride::default(),
        );
        assert_eq!(stepper.easing(), Easing::Linear);
    }
}
