//! # Frame 模块
//!
//! 编译产物与渲染器之间的逐帧契约。
//!
//! 渲染器每帧用"自开始以来经过的秒数"调用一次 [`FrameStepper::advance`]，
//! 拿到部分视觉状态和继续/结束信号：
//!
//! ```text
//! renderer tick
//!   → stepper.advance(elapsed) → Frame { state, signal, sound }
//!   → 应用 state；signal == Done 时停止调用
//! ```
//!
//! 取消即"不再调用"。步进器只持有自身状态，不引用控制器，
//! 因此被取消的步进器不会影响编排状态。

use serde::Serialize;

use crate::audio::AudioCommand;
use crate::preset::MeshPad;
use crate::shader::ShaderApplication;

/// 继续/结束信号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameSignal {
    /// 下一帧继续调用
    #[default]
    Continue,
    /// 已到达终态，不再需要调用
    Done,
}

impl FrameSignal {
    /// 是否已结束
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// 按"是否还需要继续"构造
    pub fn continue_if(keep_going: bool) -> Self {
        if keep_going { Self::Continue } else { Self::Done }
    }
}

/// 部分视觉状态
///
/// 每个字段都是可选的：`None` 表示本帧不触碰该属性。
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VisualState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xalign: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yalign: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xoffset: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yoffset: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xpos: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ypos: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alpha: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<f32>,
    /// 本帧应用的着色器
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shader: Option<ShaderApplication>,
    /// 是否需要网格（离屏）渲染
    ///
    /// 附加着色器时必须为 `true`，否则着色器无法采样像素，效果静默丢失。
    pub mesh: bool,
    /// 网格内边距
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mesh_pad: Option<MeshPad>,
}

impl VisualState {
    /// 附加着色器，同时打开网格渲染
    pub fn attach_shader(&mut self, application: ShaderApplication) {
        self.mesh = true;
        self.mesh_pad = Some(application.mesh_pad);
        self.shader = Some(application);
    }

    /// 当前对齐坐标
    pub fn align(&self) -> Option<(f32, f32)> {
        Some((self.xalign?, self.yalign?))
    }
}

/// 单帧求值结果
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Frame {
    pub state: VisualState,
    pub signal: FrameSignal,
    /// 本帧需要触发的音效（最多一次）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sound: Option<AudioCommand>,
}

impl Frame {
    pub fn new(state: VisualState, signal: FrameSignal) -> Self {
        Self {
            state,
            signal,
            sound: None,
        }
    }

    /// 是否已结束
    pub fn is_done(&self) -> bool {
        self.signal.is_done()
    }
}

/// 逐帧步进器
pub trait FrameStepper {
    /// 以自开始以来经过的秒数求值一帧
    fn advance(&mut self, elapsed: f32) -> Frame;
}

/// 以固定步长驱动步进器直到结束（或达到帧数上限）
///
/// 供 CLI 采样与测试使用；真实渲染器按自己的时钟调用 `advance`。
pub fn run_to_end(stepper: &mut dyn FrameStepper, dt: f32, max_frames: usize) -> Vec<Frame> {
    let mut frames = Vec::new();
    for i in 0..max_frames {
        let frame = stepper.advance(i as f32 * dt);
        let done = frame.is_done();
        frames.push(frame);
        if done {
            break;
        }
    }
    frames
}
