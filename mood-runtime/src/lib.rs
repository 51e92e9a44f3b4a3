//! # Mood Runtime
//!
//! 视觉小说演出预设的核心运行时库。
//!
//! ## 架构概述
//!
//! `mood-runtime` 是纯逻辑核心，不做渲染也不播放音频。
//! 它把作者手写的 JSON 预设编译为逐帧步进器，交给宿主层的渲染器驱动：
//!
//! ```text
//! JSON ──► PresetStore ──► TransformStepper / ShaderStepper ──► MoodController
//!          (解析 + 继承)     (编译为逐帧步进器)                   (组合、记录位置、环境音)
//!                                                                   │
//!                                  Renderer ◄── ChoreographyStepper ┘
//!                                  每帧 advance(elapsed) → Frame { state, signal, sound }
//! ```
//!
//! ## 核心类型
//!
//! - [`PresetStore`]：加载并索引三类预设文档
//! - [`Easing`]：缓动函数
//! - [`TransformStepper`]：过渡预设的编译产物
//! - [`ShaderStepper`]：着色器预设的编译产物
//! - [`MoodController`]：场景编排门面
//! - [`FrameStepper`]：逐帧契约
//!
//! ## 使用示例
//!
//! ```ignore
//! use mood_runtime::{FrameStepper, MoodConfig, MoodController};
//!
//! let mut mood = MoodController::new(MoodConfig::load("mood.json"));
//! mood.set("rainy");
//! for command in mood.take_audio_commands() {
//!     host.audio.execute(command);
//! }
//!
//! let mut show = mood.build_enter_transform("alice", None);
//! loop {
//!     let frame = show.advance(clock.elapsed());
//!     host.apply("alice", &frame.state);
//!     if frame.is_done() {
//!         break;
//!     }
//! }
//! ```
//!
//! ## 模块结构
//!
//! - [`store`]：预设加载、继承解析与校验
//! - [`preset`]：预设记录类型
//! - [`easing`]：缓动函数
//! - [`transform`]：过渡编译
//! - [`shader`]：着色器编译、颜色转换、参数注解
//! - [`mood`]：编排控制器
//! - [`catalog`]：可编辑的预设目录（撤销/重做）
//! - [`config`]：运行时配置
//! - [`error`]：错误类型定义

pub mod audio;
pub mod catalog;
pub mod config;
pub mod easing;
pub mod error;
pub mod frame;
pub mod mood;
pub mod preset;
pub mod shader;
pub mod store;
pub mod transform;
pub mod value;

// 重导出核心类型
pub use audio::AudioCommand;
pub use catalog::{MAX_UNDO_LEVELS, MoveDirection, PresetCatalog, Section};
pub use config::{AudioConfig, MoodConfig};
pub use easing::{Easing, ease};
pub use error::{CatalogError, ColorError, ConfigError, PresetError, PresetKind, PresetResult};
pub use frame::{Frame, FrameSignal, FrameStepper, VisualState, run_to_end};
pub use mood::{
    ChoreographyState, ChoreographyStepper, IntensityFade, MoodController, Phase,
    SHADER_INTENSITY_EPSILON,
};
pub use preset::{
    AmbientConfig, CharacterChoreography, LeadConfig, MeshPad, PositionSpec, Range, ScenePreset,
    ScreenTransition, ShaderAttachment, ShaderPreset, TransformPreset,
};
pub use shader::annotations::{ParamWarning, ShaderDefinition, ShaderLibrary, ShaderParam};
pub use shader::color::hex_to_color;
pub use shader::{ShaderApplication, ShaderCompiler, ShaderStepper, UniformValue};
pub use store::{PresetStore, PresetWarning};
pub use transform::{PositionOverride, TransformStepper};
