//! # Preset 模块
//!
//! 三类预设文档的强类型记录：
//!
//! - [`TransformPreset`]：过渡（位置/透明度/旋转/缩放/时长/缓动）
//! - [`ShaderPreset`]：着色器名 + 参数表
//! - [`ScenePreset`]：场景编排，按名称引用前两者
//!
//! 原始 JSON 由 [`PresetStore`](crate::store::PresetStore) 索引，
//! 这里只负责把（已规范化/已解析继承的）JSON 转为强类型。

mod scene;
mod shader;
mod transform;

pub use scene::{
    ActiveConfig, AmbientConfig, CharacterChoreography, DEFAULT_SCREEN_TRANSITION_DURATION,
    DEFAULT_SHADER_FADE, LeadConfig, ScenePreset, SceneTransitions, ScreenTransition,
    ShaderAttachment,
};
pub use shader::{MeshPad, ShaderPreset};
pub use transform::{DEFAULT_DURATION, DEFAULT_EASING, PositionSpec, Range, TransformPreset};
