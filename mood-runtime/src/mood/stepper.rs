//! 出入场组合步进器
//!
//! 每帧先求值基础过渡（位置/透明度等），再按当前强度叠加着色器：
//!
//! ```text
//! frame = base.advance(elapsed)
//! intensity = fade(elapsed)
//! if intensity > ε: frame.state.shader = shader.application(intensity)
//! continue ⇔ base 未结束 ∨ shader.animated ∨ intensity > ε
//! ```

use crate::audio::AudioCommand;
use crate::frame::{Frame, FrameSignal, FrameStepper};
use crate::shader::ShaderStepper;
use crate::transform::TransformStepper;

/// 低于此强度的着色器不再应用
pub const SHADER_INTENSITY_EPSILON: f32 = 0.01;

/// 线性强度过渡
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntensityFade {
    pub from: f32,
    pub to: f32,
    /// 时长（秒），`<= 0` 时直接取目标值
    pub duration: f32,
}

impl IntensityFade {
    /// 入场：效果从强到无
    pub fn fade_out(duration: f32) -> Self {
        Self {
            from: 1.0,
            to: 0.0,
            duration,
        }
    }

    /// 退场：效果从无到强
    pub fn fade_in(duration: f32) -> Self {
        Self {
            from: 0.0,
            to: 1.0,
            duration,
        }
    }

    /// 指定时间点的强度
    pub fn at(&self, elapsed: f32) -> f32 {
        if self.duration <= 0.0 {
            return self.to;
        }
        let t = (elapsed / self.duration).clamp(0.0, 1.0);
        self.from + (self.to - self.from) * t
    }
}

#[derive(Debug, Clone)]
struct ShaderLayer {
    stepper: ShaderStepper,
    fade: IntensityFade,
}

/// 出入场步进器
#[derive(Debug, Clone)]
pub struct ChoreographyStepper {
    base: TransformStepper,
    shader: Option<ShaderLayer>,
    /// 尚未播放的音效，播放后置为 `None`
    pending_sound: Option<AudioCommand>,
}

impl ChoreographyStepper {
    /// 只有基础过渡的步进器
    pub fn new(base: TransformStepper) -> Self {
        Self {
            base,
            shader: None,
            pending_sound: None,
        }
    }

    /// 叠加着色器
    pub fn with_shader(mut self, stepper: ShaderStepper, fade: IntensityFade) -> Self {
        self.shader = Some(ShaderLayer { stepper, fade });
        self
    }

    /// 延迟结束后播放一次的音效
    pub fn with_sound(mut self, sound: AudioCommand) -> Self {
        self.pending_sound = Some(sound);
        self
    }

    /// 基础过渡
    pub fn base(&self) -> &TransformStepper {
        &self.base
    }

    /// 是否叠加了着色器
    pub fn has_shader(&self) -> bool {
        self.shader.is_some()
    }

    /// 指定时间点的着色器强度（无着色器时为 `None`）
    pub fn intensity_at(&self, elapsed: f32) -> Option<f32> {
        self.shader.as_ref().map(|layer| layer.fade.at(elapsed))
    }
}

impl FrameStepper for ChoreographyStepper {
    fn advance(&mut self, elapsed: f32) -> Frame {
        let base = self.base.advance(elapsed);
        let mut state = base.state;
        let mut keep_going = !base.signal.is_done();

        if let Some(layer) = &mut self.shader {
            let intensity = layer.fade.at(elapsed);
            layer.stepper.set_intensity(intensity);

            state.mesh = true;
            state.mesh_pad = Some(layer.stepper.mesh_pad());
            let visible = intensity > SHADER_INTENSITY_EPSILON;
            if visible {
                state.attach_shader(layer.stepper.application());
            }

            keep_going |= layer.stepper.is_animated() || visible;
        }

        let sound = if elapsed >= self.base.delay() {
            self.pending_sound.take()
        } else {
            None
        };

        Frame {
            state,
            signal: FrameSignal::continue_if(keep_going),
            sound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preset::{ShaderPreset, TransformPreset};
    use crate::transform::{self, PositionOverride};
    use serde_json::{Map, json};

    fn base(raw: serde_json::Value) -> TransformStepper {
        transform::compile(
            &TransformPreset::normalize(&raw, None).unwrap(),
            &PositionOverride::default(),
        )
    }

    fn shader(animated: bool) -> ShaderStepper {
        let preset = ShaderPreset::from_value(&json!({
            "shader": "shader.glow",
            "params": {"u_strength": 1.0, "u_color": "#FFFFFF"},
            "animated": animated,
            "mesh_pad": 8
        }))
        .unwrap();
        crate::shader::compile("glow", &preset, &Map::new()).unwrap()
    }

    #[test]
    fn test_fade_linear() {
        let fade = IntensityFade::fade_out(0.5);
        assert!((fade.at(0.25) - 0.5).abs() < 1e-6);
        assert_eq!(fade.at(1.0), 0.0);

        let instant = IntensityFade::fade_in(0.0);
        assert_eq!(instant.at(0.0), 1.0);
    }

    #[test]
    fn test_entrance_shader_half_intensity() {
        let mut stepper = ChoreographyStepper::new(base(json!({"duration": 1.0})))
            .with_shader(shader(false), IntensityFade::fade_out(0.5));
        let frame = stepper.advance(0.25);
        let applied = frame.state.shader.unwrap();
        assert!((applied.intensity - 0.5).abs() < 1e-6);
        assert!(frame.state.mesh);
    }

    #[test]
    fn test_shader_dropped_below_epsilon() {
        let mut stepper = ChoreographyStepper::new(base(json!({"duration": 1.0})))
            .with_shader(shader(false), IntensityFade::fade_out(0.5));
        let frame = stepper.advance(0.6);
        assert!(frame.state.shader.is_none());
        // 网格渲染保持开启
        assert!(frame.state.mesh);
        assert!(!frame.is_done());
        assert!(stepper.advance(1.0).is_done());
    }

    #[test]
    fn test_static_exit_shader_keeps_running_at_full_intensity() {
        let mut stepper = ChoreographyStepper::new(base(json!({"duration": 0.2})))
            .with_shader(shader(false), IntensityFade::fade_in(1.0));
        assert!(!stepper.advance(0.5).is_done());

        let late = stepper.advance(3.0);
        assert_eq!(late.state.shader.as_ref().map(|s| s.intensity), Some(1.0));
        assert!(!late.is_done());
    }

    #[test]
    fn test_static_shader_below_epsilon_at_start() {
        // 退场开始时强度为 0，基础过渡决定是否继续
        let mut stepper = ChoreographyStepper::new(base(json!({"duration": 0.0})))
            .with_shader(shader(false), IntensityFade::fade_in(1.0));
        assert!(stepper.advance(0.0).is_done());
    }

    #[test]
    fn test_animated_shader_never_finishes() {
        let mut exit = ChoreographyStepper::new(base(json!({"duration": 0.2})))
            .with_shader(shader(true), IntensityFade::fade_in(0.5));
        assert!(!exit.advance(3.0).is_done());

        let mut entrance = ChoreographyStepper::new(base(json!({"duration": 0.2})))
            .with_shader(shader(true), IntensityFade::fade_out(0.5));
        let frame = entrance.advance(3.0);
        assert!(frame.state.shader.is_none());
        assert!(!frame.is_done());
    }

    #[test]
    fn test_sound_emitted_once_after_delay() {
        let mut stepper = ChoreographyStepper::new(base(json!({"duration": 1.0, "delay": 0.3})))
            .with_sound(AudioCommand::one_shot("audio/step.ogg", "sound"));
        assert!(stepper.advance(0.1).sound.is_none());
        assert_eq!(
            stepper.advance(0.3).sound,
            Some(AudioCommand::one_shot("audio/step.ogg", "sound"))
        );
        assert!(stepper.advance(0.5).sound.is_none());
    }

    #[test]
    fn test_without_shader_matches_base() {
        let mut plain = base(json!({"scale": {"start": 1.0, "end": 0.5}, "duration": 1.0, "easing": "linear"}));
        let mut stepper = ChoreographyStepper::new(plain.clone());
        assert_eq!(stepper.advance(0.5).state, plain.advance(0.5).state);
        assert_eq!(stepper.intensity_at(0.5), None);
    }
}
