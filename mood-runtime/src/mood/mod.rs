//! # Mood 模块
//!
//! 编排控制器：持有当前场景预设，为角色组装出入场步进器，
//! 跟踪角色位置，并产出环境音命令。
//!
//! ## 状态机
//!
//! ```text
//! NoMood ──set(name)──▶ MoodActive(name) ──set(other)──▶ MoodActive(other)
//!            │ 查找失败：记录警告，状态不变，返回 false
//! ```
//!
//! ## 出入场
//!
//! - 入场：着色器强度 1 → 0（出现时效果最强，逐渐变干净），记录终点位置
//! - 退场：着色器强度 0 → 1，默认从记录的位置出发，并清除记录
//!
//! 任何无法解析的名称都会降级为后备过渡，最后降级为恒等变换，
//! 不会中断播放。

mod stepper;

pub use stepper::{ChoreographyStepper, IntensityFade, SHADER_INTENSITY_EPSILON};

use std::collections::HashMap;

use serde_json::Value;

use crate::audio::AudioCommand;
use crate::config::MoodConfig;
use crate::preset::{
    CharacterChoreography, LeadConfig, PositionSpec, ScenePreset, ScreenTransition,
    TransformPreset,
};
use crate::shader::ShaderCompiler;
use crate::store::PresetStore;
use crate::transform::{self, DEFAULT_XALIGN, DEFAULT_YALIGN, PositionOverride, TransformStepper};

/// 出场 / 入场
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Enter,
    Exit,
}

impl Phase {
    fn lead<'a>(&self, choreography: &'a CharacterChoreography) -> Option<&'a LeadConfig> {
        match self {
            Phase::Enter => choreography.lead_in.as_ref(),
            Phase::Exit => choreography.lead_out.as_ref(),
        }
    }

    fn intensity_fade(&self, duration: f32) -> IntensityFade {
        match self {
            Phase::Enter => IntensityFade::fade_out(duration),
            Phase::Exit => IntensityFade::fade_in(duration),
        }
    }
}

/// 编排状态
#[derive(Debug, Clone, Default)]
pub struct ChoreographyState {
    /// 当前场景预设
    pub current: Option<ScenePreset>,
    /// 当前场景名
    pub current_name: Option<String>,
    /// 角色名 -> 入场终点 `(xalign, yalign)`
    pub positions: HashMap<String, (f32, f32)>,
}

/// 编排控制器
#[derive(Debug)]
pub struct MoodController {
    config: MoodConfig,
    store: PresetStore,
    state: ChoreographyState,
    audio_queue: Vec<AudioCommand>,
}

impl MoodController {
    /// 创建控制器，预设在首次使用时按配置加载
    pub fn new(config: MoodConfig) -> Self {
        Self::with_store(config, PresetStore::new())
    }

    /// 使用预先构建的预设仓库
    pub fn with_store(config: MoodConfig, store: PresetStore) -> Self {
        Self {
            config,
            store,
            state: ChoreographyState::default(),
            audio_queue: Vec::new(),
        }
    }

    /// 确保三类预设都已加载（幂等，失败的类型下次重试）
    pub fn ensure_loaded(&mut self) -> bool {
        self.store.load_from_config(&self.config)
    }

    pub fn config(&self) -> &MoodConfig {
        &self.config
    }

    pub fn store(&self) -> &PresetStore {
        &self.store
    }

    pub fn state(&self) -> &ChoreographyState {
        &self.state
    }

    /// 切换场景
    ///
    /// 查找失败时状态不变并返回 `false`。
    pub fn set(&mut self, name: &str) -> bool {
        self.ensure_loaded();

        let scene = match self.store.scene(name) {
            Ok(scene) => scene,
            Err(e) => {
                tracing::warn!(scene = %name, error = %e, "场景切换失败，保持当前状态");
                return false;
            }
        };

        self.queue_ambient(&scene);
        self.state.current = Some(scene);
        self.state.current_name = Some(name.to_string());
        tracing::info!(scene = %name, "场景已切换");
        true
    }

    /// 回到默认场景并清空角色位置
    pub fn reset(&mut self) -> bool {
        self.state.positions.clear();
        let default_scene = self.config.default_scene.clone();
        self.set(&default_scene)
    }

    fn queue_ambient(&mut self, scene: &ScenePreset) {
        let channel = self.config.audio.ambient_channel.clone();
        let command = match &scene.active.ambient {
            Some(ambient) if !ambient.is_silent() => AudioCommand::Play {
                sound: ambient.sound.clone(),
                channel,
                volume: ambient.volume.clamp(0.0, 1.0),
                fade_in: ambient.fadein.max(0.0),
                looping: ambient.looping,
            },
            _ => AudioCommand::Stop {
                channel,
                fade_out: self.config.audio.ambient_fadeout,
            },
        };
        self.audio_queue.push(command);
    }

    /// 取出待执行的音频命令
    pub fn take_audio_commands(&mut self) -> Vec<AudioCommand> {
        std::mem::take(&mut self.audio_queue)
    }

    /// 当前场景名
    pub fn current_name(&self) -> Option<&str> {
        self.state.current_name.as_deref()
    }

    /// 当前场景预设
    pub fn current(&self) -> Option<&ScenePreset> {
        self.state.current.as_ref()
    }

    /// 当前场景的进入/退出屏幕过渡
    pub fn get_transition(&self, phase: Phase) -> Option<&ScreenTransition> {
        let transitions = &self.current()?.transition;
        match phase {
            Phase::Enter => transitions.enter.as_ref(),
            Phase::Exit => transitions.exit.as_ref(),
        }
    }

    /// 当前场景的对话框配置（原样透传）
    pub fn get_dialogbox_config(&self) -> Option<&Value> {
        self.current()?.dialogbox.as_ref()
    }

    /// 角色记录的入场终点
    pub fn recorded_position(&self, character: &str) -> Option<(f32, f32)> {
        self.state.positions.get(character).copied()
    }

    /// 组装入场步进器，并记录角色终点位置
    pub fn build_enter_transform(
        &mut self,
        character: &str,
        position: Option<PositionOverride>,
    ) -> ChoreographyStepper {
        self.ensure_loaded();
        let overrides = position.unwrap_or_default();
        let stepper = self.build(character, Phase::Enter, &overrides);

        let end = stepper.base().final_align();
        self.state.positions.insert(character.to_string(), end);
        tracing::debug!(character = %character, x = end.0, y = end.1, "记录角色入场位置");
        stepper
    }

    /// 组装退场步进器
    ///
    /// 未给出位置时从记录的入场位置出发（没有记录则为水平居中、底部对齐），
    /// 记录随之清除。
    pub fn build_exit_transform(
        &mut self,
        character: &str,
        position: Option<PositionOverride>,
    ) -> ChoreographyStepper {
        self.ensure_loaded();
        let recorded = self.state.positions.remove(character);
        let overrides = position.unwrap_or_else(|| {
            let (x, y) = recorded.unwrap_or((DEFAULT_XALIGN, DEFAULT_YALIGN));
            PositionSpec::align(x, y)
        });
        self.build(character, Phase::Exit, &overrides)
    }

    fn build(&self, character: &str, phase: Phase, overrides: &PositionOverride) -> ChoreographyStepper {
        let lead = self.lead_config(character, phase);
        let base = self.compile_base(lead.as_ref(), phase, overrides);
        let mut stepper = ChoreographyStepper::new(base);

        let Some(lead) = lead else {
            return stepper;
        };

        if let Some(attachment) = &lead.shader {
            match ShaderCompiler::new(&self.store).compile_named(&attachment.preset, &attachment.params) {
                Ok(shader) => {
                    stepper = stepper.with_shader(shader, phase.intensity_fade(attachment.fade_duration));
                }
                Err(e) => {
                    tracing::warn!(character = %character, preset = %attachment.preset, error = %e, "着色器不可用，只使用基础过渡");
                }
            }
        }

        if let Some(sound) = &lead.sound {
            stepper = stepper.with_sound(AudioCommand::one_shot(
                sound.clone(),
                self.config.audio.sound_channel.clone(),
            ));
        }

        stepper
    }

    /// 查找角色的出入场配置
    ///
    /// 没有当前场景时使用默认场景；角色缺少该阶段时使用场景 `"default"` 角色条目的同一阶段。
    fn lead_config(&self, character: &str, phase: Phase) -> Option<LeadConfig> {
        let fallback_scene;
        let scene = match self.current() {
            Some(scene) => scene,
            None => {
                fallback_scene = self.store.scene(&self.config.default_scene).ok()?;
                &fallback_scene
            }
        };
        scene
            .lead_for(character, |choreography| phase.lead(choreography))
            .cloned()
    }

    fn compile_base(
        &self,
        lead: Option<&LeadConfig>,
        phase: Phase,
        overrides: &PositionOverride,
    ) -> TransformStepper {
        if let Some(lead) = lead.filter(|lead| lead.is_inline()) {
            return transform::compile(&lead.inline_preset(), overrides);
        }

        let fallback: &str = match phase {
            Phase::Enter => &self.config.fallback_enter,
            Phase::Exit => &self.config.fallback_exit,
        };
        let name = lead
            .and_then(|lead| lead.transition.as_deref())
            .unwrap_or(fallback);

        let preset = self
            .store
            .transition(name)
            .or_else(|e| {
                tracing::warn!(transition = %name, fallback = %fallback, error = %e, "过渡预设不可用，使用后备过渡");
                self.store.transition(fallback)
            })
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "后备过渡不可用，使用恒等变换");
                TransformPreset::identity()
            });

        transform::compile(&preset, overrides)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PresetKind;
    use crate::frame::FrameStepper;
    use serde_json::json;

    fn store() -> PresetStore {
        let mut store = PresetStore::new();
        store.load_value(
            PresetKind::Transition,
            &json!({"presets": {
                "slide_left_enter": {
                    "start_position": {"xalign": -0.25},
                    "end_position": {"xalign": 0.25},
                    "duration": 0.4
                },
                "fade_left_exit": {
                    "alpha": {"start": 1.0, "end": 0.0},
                    "duration": 0.3
                },
                "pop_in": {"scale": {"start": 0.5, "end": 1.0}, "duration": 0.2},
                "custom_exit": {"alpha": {"start": 1.0, "end": 0.0}, "duration": 0.7}
            }}),
        );
        store.load_value(
            PresetKind::Shader,
            &json!({"shader_presets": {
                "glow_soft": {"shader": "shader.glow", "params": {"u_strength": 0.8}}
            }}),
        );
        store.load_value(
            PresetKind::Scene,
            &json!({"presets": {
                "default": {
                    "characters": {"default": {
                        "lead_in": {"transition": "slide_left_enter"},
                        "lead_out": {"transition": "custom_exit"}
                    }}
                },
                "patchy": {
                    "extends": "default",
                    "characters": {
                        "alice": {"lead_in": {"transition": "pop_in"}},
                        "zed": {"lead_in": {"start": [0.0, 1.0], "end": [0.5, 1.0], "speed": "fast"}},
                        "yan": {"lead_in": {"start": [0.0, 1.0], "end": [0.5, 1.0], "alpha": {"start": 0.0}}}
                    }
                },
                "rainy": {
                    "extends": "default",
                    "active": {"ambient": {"sound": "audio/rain.ogg", "volume": 0.6, "fadein": 2.0}},
                    "characters": {
                        "alice": {
                            "lead_in": {
                                "transition": "pop_in",
                                "shader": {"preset": "glow_soft", "fade_duration": 0.5}
                            },
                            "lead_out": {"transition": "missing_exit", "shader": "glow_soft"}
                        },
                        "dave": {"lead_in": {"transition": "pop_in"}}
                    },
                    "transition": {"enter": {"type": "fade", "duration": 1.0}},
                    "dialogbox": {"style": "rain"}
                }
            }}),
        );
        store
    }

    fn controller() -> MoodController {
        MoodController::with_store(MoodConfig::default(), store())
    }

    #[test]
    fn test_set_and_ambient() {
        let mut mood = controller();
        assert!(mood.set("rainy"));
        assert_eq!(mood.current_name(), Some("rainy"));
        assert_eq!(
            mood.take_audio_commands(),
            vec![AudioCommand::Play {
                sound: "audio/rain.ogg".to_string(),
                channel: "ambient".to_string(),
                volume: 0.6,
                fade_in: 2.0,
                looping: true,
            }]
        );
        assert!(mood.take_audio_commands().is_empty());

        assert!(mood.set("default"));
        assert_eq!(
            mood.take_audio_commands(),
            vec![AudioCommand::Stop {
                channel: "ambient".to_string(),
                fade_out: 1.0,
            }]
        );
    }

    #[test]
    fn test_set_missing_keeps_state() {
        let mut mood = controller();
        assert!(mood.set("rainy"));
        mood.take_audio_commands();

        assert!(!mood.set("nonexistent"));
        assert_eq!(mood.current_name(), Some("rainy"));
        assert!(mood.take_audio_commands().is_empty());
    }

    #[test]
    fn test_scene_accessors() {
        let mut mood = controller();
        assert!(mood.get_transition(Phase::Enter).is_none());
        mood.set("rainy");
        assert_eq!(mood.get_transition(Phase::Enter).unwrap().kind, "fade");
        assert!(mood.get_transition(Phase::Exit).is_none());
        assert_eq!(mood.get_dialogbox_config(), Some(&json!({"style": "rain"})));
    }

    #[test]
    fn test_enter_records_position_and_fades_shader() {
        let mut mood = controller();
        mood.set("rainy");

        let mut stepper = mood.build_enter_transform("alice", Some(PositionSpec::align(0.7, 1.0)));
        assert_eq!(mood.recorded_position("alice"), Some((0.7, 1.0)));

        let frame = stepper.advance(0.25);
        let shader = frame.state.shader.unwrap();
        assert_eq!(shader.shader, "shader.glow");
        assert!((shader.intensity - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_default_character_entry() {
        let mut mood = controller();
        mood.set("rainy");
        let stepper = mood.build_enter_transform("bob", None);
        // bob 使用继承来的 default 角色条目 (slide_left_enter)
        assert_eq!(stepper.base().final_align(), (0.25, 1.0));
        assert!(!stepper.has_shader());
    }

    #[test]
    fn test_missing_phase_uses_default_character() {
        let mut mood = controller();
        mood.set("rainy");

        let enter = mood.build_enter_transform("dave", None);
        assert_eq!(enter.base().duration(), 0.2);
        // dave 只有 lead_in，退场使用 default 角色的 lead_out
        let exit = mood.build_exit_transform("dave", None);
        assert_eq!(exit.base().duration(), 0.7);
    }

    #[test]
    fn test_bad_character_does_not_reject_scene() {
        let mut mood = controller();
        assert!(mood.set("patchy"));
        assert_eq!(mood.current_name(), Some("patchy"));

        let alice = mood.build_enter_transform("alice", None);
        assert_eq!(alice.base().duration(), 0.2);
        // zed 的条目被跳过，回退到 default 角色
        let zed = mood.build_enter_transform("zed", None);
        assert_eq!(zed.base().final_align(), (0.25, 1.0));

        // 只写了 start 的透明度，终点取 1.0
        let mut yan = mood.build_enter_transform("yan", None);
        assert_eq!(yan.advance(0.0).state.alpha, Some(0.0));
        assert_eq!(yan.advance(1.0).state.alpha, Some(1.0));
    }

    #[test]
    fn test_exit_consumes_recorded_position() {
        let mut mood = controller();
        mood.set("rainy");
        mood.build_enter_transform("bob", None);
        assert_eq!(mood.recorded_position("bob"), Some((0.25, 1.0)));

        let stepper = mood.build_exit_transform("bob", None);
        assert_eq!(mood.recorded_position("bob"), None);
        // fade_left_exit 不移动位置，保持在记录点
        assert_eq!(stepper.base().final_align(), (0.25, 1.0));
    }

    #[test]
    fn test_exit_without_entry_defaults() {
        let mut mood = controller();
        let mut stepper = mood.build_exit_transform("nobody", None);
        let state = stepper.advance(0.0).state;
        assert_eq!(state.align(), Some((0.5, 1.0)));
    }

    #[test]
    fn test_missing_transition_falls_back() {
        let mut mood = controller();
        mood.set("rainy");
        let mut stepper = mood.build_exit_transform("alice", None);
        // missing_exit -> fade_left_exit
        assert_eq!(stepper.base().duration(), 0.3);
        // 退场着色器从 0 开始
        assert!(stepper.advance(0.0).state.shader.is_none());
        let late = stepper.advance(0.5).state.shader.unwrap();
        assert!((late.intensity - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_identity_when_nothing_resolves() {
        let mut mood = MoodController::with_store(MoodConfig::default(), PresetStore::new());
        let mut stepper = mood.build_enter_transform("alice", None);
        let frame = stepper.advance(0.0);
        assert!(frame.is_done());
        assert_eq!(frame.state.alpha, Some(1.0));
    }

    #[test]
    fn test_reset_clears_positions() {
        let mut mood = controller();
        mood.set("rainy");
        mood.build_enter_transform("alice", None);
        assert!(mood.reset());
        assert_eq!(mood.current_name(), Some("default"));
        assert!(mood.state().positions.is_empty());
    }
}
