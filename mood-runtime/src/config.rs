//! # Config 模块
//!
//! 编排运行时配置。
//!
//! ## 配置优先级
//!
//! 1. 命令行参数（最高）
//! 2. 配置文件 (mood.json)
//! 3. 默认值（最低）

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// 编排配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodConfig {
    /// 预设文件根目录
    #[serde(default = "default_presets_root")]
    pub presets_root: PathBuf,

    /// 过渡预设文件（相对于 presets_root）
    #[serde(default = "default_transitions_path")]
    pub transitions_path: String,

    /// 着色器预设文件（相对于 presets_root）
    #[serde(default = "default_shaders_path")]
    pub shaders_path: String,

    /// 场景预设文件（相对于 presets_root）
    #[serde(default = "default_scenes_path")]
    pub scenes_path: String,

    /// `reset()` 时切换到的场景
    #[serde(default = "default_scene")]
    pub default_scene: String,

    /// 入场过渡查找失败时的后备预设
    #[serde(default = "default_fallback_enter")]
    pub fallback_enter: String,

    /// 退场过渡查找失败时的后备预设
    #[serde(default = "default_fallback_exit")]
    pub fallback_exit: String,

    /// 音频通道配置
    #[serde(default)]
    pub audio: AudioConfig,
}

/// 音频通道配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    /// 环境音通道
    #[serde(default = "default_ambient_channel")]
    pub ambient_channel: String,

    /// 出入场音效通道
    #[serde(default = "default_sound_channel")]
    pub sound_channel: String,

    /// 停止环境音时的淡出时长（秒）
    #[serde(default = "default_ambient_fadeout")]
    pub ambient_fadeout: f32,
}

// 默认值函数
fn default_presets_root() -> PathBuf {
    PathBuf::from("presets")
}

fn default_transitions_path() -> String {
    "transition_presets.json".to_string()
}

fn default_shaders_path() -> String {
    "shader_presets.json".to_string()
}

fn default_scenes_path() -> String {
    "mood_presets.json".to_string()
}

fn default_scene() -> String {
    "default".to_string()
}

fn default_fallback_enter() -> String {
    "slide_left_enter".to_string()
}

fn default_fallback_exit() -> String {
    "fade_left_exit".to_string()
}

fn default_ambient_channel() -> String {
    "ambient".to_string()
}

fn default_sound_channel() -> String {
    "sound".to_string()
}

fn default_ambient_fadeout() -> f32 {
    1.0
}

impl Default for MoodConfig {
    fn default() -> Self {
        Self {
            presets_root: default_presets_root(),
            transitions_path: default_transitions_path(),
            shaders_path: default_shaders_path(),
            scenes_path: default_scenes_path(),
            default_scene: default_scene(),
            fallback_enter: default_fallback_enter(),
            fallback_exit: default_fallback_exit(),
            audio: AudioConfig::default(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            ambient_channel: default_ambient_channel(),
            sound_channel: default_sound_channel(),
            ambient_fadeout: default_ambient_fadeout(),
        }
    }
}

impl MoodConfig {
    /// 以指定根目录构造默认配置
    pub fn with_root(presets_root: impl Into<PathBuf>) -> Self {
        Self {
            presets_root: presets_root.into(),
            ..Default::default()
        }
    }

    /// 从文件加载配置
    ///
    /// 文件不存在或解析失败时返回默认配置。
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            tracing::warn!(path = %path.display(), "配置文件不存在，使用默认配置");
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => {
                    tracing::info!(path = %path.display(), "配置文件加载成功");
                    config
                }
                Err(e) => {
                    tracing::warn!(error = %e, "配置文件解析失败，使用默认配置");
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "配置文件读取失败，使用默认配置");
                Self::default()
            }
        }
    }

    /// 保存配置到文件
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializationFailed(e.to_string()))?;

        fs::write(path, json).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// 过渡预设完整路径
    pub fn transitions_full_path(&self) -> PathBuf {
        self.presets_root.join(&self.transitions_path)
    }

    /// 着色器预设完整路径
    pub fn shaders_full_path(&self) -> PathBuf {
        self.presets_root.join(&self.shaders_path)
    }

    /// 场景预设完整路径
    pub fn scenes_full_path(&self) -> PathBuf {
        self.presets_root.join(&self.scenes_path)
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        let names = [
            ("transitions_path", &self.transitions_path),
            ("shaders_path", &self.shaders_path),
            ("scenes_path", &self.scenes_path),
            ("default_scene", &self.default_scene),
            ("fallback_enter", &self.fallback_enter),
            ("fallback_exit", &self.fallback_exit),
            ("audio.ambient_channel", &self.audio.ambient_channel),
            ("audio.sound_channel", &self.audio.sound_channel),
        ];
        for (field, value) in names {
            if value.trim().is_empty() {
                return Err(ConfigError::ValidationFailed(format!("{} 不能为空", field)));
            }
        }

        if !self.audio.ambient_fadeout.is_finite() || self.audio.ambient_fadeout < 0.0 {
            return Err(ConfigError::ValidationFailed(format!(
                "audio.ambient_fadeout 必须 >= 0，当前为 {}",
                self.audio.ambient_fadeout
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MoodConfig::default();
        assert_eq!(config.presets_root, PathBuf::from("presets"));
        assert_eq!(config.default_scene, "default");
        assert_eq!(config.fallback_enter, "slide_left_enter");
        assert_eq!(config.fallback_exit, "fade_left_exit");
        assert_eq!(config.audio.ambient_channel, "ambient");
        assert_eq!(config.audio.ambient_fadeout, 1.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: MoodConfig = serde_json::from_str(
            r#"{"presets_root": "game/presets", "audio": {"ambient_fadeout": 2.0}}"#,
        )
        .unwrap();
        assert_eq!(config.presets_root, PathBuf::from("game/presets"));
        assert_eq!(config.scenes_path, "mood_presets.json");
        assert_eq!(config.audio.ambient_fadeout, 2.0);
        assert_eq!(config.audio.sound_channel, "sound");
    }

    #[test]
    fn test_full_paths() {
        let config = MoodConfig::with_root("data");
        assert_eq!(
            config.transitions_full_path(),
            PathBuf::from("data").join("transition_presets.json")
        );
        assert_eq!(
            config.shaders_full_path(),
            PathBuf::from("data").join("shader_presets.json")
        );
    }

    #[test]
    fn test_validate_rejects_empty_names() {
        let config = MoodConfig {
            default_scene: "  ".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationFailed(_))
        ));
    }

    #[test]
    fn test_validate_rejects_negative_fadeout() {
        let mut config = MoodConfig::default();
        config.audio.ambient_fadeout = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_missing_falls_back() {
        let config = MoodConfig::load("/definitely/not/here/mood.json");
        assert_eq!(config, MoodConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mood.json");

        let mut config = MoodConfig::with_root("assets/presets");
        config.default_scene = "calm".to_string();
        config.save(&path).unwrap();

        assert_eq!(MoodConfig::load(&path), config);
    }

    #[test]
    fn test_load_malformed_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mood.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(MoodConfig::load(&path), MoodConfig::default());
    }
}
