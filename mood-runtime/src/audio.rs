//! # Audio 模块
//!
//! 音频副作用命令。
//!
//! 运行时不播放声音，只产出 [`AudioCommand`]，由宿主层交给音频子系统
//! （即发即忘）。

use serde::Serialize;

/// 音频命令
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AudioCommand {
    /// 在指定通道播放
    Play {
        sound: String,
        channel: String,
        volume: f32,
        /// 淡入时长（秒）
        fade_in: f32,
        looping: bool,
    },
    /// 停止指定通道
    Stop {
        channel: String,
        /// 淡出时长（秒）
        fade_out: f32,
    },
}

impl AudioCommand {
    /// 一次性音效
    pub fn one_shot(sound: impl Into<String>, channel: impl Into<String>) -> Self {
        Self::Play {
            sound: sound.into(),
            channel: channel.into(),
            volume: 1.0,
            fade_in: 0.0,
            looping: false,
        }
    }

    /// 目标通道
    pub fn channel(&self) -> &str {
        match self {
            Self::Play { channel, .. } | Self::Stop { channel, .. } => channel,
        }
    }
}
