//! # Error 模块
//!
//! 定义 mood-runtime 中使用的错误类型。
//!
//! 公开的门面方法（`PresetStore::load`、`MoodController::set` 等）不会把这些错误
//! 抛给调用方：失败会被记录日志，并降级为安全的默认值。内部函数之间则用
//! `Result` + `?` 传递。

use std::fmt;

use thiserror::Error;

/// 预设文档类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PresetKind {
    /// 过渡（位移/透明度/缩放/旋转）预设
    Transition,
    /// 着色器预设
    Shader,
    /// 场景（mood）预设
    Scene,
}

impl PresetKind {
    /// 所有类型（按加载顺序）
    pub const ALL: [PresetKind; 3] = [Self::Transition, Self::Shader, Self::Scene];

    /// 文档中承载预设表的顶层键
    pub fn section_key(&self) -> &'static str {
        match self {
            Self::Transition | Self::Scene => "presets",
            Self::Shader => "shader_presets",
        }
    }
}

impl fmt::Display for PresetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Transition => "transition",
            Self::Shader => "shader",
            Self::Scene => "scene",
        };
        f.write_str(name)
    }
}

/// 预设加载/解析错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PresetError {
    /// 预设文件不存在
    #[error("预设文件不存在: {path}")]
    ConfigNotFound { path: String },

    /// 预设文件 JSON 格式错误
    #[error("预设文件解析失败 {path}: {message}")]
    ConfigParse { path: String, message: String },

    /// 读取文件失败
    #[error("读取预设文件失败 {path}: {message}")]
    Io { path: String, message: String },

    /// 按名称查找失败
    #[error("{kind} 预设 '{name}' 不存在")]
    PresetNotFound { kind: PresetKind, name: String },

    /// 继承链中的父预设不存在（或成环）
    #[error("预设 '{name}' 的父预设 '{parent}' 无法解析")]
    UnresolvedInheritance { name: String, parent: String },

    /// 记录结构不合法（字段类型不匹配等）
    #[error("{kind} 预设 '{name}' 结构无效: {message}")]
    InvalidRecord {
        kind: PresetKind,
        name: String,
        message: String,
    },
}

/// 颜色解析错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ColorError {
    /// 空字符串
    #[error("颜色字符串为空")]
    Empty,
    /// 缺少 '#' 前缀
    #[error("颜色必须以 '#' 开头")]
    MissingHash,
    /// 长度不合法（'#' 之后必须是 3/4/6/8 位）
    #[error("颜色长度 {0} 无效，应为 3、4、6 或 8")]
    InvalidLength(usize),
    /// 非十六进制字符
    #[error("无效的十六进制字符 '{0}'")]
    InvalidHex(char),
}

/// 配置错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// 序列化失败
    #[error("配置序列化失败: {0}")]
    SerializationFailed(String),
    /// IO 错误
    #[error("配置 IO 错误: {0}")]
    IoError(String),
    /// 验证失败
    #[error("配置验证失败: {0}")]
    ValidationFailed(String),
}

/// 预设目录编辑错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CatalogError {
    /// 名称已存在
    #[error("预设 '{0}' 已存在")]
    DuplicateName(String),
    /// 名称不存在
    #[error("预设 '{0}' 不存在")]
    NotFound(String),
    /// 文件读写失败
    #[error("预设文件 IO 错误 {path}: {message}")]
    Io { path: String, message: String },
    /// JSON 序列化/反序列化失败
    #[error("预设文件序列化失败: {0}")]
    Serialize(String),
}

/// Result 类型别名
pub type PresetResult<T> = Result<T, PresetError>;
