//! # Shader Annotations
//!
//! 从着色器源文件的结构化注释中提取参数元数据。
//!
//! ```text
//! ## @tool-category: Glow
//! ## @tool-description: Adds glowing aura effects
//!
//! # @shader: shader.glow
//! # @param u_glow_color: color, default=#FFFFFF, description=Glow color
//! # @param u_outer_strength: float, range=0.0-2.0, default=0.6
//! # @animated
//! register_shader("shader.glow", ...)
//! ```
//!
//! 没有注解、只有 `register_shader("name"` 调用的着色器也会生成基础定义。

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::preset::ShaderPreset;

/// 文件级元数据只在前若干行中查找
const FILE_HEADER_LINES: usize = 20;

/// 参数类型
#[derive(Debug, Clone, PartialEq)]
pub enum ParamType {
    Float,
    Int,
    Color,
    Vec2,
    Vec3,
    Vec4,
    Other(String),
}

impl ParamType {
    fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "float" => Self::Float,
            "int" => Self::Int,
            "color" => Self::Color,
            "vec2" => Self::Vec2,
            "vec3" => Self::Vec3,
            "vec4" => Self::Vec4,
            other => Self::Other(other.to_string()),
        }
    }
}

/// 参数默认值
#[derive(Debug, Clone, PartialEq)]
pub enum ParamDefault {
    Float(f32),
    Int(i64),
    Text(String),
}

/// 参数定义
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderParam {
    pub name: String,
    pub param_type: ParamType,
    pub default: Option<ParamDefault>,
    pub min_value: Option<f32>,
    pub max_value: Option<f32>,
    pub description: String,
}

impl ShaderParam {
    /// 解析 `# @param name: type, range=a-b, default=v, description=text`
    ///
    /// 类型缺省为 `float`。缺少 `:` 时返回 `None`。
    pub fn parse_line(line: &str) -> Option<Self> {
        let content = line.trim().strip_prefix("# @param")?.trim();
        let (name, attrs) = content.split_once(':')?;

        let mut param = ShaderParam {
            name: name.trim().to_string(),
            param_type: ParamType::Float,
            default: None,
            min_value: None,
            max_value: None,
            description: String::new(),
        };

        let mut default_raw = None;
        for attr in attrs.split(',') {
            let attr = attr.trim();
            match attr.split_once('=') {
                Some(("range", range)) => {
                    if let Some((lo, hi)) = split_range(range.trim())
                        && let (Ok(lo), Ok(hi)) = (lo.trim().parse(), hi.trim().parse())
                    {
                        param.min_value = Some(lo);
                        param.max_value = Some(hi);
                    }
                }
                Some(("default", value)) => default_raw = Some(value.trim().to_string()),
                Some(("description", text)) => param.description = text.trim().to_string(),
                Some(_) => {}
                None if !attr.is_empty() => param.param_type = ParamType::parse(attr),
                None => {}
            }
        }

        param.default = default_raw.map(|raw| match param.param_type {
            ParamType::Float => ParamDefault::Float(raw.parse().unwrap_or(0.0)),
            ParamType::Int => ParamDefault::Int(raw.parse().unwrap_or(0)),
            _ => ParamDefault::Text(raw),
        });

        Some(param)
    }

    /// 数值是否在声明范围内
    pub fn in_range(&self, value: f32) -> bool {
        self.min_value.is_none_or(|lo| value >= lo) && self.max_value.is_none_or(|hi| value <= hi)
    }
}

/// 着色器定义
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderDefinition {
    /// 着色器名（如 `shader.glow`）
    pub name: String,
    pub category: String,
    pub description: String,
    /// 文件开头的自然语言描述
    pub file_description: String,
    pub params: Vec<ShaderParam>,
    pub source_file: String,
    /// 1-based 行号
    pub line_number: usize,
    pub is_animated: bool,
}

impl ShaderDefinition {
    fn new(name: &str, header: &FileHeader, source_file: &str, line_number: usize) -> Self {
        Self {
            name: name.to_string(),
            category: header.category.clone(),
            description: header.description.clone(),
            file_description: header.natural_description.clone(),
            params: Vec::new(),
            source_file: source_file.to_string(),
            line_number,
            is_animated: false,
        }
    }

    /// 按名称查找参数
    pub fn param(&self, name: &str) -> Option<&ShaderParam> {
        self.params.iter().find(|p| p.name == name)
    }

    /// 对照定义检查着色器预设
    pub fn check_preset(&self, preset_name: &str, preset: &ShaderPreset) -> Vec<ParamWarning> {
        let mut warnings = Vec::new();
        // 仅有 register_shader 调用、没有参数注解时无从检查
        if self.params.is_empty() {
            return warnings;
        }

        for (key, value) in &preset.params {
            if crate::value::is_comment_key(key) {
                continue;
            }
            match self.param(key) {
                None => warnings.push(ParamWarning::UnknownParam {
                    preset: preset_name.to_string(),
                    shader: self.name.clone(),
                    param: key.clone(),
                }),
                Some(param) => {
                    if let Some(v) = value.as_f64() {
                        let v = v as f32;
                        if !param.in_range(v) {
                            warnings.push(ParamWarning::OutOfRange {
                                preset: preset_name.to_string(),
                                param: key.clone(),
                                value: v,
                                min: param.min_value,
                                max: param.max_value,
                            });
                        }
                    }
                }
            }
        }
        warnings
    }
}

/// 参数检查警告
#[derive(Debug, Clone, PartialEq)]
pub enum ParamWarning {
    /// 预设使用了定义中不存在的参数
    UnknownParam {
        preset: String,
        shader: String,
        param: String,
    },
    /// 数值超出声明范围
    OutOfRange {
        preset: String,
        param: String,
        value: f32,
        min: Option<f32>,
        max: Option<f32>,
    },
}

impl fmt::Display for ParamWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamWarning::UnknownParam {
                preset,
                shader,
                param,
            } => write!(f, "{}: 着色器 '{}' 没有参数 '{}'", preset, shader, param),
            ParamWarning::OutOfRange {
                preset,
                param,
                value,
                min,
                max,
            } => write!(
                f,
                "{}: 参数 '{}' 的值 {} 超出范围 [{}, {}]",
                preset,
                param,
                value,
                min.map_or("-∞".to_string(), |v| v.to_string()),
                max.map_or("+∞".to_string(), |v| v.to_string()),
            ),
        }
    }
}

/// 文件级元数据
#[derive(Debug, Default)]
struct FileHeader {
    category: String,
    description: String,
    natural_description: String,
}

impl FileHeader {
    fn parse(lines: &[&str]) -> Self {
        // 第 3-5 行的 `## text` 为自然语言描述，遇到空注释/注解/非注释即停止
        let natural = lines
            .iter()
            .skip(2)
            .take(3)
            .map(|line| line.trim())
            .take_while(|line| *line != "##" && !line.starts_with("## @") && line.starts_with("##"))
            .map(|line| line[2..].trim())
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        let mut header = FileHeader {
            category: "Uncategorized".to_string(),
            natural_description: natural,
            ..Default::default()
        };

        for line in lines.iter().take(FILE_HEADER_LINES).map(|l| l.trim()) {
            if let Some(category) = line.strip_prefix("## @tool-category:") {
                header.category = category.trim().to_string();
            } else if let Some(description) = line.strip_prefix("## @tool-description:") {
                header.description = description.trim().to_string();
            }
        }
        header
    }
}

/// 拆分 `a-b` 形式的范围，允许负数下界（`-1.0-1.0`）
fn split_range(range: &str) -> Option<(&str, &str)> {
    let split = range.char_indices().skip(1).find(|(_, c)| *c == '-')?.0;
    Some((&range[..split], &range[split + 1..]))
}

/// 从 `register_shader("name", ...)` 调用中提取着色器名
fn registered_name(line: &str) -> Option<&str> {
    let rest = &line[line.find("register_shader")? + "register_shader".len()..];
    let rest = rest.trim_start().strip_prefix('(')?.trim_start();
    let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let body = &rest[1..];
    body.find(quote).map(|end| &body[..end])
}

/// 着色器定义库
#[derive(Debug, Clone, Default)]
pub struct ShaderLibrary {
    shaders: BTreeMap<String, ShaderDefinition>,
}

impl ShaderLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// 解析目录下所有着色器源文件（非递归）
    ///
    /// 目录不存在时记录警告并返回空库。
    pub fn parse_dir(dir: impl AsRef<Path>, extension: &str) -> Self {
        let dir = dir.as_ref();
        let mut library = Self::new();

        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "着色器目录不可读");
                return library;
            }
        };

        let mut paths: Vec<_> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == extension))
            .collect();
        paths.sort();

        for path in paths {
            match fs::read_to_string(&path) {
                Ok(source) => {
                    let file_name = path
                        .file_name()
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_default();
                    library.parse_source(&file_name, &source);
                }
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "读取着色器文件失败"),
            }
        }

        tracing::info!(dir = %dir.display(), count = library.len(), "着色器定义已加载");
        library
    }

    /// 解析单个源文件内容，把定义加入库中
    pub fn parse_source(&mut self, file_name: &str, source: &str) {
        let lines: Vec<&str> = source.lines().collect();
        let header = FileHeader::parse(&lines);
        let mut current: Option<ShaderDefinition> = None;

        for (i, raw) in lines.iter().enumerate() {
            let line = raw.trim();

            if let Some(name) = line.strip_prefix("# @shader:") {
                if let Some(done) = current.take() {
                    self.insert(done);
                }
                current = Some(ShaderDefinition::new(name.trim(), &header, file_name, i + 1));
            } else if line.starts_with("# @param") {
                if let Some(shader) = current.as_mut()
                    && let Some(param) = ShaderParam::parse_line(line)
                {
                    shader.params.push(param);
                }
            } else if line.starts_with("# @animated") {
                if let Some(shader) = current.as_mut() {
                    shader.is_animated = true;
                }
            } else if let Some(description) = line.strip_prefix("# @description:") {
                if let Some(shader) = current.as_mut() {
                    shader.description = description.trim().to_string();
                }
            } else if let Some(name) = registered_name(line) {
                let annotated = current.as_ref().is_some_and(|s| s.name == name);
                if !annotated && !self.shaders.contains_key(name) {
                    self.insert(ShaderDefinition::new(name, &header, file_name, i + 1));
                }
            }
        }

        if let Some(done) = current {
            self.insert(done);
        }
    }

    fn insert(&mut self, definition: ShaderDefinition) {
        self.shaders.insert(definition.name.clone(), definition);
    }

    /// 按名称查找
    pub fn get(&self, name: &str) -> Option<&ShaderDefinition> {
        self.shaders.get(name)
    }

    /// 所有着色器名（字典序）
    pub fn names(&self) -> Vec<String> {
        self.shaders.keys().cloned().collect()
    }

    /// 按分类分组
    pub fn by_category(&self) -> BTreeMap<String, Vec<&ShaderDefinition>> {
        let mut groups: BTreeMap<String, Vec<&ShaderDefinition>> = BTreeMap::new();
        for shader in self.shaders.values() {
            groups.entry(shader.category.clone()).or_default().push(shader);
        }
        groups
    }

    pub fn len(&self) -> usize {
        self.shaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shaders.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const GLOW_SOURCE: &str = "\
## Glow shaders
##
## Soft outer glow for sprites.
## @tool-category: Glow
## @tool-description: Adds glowing aura effects

# @shader: shader.glow
# @description: Outer glow
# @param u_glow_color: color, default=#FFFFFF, description=Glow color
# @param u_outer_strength: float, range=0.0-2.0, default=0.6
# @param u_count: int, range=1-100, default=10
# @animated
register_shader(\"shader.glow\", variables=\"...\")

register_shader('shader.plain', variables=\"...\")
";

    #[test]
    fn test_parse_param_line() {
        let param =
            ShaderParam::parse_line("# @param u_strength: float, range=0.0-2.0, default=0.6")
                .unwrap();
        assert_eq!(param.name, "u_strength");
        assert_eq!(param.param_type, ParamType::Float);
        assert_eq!(param.min_value, Some(0.0));
        assert_eq!(param.max_value, Some(2.0));
        assert_eq!(param.default, Some(ParamDefault::Float(0.6)));

        let color = ShaderParam::parse_line(
            "# @param u_glow_color: color, default=#FFFFFF, description=Glow color",
        )
        .unwrap();
        assert_eq!(color.param_type, ParamType::Color);
        assert_eq!(color.default, Some(ParamDefault::Text("#FFFFFF".to_string())));
        assert_eq!(color.description, "Glow color");

        let signed = ShaderParam::parse_line("# @param u_shift: float, range=-1.0-1.0").unwrap();
        assert_eq!(signed.min_value, Some(-1.0));
        assert_eq!(signed.max_value, Some(1.0));
        assert!(signed.in_range(-0.5));
        assert!(!signed.in_range(1.5));

        assert!(ShaderParam::parse_line("# @param broken").is_none());
    }

    #[test]
    fn test_parse_source() {
        let mut library = ShaderLibrary::new();
        library.parse_source("glow.rpy", GLOW_SOURCE);

        assert_eq!(library.names(), vec!["shader.glow", "shader.plain"]);

        let glow = library.get("shader.glow").unwrap();
        assert_eq!(glow.category, "Glow");
        assert_eq!(glow.description, "Outer glow");
        assert_eq!(glow.file_description, "Soft outer glow for sprites.");
        assert_eq!(glow.params.len(), 3);
        assert!(glow.is_animated);
        assert_eq!(glow.line_number, 7);

        let plain = library.get("shader.plain").unwrap();
        assert!(plain.params.is_empty());
        assert!(!plain.is_animated);
    }

    #[test]
    fn test_by_category() {
        let mut library = ShaderLibrary::new();
        library.parse_source("glow.rpy", GLOW_SOURCE);
        let groups = library.by_category();
        assert_eq!(groups["Glow"].len(), 2);
    }

    #[test]
    fn test_check_preset() {
        let mut library = ShaderLibrary::new();
        library.parse_source("glow.rpy", GLOW_SOURCE);
        let glow = library.get("shader.glow").unwrap();

        let preset = ShaderPreset::from_value(&json!({
            "shader": "shader.glow",
            "params": {"u_outer_strength": 3.0, "u_glow_color": "#FF0000", "u_typo": 1.0}
        }))
        .unwrap();
        let warnings = glow.check_preset("glow_strong", &preset);
        assert_eq!(warnings.len(), 2);
        assert!(warnings.iter().any(|w| matches!(w, ParamWarning::OutOfRange { param, .. } if param == "u_outer_strength")));
        assert!(warnings.iter().any(|w| matches!(w, ParamWarning::UnknownParam { param, .. } if param == "u_typo")));
    }

    #[test]
    fn test_registered_name() {
        assert_eq!(registered_name("register_shader(\"a.b\", x)"), Some("a.b"));
        assert_eq!(registered_name("x.register_shader ( 'c' )"), Some("c"));
        assert_eq!(registered_name("register_shader(name)"), None);
    }
}
