//! # xtask - 开发辅助工具
//!
//! 提供本地质量门禁与预设检查命令。
//!
//! ## 命令
//!
//! - `check-all`: 运行 fmt、clippy、test
//! - `cov-runtime`: 运行 mood-runtime 覆盖率
//! - `preset-check`: 检查预设文件（继承、引用、缓动、颜色）
//! - `shader-check`: 列出着色器注解解析结果

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use mood_runtime::{PresetKind, PresetStore, ShaderLibrary};
use serde_json::Value;
use walkdir::WalkDir;
use xshell::{Shell, cmd};

fn main() -> ExitCode {
    if let Err(e) = real_main() {
        eprintln!("xtask error: {e:#}");
        return ExitCode::from(1);
    }
    ExitCode::from(0)
}

fn real_main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let sub = args.next().unwrap_or_else(|| "help".to_string());

    match sub.as_str() {
        "check-all" => {
            let sh = Shell::new()?;
            step("cargo fmt --all -- --check");
            cmd!(sh, "cargo fmt --all -- --check").run()?;
            step("cargo clippy --workspace --all-targets");
            cmd!(sh, "cargo clippy --workspace --all-targets").run()?;
            step("cargo test --workspace");
            cmd!(sh, "cargo test --workspace").run()?;
        }
        "cov-runtime" => {
            let sh = Shell::new()?;
            ensure_cargo_llvm_cov_available(&sh)?;

            step("cargo llvm-cov -p mood-runtime --html");
            cmd!(sh, "cargo llvm-cov -p mood-runtime --html").run()?;

            eprintln!("\nCoverage HTML: target/llvm-cov/html/index.html");
        }
        "preset-check" => {
            let path = args.next();
            preset_check(path.as_deref())?;
        }
        "shader-check" => {
            let dir = args.next();
            let extension = args.next();
            shader_check(dir.as_deref(), extension.as_deref().unwrap_or("rpy"))?;
        }
        "help" | "-h" | "--help" => {
            print_help();
        }
        other => anyhow::bail!("unknown xtask subcommand: {other}"),
    }

    Ok(())
}

fn step(name: &str) {
    eprintln!("\n==> {name}");
}

fn ensure_cargo_llvm_cov_available(sh: &Shell) -> anyhow::Result<()> {
    match cmd!(sh, "cargo llvm-cov --version").quiet().ignore_stdout().run() {
        Ok(()) => Ok(()),
        Err(_) => anyhow::bail!(
            "cargo llvm-cov 不可用。\n\
请先安装：\n\
  - cargo install cargo-llvm-cov\n\
  - rustup component add llvm-tools-preview\n\
然后重试。"
        ),
    }
}

fn print_help() {
    eprintln!(
        r#"xtask - 开发辅助工具

USAGE:
  cargo xtask <command>

COMMANDS:
  check-all       运行 fmt、clippy、test 门禁检查
  cov-runtime     运行 mood-runtime 覆盖率报告
  preset-check    检查预设文件
  shader-check    解析着色器源码中的参数注解

PRESET-CHECK:
  cargo xtask preset-check [path]

  不带参数：检查 presets/ 下所有 .json 文件
  带路径参数：检查指定文件或目录

  按顶层键判断文件类别：
    - shader_presets            -> 着色器预设
    - presets + defaults        -> 过渡预设
    - presets（记录含位置/透明度等字段）-> 过渡预设
    - 其余 presets              -> 场景预设

  所有文件合并进同一个预设库后统一校验，跨文件引用可以互相解析。

SHADER-CHECK:
  cargo xtask shader-check [dir] [extension]

  默认目录 shaders/，默认扩展名 rpy
"#
    );
}

//=============================================================================
// preset-check 命令实现
//=============================================================================

/// 默认预设目录（相对于 workspace root）
const DEFAULT_PRESETS_DIR: &str = "presets";

/// 过渡预设记录特有的字段
const TRANSITION_FIELDS: &[&str] = &[
    "start_position",
    "end_position",
    "alpha",
    "scale",
    "rotation",
    "easing",
];

/// 执行预设检查
fn preset_check(path: Option<&str>) -> anyhow::Result<()> {
    let files = match path {
        Some(p) => {
            let path = PathBuf::from(p);
            if path.is_file() {
                vec![path]
            } else if path.is_dir() {
                collect_files(&path, "json")
            } else {
                anyhow::bail!("路径不存在: {}", p);
            }
        }
        None => {
            let dir = Path::new(DEFAULT_PRESETS_DIR);
            if !dir.exists() {
                anyhow::bail!(
                    "默认预设目录不存在: {}\n请在 workspace 根目录运行，或指定预设路径",
                    dir.display()
                );
            }
            collect_files(dir, "json")
        }
    };

    if files.is_empty() {
        eprintln!("未找到预设文件（.json）");
        return Ok(());
    }

    eprintln!("==> 检查 {} 个预设文件...\n", files.len());

    let mut store = PresetStore::new();
    let mut load_errors = 0;
    for file in &files {
        let display = file.display();
        let doc = match read_json(file) {
            Ok(doc) => doc,
            Err(e) => {
                eprintln!("[ERROR] {}: {:#}", display, e);
                load_errors += 1;
                continue;
            }
        };

        match detect_kind(&doc) {
            Some(kind) => {
                let count = store.load_value(kind, &doc);
                eprintln!("[INFO] {}: {} 个{}预设", display, count, kind);
            }
            None => eprintln!("[SKIP] {}: 不是预设文档", display),
        }
    }

    let warnings = store.validate();
    eprintln!("─────────────────────────────────────────────────────");
    for warning in &warnings {
        eprintln!("[WARN] {}", warning);
    }

    eprintln!();
    if load_errors > 0 {
        eprintln!("❌ {} 个错误, {} 个警告", load_errors, warnings.len());
        anyhow::bail!("预设检查发现错误");
    } else if !warnings.is_empty() {
        eprintln!("⚠️  0 个错误, {} 个警告", warnings.len());
    } else {
        eprintln!("✅ 检查通过，无错误");
    }
    Ok(())
}

fn read_json(path: &Path) -> anyhow::Result<Value> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// 按顶层结构判断预设文档类别
fn detect_kind(doc: &Value) -> Option<PresetKind> {
    let root = doc.as_object()?;
    if root.contains_key(PresetKind::Shader.section_key()) {
        return Some(PresetKind::Shader);
    }

    let presets = root.get("presets")?.as_object()?;
    if root.contains_key("defaults") {
        return Some(PresetKind::Transition);
    }

    let looks_like_transition = presets
        .values()
        .filter_map(Value::as_object)
        .any(|record| TRANSITION_FIELDS.iter().any(|f| record.contains_key(*f)));
    if looks_like_transition {
        Some(PresetKind::Transition)
    } else {
        Some(PresetKind::Scene)
    }
}

/// 收集目录下指定扩展名的文件
fn collect_files(dir: &Path, extension: &str) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == extension))
        .collect();
    files.sort();
    files
}

//=============================================================================
// shader-check 命令实现
//=============================================================================

/// 默认着色器源码目录
const DEFAULT_SHADERS_DIR: &str = "shaders";

fn shader_check(dir: Option<&str>, extension: &str) -> anyhow::Result<()> {
    let dir = PathBuf::from(dir.unwrap_or(DEFAULT_SHADERS_DIR));
    if !dir.is_dir() {
        anyhow::bail!("着色器目录不存在: {}", dir.display());
    }

    let library = ShaderLibrary::parse_dir(&dir, extension);
    if library.is_empty() {
        eprintln!("未找到带注解的着色器（.{}）", extension);
        return Ok(());
    }

    for (category, definitions) in library.by_category() {
        eprintln!("[{}]", category);
        for definition in definitions {
            let animated = if definition.is_animated { " (animated)" } else { "" };
            eprintln!(
                "  {}{} - {}:{}",
                definition.name,
                animated,
                definition.source_file,
                definition.line_number
            );
            for param in &definition.params {
                eprintln!("    {} : {:?}", param.name, param.param_type);
            }
        }
    }

    eprintln!();
    eprintln!("✅ {} 个着色器", library.len());
    Ok(())
}
