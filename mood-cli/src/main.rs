//! # Mood CLI
//!
//! 预设调试工具：加载预设、校验、按帧采样编译结果，以 JSON 行输出。
//!
//! ## 用法
//!
//! ```bash
//! cargo run -p mood-cli -- --root game/presets list
//! cargo run -p mood-cli -- --root game/presets check --shaders game/shaders
//! cargo run -p mood-cli -- --root game/presets sample transition slide_left_enter --fps 30
//! cargo run -p mood-cli -- --root game/presets sample shader glow_soft
//! cargo run -p mood-cli -- --config mood.json scene rainy --character alice
//! cargo run -p mood-cli -- --root game/presets edit transitions rename slide_in slide_left_enter
//! ```

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use tracing::Level;

use mood_runtime::{
    Frame, FrameStepper, MoodConfig, MoodController, MoveDirection, Phase, PositionSpec,
    PresetCatalog, PresetKind, PresetStore, Section, ShaderCompiler, ShaderLibrary, ShaderPreset,
    transform,
};

/// 单次采样的帧数上限
const MAX_SAMPLE_FRAMES: usize = 10_000;

#[derive(Parser)]
#[command(name = "mood")]
#[command(about = "演出预设调试工具 - 加载、校验并逐帧采样预设")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 配置文件（默认：mood.json）
    #[arg(short, long, default_value = "mood.json", global = true)]
    config: PathBuf,

    /// 预设根目录（覆盖配置文件）
    #[arg(short, long, global = true)]
    root: Option<PathBuf>,

    /// 日志详细程度（-v: info, -vv: debug）
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// 列出预设名
    List {
        /// 只列出一类
        #[arg(short, long)]
        kind: Option<KindArg>,
    },

    /// 校验预设引用与取值
    Check {
        /// 着色器源码目录（用于对照参数注解）
        #[arg(long)]
        shaders: Option<PathBuf>,

        /// 着色器源码扩展名
        #[arg(long, default_value = "rpy")]
        extension: String,
    },

    /// 采样单个编译结果
    Sample {
        #[command(subcommand)]
        target: SampleTarget,
    },

    /// 切换场景并采样角色出入场
    Scene {
        /// 场景名
        name: String,

        /// 角色名
        #[arg(long, default_value = "default")]
        character: String,

        /// 采样帧率
        #[arg(long, default_value_t = 60.0)]
        fps: f32,
    },

    /// 编辑过渡/着色器预设文件
    Edit {
        /// 预设表
        section: SectionArg,

        #[command(subcommand)]
        action: EditAction,
    },
}

#[derive(Subcommand)]
enum EditAction {
    /// 重命名（保持位置）
    Rename { old: String, new: String },

    /// 复制，未给出新名称时自动生成
    Duplicate { name: String, new_name: Option<String> },

    /// 删除一个或多个预设
    Delete {
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// 调整顺序
    Move { name: String, direction: DirectionArg },
}

#[derive(Clone, Copy, ValueEnum)]
enum SectionArg {
    Transitions,
    Shaders,
}

impl From<SectionArg> for Section {
    fn from(section: SectionArg) -> Self {
        match section {
            SectionArg::Transitions => Section::Transitions,
            SectionArg::Shaders => Section::Shaders,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum DirectionArg {
    Top,
    Up,
    Down,
    Bottom,
}

impl From<DirectionArg> for MoveDirection {
    fn from(direction: DirectionArg) -> Self {
        match direction {
            DirectionArg::Top => MoveDirection::Top,
            DirectionArg::Up => MoveDirection::Up,
            DirectionArg::Down => MoveDirection::Down,
            DirectionArg::Bottom => MoveDirection::Bottom,
        }
    }
}

#[derive(Subcommand)]
enum SampleTarget {
    /// 过渡预设
    Transition {
        name: String,

        #[arg(long, default_value_t = 60.0)]
        fps: f32,

        /// 水平对齐覆盖
        #[arg(long)]
        xalign: Option<f32>,

        /// 垂直对齐覆盖
        #[arg(long)]
        yalign: Option<f32>,
    },

    /// 着色器预设（输出一次应用结果）
    Shader {
        name: String,

        /// 强度 (0.0 - 1.0)
        #[arg(long, default_value_t = 1.0)]
        intensity: f32,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Transition,
    Shader,
    Scene,
}

impl From<KindArg> for PresetKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Transition => PresetKind::Transition,
            KindArg::Shader => PresetKind::Shader,
            KindArg::Scene => PresetKind::Scene,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("❌ {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let mut config = MoodConfig::load(&cli.config);
    if let Some(root) = cli.root {
        config.presets_root = root;
    }
    config.validate().context("配置无效")?;

    match cli.command {
        Commands::List { kind } => list(&config, kind),
        Commands::Check { shaders, extension } => check(&config, shaders, &extension),
        Commands::Sample { target } => sample(&config, target),
        Commands::Scene {
            name,
            character,
            fps,
        } => scene(config, &name, &character, fps),
        Commands::Edit { section, action } => edit(&config, section.into(), action),
    }
}

fn load_store(config: &MoodConfig) -> PresetStore {
    let mut store = PresetStore::new();
    if !store.load_from_config(config) {
        tracing::warn!(root = %config.presets_root.display(), "部分预设文件加载失败");
    }
    store
}

fn list(config: &MoodConfig, kind: Option<KindArg>) -> Result<()> {
    let store = load_store(config);
    let kinds = match kind {
        Some(kind) => vec![kind.into()],
        None => PresetKind::ALL.to_vec(),
    };

    let mut out = io::stdout().lock();
    for kind in kinds {
        for name in store.list_presets(kind) {
            writeln!(out, "{}", json!({"kind": kind.to_string(), "name": name}))?;
        }
    }
    Ok(())
}

fn check(config: &MoodConfig, shaders: Option<PathBuf>, extension: &str) -> Result<()> {
    let store = load_store(config);
    let mut messages: Vec<String> = store
        .validate()
        .iter()
        .map(ToString::to_string)
        .collect();

    if let Some(dir) = shaders {
        let library = ShaderLibrary::parse_dir(&dir, extension);
        for name in store.list_presets(PresetKind::Shader) {
            let preset = match store.shader(&name) {
                Ok(preset) => preset,
                Err(_) => continue,
            };
            messages.extend(check_against_library(&library, &name, &preset));
        }
    }

    for message in &messages {
        println!("⚠️ {}", message);
    }
    if messages.is_empty() {
        println!("✅ 预设检查通过");
        Ok(())
    } else {
        bail!("发现 {} 个问题", messages.len())
    }
}

fn check_against_library(library: &ShaderLibrary, name: &str, preset: &ShaderPreset) -> Vec<String> {
    if preset.shader.is_empty() {
        return Vec::new();
    }
    match library.get(&preset.shader) {
        Some(definition) => definition
            .check_preset(name, preset)
            .iter()
            .map(ToString::to_string)
            .collect(),
        None => vec![format!("{}: 着色器 '{}' 没有定义", name, preset.shader)],
    }
}

fn sample(config: &MoodConfig, target: SampleTarget) -> Result<()> {
    let store = load_store(config);
    let mut out = io::stdout().lock();

    match target {
        SampleTarget::Transition {
            name,
            fps,
            xalign,
            yalign,
        } => {
            let preset = store.transition(&name)?;
            let overrides = PositionSpec {
                xalign,
                yalign,
                ..Default::default()
            };
            let mut stepper = transform::compile(&preset, &overrides);
            write_frames(&mut out, "transition", &mut stepper, fps)?;
        }
        SampleTarget::Shader { name, intensity } => {
            let mut stepper = ShaderCompiler::new(&store).compile_named(&name, &Default::default())?;
            stepper.set_intensity(intensity);
            let frame = stepper.advance(0.0);
            write_frame(&mut out, "shader", 0, 0.0, &frame)?;
        }
    }
    Ok(())
}

fn scene(config: MoodConfig, name: &str, character: &str, fps: f32) -> Result<()> {
    let mut mood = MoodController::new(config);
    if !mood.set(name) {
        bail!("场景 '{}' 不存在", name);
    }

    let mut out = io::stdout().lock();
    for command in mood.take_audio_commands() {
        writeln!(
            out,
            "{}",
            json!({"phase": "audio", "channel": command.channel(), "command": command})
        )?;
    }
    if let Some(transition) = mood.get_transition(Phase::Enter) {
        writeln!(out, "{}", json!({"phase": "screen_enter", "transition": transition}))?;
    }

    let mut enter = mood.build_enter_transform(character, None);
    write_frames(&mut out, "enter", &mut enter, fps)?;

    let mut exit = mood.build_exit_transform(character, None);
    write_frames(&mut out, "exit", &mut exit, fps)?;
    Ok(())
}

fn edit(config: &MoodConfig, section: Section, action: EditAction) -> Result<()> {
    let mut catalog = PresetCatalog::open(config.transitions_full_path(), config.shaders_full_path())
        .context("打开预设文件失败")?;

    match action {
        EditAction::Rename { old, new } => {
            catalog.rename(section, &old, &new)?;
            println!("✅ {} -> {}", old, new);
        }
        EditAction::Duplicate { name, new_name } => {
            let new_name =
                new_name.unwrap_or_else(|| catalog.unique_name(section, &format!("{}_copy", name)));
            catalog.duplicate(section, &name, &new_name)?;
            println!("✅ {} -> {}", name, new_name);
        }
        EditAction::Delete { names } => {
            let removed = catalog.delete_many(section, &names);
            if removed == 0 {
                bail!("没有找到要删除的预设");
            }
            println!("✅ 删除了 {} 个预设", removed);
        }
        EditAction::Move { name, direction } => {
            if !catalog.move_preset(section, &name, direction.into()) {
                bail!("无法移动预设 '{}'", name);
            }
            println!("✅ {}", catalog.names(section).join(", "));
        }
    }

    catalog.save().context("保存预设文件失败")?;
    Ok(())
}

fn write_frames(out: &mut impl Write, phase: &str, stepper: &mut dyn FrameStepper, fps: f32) -> Result<()> {
    if fps.is_nan() || fps <= 0.0 {
        bail!("fps 必须大于 0");
    }
    let dt = 1.0 / fps;
    for index in 0..MAX_SAMPLE_FRAMES {
        let elapsed = index as f32 * dt;
        let frame = stepper.advance(elapsed);
        write_frame(out, phase, index, elapsed, &frame)?;
        if frame.is_done() {
            return Ok(());
        }
    }
    tracing::warn!(phase = %phase, frames = MAX_SAMPLE_FRAMES, "达到帧数上限仍未结束（动画或仍可见的着色器？）");
    Ok(())
}

fn write_frame(out: &mut impl Write, phase: &str, index: usize, elapsed: f32, frame: &Frame) -> Result<()> {
    let line = json!({
        "phase": phase,
        "frame": index,
        "elapsed": elapsed,
        "state": frame.state,
        "signal": frame.signal,
        "sound": frame.sound,
    });
    writeln!(out, "{}", line)?;
    Ok(())
}
