use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use fieldconfig::MAX_DENSITY;
use imagery::DEFAULT_MOUNT;

#[derive(Parser, Debug)]
#[command(
    name = "orbfield",
    author,
    version,
    about = "Adaptive orbiting-particle background renderer",
    arg_required_else_help = true
)]
pub struct Cli {
    /// Configuration file to use instead of the discovered `config.toml`.
    #[arg(long, global = true, value_name = "FILE", env = "ORBFIELD_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run an animated session into an offscreen surface and export frames.
    Render(RenderArgs),
    /// Paint a single still frame and export it as PNG.
    Still(StillArgs),
    /// Build-time asset tooling (image optimizer and variant manifest).
    Assets(AssetsCommand),
    /// Inspect configuration discovery and the effective settings.
    Config(ConfigCommand),
}

/// Field appearance and device overrides shared by `render` and `still`.
#[derive(Args, Debug, Clone, Default)]
pub struct FieldArgs {
    /// Logical surface size (e.g. `1280x720`).
    #[arg(
        long,
        value_name = "WIDTHxHEIGHT",
        value_parser = parse_size,
        default_value = "1920x1080"
    )]
    pub size: (u32, u32),

    /// Device pixel ratio of the surface; capped by `pacing.pixel_ratio_cap`.
    #[arg(long, value_name = "RATIO")]
    pub dpr: Option<f32>,

    /// Multiplier on the area-derived point count, up to 10.
    #[arg(long, value_name = "FACTOR", value_parser = parse_density)]
    pub density: Option<f32>,

    /// Pointer influence radius in logical pixels.
    #[arg(long, value_name = "PIXELS", value_parser = parse_positive)]
    pub pointer_radius: Option<f32>,

    /// Hue of the glow in degrees.
    #[arg(long, value_name = "DEGREES", allow_negative_numbers = true)]
    pub hue: Option<f32>,

    /// Strength of the pointer nudge.
    #[arg(long, value_name = "STRENGTH")]
    pub response_strength: Option<f32>,

    /// Multiplier on every point's orbital speed.
    #[arg(long, value_name = "FACTOR", value_parser = parse_positive)]
    pub speed_scale: Option<f32>,

    /// Global opacity in `[0, 1]`.
    #[arg(long, value_name = "LEVEL", value_parser = parse_unit)]
    pub brightness: Option<f32>,

    /// Seed for reproducible field generation.
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Override the detected device memory in gigabytes.
    #[arg(long, value_name = "GB")]
    pub memory_gb: Option<f32>,

    /// Override the detected logical core count.
    #[arg(long, value_name = "COUNT")]
    pub cores: Option<u32>,

    /// Behave as if the user prefers reduced motion.
    #[arg(long)]
    pub reduced_motion: bool,

    /// Export PNGs with a transparent background instead of the dark backdrop.
    #[arg(long)]
    pub transparent: bool,
}

#[derive(Args, Debug, Clone)]
pub struct RenderArgs {
    #[command(flatten)]
    pub field: FieldArgs,

    /// Frame-rate cap (0 = draw every delivered frame).
    #[arg(long, value_name = "FPS")]
    pub fps: Option<f32>,

    /// Refresh rate of the emulated display.
    #[arg(long, value_name = "HZ", default_value_t = 60.0)]
    pub refresh_hz: f32,

    /// Session length (e.g. `5s`, `1m 30s`).
    #[arg(long, value_name = "DURATION", value_parser = parse_duration, default_value = "5s")]
    pub duration: Duration,

    /// Simulated paint cost added after every drawn frame.
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub frame_cost: Option<Duration>,

    /// Hide the surface at this session time.
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub hide_at: Option<Duration>,

    /// Show the surface again at this session time.
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub show_at: Option<Duration>,

    /// Hold the pointer at this logical position for the whole session.
    #[arg(long, value_name = "X,Y", value_parser = parse_point)]
    pub pointer: Option<(f32, f32)>,

    /// Pace the session against the wall clock instead of a simulated one.
    #[arg(long)]
    pub realtime: bool,

    /// Write the last drawn frame to this PNG path.
    #[arg(long, short, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Directory that receives numbered PNG frames.
    #[arg(long, value_name = "DIR")]
    pub sequence: Option<PathBuf>,

    /// Export every Nth drawn frame to the sequence directory.
    #[arg(long, value_name = "N", default_value_t = 1, requires = "sequence")]
    pub every: u32,

    /// Print the session summary as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct StillArgs {
    #[command(flatten)]
    pub field: FieldArgs,

    /// Simulated time to advance the orbits before painting.
    #[arg(long, value_name = "DURATION", value_parser = parse_duration, default_value = "0s")]
    pub time: Duration,

    /// Destination PNG path.
    #[arg(long, short, value_name = "PATH")]
    pub output: PathBuf,
}

#[derive(Args, Debug)]
pub struct AssetsCommand {
    #[command(subcommand)]
    pub action: AssetsAction,
}

#[derive(Subcommand, Debug)]
pub enum AssetsAction {
    /// Convert JPEG/PNG sources into downscaled WebP/AVIF siblings.
    Optimize(OptimizeArgs),
    /// Scan the asset root and emit the variant manifest.
    Manifest(ManifestArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct OptimizeArgs {
    /// Asset root to scan (defaults to `assets.root`, then `src/assets`).
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Also produce AVIF outputs (requires the `avif` build feature).
    #[arg(long)]
    pub avif: bool,

    /// Skip WebP outputs.
    #[arg(long)]
    pub no_webp: bool,

    #[arg(long, value_name = "PIXELS")]
    pub max_width_cover: Option<u32>,

    #[arg(long, value_name = "PIXELS")]
    pub max_width_gallery: Option<u32>,

    #[arg(long, value_name = "PIXELS")]
    pub max_width_thumb: Option<u32>,

    /// Print the report as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ManifestArgs {
    /// Asset root to scan (defaults to `assets.root`, then `src/assets`).
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Key prefix for scanned files.
    #[arg(long, value_name = "PREFIX", default_value = DEFAULT_MOUNT)]
    pub mount: String,

    /// Resolve these references and print their variants instead of the table.
    #[arg(long = "resolve", value_name = "REFERENCE")]
    pub resolve: Vec<String>,

    /// Write the JSON to a file instead of stdout.
    #[arg(long, short, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the configuration directory and file that would be loaded.
    Where,
    /// Print the loaded configuration as TOML.
    Show,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let trimmed = value.trim();
    let (w, h) = trimmed
        .split_once(['x', 'X', '×'])
        .ok_or_else(|| "expected WIDTHxHEIGHT, e.g. 1920x1080".to_string())?;
    let width = w
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid width '{}'", w.trim()))?;
    let height = h
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid height '{}'", h.trim()))?;
    Ok((width, height))
}

pub fn parse_duration(value: &str) -> Result<Duration, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("duration must not be empty".to_string());
    }
    if let Ok(seconds) = trimmed.parse::<f64>() {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err("duration must be a non-negative number of seconds".to_string());
        }
        return Ok(Duration::from_secs_f64(seconds));
    }
    humantime::parse_duration(trimmed).map_err(|err| format!("invalid duration '{trimmed}': {err}"))
}

pub fn parse_point(value: &str) -> Result<(f32, f32), String> {
    let (x, y) = value
        .split_once(',')
        .ok_or_else(|| "expected X,Y".to_string())?;
    let x = x
        .trim()
        .parse::<f32>()
        .map_err(|_| "invalid pointer x coordinate".to_string())?;
    let y = y
        .trim()
        .parse::<f32>()
        .map_err(|_| "invalid pointer y coordinate".to_string())?;
    if !x.is_finite() || !y.is_finite() {
        return Err("pointer coordinates must be finite".to_string());
    }
    Ok((x, y))
}

fn parse_positive(value: &str) -> Result<f32, String> {
    let parsed = value
        .trim()
        .parse::<f32>()
        .map_err(|_| format!("invalid number '{value}'"))?;
    if !parsed.is_finite() || parsed <= 0.0 {
        return Err("value must be greater than zero".to_string());
    }
    Ok(parsed)
}

fn parse_density(value: &str) -> Result<f32, String> {
    let parsed = parse_positive(value)?;
    if parsed > MAX_DENSITY {
        return Err(format!("density must be at most {MAX_DENSITY}"));
    }
    Ok(parsed)
}

fn parse_unit(value: &str) -> Result<f32, String> {
    let parsed = value
        .trim()
        .parse::<f32>()
        .map_err(|_| format!("invalid number '{value}'"))?;
    if !(0.0..=1.0).contains(&parsed) {
        return Err("value must be within [0, 1]".to_string());
    }
    Ok(parsed)
}
