use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use fieldconfig::FieldConfig;
use imagery::{optimize_tree, AssetManifest};
use renderer::{render_still, Color, LifecycleGate, RasterSurface, RenderPolicy, SurfaceSize};
use scheduler::{IntervalScheduler, SimulatedClock, SystemClock};
use tracing_subscriber::EnvFilter;

use crate::bindings::{asset_root, device_hints, optimize_options, renderer_config, target_fps};
use crate::cli::{FieldArgs, ManifestArgs, OptimizeArgs, RenderArgs, StillArgs};
use crate::paths::{AppPaths, ConfigSource};
use crate::session::{run_session, SequenceExport, SessionPlan};

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

pub fn render(args: RenderArgs, config: &FieldConfig) -> Result<()> {
    let (width, height) = args.field.size;
    let policy = RenderPolicy::Animate {
        target_fps: target_fps(config, args.fps),
    };
    let renderer_config = renderer_config(config, &args.field, policy);
    let hints = device_hints(config, &args.field);
    let scheduler = IntervalScheduler::new(args.refresh_hz)
        .with_context(|| format!("invalid --refresh-hz {}", args.refresh_hz))?;
    let surface = RasterSurface::new(SurfaceSize::new(width, height, 1.0));

    tracing::info!(
        width,
        height,
        refresh_hz = args.refresh_hz,
        target_fps = ?renderer_config.policy.target_fps(),
        duration = %humantime::format_duration(args.duration),
        realtime = args.realtime,
        "starting render session"
    );

    let mut gate = LifecycleGate::new(renderer_config, hints, scheduler, surface);
    if args.field.dpr.is_some() {
        gate.resize(width, height, args.field.dpr);
    }

    let plan = SessionPlan {
        duration: args.duration,
        frame_cost: args.frame_cost.unwrap_or_default(),
        hide_at: args.hide_at,
        show_at: args.show_at,
        pointer: args.pointer,
        sequence: args.sequence.clone().map(|dir| SequenceExport {
            dir,
            every: args.every,
        }),
        backdrop: backdrop(&args.field, gate.driver().options().hue),
    };

    let report = if args.realtime {
        run_session(&mut gate, &plan, &mut SystemClock::new())?
    } else {
        run_session(&mut gate, &plan, &mut SimulatedClock::default())?
    };

    if let Some(output) = &args.output {
        if report.drawn == 0 {
            bail!("no frame was drawn during the session; nothing to export");
        }
        gate.surface()
            .save_png(output, plan.backdrop)
            .with_context(|| format!("failed to export final frame to {}", output.display()))?;
        tracing::info!(path = %output.display(), "exported final frame");
    }
    gate.teardown();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "frames: delivered={} drawn={} paced={} empty={} ignored={} exported={}",
            report.delivered,
            report.drawn,
            report.paced,
            report.empty,
            report.ignored,
            report.exported
        );
        println!(
            "field: points={} glows={} weight={:.3} target={:.3} fps={:.1}",
            report.points,
            report.last_glows,
            report.weight,
            report.target_weight,
            report.drawn_fps()
        );
    }
    Ok(())
}

pub fn still(args: StillArgs, config: &FieldConfig) -> Result<()> {
    let (width, height) = args.field.size;
    let renderer_config = renderer_config(
        config,
        &args.field,
        RenderPolicy::Still { time: args.time },
    );
    let hints = device_hints(config, &args.field);
    let cap = renderer_config.pacing.pixel_ratio_cap;
    let ratio = args
        .field
        .dpr
        .filter(|ratio| ratio.is_finite() && *ratio > 0.0)
        .unwrap_or(1.0)
        .min(cap);
    let mut surface = RasterSurface::new(SurfaceSize::new(width, height, ratio));

    let stats = render_still(&renderer_config, &hints, &mut surface)
        .context("failed to render still frame")?;
    let backdrop = backdrop(&args.field, renderer_config.options.hue);
    surface.save_png(&args.output, backdrop)?;
    println!(
        "wrote {} ({}x{} @{ratio}x, glows={})",
        args.output.display(),
        width,
        height,
        stats.glows
    );
    Ok(())
}

pub fn optimize(args: OptimizeArgs, config: &FieldConfig) -> Result<()> {
    let root = asset_root(config, args.root.as_deref());
    let options = optimize_options(config, &args);
    if !root.is_dir() {
        tracing::warn!(root = %root.display(), "asset root does not exist; nothing to optimize");
    }
    let report = optimize_tree(&root, &options)
        .with_context(|| format!("failed to optimize images under {}", root.display()))?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("[optimize-images] done. {report}");
    }
    Ok(())
}

pub fn manifest(args: ManifestArgs, config: &FieldConfig) -> Result<()> {
    let root = asset_root(config, args.root.as_deref());
    let manifest = AssetManifest::scan(&root, &args.mount)
        .with_context(|| format!("failed to scan assets under {}", root.display()))?;

    let json = if args.resolve.is_empty() {
        manifest.to_json()?
    } else {
        let resolved: serde_json::Map<String, serde_json::Value> = args
            .resolve
            .iter()
            .map(|reference| {
                let variants = manifest.resolve(reference);
                serde_json::to_value(&variants).map(|value| (reference.clone(), value))
            })
            .collect::<Result<_, _>>()?;
        serde_json::to_string_pretty(&resolved)?
    };

    match &args.output {
        Some(path) => write_output(path, &json)?,
        None => println!("{json}"),
    }
    tracing::info!(entries = manifest.len(), root = %root.display(), "manifest generated");
    Ok(())
}

pub fn config_where(paths: &AppPaths, source: &ConfigSource) {
    println!("Configuration:");
    println!("  directory:  {}", paths.config_dir().display());
    println!("  file:       {}", paths.config_file().display());
    match source {
        ConfigSource::Explicit(path) => println!("  loaded:     {} (--config)", path.display()),
        ConfigSource::Discovered(path) => println!("  loaded:     {}", path.display()),
        ConfigSource::Defaults => println!("  loaded:     (built-in defaults)"),
    }
}

pub fn config_show(config: &FieldConfig) -> Result<()> {
    let rendered = config
        .to_toml_string()
        .context("failed to render configuration as TOML")?;
    print!("{rendered}");
    Ok(())
}

/// Opaque backdrop for exports unless the caller asked for transparency.
fn backdrop(args: &FieldArgs, hue: f32) -> Option<Color> {
    (!args.transparent).then(|| Color::from_hsla(hue, 0.35, 0.06, 1.0))
}

fn write_output(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}
