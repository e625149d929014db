//! Layering of command-line flags over the configuration file over defaults.

use std::path::{Path, PathBuf};

use fieldconfig::FieldConfig;
use imagery::OptimizeOptions;
use renderer::{
    BackgroundOptions, DeviceHints, PacingOptions, RenderPolicy, RendererConfig,
    DEFAULT_TARGET_FPS,
};

use crate::cli::{FieldArgs, OptimizeArgs};

pub const DEFAULT_ASSET_ROOT: &str = "src/assets";

pub fn background_options(config: &FieldConfig, args: &FieldArgs) -> BackgroundOptions {
    let defaults = BackgroundOptions::default();
    let file = &config.field;
    BackgroundOptions {
        density: args.density.or(file.density).unwrap_or(defaults.density),
        pointer_radius: args
            .pointer_radius
            .or(file.pointer_radius)
            .unwrap_or(defaults.pointer_radius),
        hue: args.hue.or(file.hue).unwrap_or(defaults.hue),
        response_strength: args
            .response_strength
            .or(file.response_strength)
            .unwrap_or(defaults.response_strength),
        speed_scale: args
            .speed_scale
            .or(file.speed_scale)
            .unwrap_or(defaults.speed_scale),
        brightness: args
            .brightness
            .or(file.brightness)
            .unwrap_or(defaults.brightness),
    }
}

pub fn pacing_options(config: &FieldConfig) -> PacingOptions {
    let defaults = PacingOptions::default();
    let file = &config.pacing;
    PacingOptions {
        max_frame_delta: file.max_frame_delta.unwrap_or(defaults.max_frame_delta),
        fps_window: file.fps_window.unwrap_or(defaults.fps_window),
        pixel_ratio_cap: file.pixel_ratio_cap.unwrap_or(defaults.pixel_ratio_cap),
    }
}

/// Frame-rate cap for animated sessions; a non-positive flag disables it.
pub fn target_fps(config: &FieldConfig, flag: Option<f32>) -> Option<f32> {
    match flag {
        Some(fps) if fps > 0.0 && fps.is_finite() => Some(fps),
        Some(_) => None,
        None => Some(config.pacing.target_fps.unwrap_or(DEFAULT_TARGET_FPS)),
    }
}

pub fn device_hints(config: &FieldConfig, args: &FieldArgs) -> DeviceHints {
    let file = DeviceHints {
        memory_gb: config.device.memory_gb,
        logical_cores: config.device.cores,
        prefers_reduced_motion: config.device.reduced_motion,
    };
    let flags = DeviceHints {
        memory_gb: args.memory_gb,
        logical_cores: args.cores,
        prefers_reduced_motion: args.reduced_motion.then_some(true),
    };
    DeviceHints::detect().with_overrides(file).with_overrides(flags)
}

pub fn renderer_config(
    config: &FieldConfig,
    args: &FieldArgs,
    policy: RenderPolicy,
) -> RendererConfig {
    RendererConfig {
        options: background_options(config, args),
        pacing: pacing_options(config),
        policy,
        seed: args.seed,
    }
}

pub fn asset_root(config: &FieldConfig, flag: Option<&Path>) -> PathBuf {
    flag.map(Path::to_path_buf)
        .or_else(|| config.assets.root.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_ASSET_ROOT))
}

pub fn optimize_options(config: &FieldConfig, args: &OptimizeArgs) -> OptimizeOptions {
    let defaults = OptimizeOptions::default();
    let file = &config.assets;
    OptimizeOptions {
        webp: !args.no_webp && file.webp.unwrap_or(defaults.webp),
        avif: args.avif || file.avif.unwrap_or(defaults.avif),
        max_width_cover: args
            .max_width_cover
            .or(file.max_width_cover)
            .unwrap_or(defaults.max_width_cover),
        max_width_gallery: args
            .max_width_gallery
            .or(file.max_width_gallery)
            .unwrap_or(defaults.max_width_gallery),
        max_width_thumb: args
            .max_width_thumb
            .or(file.max_width_thumb)
            .unwrap_or(defaults.max_width_thumb),
        ..defaults
    }
}
