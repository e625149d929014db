use std::time::Duration;

use crate::runtime::RenderPolicy;

/// Appearance and interaction knobs for the particle field.
#[derive(Debug, Clone, PartialEq)]
pub struct BackgroundOptions {
    /// Multiplier applied to the area-derived point count.
    pub density: f32,
    /// Pointer influence radius in logical pixels.
    pub pointer_radius: f32,
    /// Hue of the glow and core colours, in degrees.
    pub hue: f32,
    /// Strength of the tangential nudge applied near the pointer.
    pub response_strength: f32,
    /// Multiplier on every point's base angular speed.
    pub speed_scale: f32,
    /// Global opacity multiplier in `[0, 1]`.
    pub brightness: f32,
}

impl Default for BackgroundOptions {
    fn default() -> Self {
        Self {
            density: 1.9,
            pointer_radius: 260.0,
            hue: 210.0,
            response_strength: 0.6,
            speed_scale: 1.15,
            brightness: 0.75,
        }
    }
}

/// Timing limits used by the frame loop and lifecycle gate.
#[derive(Debug, Clone, PartialEq)]
pub struct PacingOptions {
    /// Upper bound on the simulation step of a single frame.
    pub max_frame_delta: Duration,
    /// Window over which drawn frames are averaged into an FPS sample.
    pub fps_window: Duration,
    /// Ceiling on the device pixel ratio used for the backing store.
    pub pixel_ratio_cap: f32,
}

impl Default for PacingOptions {
    fn default() -> Self {
        Self {
            max_frame_delta: Duration::from_millis(33),
            fps_window: Duration::from_millis(800),
            pixel_ratio_cap: 1.75,
        }
    }
}

/// Configuration consumed by [`crate::LifecycleGate`] and [`crate::render_still`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RendererConfig {
    pub options: BackgroundOptions,
    pub pacing: PacingOptions,
    pub policy: RenderPolicy,
    /// Seed for field generation; `None` draws from system entropy.
    pub seed: Option<u64>,
}
