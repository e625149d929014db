//! Frame-rate driven density control.
//!
//! The controller never adds or removes points. It moves a density weight in
//! `[0, 1]` and every point fades in or out depending on where its fixed
//! weight falls relative to that threshold.

/// Samples below this frame rate shrink the target density.
pub const LOW_FPS: f32 = 48.0;
/// Samples above this frame rate grow the target density.
pub const HIGH_FPS: f32 = 58.0;
/// Lowest target density the controller will settle on.
pub const MIN_TARGET: f32 = 0.35;
const SHRINK: f32 = 0.85;
const GROW: f32 = 1.06;
const LERP_FACTOR: f32 = 0.08;
/// Width of the fade band around the density threshold.
pub const BLEND_BAND: f32 = 0.12;
/// Points with a lower inclusion alpha are not drawn at all.
pub const CULL_ALPHA: f32 = 0.03;
/// Points need at least this inclusion alpha to get a core dot.
pub const CORE_ALPHA: f32 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DensityController {
    current: f32,
    target: f32,
}

impl DensityController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_weight(&self) -> f32 {
        self.current
    }

    pub fn target_weight(&self) -> f32 {
        self.target
    }

    /// Adjusts the target from one averaged FPS sample.
    ///
    /// Samples inside `[LOW_FPS, HIGH_FPS]` leave the target untouched.
    pub fn on_frame_measured(&mut self, fps: f32) {
        if !fps.is_finite() {
            return;
        }
        let before = self.target;
        if fps < LOW_FPS {
            self.target = (self.target * SHRINK).max(MIN_TARGET);
        } else if fps > HIGH_FPS {
            self.target = (self.target * GROW).min(1.0);
        }
        if self.target != before {
            tracing::debug!(fps, from = before, to = self.target, "density target changed");
        }
    }

    /// Moves the current weight toward the target; call once per drawn frame.
    pub fn advance(&mut self) {
        self.current += (self.target - self.current) * LERP_FACTOR;
        self.current = self.current.clamp(0.0, 1.0);
    }

    /// Soft inclusion alpha of a point at the current weight.
    pub fn alpha_for(&self, point_weight: f32) -> f32 {
        inclusion_alpha(self.current, point_weight)
    }
}

impl Default for DensityController {
    fn default() -> Self {
        Self {
            current: 1.0,
            target: 1.0,
        }
    }
}

/// `1` well inside the included set, `0` well outside, linear across the band.
pub fn inclusion_alpha(weight: f32, point_weight: f32) -> f32 {
    ((weight - point_weight) / BLEND_BAND + 0.5).clamp(0.0, 1.0)
}
