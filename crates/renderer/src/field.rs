//! Center grid and orbiting point generation.
//!
//! A field is built for one viewport size and thrown away on resize. Centers
//! sit on a jittered grid whose cell size tracks the shorter viewport side;
//! points are spread uniformly across centers with randomised orbits.

use std::f32::consts::{PI, TAU};

use rand::Rng;

use crate::capability::CapabilityProfile;
use crate::types::BackgroundOptions;

/// Smallest grid cell edge in logical pixels.
pub const MIN_CELL: f32 = 180.0;
/// Lower bound on the area-derived point count.
pub const MIN_BASE_POINTS: usize = 60;
/// Ceiling on the generated population, whatever the density.
pub const MAX_POINTS: usize = 20_000;
const AREA_PER_POINT: f32 = 12_000.0;
const AREA_EXPONENT: f32 = 0.92;
const CENTER_JITTER: f32 = 0.35;

const DRIFT_PHASE_RATE: f32 = 0.6;
const DRIFT_X_FREQ: f32 = 0.9;
const DRIFT_Y_FREQ: f32 = 0.7;
/// Pixels per second of the drift velocity envelope.
const DRIFT_SPEED: f32 = 2.0;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum FieldError {
    #[error("viewport {width}x{height} has no drawable area")]
    EmptyViewport { width: f32, height: f32 },
}

/// Anchor that a group of points orbits around.
#[derive(Debug, Clone, PartialEq)]
pub struct Center {
    pub x: f32,
    pub y: f32,
    pub phase: f32,
    /// Drift speed in `[0.2, 0.6)`.
    pub drift: f32,
    anchor_x: f32,
    anchor_y: f32,
}

impl Center {
    pub fn new(x: f32, y: f32, drift: f32, phase: f32) -> Self {
        let (offset_x, offset_y) = drift_offset(drift, phase);
        Self {
            x,
            y,
            phase,
            drift,
            anchor_x: x - offset_x,
            anchor_y: y - offset_y,
        }
    }

    /// Advances the drift phase and moves the center along its closed path.
    pub fn advance(&mut self, dt: f32) {
        self.phase += DRIFT_PHASE_RATE * self.drift * dt;
        let (offset_x, offset_y) = drift_offset(self.drift, self.phase);
        self.x = self.anchor_x + offset_x;
        self.y = self.anchor_y + offset_y;
    }
}

/// Position offset of a center relative to its anchor.
///
/// This is the integral of a `cos`/`sin` velocity of [`DRIFT_SPEED`] px/s
/// over the phase, so the motion stays on a bounded Lissajous curve.
fn drift_offset(drift: f32, phase: f32) -> (f32, f32) {
    let rate = DRIFT_PHASE_RATE * drift.max(f32::EPSILON);
    let x = DRIFT_SPEED / (DRIFT_X_FREQ * rate) * (DRIFT_X_FREQ * phase).sin();
    let y = -DRIFT_SPEED / (DRIFT_Y_FREQ * rate) * (DRIFT_Y_FREQ * phase).cos();
    (x, y)
}

/// A glow point orbiting one center.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitingPoint {
    /// Index into [`Field::centers`].
    pub center: usize,
    pub radius: f32,
    pub angle: f32,
    pub base_velocity: f32,
    pub velocity: f32,
    pub size: f32,
    pub pulse: f32,
    /// Fixed inclusion weight in `[0, 1)` compared against the density weight.
    pub weight: f32,
}

impl OrbitingPoint {
    pub fn position(&self, center: &Center) -> (f32, f32) {
        let (sin, cos) = self.angle.sin_cos();
        (center.x + cos * self.radius, center.y + sin * self.radius)
    }
}

/// Geometry for a single viewport size.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub width: f32,
    pub height: f32,
    pub centers: Vec<Center>,
    pub points: Vec<OrbitingPoint>,
}

/// Grid cell edge and column/row counts for a viewport.
pub fn grid_dimensions(width: f32, height: f32) -> (f32, usize, usize) {
    let cell = MIN_CELL.max(width.min(height) / 5.0);
    let cols = ((width / cell).floor() as usize).max(2);
    let rows = ((height / cell).floor() as usize).max(2);
    (cell, cols, rows)
}

/// Area-derived point count before density and quality scaling.
pub fn base_point_count(width: f32, height: f32) -> usize {
    let scaled = (width * height / AREA_PER_POINT).powf(AREA_EXPONENT).round();
    (scaled as usize).max(MIN_BASE_POINTS)
}

pub fn point_count(
    width: f32,
    height: f32,
    profile: &CapabilityProfile,
    options: &BackgroundOptions,
) -> usize {
    let base = base_point_count(width, height) as f32;
    let scaled = (base * profile.count_scale(options.density)).floor();
    if scaled.is_nan() || scaled <= 0.0 {
        return 0;
    }
    scaled.min(MAX_POINTS as f32) as usize
}

/// Builds centers and points for a `width` x `height` logical viewport.
pub fn build_field<R: Rng + ?Sized>(
    width: f32,
    height: f32,
    profile: &CapabilityProfile,
    options: &BackgroundOptions,
    rng: &mut R,
) -> Result<Field, FieldError> {
    if !(width.is_finite() && height.is_finite()) || width <= 0.0 || height <= 0.0 {
        return Err(FieldError::EmptyViewport { width, height });
    }

    let (_, cols, rows) = grid_dimensions(width, height);
    let cell_w = width / cols as f32;
    let cell_h = height / rows as f32;

    let mut centers = Vec::with_capacity(cols * rows);
    for gy in 0..rows {
        for gx in 0..cols {
            let x = (gx as f32 + 0.5) * cell_w + (rng.gen::<f32>() - 0.5) * cell_w * CENTER_JITTER;
            let y = (gy as f32 + 0.5) * cell_h + (rng.gen::<f32>() - 0.5) * cell_h * CENTER_JITTER;
            let drift = rng.gen_range(0.2..0.6);
            let phase = rng.gen_range(0.0..TAU);
            centers.push(Center::new(x, y, drift, phase));
        }
    }

    let count = point_count(width, height, profile, options);
    let mut points = Vec::with_capacity(count);
    for _ in 0..count {
        let degrees = rng.gen_range(0.16..0.48) * if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
        let base_velocity = degrees * PI / 180.0 * options.speed_scale;
        points.push(OrbitingPoint {
            center: rng.gen_range(0..centers.len()),
            radius: rng.gen_range(60.0..320.0),
            angle: rng.gen_range(0.0..TAU),
            base_velocity,
            velocity: base_velocity,
            size: rng.gen_range(1.0..3.0),
            pulse: rng.gen_range(0.4..1.2),
            weight: rng.gen::<f32>(),
        });
    }

    tracing::debug!(
        width,
        height,
        centers = centers.len(),
        points = points.len(),
        "built particle field"
    );

    Ok(Field {
        width,
        height,
        centers,
        points,
    })
}
