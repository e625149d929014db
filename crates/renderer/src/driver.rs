//! Per-frame simulation and painting.
//!
//! ```text
//!   frame(now)
//!     ├─ pacer: too early? ──▶ FrameOutcome::Paced
//!     ├─ dt = min(now - last, max_frame_delta)
//!     ├─ density.advance()
//!     ├─ step(dt): center drift, orbit relaxation, pointer nudge
//!     ├─ paint(): clear, glow sprites, one batched core-dot fill
//!     └─ fps meter ──▶ density.on_frame_measured()
//! ```

use std::f64::consts::TAU;
use std::time::Duration;

use scheduler::{FpsMeter, FramePacer};

use crate::density::{DensityController, CORE_ALPHA, CULL_ALPHA};
use crate::field::{Center, Field, OrbitingPoint};
use crate::sprite::{Color, GlowSprite};
use crate::surface::{Circle, DrawSurface};
use crate::types::{BackgroundOptions, PacingOptions};

/// Fraction of the current angular velocity kept each frame.
const VELOCITY_RETAIN: f32 = 0.985;
const NUDGE_GAIN: f32 = 0.0026;
/// Distances below this are clamped before computing the pointer nudge.
pub const MIN_POINTER_DISTANCE: f32 = 12.0;
const GLOW_SCALE: f32 = 3.4;
const CORE_SCALE: f32 = 0.6;
const CORE_OPACITY: f32 = 0.28;
const PULSE_DEPTH: f32 = 0.12;
/// Upper bound on simulation steps taken by a single still.
pub const MAX_STILL_STEPS: u32 = 10_000;

/// Result of handing one delivered frame to the driver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameOutcome {
    /// Frame arrived inside the pacing interval and did no work.
    Paced,
    /// No field exists for the current size; nothing was drawn.
    Empty,
    /// Frame was stale, cancelled, or arrived while paused.
    Ignored,
    Drawn(FrameStats),
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameStats {
    /// Glow sprites composited.
    pub glows: usize,
    /// Core dots submitted in the batched fill.
    pub cores: usize,
    /// Points skipped because their inclusion alpha was negligible.
    pub culled: usize,
    /// Simulation step applied, in seconds.
    pub dt: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Pointer {
    x: f32,
    y: f32,
}

pub struct AnimationDriver {
    options: BackgroundOptions,
    max_frame_delta: f32,
    field: Option<Field>,
    density: DensityController,
    pacer: FramePacer,
    meter: FpsMeter,
    sprite: GlowSprite,
    core_color: Color,
    pointer: Option<Pointer>,
    last: Option<Duration>,
    cores: Vec<Circle>,
}

impl AnimationDriver {
    pub fn new(
        options: BackgroundOptions,
        pacing: &PacingOptions,
        target_fps: Option<f32>,
    ) -> Self {
        let sprite = GlowSprite::new(options.hue, options.brightness);
        let core_color = Color::from_hsla(
            options.hue,
            0.14,
            0.62,
            CORE_OPACITY * options.brightness,
        );
        Self {
            max_frame_delta: pacing.max_frame_delta.as_secs_f32(),
            field: None,
            density: DensityController::new(),
            pacer: FramePacer::new(target_fps),
            meter: FpsMeter::new(pacing.fps_window),
            sprite,
            core_color,
            pointer: None,
            last: None,
            cores: Vec::new(),
            options,
        }
    }

    pub fn options(&self) -> &BackgroundOptions {
        &self.options
    }

    pub fn field(&self) -> Option<&Field> {
        self.field.as_ref()
    }

    /// Replaces the geometry; `None` suspends drawing until a field arrives.
    pub fn set_field(&mut self, field: Option<Field>) {
        self.cores.clear();
        self.field = field;
    }

    pub fn density(&self) -> &DensityController {
        &self.density
    }

    /// Pointer position in logical surface coordinates.
    pub fn set_pointer(&mut self, x: f32, y: f32) {
        if x.is_finite() && y.is_finite() {
            self.pointer = Some(Pointer { x, y });
        }
    }

    pub fn clear_pointer(&mut self) {
        self.pointer = None;
    }

    pub fn pointer_active(&self) -> bool {
        self.pointer.is_some()
    }

    /// Makes `now` the reference for the next `dt` and restarts FPS sampling.
    pub fn reset_timing(&mut self, now: Duration) {
        self.last = Some(now);
        self.meter.reset(now);
        self.pacer.reset();
    }

    pub fn frame<D: DrawSurface>(&mut self, now: Duration, surface: &mut D) -> FrameOutcome {
        if !self.pacer.should_render(now) {
            return FrameOutcome::Paced;
        }

        let dt = match self.last {
            Some(last) => now.saturating_sub(last).as_secs_f32().min(self.max_frame_delta),
            None => 0.0,
        };
        self.last = Some(now);

        if self.field.is_none() {
            return FrameOutcome::Empty;
        }

        self.density.advance();
        self.step(dt);
        let mut stats = self.paint(now, surface);
        stats.dt = dt;

        if let Some(fps) = self.meter.record_frame(now) {
            self.density.on_frame_measured(fps);
            tracing::debug!(
                fps = format_args!("{fps:.1}"),
                weight = self.density.current_weight(),
                target = self.density.target_weight(),
                glows = stats.glows,
                "render stats"
            );
        }

        FrameOutcome::Drawn(stats)
    }

    /// Advances the simulation to `time` in bounded steps and paints once.
    ///
    /// Steps are `max_frame_delta` long until `time` would need more than
    /// [`MAX_STILL_STEPS`] of them; past that they lengthen instead. The
    /// pointer and the frame pacer play no part in a still.
    pub fn render_still<D: DrawSurface>(
        &mut self,
        time: Duration,
        surface: &mut D,
    ) -> FrameStats {
        let pointer = self.pointer.take();
        let total = time.as_secs_f64();
        let step = f64::from(self.max_frame_delta.max(1e-3));
        let steps = (total / step).ceil().min(f64::from(MAX_STILL_STEPS)) as u32;
        if steps > 0 {
            let dt = (total / f64::from(steps)) as f32;
            for _ in 0..steps {
                self.step(dt);
            }
        }
        let mut stats = self.paint(time, surface);
        stats.dt = time.as_secs_f32();
        self.pointer = pointer;
        stats
    }

    fn step(&mut self, dt: f32) {
        let Some(field) = self.field.as_mut() else {
            return;
        };

        for center in &mut field.centers {
            center.advance(dt);
        }

        for point in &mut field.points {
            point.velocity =
                point.velocity * VELOCITY_RETAIN + point.base_velocity * (1.0 - VELOCITY_RETAIN);
            point.angle += point.velocity * dt;

            if let Some(pointer) = self.pointer {
                let center = &field.centers[point.center];
                point.velocity +=
                    pointer_nudge(point, center, pointer.x, pointer.y, &self.options);
            }
        }
    }

    fn paint<D: DrawSurface>(&mut self, time: Duration, surface: &mut D) -> FrameStats {
        surface.clear();
        let mut stats = FrameStats::default();
        let Some(field) = self.field.as_ref() else {
            return stats;
        };

        let pulse_clock = (time.as_secs_f64() * 2.0 % TAU) as f32;
        let brightness = self.options.brightness;
        self.cores.clear();

        for point in &field.points {
            let alpha = self.density.alpha_for(point.weight);
            if alpha < CULL_ALPHA {
                stats.culled += 1;
                continue;
            }
            let (x, y) = point.position(&field.centers[point.center]);
            let shimmer = 0.5 + (pulse_clock + point.angle).sin() * PULSE_DEPTH * point.pulse;
            let glow_alpha = (alpha * shimmer * brightness).clamp(0.0, 1.0);
            surface.draw_sprite(&self.sprite, x, y, point.size * GLOW_SCALE, glow_alpha);
            stats.glows += 1;

            if alpha >= CORE_ALPHA {
                self.cores.push(Circle {
                    x,
                    y,
                    radius: point.size * CORE_SCALE,
                });
            }
        }

        stats.cores = self.cores.len();
        surface.fill_circles(&self.cores, self.core_color);
        stats
    }
}

/// Angular velocity change from a pointer at `(px, py)`.
///
/// Only the tangential component of the offset counts, scaled down with
/// distance and zero outside the pointer radius. The distance floor keeps the
/// result finite when the pointer sits exactly on the point.
pub fn pointer_nudge(
    point: &OrbitingPoint,
    center: &Center,
    px: f32,
    py: f32,
    options: &BackgroundOptions,
) -> f32 {
    let (sin, cos) = point.angle.sin_cos();
    let x = center.x + cos * point.radius;
    let y = center.y + sin * point.radius;
    let dx = px - x;
    let dy = py - y;
    let dist_sq = dx * dx + dy * dy;
    let radius = options.pointer_radius;
    if dist_sq.is_nan() || dist_sq >= radius * radius {
        return 0.0;
    }
    let dist = dist_sq.sqrt().max(MIN_POINTER_DISTANCE);
    let tangential = dx * -sin + dy * cos;
    options.response_strength * NUDGE_GAIN * (tangential / (dist + 1.0)) * (1.0 - dist / radius)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::CapabilityProfile;
    use crate::field::build_field;
    use crate::surface::recording::RecordingSurface;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn driver_with_field(width: f32, height: f32) -> AnimationDriver {
        let options = BackgroundOptions::default();
        let mut driver = AnimationDriver::new(options.clone(), &PacingOptions::default(), None);
        let field = build_field(
            width,
            height,
            &CapabilityProfile::default(),
            &options,
            &mut StdRng::seed_from_u64(3),
        )
        .unwrap();
        driver.set_field(Some(field));
        driver
    }

    fn single_point_field() -> Field {
        Field {
            width: 400.0,
            height: 400.0,
            centers: vec![Center::new(200.0, 200.0, 0.4, 0.0)],
            points: vec![OrbitingPoint {
                center: 0,
                radius: 100.0,
                angle: 0.0,
                base_velocity: 0.005,
                velocity: 0.005,
                size: 2.0,
                pulse: 1.0,
                weight: 0.1,
            }],
        }
    }

    #[test]
    fn pointer_on_point_stays_finite() {
        let options = BackgroundOptions::default();
        let field = single_point_field();
        let point = &field.points[0];
        let (x, y) = point.position(&field.centers[0]);
        let nudge = pointer_nudge(point, &field.centers[0], x, y, &options);
        assert!(nudge.is_finite());
        assert_eq!(nudge, 0.0);

        let mut driver = AnimationDriver::new(options, &PacingOptions::default(), None);
        driver.set_field(Some(field));
        driver.set_pointer(x, y);
        let mut surface = RecordingSurface::with_size(400, 400);
        driver.reset_timing(ms(0));
        for frame in 1..=120 {
            driver.frame(ms(frame * 16), &mut surface);
        }
        let field = driver.field().unwrap();
        assert!(field.points.iter().all(|p| p.velocity.is_finite() && p.angle.is_finite()));
    }

    #[test]
    fn pointer_outside_radius_has_no_effect() {
        let options = BackgroundOptions::default();
        let field = single_point_field();
        let nudge = pointer_nudge(
            &field.points[0],
            &field.centers[0],
            -1000.0,
            -1000.0,
            &options,
        );
        assert_eq!(nudge, 0.0);
    }

    #[test]
    fn tangential_pointer_speeds_up_orbit() {
        let options = BackgroundOptions::default();
        let field = single_point_field();
        // point sits at (300, 200); the tangent at angle 0 points along +y
        let ahead = pointer_nudge(&field.points[0], &field.centers[0], 300.0, 260.0, &options);
        let behind = pointer_nudge(&field.points[0], &field.centers[0], 300.0, 140.0, &options);
        assert!(ahead > 0.0);
        assert!(behind < 0.0);
        assert!((ahead + behind).abs() < 1e-7);
    }

    #[test]
    fn velocity_relaxes_toward_base() {
        let mut driver = AnimationDriver::new(
            BackgroundOptions::default(),
            &PacingOptions::default(),
            None,
        );
        let mut field = single_point_field();
        field.points[0].velocity = 0.5;
        driver.set_field(Some(field));
        let mut surface = RecordingSurface::with_size(400, 400);
        driver.reset_timing(ms(0));
        for frame in 1..=600 {
            driver.frame(ms(frame * 16), &mut surface);
        }
        let point = &driver.field().unwrap().points[0];
        assert!((point.velocity - point.base_velocity).abs() < 1e-3);
    }

    #[test]
    fn dt_is_clamped_after_long_gap() {
        let mut driver = driver_with_field(800.0, 600.0);
        let mut surface = RecordingSurface::with_size(800, 600);
        driver.reset_timing(ms(0));
        assert!(matches!(driver.frame(ms(16), &mut surface), FrameOutcome::Drawn(_)));
        match driver.frame(ms(5_016), &mut surface) {
            FrameOutcome::Drawn(stats) => assert!((stats.dt - 0.033).abs() < 1e-6),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn frame_batches_core_dots_once() {
        let mut driver = driver_with_field(1280.0, 720.0);
        let mut surface = RecordingSurface::with_size(1280, 720);
        driver.reset_timing(ms(0));
        let FrameOutcome::Drawn(stats) = driver.frame(ms(16), &mut surface) else {
            panic!("frame not drawn");
        };
        assert_eq!(surface.clears, 1);
        assert_eq!(surface.circle_batches, vec![stats.cores]);
        assert_eq!(surface.sprites.len(), stats.glows);
        let total = driver.field().unwrap().points.len();
        assert_eq!(stats.glows + stats.culled, total);
        assert!(surface
            .sprites
            .iter()
            .all(|(_, _, extent, alpha)| *extent > 0.0 && (0.0..=1.0).contains(alpha)));
    }

    #[test]
    fn pacer_skips_early_frames() {
        let options = BackgroundOptions::default();
        let mut driver = AnimationDriver::new(options, &PacingOptions::default(), Some(55.0));
        driver.set_field(Some(single_point_field()));
        let mut surface = RecordingSurface::with_size(400, 400);
        driver.reset_timing(ms(0));
        assert!(matches!(driver.frame(ms(1), &mut surface), FrameOutcome::Drawn(_)));
        assert_eq!(driver.frame(ms(5), &mut surface), FrameOutcome::Paced);
        assert_eq!(surface.clears, 1);
    }

    #[test]
    fn missing_field_draws_nothing() {
        let mut driver = AnimationDriver::new(
            BackgroundOptions::default(),
            &PacingOptions::default(),
            None,
        );
        let mut surface = RecordingSurface::with_size(0, 0);
        assert_eq!(driver.frame(ms(16), &mut surface), FrameOutcome::Empty);
        assert_eq!(surface.clears, 0);
    }

    #[test]
    fn slow_frames_thin_out_the_field() {
        let mut driver = driver_with_field(1280.0, 720.0);
        let mut surface = RecordingSurface::with_size(1280, 720);
        driver.reset_timing(ms(0));
        let mut now = 0;
        let mut last_culled = 0;
        for _ in 0..200 {
            now += 50;
            if let FrameOutcome::Drawn(stats) = driver.frame(ms(now), &mut surface) {
                last_culled = stats.culled;
            }
        }
        assert!(driver.density().target_weight() < 1.0);
        assert!(driver.density().current_weight() < 0.9);
        assert!(last_culled > 0);
    }

    #[test]
    fn still_render_advances_without_pointer() {
        let mut driver = driver_with_field(800.0, 600.0);
        let before: Vec<f32> = driver.field().unwrap().points.iter().map(|p| p.angle).collect();
        driver.set_pointer(400.0, 300.0);
        let mut surface = RecordingSurface::with_size(800, 600);
        let stats = driver.render_still(Duration::from_secs(2), &mut surface);
        assert_eq!(surface.clears, 1);
        assert!(stats.glows > 0);
        let field = driver.field().unwrap();
        for (point, angle) in field.points.iter().zip(before) {
            let expected = angle + point.base_velocity * 2.0;
            assert!((point.angle - expected).abs() < 1e-3);
        }
        assert!(driver.pointer_active());
    }

    #[test]
    fn very_long_still_stays_bounded_and_finite() {
        let mut driver = driver_with_field(800.0, 600.0);
        let mut surface = RecordingSurface::with_size(800, 600);
        let time = Duration::from_secs(10_000 * 3600);
        let stats = driver.render_still(time, &mut surface);
        assert_eq!(surface.clears, 1);
        assert!(stats.glows > 0);
        let field = driver.field().unwrap();
        assert!(field.points.iter().all(|p| p.angle.is_finite()));
        assert!(field.centers.iter().all(|c| c.x.is_finite() && c.y.is_finite()));
    }
}
