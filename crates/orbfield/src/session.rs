//! Headless animation session: drives a `LifecycleGate` from an emulated
//! display and a clock that is either simulated or the wall clock.

use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use renderer::{Color, FrameOutcome, LifecycleGate, RasterSurface};
use scheduler::{Clock, IntervalScheduler, SimulatedClock, SystemClock};
use serde::Serialize;
use tracing::{debug, info};

pub type SessionGate = LifecycleGate<IntervalScheduler, RasterSurface>;

/// Clock that the session loop can wait on and charge paint time to.
pub trait SessionClock: Clock {
    fn wait_until(&mut self, at: Duration);
    fn spend(&mut self, cost: Duration);
}

impl SessionClock for SimulatedClock {
    fn wait_until(&mut self, at: Duration) {
        self.advance_to(at);
    }

    fn spend(&mut self, cost: Duration) {
        self.advance(cost);
    }
}

impl SessionClock for SystemClock {
    fn wait_until(&mut self, at: Duration) {
        let remaining = self.instant_at(at).saturating_duration_since(Instant::now());
        if !remaining.is_zero() {
            thread::sleep(remaining);
        }
    }

    fn spend(&mut self, cost: Duration) {
        if !cost.is_zero() {
            thread::sleep(cost);
        }
    }
}

#[derive(Debug, Clone)]
pub struct SequenceExport {
    pub dir: PathBuf,
    pub every: u32,
}

#[derive(Debug, Clone, Default)]
pub struct SessionPlan {
    pub duration: Duration,
    /// Extra time charged after every drawn frame.
    pub frame_cost: Duration,
    pub hide_at: Option<Duration>,
    pub show_at: Option<Duration>,
    pub pointer: Option<(f32, f32)>,
    pub sequence: Option<SequenceExport>,
    pub backdrop: Option<Color>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionReport {
    pub delivered: u64,
    pub drawn: u64,
    pub paced: u64,
    pub empty: u64,
    pub ignored: u64,
    pub exported: u64,
    pub points: usize,
    pub last_glows: usize,
    pub weight: f32,
    pub target_weight: f32,
    pub elapsed_ms: f64,
}

impl SessionReport {
    /// Average drawn frames per second over the session.
    pub fn drawn_fps(&self) -> f64 {
        if self.elapsed_ms <= 0.0 {
            return 0.0;
        }
        self.drawn as f64 * 1000.0 / self.elapsed_ms
    }
}

/// Runs `gate` until `plan.duration` of session time has passed.
pub fn run_session<C: SessionClock>(
    gate: &mut SessionGate,
    plan: &SessionPlan,
    clock: &mut C,
) -> Result<SessionReport> {
    let mut events = visibility_events(plan);
    let mut report = SessionReport::default();

    if let Some((x, y)) = plan.pointer {
        gate.pointer_moved(x, y);
    }
    gate.start(clock.now());

    loop {
        let now = clock.now();
        if now >= plan.duration {
            break;
        }

        while let Some(&(at, visible)) = events.first() {
            if at > now {
                break;
            }
            events.remove(0);
            debug!(at_ms = at.as_millis() as u64, visible, "visibility changed");
            gate.set_page_visible(visible, now);
        }

        if let Some(request) = gate.scheduler_mut().poll(now) {
            report.delivered += 1;
            match gate.on_frame(request, now) {
                FrameOutcome::Drawn(stats) => {
                    report.drawn += 1;
                    report.last_glows = stats.glows;
                    if let Some(sequence) = &plan.sequence {
                        if report.drawn % u64::from(sequence.every.max(1)) == 0 {
                            export_frame(gate, sequence, report.drawn, plan.backdrop)?;
                            report.exported += 1;
                        }
                    }
                    clock.spend(plan.frame_cost);
                }
                FrameOutcome::Paced => report.paced += 1,
                FrameOutcome::Empty => report.empty += 1,
                FrameOutcome::Ignored => report.ignored += 1,
            }
            continue;
        }

        let next = [
            gate.scheduler().next_deadline(),
            events.first().map(|(at, _)| *at),
            Some(plan.duration),
        ]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(plan.duration);
        clock.wait_until(next);
    }

    report.points = gate.driver().field().map_or(0, |field| field.points.len());
    report.weight = gate.driver().density().current_weight();
    report.target_weight = gate.driver().density().target_weight();
    report.elapsed_ms = clock.now().as_secs_f64() * 1000.0;
    info!(
        drawn = report.drawn,
        paced = report.paced,
        fps = format_args!("{:.1}", report.drawn_fps()),
        weight = format_args!("{:.3}", report.weight),
        points = report.points,
        "session finished"
    );
    Ok(report)
}

fn visibility_events(plan: &SessionPlan) -> Vec<(Duration, bool)> {
    let mut events: Vec<(Duration, bool)> = plan
        .hide_at
        .map(|at| (at, false))
        .into_iter()
        .chain(plan.show_at.map(|at| (at, true)))
        .collect();
    events.sort_by_key(|(at, _)| *at);
    events
}

fn export_frame(
    gate: &SessionGate,
    sequence: &SequenceExport,
    index: u64,
    backdrop: Option<Color>,
) -> Result<()> {
    let path = frame_path(&sequence.dir, index);
    gate.surface().save_png(&path, backdrop)
}

pub fn frame_path(dir: &Path, index: u64) -> PathBuf {
    dir.join(format!("frame-{index:05}.png"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use renderer::{DeviceHints, RenderPolicy, RendererConfig, SurfaceSize};

    #[test]
    fn system_clock_waits_until_deadline() {
        let mut clock = SystemClock::new();
        let deadline = Duration::from_millis(15);
        clock.wait_until(deadline);
        assert!(clock.now() >= deadline);
        // Past deadlines return immediately.
        clock.wait_until(Duration::ZERO);
    }

    fn gate(width: u32, height: u32, target_fps: Option<f32>) -> SessionGate {
        let config = RendererConfig {
            policy: RenderPolicy::Animate { target_fps },
            seed: Some(11),
            ..RendererConfig::default()
        };
        let hints = DeviceHints {
            memory_gb: Some(8.0),
            logical_cores: Some(8),
            prefers_reduced_motion: Some(false),
        };
        LifecycleGate::new(
            config,
            hints,
            IntervalScheduler::new(60.0).unwrap(),
            RasterSurface::new(SurfaceSize::new(width, height, 1.0)),
        )
    }

    #[test]
    fn simulated_session_caps_frame_rate() {
        let mut gate = gate(320, 200, Some(30.0));
        let plan = SessionPlan {
            duration: Duration::from_secs(2),
            ..SessionPlan::default()
        };
        let report = run_session(&mut gate, &plan, &mut SimulatedClock::default()).unwrap();
        assert!(report.delivered >= 110, "delivered {}", report.delivered);
        assert!((55..=65).contains(&report.drawn), "drawn {}", report.drawn);
        assert!(report.paced > 0);
        assert!(report.points > 0);
    }

    #[test]
    fn slow_frames_thin_the_field() {
        let mut gate = gate(320, 200, None);
        let plan = SessionPlan {
            duration: Duration::from_secs(3),
            frame_cost: Duration::from_millis(40),
            ..SessionPlan::default()
        };
        let report = run_session(&mut gate, &plan, &mut SimulatedClock::default()).unwrap();
        assert!(report.target_weight < 1.0);
        assert!(report.target_weight >= 0.35);
    }

    #[test]
    fn hidden_interval_draws_nothing() {
        let mut gate = gate(320, 200, None);
        let plan = SessionPlan {
            duration: Duration::from_secs(3),
            hide_at: Some(Duration::from_millis(500)),
            show_at: Some(Duration::from_millis(2500)),
            ..SessionPlan::default()
        };
        let report = run_session(&mut gate, &plan, &mut SimulatedClock::default()).unwrap();
        // Roughly one second of visible time at 60Hz.
        assert!((50..=70).contains(&report.drawn), "drawn {}", report.drawn);
    }

    #[test]
    fn zero_sized_surface_only_reports_empty_frames() {
        let mut gate = gate(0, 0, None);
        let plan = SessionPlan {
            duration: Duration::from_millis(200),
            ..SessionPlan::default()
        };
        let report = run_session(&mut gate, &plan, &mut SimulatedClock::default()).unwrap();
        assert_eq!(report.drawn, 0);
        assert!(report.empty > 0);
        assert_eq!(report.points, 0);
    }

    #[test]
    fn sequence_exports_every_nth_frame() {
        let dir = tempfile::tempdir().unwrap();
        let mut gate = gate(64, 48, None);
        let plan = SessionPlan {
            duration: Duration::from_millis(500),
            sequence: Some(SequenceExport {
                dir: dir.path().to_path_buf(),
                every: 10,
            }),
            ..SessionPlan::default()
        };
        let report = run_session(&mut gate, &plan, &mut SimulatedClock::default()).unwrap();
        assert_eq!(report.exported, report.drawn / 10);
        assert!(frame_path(dir.path(), 10).exists());
    }
}
