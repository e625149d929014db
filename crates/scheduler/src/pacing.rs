use std::time::Duration;

/// Caps the rate at which delivered frames are actually drawn.
///
/// Time between deliveries accumulates until a full target interval has
/// passed. The remainder carries into the next frame, so a 60 Hz display with
/// a 55 FPS cap draws close to 55 frames per second instead of halving.
#[derive(Debug, Clone)]
pub struct FramePacer {
    target_interval: Option<Duration>,
    accumulator: Duration,
    last_tick: Option<Duration>,
}

const SLACK: Duration = Duration::from_micros(250);

impl FramePacer {
    /// `None` or a non-positive rate disables the cap.
    pub fn new(target_fps: Option<f32>) -> Self {
        let target_interval = target_fps.and_then(|fps| {
            if fps.is_finite() && fps > 0.0 {
                Some(Duration::from_secs_f64(1.0 / f64::from(fps)))
            } else {
                None
            }
        });
        Self {
            target_interval,
            accumulator: Duration::ZERO,
            last_tick: None,
        }
    }

    pub fn target_interval(&self) -> Option<Duration> {
        self.target_interval
    }

    /// Forgets timing history; the next delivered frame draws.
    pub fn reset(&mut self) {
        self.accumulator = Duration::ZERO;
        self.last_tick = None;
    }

    pub fn should_render(&mut self, now: Duration) -> bool {
        match (self.target_interval, self.last_tick) {
            (Some(interval), Some(last)) => {
                let delta = now.saturating_sub(last);
                self.last_tick = Some(now);
                self.accumulator = self.accumulator.saturating_add(delta);
                if self.accumulator + SLACK < interval {
                    false
                } else {
                    self.accumulator = self.accumulator.saturating_sub(interval).min(interval);
                    true
                }
            }
            (Some(_), None) | (None, _) => {
                self.last_tick = Some(now);
                true
            }
        }
    }
}

/// Counts drawn frames and emits an FPS sample once per window.
#[derive(Debug, Clone)]
pub struct FpsMeter {
    window: Duration,
    frames: u32,
    window_start: Option<Duration>,
}

impl FpsMeter {
    pub fn new(window: Duration) -> Self {
        Self {
            window: window.max(Duration::from_millis(1)),
            frames: 0,
            window_start: None,
        }
    }

    /// Restarts the window at `now`, discarding frames counted so far.
    pub fn reset(&mut self, now: Duration) {
        self.frames = 0;
        self.window_start = Some(now);
    }

    /// Records one drawn frame. Returns the average FPS when the window has elapsed.
    pub fn record_frame(&mut self, now: Duration) -> Option<f32> {
        let Some(start) = self.window_start else {
            self.reset(now);
            return None;
        };
        self.frames = self.frames.saturating_add(1);
        let elapsed = now.saturating_sub(start);
        if elapsed < self.window {
            return None;
        }
        let fps = self.frames as f32 / elapsed.as_secs_f32();
        self.reset(now);
        Some(fps)
    }
}
