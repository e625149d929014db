use std::time::Duration;

/// High-level behaviour requested by the caller.
///
/// The render policy decides whether the field animates continuously or is
/// painted once as a still snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderPolicy {
    /// Run the frame loop continuously.
    Animate {
        /// Frames-per-second cap; `None` draws every delivered frame.
        target_fps: Option<f32>,
    },
    /// Paint a single frame after simulating the field for `time`.
    Still {
        /// Simulated time to advance the orbits before painting.
        time: Duration,
    },
}

impl RenderPolicy {
    pub fn target_fps(&self) -> Option<f32> {
        match self {
            RenderPolicy::Animate { target_fps } => *target_fps,
            RenderPolicy::Still { .. } => None,
        }
    }
}

impl Default for RenderPolicy {
    fn default() -> Self {
        Self::Animate {
            target_fps: Some(DEFAULT_TARGET_FPS),
        }
    }
}

/// Frame-rate cap applied by the animated policy when none is requested.
pub const DEFAULT_TARGET_FPS: f32 = 55.0;
