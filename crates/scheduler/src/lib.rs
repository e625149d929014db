//! Frame scheduling primitives shared by the renderer and its hosts.
//!
//! Timestamps are [`Duration`]s measured from an arbitrary session origin so
//! simulated and wall-clock sessions share one code path.
//!
//! Types
//! - [`FrameScheduler`]: "run on next paint" requests with synchronous cancel.
//! - [`IntervalScheduler`]: display-refresh emulation delivering one request per vsync.
//! - [`FrameRequest`]: opaque token identifying a single pending request.
//! - [`Clock`], [`SystemClock`], [`SimulatedClock`]: sources of `now`.
//! - [`FramePacer`], [`FpsMeter`]: frame-rate cap and rolling FPS sampling.

use std::time::Duration;

mod clock;
mod pacing;

pub use clock::{Clock, SimulatedClock, SystemClock};
pub use pacing::{FpsMeter, FramePacer};

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("refresh rate must be a positive number of hertz, got {0}")]
    InvalidRefreshRate(f32),
}

/// Token for a scheduled frame; each call to `schedule_next_frame` yields a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameRequest(u64);

impl FrameRequest {
    pub fn id(self) -> u64 {
        self.0
    }
}

/// Host-side frame callback mechanism.
///
/// At most one request is pending at a time. Scheduling again replaces the
/// previous request, and a cancelled request is never delivered.
pub trait FrameScheduler {
    /// Requests the next frame and returns the token that will be delivered.
    fn schedule_next_frame(&mut self) -> FrameRequest;
    /// Withdraws `request` if it is still pending. Unknown tokens are ignored.
    fn cancel(&mut self, request: FrameRequest);
    /// Currently pending request, if any.
    fn pending(&self) -> Option<FrameRequest>;
}

/// Emulates a display that fires frame callbacks on a fixed refresh grid.
#[derive(Debug, Clone)]
pub struct IntervalScheduler {
    interval: Duration,
    pending: Option<FrameRequest>,
    next_id: u64,
    next_vsync: Duration,
}

impl IntervalScheduler {
    pub fn new(refresh_hz: f32) -> Result<Self, SchedulerError> {
        if !refresh_hz.is_finite() || refresh_hz <= 0.0 {
            return Err(SchedulerError::InvalidRefreshRate(refresh_hz));
        }
        Ok(Self {
            interval: Duration::from_secs_f64(1.0 / f64::from(refresh_hz)),
            pending: None,
            next_id: 0,
            next_vsync: Duration::ZERO,
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Timestamp at which the pending request becomes deliverable.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.pending.map(|_| self.next_vsync)
    }

    /// Delivers the pending request when its vsync has been reached.
    ///
    /// The refresh grid is re-anchored on `now`, so a host that idled for a
    /// long time receives one frame rather than a burst.
    pub fn poll(&mut self, now: Duration) -> Option<FrameRequest> {
        if now < self.next_vsync {
            return None;
        }
        let request = self.pending.take()?;
        self.next_vsync = self.align(now) + self.interval;
        tracing::trace!(
            request = request.id(),
            now_ms = now.as_secs_f64() * 1000.0,
            "frame delivered"
        );
        Some(request)
    }

    fn align(&self, now: Duration) -> Duration {
        let interval = self.interval.as_nanos().max(1);
        let ticks = now.as_nanos() / interval;
        let aligned = ticks.saturating_mul(interval);
        Duration::from_nanos(u64::try_from(aligned).unwrap_or(u64::MAX))
    }
}

impl FrameScheduler for IntervalScheduler {
    fn schedule_next_frame(&mut self) -> FrameRequest {
        self.next_id = self.next_id.wrapping_add(1);
        let request = FrameRequest(self.next_id);
        self.pending = Some(request);
        request
    }

    fn cancel(&mut self, request: FrameRequest) {
        if self.pending == Some(request) {
            self.pending = None;
            tracing::trace!(request = request.id(), "frame request cancelled");
        }
    }

    fn pending(&self) -> Option<FrameRequest> {
        self.pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn rejects_non_positive_refresh_rate() {
        assert!(IntervalScheduler::new(0.0).is_err());
        assert!(IntervalScheduler::new(f32::NAN).is_err());
    }

    #[test]
    fn delivers_pending_request_once() {
        let mut scheduler = IntervalScheduler::new(50.0).unwrap();
        let request = scheduler.schedule_next_frame();
        assert_eq!(scheduler.poll(ms(0)), Some(request));
        assert_eq!(scheduler.poll(ms(100)), None);
    }

    #[test]
    fn waits_for_next_vsync() {
        let mut scheduler = IntervalScheduler::new(50.0).unwrap();
        scheduler.schedule_next_frame();
        assert!(scheduler.poll(ms(0)).is_some());

        let second = scheduler.schedule_next_frame();
        assert_eq!(scheduler.next_deadline(), Some(ms(20)));
        assert_eq!(scheduler.poll(ms(10)), None);
        assert_eq!(scheduler.poll(ms(20)), Some(second));
    }

    #[test]
    fn cancelled_request_is_never_delivered() {
        let mut scheduler = IntervalScheduler::new(60.0).unwrap();
        let request = scheduler.schedule_next_frame();
        scheduler.cancel(request);
        assert_eq!(scheduler.pending(), None);
        assert_eq!(scheduler.next_deadline(), None);
        assert_eq!(scheduler.poll(ms(500)), None);
    }

    #[test]
    fn rescheduling_replaces_previous_request() {
        let mut scheduler = IntervalScheduler::new(60.0).unwrap();
        let first = scheduler.schedule_next_frame();
        let second = scheduler.schedule_next_frame();
        assert_ne!(first, second);

        scheduler.cancel(first);
        assert_eq!(scheduler.pending(), Some(second));
        assert_eq!(scheduler.poll(ms(0)), Some(second));
    }

    #[test]
    fn realigns_after_idle_gap() {
        let mut scheduler = IntervalScheduler::new(50.0).unwrap();
        scheduler.schedule_next_frame();
        assert!(scheduler.poll(ms(5_013)).is_some());
        scheduler.schedule_next_frame();
        assert_eq!(scheduler.next_deadline(), Some(ms(5_020)));
    }
}
