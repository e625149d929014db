//! Visibility-aware ownership of the frame loop.
//!
//! The gate owns the driver, the scheduler and the surface. It is running
//! only while the page is visible, the surface intersects the viewport and
//! teardown has not happened. Exactly one frame request is outstanding while
//! running and none otherwise.
//!
//! ```text
//!   host signals ──▶ set_page_visible / set_intersecting / resize / pointer_*
//!                          │
//!   scheduler tick ──▶ on_frame(request) ──▶ AnimationDriver::frame ──▶ DrawSurface
//!                          │
//!                          └─▶ schedule_next_frame() while running
//! ```

use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use scheduler::{FrameRequest, FrameScheduler};

use crate::capability::{CapabilityProfile, DeviceHints};
use crate::driver::{AnimationDriver, FrameOutcome};
use crate::field::build_field;
use crate::surface::{DrawSurface, SurfaceSize};
use crate::types::RendererConfig;

/// Unsubscribe hook for a host listener, run exactly once at teardown.
pub struct Subscription {
    label: &'static str,
    release: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new(label: &'static str, release: impl FnOnce() + 'static) -> Self {
        Self {
            label,
            release: Some(Box::new(release)),
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    fn release(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("label", &self.label)
            .field("active", &self.release.is_some())
            .finish()
    }
}

pub struct LifecycleGate<S: FrameScheduler, D: DrawSurface> {
    config: RendererConfig,
    profile: CapabilityProfile,
    driver: AnimationDriver,
    scheduler: S,
    surface: D,
    rng: StdRng,
    page_visible: bool,
    intersecting: bool,
    torn_down: bool,
    pending: Option<FrameRequest>,
    subscriptions: Vec<Subscription>,
}

impl<S: FrameScheduler, D: DrawSurface> LifecycleGate<S, D> {
    /// Builds the gate around a surface that already has its initial size.
    ///
    /// Capability hints are read once here and never re-polled.
    pub fn new(config: RendererConfig, hints: DeviceHints, scheduler: S, surface: D) -> Self {
        let profile = CapabilityProfile::from_hints(&hints);
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let driver = AnimationDriver::new(
            config.options.clone(),
            &config.pacing,
            config.policy.target_fps(),
        );
        tracing::info!(
            quality = profile.quality,
            low_power = profile.low_power,
            reduced_motion = profile.reduced_motion,
            "capability profile"
        );
        let mut gate = Self {
            config,
            profile,
            driver,
            scheduler,
            surface,
            rng,
            page_visible: true,
            intersecting: true,
            torn_down: false,
            pending: None,
            subscriptions: Vec::new(),
        };
        gate.rebuild_field();
        gate
    }

    pub fn profile(&self) -> &CapabilityProfile {
        &self.profile
    }

    pub fn driver(&self) -> &AnimationDriver {
        &self.driver
    }

    pub fn surface(&self) -> &D {
        &self.surface
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// Hosts poll their scheduler through this to obtain due requests.
    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    pub fn pending_request(&self) -> Option<FrameRequest> {
        self.pending
    }

    pub fn is_running(&self) -> bool {
        self.page_visible && self.intersecting && !self.torn_down
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Starts the frame loop at `now` if every visibility signal allows it.
    pub fn start(&mut self, now: Duration) {
        if self.is_running() && self.pending.is_none() {
            self.resume(now);
        }
    }

    pub fn set_page_visible(&mut self, visible: bool, now: Duration) {
        let was_running = self.is_running();
        self.page_visible = visible;
        self.apply_visibility(was_running, now);
    }

    pub fn set_intersecting(&mut self, intersecting: bool, now: Duration) {
        let was_running = self.is_running();
        self.intersecting = intersecting;
        self.apply_visibility(was_running, now);
    }

    fn apply_visibility(&mut self, was_running: bool, now: Duration) {
        match (was_running, self.is_running()) {
            (true, false) => {
                self.cancel_pending();
                tracing::debug!(
                    page_visible = self.page_visible,
                    intersecting = self.intersecting,
                    "background paused"
                );
            }
            (false, true) => {
                self.resume(now);
                tracing::debug!("background resumed");
            }
            _ => {}
        }
    }

    fn resume(&mut self, now: Duration) {
        self.driver.reset_timing(now);
        self.request_frame();
    }

    /// Applies a container size change and regenerates the field.
    ///
    /// `device_pixel_ratio` of `None` or a non-positive value counts as 1.
    pub fn resize(&mut self, width: u32, height: u32, device_pixel_ratio: Option<f32>) {
        if self.torn_down {
            return;
        }
        let ratio = device_pixel_ratio
            .filter(|ratio| ratio.is_finite() && *ratio > 0.0)
            .unwrap_or(1.0)
            .min(self.config.pacing.pixel_ratio_cap);
        let size = SurfaceSize::new(width, height, ratio);
        if size == self.surface.size() && self.driver.field().is_some() {
            return;
        }
        self.surface.resize(size);
        self.rebuild_field();
    }

    fn rebuild_field(&mut self) {
        let size = self.surface.size();
        let field = build_field(
            size.width as f32,
            size.height as f32,
            &self.profile,
            &self.config.options,
            &mut self.rng,
        );
        match field {
            Ok(field) => {
                tracing::info!(
                    width = size.width,
                    height = size.height,
                    pixel_ratio = size.pixel_ratio,
                    points = field.points.len(),
                    "field regenerated"
                );
                self.driver.set_field(Some(field));
            }
            Err(err) => {
                tracing::debug!(%err, "skipping frames until the surface has an area");
                self.driver.set_field(None);
            }
        }
    }

    pub fn pointer_moved(&mut self, x: f32, y: f32) {
        self.driver.set_pointer(x, y);
    }

    pub fn pointer_left(&mut self) {
        self.driver.clear_pointer();
    }

    /// Registers a host listener to be released at teardown.
    pub fn attach(&mut self, subscription: Subscription) {
        if self.torn_down {
            let mut subscription = subscription;
            subscription.release();
            return;
        }
        self.subscriptions.push(subscription);
    }

    /// Runs the frame for `request` if it is the one currently pending.
    pub fn on_frame(&mut self, request: FrameRequest, now: Duration) -> FrameOutcome {
        if self.torn_down || self.pending != Some(request) {
            tracing::trace!(request = request.id(), "ignoring stale frame");
            return FrameOutcome::Ignored;
        }
        self.pending = None;
        if !self.is_running() {
            return FrameOutcome::Ignored;
        }
        let outcome = self.driver.frame(now, &mut self.surface);
        self.request_frame();
        outcome
    }

    /// Cancels the pending frame and releases every subscription. Idempotent.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.cancel_pending();
        for subscription in &mut self.subscriptions {
            tracing::trace!(label = subscription.label(), "releasing subscription");
            subscription.release();
        }
        self.subscriptions.clear();
        tracing::debug!("background torn down");
    }

    fn request_frame(&mut self) {
        if let Some(previous) = self.pending.take() {
            self.scheduler.cancel(previous);
        }
        self.pending = Some(self.scheduler.schedule_next_frame());
    }

    fn cancel_pending(&mut self) {
        if let Some(request) = self.pending.take() {
            self.scheduler.cancel(request);
        }
    }
}

impl<S: FrameScheduler, D: DrawSurface> Drop for LifecycleGate<S, D> {
    fn drop(&mut self) {
        self.teardown();
    }
}
