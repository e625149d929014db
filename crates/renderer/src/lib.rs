//! Renderer crate for the orbfield adaptive particle background.
//!
//! A field of glow points orbits drifting centers. The drawn population is
//! thinned or restored by a frame-rate feedback loop, the loop pauses while
//! the surface is invisible, and points near the pointer are nudged along
//! their orbit. The overall flow is:
//!
//! ```text
//!   host (CLI / embedder)
//!          │ RendererConfig + DeviceHints
//!          ▼
//!   LifecycleGate ──▶ FrameScheduler ──▶ on_frame(request)
//!          │                                   │
//!          │ resize ─▶ build_field()           ▼
//!          │                           AnimationDriver::frame
//!          │                             ├─ DensityController
//!          ▼                             └─▶ DrawSurface (RasterSurface)
//!   teardown(): cancel + release subscriptions
//! ```
//!
//! `render_still` covers the single-paint variant without a scheduler.

mod capability;
mod density;
mod driver;
mod field;
mod lifecycle;
mod runtime;
mod sprite;
mod still;
mod surface;
mod types;

pub use capability::{CapabilityProfile, DeviceHints};
pub use density::{inclusion_alpha, DensityController};
pub use driver::{pointer_nudge, AnimationDriver, FrameOutcome, FrameStats, MAX_STILL_STEPS};
pub use field::{
    base_point_count, build_field, grid_dimensions, point_count, Center, Field, FieldError,
    OrbitingPoint, MAX_POINTS,
};
pub use lifecycle::{LifecycleGate, Subscription};
pub use runtime::{RenderPolicy, DEFAULT_TARGET_FPS};
pub use sprite::{Color, GlowSprite, SPRITE_SIZE};
pub use still::render_still;
pub use surface::{Circle, DrawSurface, RasterSurface, SurfaceSize};
pub use types::{BackgroundOptions, PacingOptions, RendererConfig};
