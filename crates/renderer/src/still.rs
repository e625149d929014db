use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::capability::{CapabilityProfile, DeviceHints};
use crate::driver::{AnimationDriver, FrameStats};
use crate::field::{build_field, FieldError};
use crate::runtime::RenderPolicy;
use crate::surface::DrawSurface;
use crate::types::RendererConfig;

/// Paints a single frame of a freshly generated field into `surface`.
///
/// The field is simulated for the policy's still time (zero for animated
/// policies) at full density before the one paint.
pub fn render_still<D: DrawSurface>(
    config: &RendererConfig,
    hints: &DeviceHints,
    surface: &mut D,
) -> Result<FrameStats, FieldError> {
    let profile = CapabilityProfile::from_hints(hints);
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let size = surface.size();
    let field = build_field(
        size.width as f32,
        size.height as f32,
        &profile,
        &config.options,
        &mut rng,
    )?;

    let time = match config.policy {
        RenderPolicy::Still { time } => time,
        RenderPolicy::Animate { .. } => Duration::ZERO,
    };

    let mut driver = AnimationDriver::new(config.options.clone(), &config.pacing, None);
    driver.set_field(Some(field));
    let stats = driver.render_still(time, surface);
    tracing::info!(
        width = size.width,
        height = size.height,
        time_s = time.as_secs_f32(),
        glows = stats.glows,
        "rendered still frame"
    );
    Ok(stats)
}
