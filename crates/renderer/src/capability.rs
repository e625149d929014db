//! Device capability hints and the quality profile derived from them.
//!
//! The profile is computed once when a gate is created. Hosts that cannot
//! report a hint leave it `None` and the mid-range fallback applies.

/// Memory assumed when the host does not report it, in gigabytes.
pub const FALLBACK_MEMORY_GB: f32 = 4.0;
/// Logical core count assumed when the host does not report it.
pub const FALLBACK_CORES: u32 = 4;
/// Point count multiplier used instead of the density option under reduced motion.
pub const REDUCED_MOTION_SCALE: f32 = 0.6;

/// Raw capability signals reported by the host environment.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DeviceHints {
    pub memory_gb: Option<f32>,
    pub logical_cores: Option<u32>,
    pub prefers_reduced_motion: Option<bool>,
}

impl DeviceHints {
    /// Probes what the native host can report. Memory is left unknown.
    pub fn detect() -> Self {
        let logical_cores = std::thread::available_parallelism()
            .ok()
            .and_then(|cores| u32::try_from(cores.get()).ok());
        Self {
            memory_gb: None,
            logical_cores,
            prefers_reduced_motion: None,
        }
    }

    /// Replaces every hint that `overrides` reports.
    pub fn with_overrides(self, overrides: DeviceHints) -> Self {
        Self {
            memory_gb: overrides.memory_gb.or(self.memory_gb),
            logical_cores: overrides.logical_cores.or(self.logical_cores),
            prefers_reduced_motion: overrides
                .prefers_reduced_motion
                .or(self.prefers_reduced_motion),
        }
    }
}

/// Quality decisions derived from [`DeviceHints`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapabilityProfile {
    /// Either memory or core count falls in the lowest tier.
    pub low_power: bool,
    pub reduced_motion: bool,
    /// Point count scale factor in `(0, 1]`.
    pub quality: f32,
}

impl CapabilityProfile {
    pub fn from_hints(hints: &DeviceHints) -> Self {
        let memory = hints
            .memory_gb
            .filter(|gb| gb.is_finite() && *gb > 0.0)
            .unwrap_or(FALLBACK_MEMORY_GB);
        let cores = hints
            .logical_cores
            .filter(|cores| *cores > 0)
            .unwrap_or(FALLBACK_CORES);

        let memory_factor = if memory >= 8.0 {
            1.0
        } else if memory >= 4.0 {
            0.85
        } else {
            0.7
        };
        let core_factor = if cores >= 8 {
            1.0
        } else if cores >= 4 {
            0.9
        } else {
            0.75
        };

        Self {
            low_power: memory < 4.0 || cores < 4,
            reduced_motion: hints.prefers_reduced_motion.unwrap_or(false),
            quality: memory_factor * core_factor,
        }
    }

    /// Multiplier applied to the base point count.
    pub fn count_scale(&self, density: f32) -> f32 {
        let scale = if self.reduced_motion {
            REDUCED_MOTION_SCALE
        } else {
            density
        };
        scale * self.quality
    }
}

impl Default for CapabilityProfile {
    fn default() -> Self {
        Self::from_hints(&DeviceHints::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_hints_fall_back_to_mid_range() {
        let profile = CapabilityProfile::default();
        assert!(!profile.low_power);
        assert!(!profile.reduced_motion);
        assert!((profile.quality - 0.85 * 0.9).abs() < 1e-6);
    }

    #[test]
    fn high_end_device_gets_full_quality() {
        let profile = CapabilityProfile::from_hints(&DeviceHints {
            memory_gb: Some(16.0),
            logical_cores: Some(12),
            prefers_reduced_motion: None,
        });
        assert_eq!(profile.quality, 1.0);
    }

    #[test]
    fn low_end_device_is_flagged() {
        let profile = CapabilityProfile::from_hints(&DeviceHints {
            memory_gb: Some(2.0),
            logical_cores: Some(2),
            prefers_reduced_motion: Some(true),
        });
        assert!(profile.low_power);
        assert!(profile.reduced_motion);
        assert!((profile.quality - 0.7 * 0.75).abs() < 1e-6);
        assert!((profile.count_scale(1.9) - 0.6 * 0.525).abs() < 1e-6);
    }

    #[test]
    fn overrides_take_precedence() {
        let detected = DeviceHints {
            memory_gb: None,
            logical_cores: Some(16),
            prefers_reduced_motion: None,
        };
        let merged = detected.with_overrides(DeviceHints {
            memory_gb: Some(8.0),
            logical_cores: Some(2),
            prefers_reduced_motion: None,
        });
        assert_eq!(merged.memory_gb, Some(8.0));
        assert_eq!(merged.logical_cores, Some(2));
        assert_eq!(merged.prefers_reduced_motion, None);
    }
}
