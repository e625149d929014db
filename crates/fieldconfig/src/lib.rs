//! TOML configuration for the orbfield background renderer and its asset tooling.
//!
//! Every key is optional so a file only needs to mention what it overrides;
//! callers layer the parsed values over built-in defaults. Durations accept
//! either a number of seconds or a human-readable string such as `"33ms"`.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// Largest accepted `field.density` multiplier.
pub const MAX_DENSITY: f32 = 10.0;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FieldConfig {
    pub version: u32,
    #[serde(default)]
    pub field: FieldSection,
    #[serde(default)]
    pub pacing: PacingSection,
    #[serde(default)]
    pub device: DeviceSection,
    #[serde(default)]
    pub assets: AssetsSection,
}

/// Appearance and interaction knobs of the particle field.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FieldSection {
    pub density: Option<f32>,
    pub pointer_radius: Option<f32>,
    pub hue: Option<f32>,
    pub response_strength: Option<f32>,
    pub speed_scale: Option<f32>,
    pub brightness: Option<f32>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PacingSection {
    pub target_fps: Option<f32>,
    #[serde(
        default,
        deserialize_with = "deserialize_duration_opt",
        serialize_with = "serialize_duration_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_frame_delta: Option<Duration>,
    #[serde(
        default,
        deserialize_with = "deserialize_duration_opt",
        serialize_with = "serialize_duration_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub fps_window: Option<Duration>,
    pub pixel_ratio_cap: Option<f32>,
}

/// Capability hints that replace host detection when present.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DeviceSection {
    pub memory_gb: Option<f32>,
    pub cores: Option<u32>,
    pub reduced_motion: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AssetsSection {
    pub root: Option<PathBuf>,
    pub webp: Option<bool>,
    pub avif: Option<bool>,
    pub max_width_cover: Option<u32>,
    pub max_width_gallery: Option<u32>,
    pub max_width_thumb: Option<u32>,
}

fn serialize_duration_opt<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(duration) => {
            serializer.serialize_str(&humantime::format_duration(*duration).to_string())
        }
        None => serializer.serialize_none(),
    }
}

fn deserialize_duration_opt<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Option<Duration>;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map(Some)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(Duration::from_secs(v)))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Some(Duration::from_secs(v as u64)))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if !v.is_finite() || v.is_sign_negative() {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Some(Duration::from_secs_f64(v)))
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }
    }

    deserializer.deserialize_any(Visitor)
}

impl FieldConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: FieldConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    /// Renders the configuration back to TOML, durations as humantime strings.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                self.version
            )));
        }

        let field = &self.field;
        require_positive("field.density", field.density)?;
        if let Some(density) = field.density {
            if density > MAX_DENSITY {
                return Err(ConfigError::Invalid(format!(
                    "field.density must be at most {MAX_DENSITY}, got {density}"
                )));
            }
        }
        require_positive("field.pointer_radius", field.pointer_radius)?;
        require_positive("field.speed_scale", field.speed_scale)?;

        if let Some(hue) = field.hue {
            if !hue.is_finite() {
                return Err(ConfigError::Invalid("field.hue must be a finite angle".into()));
            }
        }

        if let Some(strength) = field.response_strength {
            if !strength.is_finite() || strength < 0.0 {
                return Err(ConfigError::Invalid(
                    "field.response_strength must be >= 0".into(),
                ));
            }
        }

        if let Some(brightness) = field.brightness {
            if !(0.0..=1.0).contains(&brightness) {
                return Err(ConfigError::Invalid(format!(
                    "field.brightness must be within [0, 1], got {brightness}"
                )));
            }
        }

        let pacing = &self.pacing;
        require_positive("pacing.target_fps", pacing.target_fps)?;
        require_positive("pacing.pixel_ratio_cap", pacing.pixel_ratio_cap)?;

        if matches!(pacing.max_frame_delta, Some(delta) if delta.is_zero()) {
            return Err(ConfigError::Invalid(
                "pacing.max_frame_delta must be greater than zero".into(),
            ));
        }

        if matches!(pacing.fps_window, Some(window) if window.is_zero()) {
            return Err(ConfigError::Invalid(
                "pacing.fps_window must be greater than zero".into(),
            ));
        }

        if let Some(memory) = self.device.memory_gb {
            if !memory.is_finite() || memory < 0.0 {
                return Err(ConfigError::Invalid("device.memory_gb must be >= 0".into()));
            }
        }

        if self.device.cores == Some(0) {
            return Err(ConfigError::Invalid("device.cores must be >= 1".into()));
        }

        let assets = &self.assets;
        for (key, value) in [
            ("assets.max_width_cover", assets.max_width_cover),
            ("assets.max_width_gallery", assets.max_width_gallery),
            ("assets.max_width_thumb", assets.max_width_thumb),
        ] {
            if value == Some(0) {
                return Err(ConfigError::Invalid(format!("{key} must be greater than zero")));
            }
        }

        if let Some(root) = &assets.root {
            if root.as_os_str().is_empty() {
                return Err(ConfigError::Invalid("assets.root may not be empty".into()));
            }
        }

        Ok(())
    }
}

fn require_positive(key: &str, value: Option<f32>) -> Result<(), ConfigError> {
    match value {
        Some(v) if !v.is_finite() || v <= 0.0 => Err(ConfigError::Invalid(format!(
            "{key} must be greater than zero, got {v}"
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
version = 1

[field]
density = 1.2
pointer_radius = 300
hue = 190
brightness = 0.6

[pacing]
target_fps = 30
max_frame_delta = "50ms"
fps_window = 1

[device]
memory_gb = 8
cores = 2
reduced_motion = true

[assets]
root = "src/assets"
avif = true
max_width_thumb = 640
"#;

    #[test]
    fn parses_sample_config() {
        let config = FieldConfig::from_toml_str(SAMPLE).expect("parse config");
        assert_eq!(config.version, 1);
        assert_eq!(config.field.density, Some(1.2));
        assert_eq!(config.field.hue, Some(190.0));
        assert_eq!(config.field.speed_scale, None);
        assert_eq!(config.pacing.max_frame_delta, Some(Duration::from_millis(50)));
        assert_eq!(config.pacing.fps_window, Some(Duration::from_secs(1)));
        assert_eq!(config.device.cores, Some(2));
        assert_eq!(config.device.reduced_motion, Some(true));
        assert_eq!(config.assets.root.as_deref(), Some(std::path::Path::new("src/assets")));
        assert_eq!(config.assets.max_width_thumb, Some(640));
        assert_eq!(config.assets.webp, None);
    }

    #[test]
    fn accepts_version_only_file() {
        let config = FieldConfig::from_toml_str("version = 1\n").expect("parse minimal");
        assert!(config.field.density.is_none());
        assert!(config.pacing.target_fps.is_none());
    }

    #[test]
    fn rejects_unknown_version() {
        let err = FieldConfig::from_toml_str("version = 2\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_out_of_range_brightness() {
        let err = FieldConfig::from_toml_str(
            r#"
version = 1
[field]
brightness = 1.5
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("brightness")));
    }

    #[test]
    fn rejects_zero_frame_delta() {
        let err = FieldConfig::from_toml_str(
            r#"
version = 1
[pacing]
max_frame_delta = "0s"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_negative_duration() {
        let err = FieldConfig::from_toml_str(
            r#"
version = 1
[pacing]
fps_window = -1
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn rejects_non_positive_density() {
        let err = FieldConfig::from_toml_str(
            r#"
version = 1
[field]
density = 0
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("density")));
    }

    #[test]
    fn rejects_oversized_density() {
        let err = FieldConfig::from_toml_str(
            r#"
version = 1
[field]
density = 1e30
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("at most")));

        let config = FieldConfig::from_toml_str("version = 1
[field]
density = 10
").unwrap();
        assert_eq!(config.field.density, Some(MAX_DENSITY));
    }

    #[test]
    fn renders_durations_as_humantime() {
        let config = FieldConfig::from_toml_str(SAMPLE).unwrap();
        let rendered = config.to_toml_string().unwrap();
        assert!(rendered.contains("max_frame_delta = \"50ms\""));
        let reparsed = FieldConfig::from_toml_str(&rendered).unwrap();
        assert_eq!(reparsed.pacing.max_frame_delta, Some(Duration::from_millis(50)));
    }
}
