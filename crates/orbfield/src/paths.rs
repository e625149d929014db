use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use directories_next::ProjectDirs;
use fieldconfig::FieldConfig;
use tracing::debug;

pub const ENV_CONFIG_DIR: &str = "ORBFIELD_CONFIG_DIR";

const QUALIFIER: &str = "org";
const ORGANISATION: &str = "orbfield";
const APPLICATION: &str = "orbfield";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone)]
pub struct AppPaths {
    config_dir: PathBuf,
}

impl AppPaths {
    pub fn discover() -> Result<Self> {
        if let Some(dir) = env_override(ENV_CONFIG_DIR) {
            return Ok(Self { config_dir: dir });
        }
        let project_dirs = ProjectDirs::from(QUALIFIER, ORGANISATION, APPLICATION)
            .ok_or_else(|| anyhow!("failed to determine user directories"))?;
        Ok(Self {
            config_dir: project_dirs.config_dir().to_path_buf(),
        })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }
}

/// Where the effective configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Explicit(PathBuf),
    Discovered(PathBuf),
    Defaults,
}

/// Loads `explicit` if given, else the discovered file when it exists.
///
/// A missing explicit file is an error; a missing discovered file is not.
pub fn load_config(
    paths: &AppPaths,
    explicit: Option<&Path>,
) -> Result<(FieldConfig, ConfigSource)> {
    if let Some(path) = explicit {
        let config = read_config(path)?;
        return Ok((config, ConfigSource::Explicit(path.to_path_buf())));
    }

    let discovered = paths.config_file();
    if discovered.is_file() {
        let config = read_config(&discovered)?;
        return Ok((config, ConfigSource::Discovered(discovered)));
    }

    debug!(path = %discovered.display(), "no configuration file; using defaults");
    Ok((default_config(), ConfigSource::Defaults))
}

pub fn default_config() -> FieldConfig {
    FieldConfig {
        version: 1,
        ..FieldConfig::default()
    }
}

fn read_config(path: &Path) -> Result<FieldConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read configuration {}", path.display()))?;
    let config = FieldConfig::from_toml_str(&raw)
        .with_context(|| format!("failed to load configuration {}", path.display()))?;
    debug!(path = %path.display(), "loaded configuration");
    Ok(config)
}

fn env_override(name: &str) -> Option<PathBuf> {
    match env::var_os(name) {
        Some(value) if !value.is_empty() => Some(PathBuf::from(value)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths_at(dir: &Path) -> AppPaths {
        AppPaths {
            config_dir: dir.to_path_buf(),
        }
    }

    #[test]
    fn missing_discovered_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let (config, source) = load_config(&paths_at(dir.path()), None).unwrap();
        assert_eq!(source, ConfigSource::Defaults);
        assert_eq!(config.version, 1);
        assert!(config.field.density.is_none());
    }

    #[test]
    fn discovered_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("config.toml"),
            "version = 1\n[field]\nhue = 30\n",
        )
        .unwrap();
        let (config, source) = load_config(&paths_at(dir.path()), None).unwrap();
        assert_eq!(source, ConfigSource::Discovered(dir.path().join("config.toml")));
        assert_eq!(config.field.hue, Some(30.0));
    }

    #[test]
    fn explicit_file_must_exist_and_validate() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths_at(dir.path());
        assert!(load_config(&paths, Some(&dir.path().join("missing.toml"))).is_err());

        let bad = dir.path().join("bad.toml");
        fs::write(&bad, "version = 1\n[field]\nbrightness = 3\n").unwrap();
        let err = load_config(&paths, Some(&bad)).unwrap_err();
        assert!(format!("{err:#}").contains("brightness"));
    }
}
