//! Lookup table from asset references to the image files that exist on disk.
//!
//! Pages refer to images loosely (`covers/a.jpg`, `assets/covers/a`,
//! `/src/assets/covers/a.png`). The manifest maps every scanned file to a
//! canonical key under a mount prefix so those references resolve to the
//! AVIF, WebP, and original variants that were actually produced.
//!
//! Types:
//!
//! - `AssetManifest` owns the key → path table. It is built explicitly by
//!   `scan` (or `insert` in tests) and handed to whoever resolves images.
//! - `ImageVariants` is the resolution result with the display fallback order.
//!
//! Functions:
//!
//! - `normalize_base` canonicalises a reference into an extension-less key
//!   under a mount.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Serialize;

use crate::scan::collect_files;

/// Key prefix used for assets in the original page layout.
pub const DEFAULT_MOUNT: &str = "/src/assets";

const MANIFEST_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "avif", "webp"];
const ORIGINAL_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AssetManifest {
    #[serde(skip)]
    mount: String,
    entries: BTreeMap<String, PathBuf>,
}

impl Default for AssetManifest {
    fn default() -> Self {
        Self::with_mount(DEFAULT_MOUNT)
    }
}

/// Variants available for one asset reference.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ImageVariants {
    pub avif: Option<PathBuf>,
    pub webp: Option<PathBuf>,
    pub original: Option<PathBuf>,
}

impl ImageVariants {
    /// Best single file to show: the original, then AVIF, then WebP.
    pub fn preferred(&self) -> Option<&Path> {
        self.original
            .as_deref()
            .or(self.avif.as_deref())
            .or(self.webp.as_deref())
    }

    /// Like `preferred`, falling back to the unresolved reference itself.
    pub fn display_source(&self, reference: &str) -> String {
        self.preferred()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| reference.to_string())
    }
}

impl AssetManifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty manifest whose keys and lookups live under `mount`.
    pub fn with_mount(mount: &str) -> Self {
        Self {
            mount: normalize_mount(mount),
            entries: BTreeMap::new(),
        }
    }

    pub fn mount(&self) -> &str {
        &self.mount
    }

    /// Records every image under `root` with a key of `{mount}/{relative path}`.
    pub fn scan(root: &Path, mount: &str) -> Result<Self> {
        let mut manifest = Self::with_mount(mount);
        for path in collect_files(root, MANIFEST_EXTENSIONS)? {
            let Ok(relative) = path.strip_prefix(root) else {
                continue;
            };
            let relative = relative
                .components()
                .map(|part| part.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            let key = format!("{}/{relative}", manifest.mount);
            manifest.insert(key, path);
        }
        tracing::debug!(
            root = %root.display(),
            entries = manifest.len(),
            "scanned asset manifest"
        );
        Ok(manifest)
    }

    pub fn insert(&mut self, key: impl Into<String>, path: impl Into<PathBuf>) {
        self.entries.insert(key.into(), path.into());
    }

    pub fn get(&self, key: &str) -> Option<&Path> {
        self.entries.get(key).map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.entries)
    }

    pub fn resolve(&self, reference: &str) -> ImageVariants {
        if reference.trim().is_empty() {
            return ImageVariants::default();
        }
        let base = normalize_base(reference, &self.mount);
        let lookup = |ext: &str| self.get(&format!("{base}.{ext}")).map(Path::to_path_buf);

        let original = match original_extension(reference) {
            Some(ext) => lookup(ext),
            None => ORIGINAL_EXTENSIONS.iter().find_map(|ext| lookup(*ext)),
        };

        ImageVariants {
            avif: lookup("avif"),
            webp: lookup("webp"),
            original,
        }
    }
}

/// Canonical extension-less key for an asset reference under `mount`.
///
/// A reference that already carries the mount keeps it; anything else is
/// taken as relative to the mount. For the default mount, `assets/x` is
/// also accepted as shorthand for `src/assets/x`.
pub fn normalize_base(reference: &str, mount: &str) -> String {
    let mount = normalize_mount(mount);
    let raw = reference.replace('\\', "/");
    let raw = raw.trim_start_matches('/');
    let stem = strip_extension(raw);
    let mounted = mount.trim_start_matches('/');
    if mounted.is_empty() {
        return format!("/{stem}");
    }
    match stem.strip_prefix(mounted) {
        Some(rest) if rest.starts_with('/') => return format!("/{stem}"),
        _ => {}
    }
    if mount == DEFAULT_MOUNT && stem.starts_with("assets/") {
        return format!("/src/{stem}");
    }
    format!("{mount}/{stem}")
}

/// `/`-led mount without a trailing slash; empty for the root mount.
fn normalize_mount(mount: &str) -> String {
    let trimmed = mount.trim().replace('\\', "/");
    let trimmed = trimmed.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

fn strip_extension(path: &str) -> &str {
    match path.rfind('.') {
        Some(dot)
            if dot + 1 < path.len()
                && path[dot + 1..].chars().all(|ch| ch.is_ascii_alphanumeric()) =>
        {
            &path[..dot]
        }
        _ => path,
    }
}

/// Extension of `reference` when it names an original raster format, case preserved.
fn original_extension(reference: &str) -> Option<&str> {
    let dot = reference.rfind('.')?;
    let ext = &reference[dot + 1..];
    ORIGINAL_EXTENSIONS
        .iter()
        .any(|known| ext.eq_ignore_ascii_case(known))
        .then_some(ext)
}
