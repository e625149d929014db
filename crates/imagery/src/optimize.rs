//! Build-time conversion of source rasters into compressed derivatives.
//!
//! Every JPEG/PNG under the asset root gets sibling `.webp` (and optionally
//! `.avif`) files, downscaled to a per-class maximum width. Sources whose
//! derivatives are already newer are skipped, and a failing file is counted
//! without stopping the run.

use std::fmt;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageDecoder, ImageReader};
use serde::Serialize;

use crate::scan::collect_files;

pub const SOURCE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

#[derive(Debug, thiserror::Error)]
pub enum OptimizeError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to process image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("{0} output requested but this build was compiled without {0} support")]
    Unsupported(&'static str),
    #[error("failed to scan asset root: {0}")]
    Scan(String),
}

/// Purpose of an image, inferred from its path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageClass {
    Cover,
    Gallery,
    Thumb,
}

impl ImageClass {
    pub fn from_path(path: &Path) -> Self {
        let normalized = path.to_string_lossy().replace('\\', "/").to_lowercase();
        if normalized.contains("/covers/") || normalized.contains("/cover/") {
            Self::Cover
        } else if normalized.contains("/thumbs/")
            || normalized.contains("/thumb/")
            || normalized.contains("preview")
        {
            Self::Thumb
        } else {
            Self::Gallery
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Webp,
    Avif,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Webp => "webp",
            OutputFormat::Avif => "avif",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptimizeOptions {
    pub webp: bool,
    pub avif: bool,
    /// AVIF quality in `1..=100`.
    pub avif_quality: u8,
    /// AVIF encoder speed in `1..=10`; lower is slower and smaller.
    pub avif_speed: u8,
    pub max_width_cover: u32,
    pub max_width_gallery: u32,
    pub max_width_thumb: u32,
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        Self {
            webp: true,
            avif: false,
            avif_quality: 48,
            avif_speed: 5,
            max_width_cover: 1600,
            max_width_gallery: 1600,
            max_width_thumb: 900,
        }
    }
}

impl OptimizeOptions {
    pub fn max_width(&self, class: ImageClass) -> u32 {
        match class {
            ImageClass::Cover => self.max_width_cover,
            ImageClass::Gallery => self.max_width_gallery,
            ImageClass::Thumb => self.max_width_thumb,
        }
    }

    pub fn outputs(&self) -> Vec<OutputFormat> {
        let mut outputs = Vec::new();
        if self.webp {
            outputs.push(OutputFormat::Webp);
        }
        if self.avif {
            outputs.push(OutputFormat::Avif);
        }
        outputs
    }

    /// Rejects requests this build cannot satisfy before any file is touched.
    pub fn check_supported(&self) -> Result<(), OptimizeError> {
        if self.avif && !cfg!(feature = "avif") {
            return Err(OptimizeError::Unsupported("avif"));
        }
        Ok(())
    }
}

/// What happened to a single source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conversion {
    Skipped(SkipReason),
    Converted(Vec<PathBuf>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoOutputsEnabled,
    UpToDate,
}

/// Totals for one optimizer run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OptimizeReport {
    pub inputs: usize,
    pub converted: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl fmt::Display for OptimizeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "inputs={}, converted={}, skipped={}, failed={}",
            self.inputs, self.converted, self.skipped, self.failed
        )
    }
}

/// Sibling path of `source` with the extension of `format`.
pub fn output_path(source: &Path, format: OutputFormat) -> PathBuf {
    source.with_extension(format.extension())
}

/// True when `output` exists and was modified no earlier than `source`.
pub fn is_up_to_date(source: &Path, output: &Path) -> bool {
    let modified = |path: &Path| fs::metadata(path).and_then(|meta| meta.modified());
    match (modified(source), modified(output)) {
        (Ok(source), Ok(output)) => output >= source,
        _ => false,
    }
}

pub fn optimize_file(
    source: &Path,
    options: &OptimizeOptions,
) -> Result<Conversion, OptimizeError> {
    let outputs = options.outputs();
    if outputs.is_empty() {
        return Ok(Conversion::Skipped(SkipReason::NoOutputsEnabled));
    }
    if outputs
        .iter()
        .all(|format| is_up_to_date(source, &output_path(source, *format)))
    {
        return Ok(Conversion::Skipped(SkipReason::UpToDate));
    }

    let class = ImageClass::from_path(source);
    let max_width = options.max_width(class);
    let mut image = load_oriented(source)?;
    if image.width() > max_width {
        let (from_w, from_h) = (image.width(), image.height());
        image = image.resize(max_width, u32::MAX, FilterType::Lanczos3);
        tracing::debug!(
            path = %source.display(),
            ?class,
            from = format_args!("{from_w}x{from_h}"),
            to = format_args!("{}x{}", image.width(), image.height()),
            "downscaled"
        );
    }

    let mut written = Vec::with_capacity(outputs.len());
    for format in outputs {
        let target = output_path(source, format);
        encode(&image, format, &target, options)?;
        written.push(target);
    }
    Ok(Conversion::Converted(written))
}

/// Converts every source under `root`, logging failures per file.
pub fn optimize_tree(
    root: &Path,
    options: &OptimizeOptions,
) -> Result<OptimizeReport, OptimizeError> {
    options.check_supported()?;
    let sources = collect_files(root, SOURCE_EXTENSIONS)
        .map_err(|err| OptimizeError::Scan(format!("{err:#}")))?;

    let mut report = OptimizeReport {
        inputs: sources.len(),
        ..OptimizeReport::default()
    };
    for source in &sources {
        match optimize_file(source, options) {
            Ok(Conversion::Skipped(reason)) => {
                tracing::debug!(path = %source.display(), ?reason, "skipped");
                report.skipped += 1;
            }
            Ok(Conversion::Converted(outputs)) => {
                tracing::info!(
                    path = %source.display(),
                    outputs = outputs.len(),
                    "converted"
                );
                report.converted += 1;
            }
            Err(err) => {
                tracing::warn!(path = %source.display(), error = %err, "conversion failed");
                report.failed += 1;
            }
        }
    }

    tracing::info!(
        inputs = report.inputs,
        converted = report.converted,
        skipped = report.skipped,
        failed = report.failed,
        webp = options.webp,
        avif = options.avif,
        "image optimization done"
    );
    Ok(report)
}

fn load_oriented(path: &Path) -> Result<DynamicImage, OptimizeError> {
    let image_err = |source| OptimizeError::Image {
        path: path.to_path_buf(),
        source,
    };
    let reader = ImageReader::open(path).map_err(|source| OptimizeError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = reader.with_guessed_format().map_err(|source| OptimizeError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut decoder = reader.into_decoder().map_err(image_err)?;
    let orientation = decoder.orientation().map_err(image_err)?;
    let mut image = DynamicImage::from_decoder(decoder).map_err(image_err)?;
    image.apply_orientation(orientation);
    Ok(image)
}

fn encode(
    image: &DynamicImage,
    format: OutputFormat,
    target: &Path,
    options: &OptimizeOptions,
) -> Result<(), OptimizeError> {
    let io_err = |source| OptimizeError::Io {
        path: target.to_path_buf(),
        source,
    };
    let image_err = |source| OptimizeError::Image {
        path: target.to_path_buf(),
        source,
    };
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let file = File::create(target).map_err(io_err)?;
    let writer = BufWriter::new(file);

    // The WebP encoder only accepts 8-bit RGB(A).
    let pixels = if image.color().has_alpha() {
        DynamicImage::ImageRgba8(image.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(image.to_rgb8())
    };

    match format {
        OutputFormat::Webp => pixels
            .write_with_encoder(WebPEncoder::new_lossless(writer))
            .map_err(image_err),
        OutputFormat::Avif => encode_avif(&pixels, writer, options).map_err(image_err),
    }
}

#[cfg(feature = "avif")]
fn encode_avif(
    image: &DynamicImage,
    writer: BufWriter<File>,
    options: &OptimizeOptions,
) -> Result<(), image::ImageError> {
    let encoder = image::codecs::avif::AvifEncoder::new_with_speed_quality(
        writer,
        options.avif_speed.clamp(1, 10),
        options.avif_quality.clamp(1, 100),
    );
    image.write_with_encoder(encoder)
}

#[cfg(not(feature = "avif"))]
fn encode_avif(
    _image: &DynamicImage,
    _writer: BufWriter<File>,
    _options: &OptimizeOptions,
) -> Result<(), image::ImageError> {
    Err(image::ImageError::Unsupported(
        image::error::UnsupportedError::from_format_and_kind(
            image::error::ImageFormatHint::Exact(image::ImageFormat::Avif),
            image::error::UnsupportedErrorKind::Format(image::error::ImageFormatHint::Exact(
                image::ImageFormat::Avif,
            )),
        ),
    ))
}
