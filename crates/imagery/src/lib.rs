//! Asset-side helpers for pages that host the particle background.
//!
//! `AssetManifest` resolves loose image references to the files a build
//! actually produced, and `optimize_tree` produces those files: downscaled
//! WebP (and, with the `avif` feature, AVIF) siblings of every JPEG/PNG.
//!
//! ```text
//!  src/assets/**.{jpg,png} --optimize_tree--> *.webp / *.avif
//!            |                                     |
//!            +------------- AssetManifest::scan ---+
//!                                 |
//!                       resolve("covers/a.jpg")
//!                                 v
//!                  ImageVariants { avif, webp, original }
//! ```

mod manifest;
mod optimize;
mod scan;

pub use manifest::{normalize_base, AssetManifest, ImageVariants, DEFAULT_MOUNT};
pub use optimize::{
    is_up_to_date, optimize_file, optimize_tree, output_path, Conversion, ImageClass,
    OptimizeError, OptimizeOptions, OptimizeReport, OutputFormat, SkipReason, SOURCE_EXTENSIONS,
};
pub use scan::collect_files;
