//! Drawing surface abstraction and the CPU raster implementation.
//!
//! Callers always draw in logical pixels. The surface owns the mapping onto
//! its backing store, whose resolution is the logical size times the pixel
//! ratio.

use std::path::Path;

use anyhow::{Context, Result};
use image::RgbaImage;

use crate::sprite::{Color, GlowSprite, SPRITE_SIZE};

/// Logical size of a surface plus the scale of its backing store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
    pub pixel_ratio: f32,
}

impl SurfaceSize {
    pub fn new(width: u32, height: u32, pixel_ratio: f32) -> Self {
        Self {
            width,
            height,
            pixel_ratio,
        }
    }

    pub fn backing_width(&self) -> u32 {
        (self.width as f32 * self.pixel_ratio).floor() as u32
    }

    pub fn backing_height(&self) -> u32 {
        (self.height as f32 * self.pixel_ratio).floor() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.backing_width() == 0 || self.backing_height() == 0
    }
}

/// Filled circle in logical coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
}

/// Target the animation driver paints into.
pub trait DrawSurface {
    fn size(&self) -> SurfaceSize;
    /// Reallocates the backing store; previous contents are discarded.
    fn resize(&mut self, size: SurfaceSize);
    fn clear(&mut self);
    /// Composites `sprite` as a square of edge `extent` centred on `(x, y)`.
    fn draw_sprite(&mut self, sprite: &GlowSprite, x: f32, y: f32, extent: f32, alpha: f32);
    /// Fills the union of `circles` with `color` in one compositing pass.
    fn fill_circles(&mut self, circles: &[Circle], color: Color);
}

/// CPU surface storing premultiplied RGBA floats.
#[derive(Debug, Clone)]
pub struct RasterSurface {
    size: SurfaceSize,
    pixels: Vec<[f32; 4]>,
    coverage: Vec<f32>,
    touched: Vec<usize>,
}

impl RasterSurface {
    pub fn new(size: SurfaceSize) -> Self {
        let mut surface = Self {
            size,
            pixels: Vec::new(),
            coverage: Vec::new(),
            touched: Vec::new(),
        };
        surface.resize(size);
        surface
    }

    /// Premultiplied pixel at backing coordinates.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[f32; 4]> {
        if x >= self.size.backing_width() || y >= self.size.backing_height() {
            return None;
        }
        self.pixels
            .get(y as usize * self.size.backing_width() as usize + x as usize)
            .copied()
    }

    /// Converts the backing store into straight-alpha 8-bit RGBA.
    pub fn to_image(&self) -> RgbaImage {
        let width = self.size.backing_width();
        let height = self.size.backing_height();
        RgbaImage::from_fn(width, height, |x, y| {
            let [r, g, b, a] = self.pixels[y as usize * width as usize + x as usize];
            let unpremultiply = |c: f32| {
                if a > 0.0 {
                    (c / a).clamp(0.0, 1.0)
                } else {
                    0.0
                }
            };
            image::Rgba([
                to_byte(unpremultiply(r)),
                to_byte(unpremultiply(g)),
                to_byte(unpremultiply(b)),
                to_byte(a),
            ])
        })
    }

    /// Writes the current contents as a PNG, optionally over an opaque backdrop.
    pub fn save_png(&self, path: &Path, backdrop: Option<Color>) -> Result<()> {
        if self.size.is_empty() {
            anyhow::bail!(
                "cannot export empty {}x{} surface",
                self.size.width,
                self.size.height
            );
        }
        let mut image = self.to_image();
        if let Some(backdrop) = backdrop {
            flatten_onto(&mut image, &self.pixels, backdrop);
        }
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
        }
        image
            .save_with_format(path, image::ImageFormat::Png)
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::debug!(path = %path.display(), "exported frame");
        Ok(())
    }

    fn index(&self, x: usize, y: usize) -> usize {
        y * self.size.backing_width() as usize + x
    }

    fn blend(&mut self, index: usize, src: [f32; 4], alpha: f32) {
        let dst = &mut self.pixels[index];
        let keep = 1.0 - src[3] * alpha;
        for channel in 0..4 {
            dst[channel] = src[channel] * alpha + dst[channel] * keep;
        }
    }
}

fn to_byte(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn flatten_onto(image: &mut RgbaImage, premultiplied: &[[f32; 4]], backdrop: Color) {
    let back = [backdrop.r, backdrop.g, backdrop.b];
    for (pixel, src) in image.pixels_mut().zip(premultiplied) {
        let keep = 1.0 - src[3];
        for channel in 0..3 {
            pixel.0[channel] = to_byte(src[channel] + back[channel] * keep);
        }
        pixel.0[3] = 255;
    }
}

/// Backing-pixel bounds of a logical rectangle, clipped to the surface.
fn clip_span(start: f32, end: f32, limit: u32) -> Option<(usize, usize)> {
    let lo = start.floor().max(0.0);
    let hi = end.ceil().min(limit as f32);
    if lo.is_nan() || hi.is_nan() || hi <= lo {
        return None;
    }
    Some((lo as usize, hi as usize))
}

impl DrawSurface for RasterSurface {
    fn size(&self) -> SurfaceSize {
        self.size
    }

    fn resize(&mut self, size: SurfaceSize) {
        self.size = size;
        let len = size.backing_width() as usize * size.backing_height() as usize;
        self.pixels = vec![[0.0; 4]; len];
        self.coverage = vec![0.0; len];
        self.touched.clear();
    }

    fn clear(&mut self) {
        self.pixels.fill([0.0; 4]);
    }

    fn draw_sprite(&mut self, sprite: &GlowSprite, x: f32, y: f32, extent: f32, alpha: f32) {
        if !(extent > 0.0 && alpha > 0.0) || self.size.is_empty() {
            return;
        }
        let ratio = self.size.pixel_ratio;
        let left = (x - extent / 2.0) * ratio;
        let top = (y - extent / 2.0) * ratio;
        let side = extent * ratio;
        let Some((x0, x1)) = clip_span(left, left + side, self.size.backing_width()) else {
            return;
        };
        let Some((y0, y1)) = clip_span(top, top + side, self.size.backing_height()) else {
            return;
        };
        let alpha = alpha.min(1.0);
        let texels_per_pixel = SPRITE_SIZE as f32 / side;
        for py in y0..y1 {
            let v = (py as f32 + 0.5 - top) * texels_per_pixel;
            if v < 0.0 || v >= SPRITE_SIZE as f32 {
                continue;
            }
            for px in x0..x1 {
                let u = (px as f32 + 0.5 - left) * texels_per_pixel;
                if u < 0.0 || u >= SPRITE_SIZE as f32 {
                    continue;
                }
                let texel = sprite.texel(u as u32, v as u32);
                if texel[3] <= 0.0 {
                    continue;
                }
                let index = self.index(px, py);
                self.blend(index, texel, alpha);
            }
        }
    }

    fn fill_circles(&mut self, circles: &[Circle], color: Color) {
        if circles.is_empty() || color.a <= 0.0 || self.size.is_empty() {
            return;
        }
        let ratio = self.size.pixel_ratio;
        let width = self.size.backing_width();
        let height = self.size.backing_height();
        for circle in circles {
            let cx = circle.x * ratio;
            let cy = circle.y * ratio;
            let radius = circle.radius * ratio;
            if radius.is_nan() || radius <= 0.0 {
                continue;
            }
            let Some((x0, x1)) = clip_span(cx - radius - 1.0, cx + radius + 1.0, width) else {
                continue;
            };
            let Some((y0, y1)) = clip_span(cy - radius - 1.0, cy + radius + 1.0, height) else {
                continue;
            };
            for py in y0..y1 {
                for px in x0..x1 {
                    let dx = px as f32 + 0.5 - cx;
                    let dy = py as f32 + 0.5 - cy;
                    let covered = (radius - (dx * dx + dy * dy).sqrt() + 0.5).clamp(0.0, 1.0);
                    if covered <= 0.0 {
                        continue;
                    }
                    let index = self.index(px, py);
                    let slot = &mut self.coverage[index];
                    if *slot == 0.0 {
                        self.touched.push(index);
                    }
                    *slot = slot.max(covered);
                }
            }
        }

        let src = color.premultiplied();
        let touched = std::mem::take(&mut self.touched);
        for &index in &touched {
            let covered = std::mem::replace(&mut self.coverage[index], 0.0);
            self.blend(index, src, covered);
        }
        self.touched = touched;
        self.touched.clear();
    }
}
