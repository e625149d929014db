use image::{Rgba, Rgba32FImage};

/// Edge length of the pre-rendered glow sprite in pixels.
pub const SPRITE_SIZE: u32 = 64;

/// Straight (non-premultiplied) colour with channels in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    /// Builds a colour from CSS-style HSLA: hue in degrees, the rest in `[0, 1]`.
    pub fn from_hsla(hue: f32, saturation: f32, lightness: f32, alpha: f32) -> Self {
        let h = hue.rem_euclid(360.0) / 360.0;
        let s = saturation.clamp(0.0, 1.0);
        let l = lightness.clamp(0.0, 1.0);
        let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let p = 2.0 * l - q;
        Self {
            r: hue_to_channel(p, q, h + 1.0 / 3.0),
            g: hue_to_channel(p, q, h),
            b: hue_to_channel(p, q, h - 1.0 / 3.0),
            a: alpha.clamp(0.0, 1.0),
        }
    }

    pub fn premultiplied(self) -> [f32; 4] {
        [self.r * self.a, self.g * self.a, self.b * self.a, self.a]
    }
}

fn hue_to_channel(p: f32, q: f32, t: f32) -> f32 {
    let t = t.rem_euclid(1.0);
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

/// Radial glow texture shared by every point of a field.
///
/// Pixels are stored premultiplied so the surface can composite them with a
/// single multiply-add per channel.
#[derive(Debug, Clone)]
pub struct GlowSprite {
    pixels: Rgba32FImage,
}

impl GlowSprite {
    pub fn new(hue: f32, brightness: f32) -> Self {
        let stops = [
            (0.0, Color::from_hsla(hue, 0.9, 0.85, 0.65 * brightness)),
            (0.5, Color::from_hsla(hue, 0.7, 0.7, 0.25 * brightness)),
            (1.0, Color::from_hsla(hue, 0.6, 0.6, 0.0)),
        ];
        let half = SPRITE_SIZE as f32 / 2.0;
        let pixels = Rgba32FImage::from_fn(SPRITE_SIZE, SPRITE_SIZE, |x, y| {
            let dx = x as f32 + 0.5 - half;
            let dy = y as f32 + 0.5 - half;
            let t = ((dx * dx + dy * dy).sqrt() / half).min(1.0);
            Rgba(gradient_at(&stops, t))
        });
        Self { pixels }
    }

    /// Premultiplied texel at `(x, y)`, clamped to the sprite bounds.
    pub fn texel(&self, x: u32, y: u32) -> [f32; 4] {
        let x = x.min(SPRITE_SIZE - 1);
        let y = y.min(SPRITE_SIZE - 1);
        self.pixels.get_pixel(x, y).0
    }
}

/// Interpolates gradient stops in premultiplied space.
fn gradient_at(stops: &[(f32, Color); 3], t: f32) -> [f32; 4] {
    for pair in stops.windows(2) {
        let (start, from) = pair[0];
        let (end, to) = pair[1];
        if t <= end {
            let span = (end - start).max(f32::EPSILON);
            let k = ((t - start) / span).clamp(0.0, 1.0);
            let a = from.premultiplied();
            let b = to.premultiplied();
            return std::array::from_fn(|i| a[i] + (b[i] - a[i]) * k);
        }
    }
    stops[stops.len() - 1].1.premultiplied()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn hsla_primaries() {
        let red = Color::from_hsla(0.0, 1.0, 0.5, 1.0);
        assert!(close(red.r, 1.0) && close(red.g, 0.0) && close(red.b, 0.0));
        let blue = Color::from_hsla(240.0, 1.0, 0.5, 0.5);
        assert!(close(blue.b, 1.0) && close(blue.r, 0.0) && close(blue.a, 0.5));
        let grey = Color::from_hsla(210.0, 0.0, 0.62, 1.0);
        assert!(close(grey.r, 0.62) && close(grey.g, 0.62) && close(grey.b, 0.62));
        let wrapped = Color::from_hsla(-120.0, 1.0, 0.5, 1.0);
        assert!(close(wrapped.b, 1.0));
    }

    #[test]
    fn glow_fades_from_centre_to_edge() {
        let sprite = GlowSprite::new(210.0, 1.0);
        let centre = sprite.texel(32, 32)[3];
        let middle = sprite.texel(48, 32)[3];
        let corner = sprite.texel(0, 0)[3];
        assert!(centre > middle && middle > corner);
        assert!(centre <= 0.65 + 1e-3);
        assert_eq!(corner, 0.0);
    }

    #[test]
    fn brightness_scales_glow() {
        let dim = GlowSprite::new(210.0, 0.5).texel(32, 32)[3];
        let bright = GlowSprite::new(210.0, 1.0).texel(32, 32)[3];
        assert!(close(dim * 2.0, bright));
    }
}
