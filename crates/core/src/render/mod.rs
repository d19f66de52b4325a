//! Drawing surface abstraction and a software rasterizer behind it.

use std::path::Path;

use image::{Rgba as Pixel, RgbaImage};

use crate::Result;

/// Straight-alpha colour with `alpha` in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub alpha: f32,
}

impl Rgba {
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    pub const LIME: Self = Self::rgb(0, 255, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, alpha: 1.0 }
    }

    pub const fn with_alpha(self, alpha: f32) -> Self {
        Self { alpha, ..self }
    }

    /// Builds an opaque colour from hue in degrees (any value, wrapped),
    /// saturation and lightness in `[0, 1]`.
    pub fn hsl(hue: f32, saturation: f32, lightness: f32) -> Self {
        let h = hue.rem_euclid(360.0) / 360.0;
        let s = saturation.clamp(0.0, 1.0);
        let l = lightness.clamp(0.0, 1.0);

        let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
        let x = c * (1.0 - ((h * 6.0) % 2.0 - 1.0).abs());
        let m = l - c / 2.0;

        let (r, g, b) = match (h * 6.0) as u32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };

        let channel = |v: f32| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
        Self::rgb(channel(r), channel(g), channel(b))
    }
}

/// 2D surface the visualizers paint on. Coordinates are in pixels with the
/// origin at the top-left corner; anything outside the surface is clipped.
pub trait Canvas {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    /// Changes the surface size. Content is discarded.
    fn resize(&mut self, width: u32, height: u32);
    /// Hard clear to transparent black.
    fn clear(&mut self);
    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Rgba);
    fn stroke_line(&mut self, from: (f32, f32), to: (f32, f32), width: f32, color: Rgba);
    fn fill_circle(&mut self, center: (f32, f32), radius: f32, color: Rgba);

    fn stroke_polyline(&mut self, points: &[(f32, f32)], width: f32, color: Rgba) {
        for pair in points.windows(2) {
            self.stroke_line(pair[0], pair[1], width, color);
        }
    }

    /// Partially transparent full-surface fill so earlier frames fade out.
    fn fade(&mut self, alpha: f32) {
        let (w, h) = (self.width() as f32, self.height() as f32);
        self.fill_rect(0.0, 0.0, w, h, Rgba::BLACK.with_alpha(alpha));
    }
}

/// Software canvas backed by an RGBA image buffer.
#[derive(Debug, Clone)]
pub struct PixelCanvas {
    image: RgbaImage,
}

impl PixelCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width.max(1), height.max(1)),
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        self.image.get_pixel_checked(x, y).map(|p| p.0)
    }

    /// Encodes the current content as a PNG file.
    pub fn save_png(&self, path: &Path) -> Result<()> {
        self.image.save(path)?;
        Ok(())
    }

    fn blend(&mut self, x: u32, y: u32, color: Rgba) {
        let a = color.alpha.clamp(0.0, 1.0);
        if a <= 0.0 {
            return;
        }
        let Some(pixel) = self.image.get_pixel_mut_checked(x, y) else {
            return;
        };

        let [r, g, b, dst_a] = pixel.0;
        let dst_alpha = f32::from(dst_a) / 255.0;
        let out_alpha = a + dst_alpha * (1.0 - a);
        let mix = |src: u8, dst: u8| -> u8 {
            if out_alpha <= 0.0 {
                return 0;
            }
            let value = (f32::from(src) * a + f32::from(dst) * dst_alpha * (1.0 - a)) / out_alpha;
            value.round().clamp(0.0, 255.0) as u8
        };

        *pixel = Pixel([
            mix(color.r, r),
            mix(color.g, g),
            mix(color.b, b),
            (out_alpha * 255.0).round() as u8,
        ]);
    }

    /// Pixel index range covering `[start, end)` clipped to `limit`.
    fn span(start: f32, end: f32, limit: u32) -> std::ops::Range<u32> {
        let lo = start.floor().max(0.0);
        let hi = end.ceil().min(limit as f32);
        if !(lo < hi) {
            return 0..0;
        }
        lo as u32..hi as u32
    }
}

impl Canvas for PixelCanvas {
    fn width(&self) -> u32 {
        self.image.width()
    }

    fn height(&self) -> u32 {
        self.image.height()
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.image = RgbaImage::new(width.max(1), height.max(1));
    }

    fn clear(&mut self) {
        self.image.pixels_mut().for_each(|p| *p = Pixel([0, 0, 0, 0]));
    }

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Rgba) {
        let (x0, x1) = if width < 0.0 { (x + width, x) } else { (x, x + width) };
        let (y0, y1) = if height < 0.0 { (y + height, y) } else { (y, y + height) };

        for py in Self::span(y0, y1, self.height()) {
            for px in Self::span(x0, x1, self.width()) {
                let (cx, cy) = (px as f32 + 0.5, py as f32 + 0.5);
                if cx >= x0 && cx < x1 && cy >= y0 && cy < y1 {
                    self.blend(px, py, color);
                }
            }
        }
    }

    fn stroke_line(&mut self, from: (f32, f32), to: (f32, f32), width: f32, color: Rgba) {
        let half = (width.max(1.0)) / 2.0;
        let (ax, ay) = from;
        let (bx, by) = to;
        if ![ax, ay, bx, by].iter().all(|v| v.is_finite()) {
            return;
        }

        let (dx, dy) = (bx - ax, by - ay);
        let len_sq = dx * dx + dy * dy;

        let xs = Self::span(ax.min(bx) - half, ax.max(bx) + half, self.width());
        let ys = Self::span(ay.min(by) - half, ay.max(by) + half, self.height());

        for py in ys {
            for px in xs.clone() {
                let (cx, cy) = (px as f32 + 0.5, py as f32 + 0.5);
                let t = if len_sq > 0.0 {
                    (((cx - ax) * dx + (cy - ay) * dy) / len_sq).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                let (nx, ny) = (ax + t * dx - cx, ay + t * dy - cy);
                if nx * nx + ny * ny <= half * half {
                    self.blend(px, py, color);
                }
            }
        }
    }

    fn fill_circle(&mut self, center: (f32, f32), radius: f32, color: Rgba) {
        let (cx, cy) = center;
        if !(cx.is_finite() && cy.is_finite() && radius > 0.0) {
            return;
        }

        let xs = Self::span(cx - radius, cx + radius, self.width());
        let ys = Self::span(cy - radius, cy + radius, self.height());
        for py in ys {
            for px in xs.clone() {
                let (dx, dy) = (px as f32 + 0.5 - cx, py as f32 + 0.5 - cy);
                if dx * dx + dy * dy <= radius * radius {
                    self.blend(px, py, color);
                }
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hsl_primaries() {
        assert_eq!(Rgba::hsl(0.0, 1.0, 0.5), Rgba::rgb(255, 0, 0));
        assert_eq!(Rgba::hsl(120.0, 1.0, 0.5), Rgba::rgb(0, 255, 0));
        assert_eq!(Rgba::hsl(240.0, 1.0, 0.5), Rgba::rgb(0, 0, 255));
        assert_eq!(Rgba::hsl(480.0, 1.0, 0.5), Rgba::rgb(0, 255, 0));
    }

    #[test]
    fn fill_rect_is_clipped_to_surface() {
        let mut canvas = PixelCanvas::new(10, 10);
        canvas.fill_rect(-5.0, 8.0, 100.0, 100.0, Rgba::rgb(255, 0, 0));

        assert_eq!(canvas.pixel(0, 9), Some([255, 0, 0, 255]));
        assert_eq!(canvas.pixel(9, 8), Some([255, 0, 0, 255]));
        assert_eq!(canvas.pixel(0, 7), Some([0, 0, 0, 0]));
    }

    #[test]
    fn fade_darkens_previous_content() {
        let mut canvas = PixelCanvas::new(4, 4);
        canvas.fill_rect(0.0, 0.0, 4.0, 4.0, Rgba::rgb(200, 200, 200));
        canvas.fade(0.5);

        let [r, _, _, a] = canvas.pixel(1, 1).unwrap();
        assert_eq!(r, 100);
        assert_eq!(a, 255);
    }

    #[test]
    fn lines_and_circles_touch_expected_pixels() {
        let mut canvas = PixelCanvas::new(20, 20);
        canvas.stroke_line((0.0, 10.0), (20.0, 10.0), 2.0, Rgba::LIME);
        assert_eq!(canvas.pixel(5, 10), Some([0, 255, 0, 255]));
        assert_eq!(canvas.pixel(5, 2), Some([0, 0, 0, 0]));

        canvas.clear();
        canvas.fill_circle((5.0, 5.0), 2.0, Rgba::rgb(0, 0, 255));
        assert_eq!(canvas.pixel(5, 5), Some([0, 0, 255, 255]));
        assert_eq!(canvas.pixel(9, 9), Some([0, 0, 0, 0]));
    }
}
