//! CPU canvas backed by an `image::RgbaImage`.
//!
//! Shapes are shaded per pixel with a one-pixel antialiasing ramp; sprites are
//! sampled nearest-neighbour after inverse rotation. Good enough for headless
//! frame dumps and pixel-level tests, not meant to be fast.

use std::path::Path;

use glam::Vec2;
use image::RgbaImage;

use crate::canvas::{Canvas, CanvasId, Rect, Rgba};
use crate::font::{glyph, glyph_pixel, GLYPH_ADVANCE};
use crate::sprite::SpriteImage;

pub struct RasterCanvas {
    id: CanvasId,
    pixels: RgbaImage,
    scale: f32,
}

impl RasterCanvas {
    /// Transparent canvas of the given device size.
    pub fn new(id: CanvasId, px_width: u32, px_height: u32) -> Self {
        Self {
            id,
            pixels: RgbaImage::new(px_width.max(1), px_height.max(1)),
            scale: 1.0,
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Device pixel, (0,0,0,0) outside the canvas.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        if x < self.pixels.width() && y < self.pixels.height() {
            self.pixels.get_pixel(x, y).0
        } else {
            [0; 4]
        }
    }

    pub fn save_png(&self, path: &Path) -> image::ImageResult<()> {
        self.pixels.save_with_format(path, image::ImageFormat::Png)
    }

    fn blend(&mut self, x: u32, y: u32, color: Rgba, coverage: f32) {
        let a = (color[3] * coverage).clamp(0.0, 1.0);
        if a <= 0.0 {
            return;
        }
        let dst = self.pixels.get_pixel_mut(x, y);
        for c in 0..3 {
            let d = dst.0[c] as f32 / 255.0;
            let v = color[c].clamp(0.0, 1.0) * a + d * (1.0 - a);
            dst.0[c] = (v * 255.0).round() as u8;
        }
        let da = dst.0[3] as f32 / 255.0;
        dst.0[3] = ((a + da * (1.0 - a)) * 255.0).round() as u8;
    }

    /// Visit device pixels whose centers fall in the device-space box `[min, max]`.
    fn shade<F>(&mut self, min: Vec2, max: Vec2, mut shader: F)
    where
        F: FnMut(Vec2) -> Option<(Rgba, f32)>,
    {
        let (w, h) = (self.pixels.width() as f32, self.pixels.height() as f32);
        let x0 = min.x.floor().max(0.0) as u32;
        let y0 = min.y.floor().max(0.0) as u32;
        let x1 = max.x.ceil().min(w) as u32;
        let y1 = max.y.ceil().min(h) as u32;
        for y in y0..y1 {
            for x in x0..x1 {
                let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                if let Some((color, coverage)) = shader(p) {
                    self.blend(x, y, color, coverage);
                }
            }
        }
    }
}

fn segment_distance(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= f32::EPSILON {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

fn point_in_polygon(p: Vec2, poly: &[Vec2]) -> bool {
    let mut inside = false;
    let mut j = poly.len() - 1;
    for i in 0..poly.len() {
        let (a, b) = (poly[i], poly[j]);
        if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x {
            inside = !inside;
        }
        j = i;
    }
    inside
}

fn lerp_color(a: Rgba, b: Rgba, t: f32) -> Rgba {
    [
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        a[2] + (b[2] - a[2]) * t,
        a[3] + (b[3] - a[3]) * t,
    ]
}

impl Canvas for RasterCanvas {
    fn id(&self) -> &CanvasId {
        &self.id
    }

    fn pixel_size(&self) -> (u32, u32) {
        (self.pixels.width(), self.pixels.height())
    }

    fn resize(&mut self, px_width: u32, px_height: u32) {
        self.pixels = RgbaImage::new(px_width.max(1), px_height.max(1));
    }

    fn set_scale(&mut self, scale: f32) {
        self.scale = if scale.is_finite() && scale > 0.0 { scale } else { 1.0 };
    }

    fn scale(&self) -> f32 {
        self.scale
    }

    fn fill_rect(&mut self, rect: Rect, color: Rgba) {
        let s = self.scale;
        let min = Vec2::new(rect.x, rect.y) * s;
        let max = Vec2::new(rect.x + rect.w, rect.y + rect.h) * s;
        self.shade(min, max, |_| Some((color, 1.0)));
    }

    fn stroke_line(&mut self, from: Vec2, to: Vec2, width: f32, color: Rgba) {
        let s = self.scale;
        let (a, b) = (from * s, to * s);
        let half = (width * s * 0.5).max(0.5);
        let pad = Vec2::splat(half + 1.0);
        self.shade(a.min(b) - pad, a.max(b) + pad, |p| {
            let coverage = (half + 0.5 - segment_distance(p, a, b)).clamp(0.0, 1.0);
            (coverage > 0.0).then_some((color, coverage))
        });
    }

    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Rgba) {
        let s = self.scale;
        let c = center * s;
        let r = radius * s;
        let pad = Vec2::splat(r + 1.0);
        self.shade(c - pad, c + pad, |p| {
            let coverage = (r + 0.5 - p.distance(c)).clamp(0.0, 1.0);
            (coverage > 0.0).then_some((color, coverage))
        });
    }

    fn stroke_circle(&mut self, center: Vec2, radius: f32, width: f32, color: Rgba) {
        let s = self.scale;
        let c = center * s;
        let r = radius * s;
        let half = (width * s * 0.5).max(0.5);
        let pad = Vec2::splat(r + half + 1.0);
        self.shade(c - pad, c + pad, |p| {
            let coverage = (half + 0.5 - (p.distance(c) - r).abs()).clamp(0.0, 1.0);
            (coverage > 0.0).then_some((color, coverage))
        });
    }

    fn fill_radial_gradient(&mut self, center: Vec2, radius: f32, inner: Rgba, outer: Rgba) {
        let s = self.scale;
        let c = center * s;
        let r = (radius * s).max(f32::EPSILON);
        let pad = Vec2::splat(r);
        self.shade(c - pad, c + pad, |p| {
            let t = p.distance(c) / r;
            (t <= 1.0).then(|| (lerp_color(inner, outer, t), 1.0))
        });
    }

    fn fill_polygon(&mut self, points: &[Vec2], color: Rgba) {
        if points.len() < 3 {
            return;
        }
        let s = self.scale;
        let device: Vec<Vec2> = points.iter().map(|p| *p * s).collect();
        let (min, max) = device
            .iter()
            .fold((Vec2::splat(f32::MAX), Vec2::splat(f32::MIN)), |(lo, hi), p| (lo.min(*p), hi.max(*p)));
        self.shade(min, max, |p| point_in_polygon(p, &device).then_some((color, 1.0)));
    }

    fn draw_image(&mut self, image: &SpriteImage, center: Vec2, size: Vec2, rotation: f32, alpha: f32) {
        let s = self.scale;
        let c = center * s;
        let extent = size * s;
        if extent.x <= 0.0 || extent.y <= 0.0 || image.width() == 0 || image.height() == 0 {
            return;
        }
        let reach = Vec2::splat(extent.length() * 0.5 + 1.0);
        let (sin, cos) = (-rotation).sin_cos();
        let (iw, ih) = (image.width() as f32, image.height() as f32);
        self.shade(c - reach, c + reach, |p| {
            let d = p - c;
            let local = Vec2::new(d.x * cos - d.y * sin, d.x * sin + d.y * cos);
            let u = (local.x / extent.x + 0.5) * iw;
            let v = (local.y / extent.y + 0.5) * ih;
            if u < 0.0 || v < 0.0 || u >= iw || v >= ih {
                return None;
            }
            let px = image.pixel(u as u32, v as u32);
            let color = [
                px[0] as f32 / 255.0,
                px[1] as f32 / 255.0,
                px[2] as f32 / 255.0,
                px[3] as f32 / 255.0 * alpha,
            ];
            Some((color, 1.0))
        });
    }

    fn fill_text(&mut self, pos: Vec2, text: &str, scale: f32, color: Rgba) {
        let mut x = pos.x;
        for ch in text.chars() {
            let rows = glyph(ch);
            for gy in 0..7 {
                for gx in 0..5 {
                    if glyph_pixel(&rows, gx, gy) {
                        let rect = Rect::new(x + gx as f32 * scale, pos.y + gy as f32 * scale, scale, scale);
                        self.fill_rect(rect, color);
                    }
                }
            }
            x += GLYPH_ADVANCE * scale;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canvas(w: u32, h: u32) -> RasterCanvas {
        RasterCanvas::new(CanvasId::new("test"), w, h)
    }

    #[test]
    fn fill_rect_respects_scale() {
        let mut c = canvas(20, 20);
        c.set_scale(2.0);
        c.fill_rect(Rect::new(0.0, 0.0, 5.0, 5.0), [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(c.pixel(9, 9), [255, 0, 0, 255]);
        assert_eq!(c.pixel(10, 10), [0, 0, 0, 0]);
        assert_eq!(c.logical_size(), Vec2::new(10.0, 10.0));
    }

    #[test]
    fn low_alpha_fill_fades_rather_than_clears() {
        let mut c = canvas(4, 4);
        c.fill_rect(Rect::new(0.0, 0.0, 4.0, 4.0), [1.0, 1.0, 1.0, 1.0]);
        c.fill_rect(Rect::new(0.0, 0.0, 4.0, 4.0), [0.0, 0.0, 0.0, 0.25]);
        let px = c.pixel(1, 1);
        assert!(px[0] > 150 && px[0] < 255, "expected partial fade, got {:?}", px);
    }

    #[test]
    fn circle_covers_center_not_corners() {
        let mut c = canvas(21, 21);
        c.fill_circle(Vec2::new(10.5, 10.5), 5.0, [0.0, 1.0, 0.0, 1.0]);
        assert_eq!(c.pixel(10, 10)[1], 255);
        assert_eq!(c.pixel(0, 0), [0, 0, 0, 0]);
    }

    #[test]
    fn gradient_fades_toward_edge() {
        let mut c = canvas(41, 41);
        c.fill_radial_gradient(Vec2::new(20.5, 20.5), 20.0, [1.0, 1.0, 1.0, 1.0], [1.0, 1.0, 1.0, 0.0]);
        let center = c.pixel(20, 20)[3];
        let edge = c.pixel(20, 38)[3];
        assert!(center > edge);
    }

    #[test]
    fn polygon_fill_uses_even_odd_interior() {
        let mut c = canvas(10, 10);
        let tri = [Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0), Vec2::new(0.0, 10.0)];
        c.fill_polygon(&tri, [0.0, 0.0, 1.0, 1.0]);
        assert_eq!(c.pixel(1, 1)[2], 255);
        assert_eq!(c.pixel(9, 9), [0, 0, 0, 0]);
    }

    #[test]
    fn rotated_image_is_drawn_around_center() {
        let mut c = canvas(20, 20);
        let sprite = SpriteImage::solid(4, 4, [200, 100, 50, 255]);
        c.draw_image(&sprite, Vec2::new(10.0, 10.0), Vec2::new(8.0, 8.0), std::f32::consts::FRAC_PI_4, 1.0);
        assert_eq!(c.pixel(10, 10), [200, 100, 50, 255]);
        assert_eq!(c.pixel(0, 0), [0, 0, 0, 0]);
    }

    #[test]
    fn text_lights_glyph_pixels() {
        let mut c = canvas(12, 8);
        c.fill_text(Vec2::ZERO, "1", 1.0, [1.0, 1.0, 1.0, 1.0]);
        assert_eq!(c.pixel(2, 3)[0], 255);
        assert_eq!(c.pixel(0, 3), [0, 0, 0, 0]);
    }

    #[test]
    fn invalid_scale_falls_back_to_identity() {
        let mut c = canvas(4, 4);
        c.set_scale(f32::NAN);
        assert_eq!(c.scale(), 1.0);
        c.set_scale(0.0);
        assert_eq!(c.scale(), 1.0);
    }
}
