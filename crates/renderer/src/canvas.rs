//! The 2D drawing surface the flight scene paints into.
//!
//! Coordinates are logical (CSS) pixels. Implementations apply their own
//! device-pixel-ratio scale set through [`Canvas::set_scale`].

use glam::Vec2;

use crate::sprite::SpriteImage;

/// RGBA color, components in 0..=1.
pub type Rgba = [f32; 4];

/// Identity of the on-page canvas element a surface draws into.
///
/// Two surfaces with the same id are the same element as far as the scene
/// registry is concerned.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanvasId(pub String);

impl CanvasId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for CanvasId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Build a color from 8-bit channels and a float alpha.
pub const fn rgb8(r: u8, g: u8, b: u8, a: f32) -> Rgba {
    [r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, a]
}

/// Same color with its alpha replaced.
pub fn with_alpha(color: Rgba, alpha: f32) -> Rgba {
    [color[0], color[1], color[2], alpha.clamp(0.0, 1.0)]
}

/// Axis-aligned rectangle in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }
}

/// Drawing operations used by the engine (a subset of a browser 2D context).
pub trait Canvas {
    fn id(&self) -> &CanvasId;

    /// Backing store size in device pixels.
    fn pixel_size(&self) -> (u32, u32);

    /// Reallocate the backing store. Clears the contents.
    fn resize(&mut self, px_width: u32, px_height: u32);

    /// Set the logical → device scale. Absolute, so repeated calls never compound.
    fn set_scale(&mut self, scale: f32);

    fn scale(&self) -> f32;

    /// Logical size: backing store divided by the current scale.
    fn logical_size(&self) -> Vec2 {
        let (w, h) = self.pixel_size();
        let s = self.scale().max(f32::EPSILON);
        Vec2::new(w as f32 / s, h as f32 / s)
    }

    fn fill_rect(&mut self, rect: Rect, color: Rgba);

    fn stroke_line(&mut self, from: Vec2, to: Vec2, width: f32, color: Rgba);

    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Rgba);

    fn stroke_circle(&mut self, center: Vec2, radius: f32, width: f32, color: Rgba);

    /// Radial gradient from `inner` at the center to `outer` at `radius`.
    fn fill_radial_gradient(&mut self, center: Vec2, radius: f32, inner: Rgba, outer: Rgba);

    fn fill_polygon(&mut self, points: &[Vec2], color: Rgba);

    /// Draw `image` centered on `center`, scaled to `size`, rotated by `rotation` radians.
    fn draw_image(&mut self, image: &SpriteImage, center: Vec2, size: Vec2, rotation: f32, alpha: f32);

    /// Draw text with its top-left corner at `pos`. `scale` 1.0 = 6x8 px glyph cells.
    fn fill_text(&mut self, pos: Vec2, text: &str, scale: f32, color: Rgba);
}
