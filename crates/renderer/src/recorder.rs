//! Canvas that records draw calls instead of rasterizing them.

use glam::Vec2;

use crate::canvas::{Canvas, CanvasId, Rect, Rgba};
use crate::sprite::SpriteImage;

/// One recorded draw call.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    FillRect { rect: Rect, color: Rgba },
    Line { from: Vec2, to: Vec2, width: f32, color: Rgba },
    FillCircle { center: Vec2, radius: f32, color: Rgba },
    StrokeCircle { center: Vec2, radius: f32, width: f32, color: Rgba },
    RadialGradient { center: Vec2, radius: f32, inner: Rgba, outer: Rgba },
    Polygon { points: Vec<Vec2>, color: Rgba },
    Image { center: Vec2, size: Vec2, rotation: f32, alpha: f32 },
    Text { pos: Vec2, text: String, scale: f32, color: Rgba },
}

pub struct RecordingCanvas {
    id: CanvasId,
    px_size: (u32, u32),
    scale: f32,
    /// Number of `set_scale` calls, to check resize handling.
    pub scale_calls: usize,
    pub commands: Vec<DrawCommand>,
}

impl RecordingCanvas {
    pub fn new(id: CanvasId, px_width: u32, px_height: u32) -> Self {
        Self {
            id,
            px_size: (px_width, px_height),
            scale: 1.0,
            scale_calls: 0,
            commands: Vec::new(),
        }
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn images(&self) -> usize {
        self.count(|c| matches!(c, DrawCommand::Image { .. }))
    }

    pub fn texts(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&DrawCommand) -> bool) -> usize {
        self.commands.iter().filter(|c| pred(c)).count()
    }
}

impl Canvas for RecordingCanvas {
    fn id(&self) -> &CanvasId {
        &self.id
    }

    fn pixel_size(&self) -> (u32, u32) {
        self.px_size
    }

    fn resize(&mut self, px_width: u32, px_height: u32) {
        self.px_size = (px_width, px_height);
    }

    fn set_scale(&mut self, scale: f32) {
        self.scale = scale;
        self.scale_calls += 1;
    }

    fn scale(&self) -> f32 {
        self.scale
    }

    fn fill_rect(&mut self, rect: Rect, color: Rgba) {
        self.commands.push(DrawCommand::FillRect { rect, color });
    }

    fn stroke_line(&mut self, from: Vec2, to: Vec2, width: f32, color: Rgba) {
        self.commands.push(DrawCommand::Line { from, to, width, color });
    }

    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Rgba) {
        self.commands.push(DrawCommand::FillCircle { center, radius, color });
    }

    fn stroke_circle(&mut self, center: Vec2, radius: f32, width: f32, color: Rgba) {
        self.commands.push(DrawCommand::StrokeCircle { center, radius, width, color });
    }

    fn fill_radial_gradient(&mut self, center: Vec2, radius: f32, inner: Rgba, outer: Rgba) {
        self.commands.push(DrawCommand::RadialGradient { center, radius, inner, outer });
    }

    fn fill_polygon(&mut self, points: &[Vec2], color: Rgba) {
        self.commands.push(DrawCommand::Polygon { points: points.to_vec(), color });
    }

    fn draw_image(&mut self, _image: &SpriteImage, center: Vec2, size: Vec2, rotation: f32, alpha: f32) {
        self.commands.push(DrawCommand::Image { center, size, rotation, alpha });
    }

    fn fill_text(&mut self, pos: Vec2, text: &str, scale: f32, color: Rgba) {
        self.commands.push(DrawCommand::Text {
            pos,
            text: text.to_string(),
            scale,
            color,
        });
    }
}
