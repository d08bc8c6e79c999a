//! Loading-screen overlay: title, uplink status, mission count and progress bar.

use glam::Vec2;
use renderer::font::{text_width, GLYPH_HEIGHT};
use renderer::{rgb8, with_alpha, Canvas, Rect, Rgba};

pub const HUD_TITLE: &str = "SPACE CAPITAL // FLEET UPLINK";

const ACCENT: Rgba = rgb8(100, 220, 255, 1.0);
const DIM: Rgba = rgb8(120, 140, 200, 1.0);
const PANEL: Rgba = rgb8(5, 8, 20, 0.55);

/// What the overlay shows this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HudState {
    /// 0..=1; 1 once the scene is ready.
    pub progress: f32,
    pub ready: bool,
    pub active_missions: usize,
    pub fleet_size: usize,
}

impl HudState {
    /// Status line for the current progress.
    pub fn status(&self) -> &'static str {
        if self.ready {
            "UPLINK READY"
        } else if self.progress < 0.34 {
            "ESTABLISHING UPLINK"
        } else if self.progress < 0.67 {
            "SYNCING TELEMETRY"
        } else {
            "CALIBRATING FLEET"
        }
    }
}

pub fn draw_hud<C: Canvas + ?Sized>(canvas: &mut C, state: &HudState) {
    let size = canvas.logical_size();
    let scale = if size.x < 480.0 { 1.0 } else { 2.0 };
    let line = GLYPH_HEIGHT * scale;

    let title_w = text_width(HUD_TITLE, scale);
    let title_pos = Vec2::new((size.x - title_w) * 0.5, size.y * 0.5 - line * 3.0);
    canvas.fill_rect(
        Rect::new(title_pos.x - 8.0, title_pos.y - 6.0, title_w + 16.0, line * 5.5),
        PANEL,
    );
    canvas.fill_text(title_pos, HUD_TITLE, scale, ACCENT);

    let status = state.status();
    let status_pos = Vec2::new((size.x - text_width(status, scale)) * 0.5, title_pos.y + line * 1.5);
    canvas.fill_text(status_pos, status, scale, with_alpha(ACCENT, 0.85));

    let missions = format!("ACTIVE MISSIONS: {}  FLEET: {}", state.active_missions, state.fleet_size);
    let small = (scale * 0.5).max(1.0);
    let missions_pos = Vec2::new((size.x - text_width(&missions, small)) * 0.5, status_pos.y + line * 1.4);
    canvas.fill_text(missions_pos, &missions, small, DIM);

    let bar_w = title_w.min(size.x - 32.0).max(0.0);
    let bar = Rect::new((size.x - bar_w) * 0.5, missions_pos.y + line * 1.2, bar_w, 4.0);
    canvas.fill_rect(bar, with_alpha(DIM, 0.35));
    let progress = if state.ready { 1.0 } else { state.progress.clamp(0.0, 1.0) };
    if progress > 0.0 {
        canvas.fill_rect(Rect::new(bar.x, bar.y, bar.w * progress, bar.h), ACCENT);
    }
}
