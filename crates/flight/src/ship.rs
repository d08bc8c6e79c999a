//! One animated ship: spawn, per-frame motion and drawing.

use std::collections::VecDeque;
use std::f32::consts::{FRAC_PI_2, PI, TAU};

use glam::Vec2;
use rand::Rng;
use renderer::{rgb8, with_alpha, Canvas, Rgba, SpriteHandle};

use crate::config::{ModeConfig, ShipTuning};
use crate::depth::{sample_range, DepthBand, DepthBandTable};
use crate::record::ShipRecord;
use crate::upgrades::UpgradeTier;

/// Visual class, resolved once from the record's flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShipType {
    Benchmark,
    Support,
    Mission,
    Elite,
    Normal,
}

/// Color and relative size of a ship class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShipStyle {
    pub color: Rgba,
    pub trail: Rgba,
    pub size: f32,
}

impl ShipType {
    /// Precedence: benchmark > support > mission > elite > normal.
    pub fn classify(record: &ShipRecord) -> Self {
        if record.is_benchmark {
            ShipType::Benchmark
        } else if record.is_support {
            ShipType::Support
        } else if record.has_mission {
            ShipType::Mission
        } else if record.is_elite {
            ShipType::Elite
        } else {
            ShipType::Normal
        }
    }

    pub fn style(self) -> ShipStyle {
        match self {
            ShipType::Benchmark => ShipStyle {
                color: rgb8(255, 214, 102, 1.0),
                trail: rgb8(255, 196, 64, 1.0),
                size: 1.25,
            },
            ShipType::Support => ShipStyle {
                color: rgb8(120, 230, 160, 1.0),
                trail: rgb8(80, 200, 130, 1.0),
                size: 0.85,
            },
            ShipType::Mission => ShipStyle {
                color: rgb8(255, 140, 66, 1.0),
                trail: rgb8(255, 110, 40, 1.0),
                size: 1.1,
            },
            ShipType::Elite => ShipStyle {
                color: rgb8(100, 220, 255, 1.0),
                trail: rgb8(60, 180, 255, 1.0),
                size: 1.15,
            },
            ShipType::Normal => ShipStyle {
                color: rgb8(170, 190, 230, 1.0),
                trail: rgb8(120, 140, 200, 1.0),
                size: 1.0,
            },
        }
    }

    /// Elite and mission ships lead formations.
    pub fn is_leader(self) -> bool {
        matches!(self, ShipType::Elite | ShipType::Mission)
    }
}

/// Temporary steering assignment toward a shared point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormationSlot {
    pub target: Vec2,
    /// Proportional gain per nominal frame.
    pub gain: f32,
    pub remaining_ms: f32,
    /// Speed cap while steering, as a multiple of cruise speed.
    pub max_speed_mult: f32,
}

/// What a ship needs from its scene at spawn time.
pub struct SpawnContext<'a> {
    pub bounds: Vec2,
    pub mode: &'a ModeConfig,
    pub tuning: &'a ShipTuning,
    pub bands: &'a DepthBandTable,
}

/// Per-frame drawing inputs shared by every ship.
#[derive(Debug, Clone, Copy)]
pub struct DrawParams<'a> {
    /// Opacity for ships without a depth band.
    pub intensity: f32,
    pub glow_intensity: f32,
    pub focused: Option<&'a str>,
    /// Extra glow from progression, fraction of the base radius.
    pub glow_boost: f32,
}

const MISSION_RING: Rgba = rgb8(255, 140, 66, 1.0);
const UPGRADE_RING: Rgba = rgb8(255, 214, 102, 1.0);
const ELITE_AURA: Rgba = rgb8(100, 220, 255, 1.0);
const SUPPORT_CHEVRON: Rgba = rgb8(120, 230, 160, 1.0);

#[derive(Debug, Clone)]
pub struct Ship {
    pub ticker: String,
    pub kind: ShipType,
    pub has_mission: bool,
    pub is_elite: bool,
    pub is_support: bool,
    pub upgrade: UpgradeTier,

    pub pos: Vec2,
    pub vel: Vec2,
    pub rotation: f32,
    pub rotation_target: f32,
    /// Recent positions, newest first.
    pub trail: VecDeque<Vec2>,
    pub max_trail: usize,

    pub depth_band: Option<DepthBand>,
    pub band_scale: f32,
    pub band_opacity: Option<f32>,
    /// Motion/size parallax for ships without a band; 1.0 for banded ships.
    pub depth: f32,

    pub wobble_phase: f32,
    pub wobble_speed: f32,
    pub wobble_amount: f32,

    pub speed_mult: f32,
    pub glow_mult: f32,
    pub cruise_speed: f32,
    pub formation: Option<FormationSlot>,

    damage: f32,
    margin: f32,
    rotation_smoothing: f32,
    sprite_size: f32,
    sprite: Option<SpriteHandle>,
}

/// Wrap an angle into (-PI, PI].
fn wrap_angle(a: f32) -> f32 {
    let wrapped = (a + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI {
        wrapped + TAU
    } else {
        wrapped
    }
}

/// Wrap a coordinate into `[-margin, max + margin]`.
fn wrap_axis(v: f32, max: f32, margin: f32) -> f32 {
    let lo = -margin;
    let hi = max + margin;
    if !v.is_finite() {
        return max * 0.5;
    }
    if v < lo || v > hi {
        lo + (v - lo).rem_euclid(hi - lo)
    } else {
        v
    }
}

impl Ship {
    pub fn new<R: Rng + ?Sized>(
        record: &ShipRecord,
        band: Option<DepthBand>,
        sprite: Option<SpriteHandle>,
        ctx: &SpawnContext<'_>,
        rng: &mut R,
    ) -> Self {
        let (w, h) = (ctx.bounds.x.max(1.0), ctx.bounds.y.max(1.0));
        let tuning = ctx.tuning;
        let kind = ShipType::classify(record);

        let off = tuning.spawn_offset;
        let pos = match rng.gen_range(0..4) {
            0 => Vec2::new(rng.gen::<f32>() * w, -off),
            1 => Vec2::new(w + off, rng.gen::<f32>() * h),
            2 => Vec2::new(rng.gen::<f32>() * w, h + off),
            _ => Vec2::new(-off, rng.gen::<f32>() * h),
        };

        let visual = record.visual.unwrap_or_default();
        let speed_mult = 0.5 + record.fit / 100.0;
        let trail_mult = 0.6 + record.firepower / 100.0 * 0.8 + visual.thrust * 0.3;
        let mut glow_mult = 0.6 + record.threat / 100.0 * 0.8;
        if record.visual.is_some() {
            glow_mult *= 0.5 + visual.glow;
        }

        let (band_scale, band_opacity, band_speed, depth) = match band {
            Some(b) => {
                let spec = ctx.bands.spec(b);
                (spec.sample_scale(rng), Some(spec.sample_opacity(rng)), spec.speed_mult, 1.0)
            }
            None => (1.0, None, 1.0, sample_range(tuning.generic_depth, rng)),
        };

        let cruise_speed = ctx.mode.base_speed * speed_mult * band_speed;
        let target = Vec2::new(
            w * (0.2 + 0.6 * rng.gen::<f32>()),
            h * (0.2 + 0.6 * rng.gen::<f32>()),
        );
        let mut dir = (target - pos).normalize_or_zero();
        if dir == Vec2::ZERO {
            dir = Vec2::X;
        }
        let jitter = Vec2::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0)) * tuning.velocity_jitter;
        let vel = dir * cruise_speed + jitter;
        let heading = vel.y.atan2(vel.x);

        let max_trail = ((ctx.mode.trail_length as f32 * trail_mult).round() as usize).max(2);

        Self {
            ticker: record.ticker.clone(),
            kind,
            has_mission: record.has_mission,
            is_elite: record.is_elite,
            is_support: record.is_support,
            upgrade: record.upgrade,
            pos,
            vel,
            rotation: heading,
            rotation_target: heading,
            trail: VecDeque::with_capacity(max_trail + 1),
            max_trail,
            depth_band: band,
            band_scale,
            band_opacity,
            depth,
            wobble_phase: rng.gen::<f32>() * TAU,
            wobble_speed: sample_range(tuning.wobble_speed, rng),
            wobble_amount: sample_range(tuning.wobble_amount, rng) + visual.jitter * 2.0,
            speed_mult,
            glow_mult,
            cruise_speed,
            formation: None,
            damage: visual.damage,
            margin: tuning.edge_margin,
            rotation_smoothing: tuning.rotation_smoothing,
            sprite_size: tuning.sprite_size,
            sprite,
        }
    }

    pub fn style(&self) -> ShipStyle {
        self.kind.style()
    }

    /// Visual scale: the band scale for banded ships, else the generic depth.
    pub fn scale(&self) -> f32 {
        if self.depth_band.is_some() {
            self.band_scale
        } else {
            self.depth
        }
    }

    pub fn in_formation(&self) -> bool {
        self.formation.is_some()
    }

    pub fn formation_target(&self) -> Option<Vec2> {
        self.formation.map(|f| f.target)
    }

    pub fn margin(&self) -> f32 {
        self.margin
    }

    pub fn sprite(&self) -> Option<&SpriteHandle> {
        self.sprite.as_ref()
    }

    pub fn assign_formation(&mut self, slot: FormationSlot) {
        self.formation = Some(slot);
    }

    pub fn release_formation(&mut self) {
        self.formation = None;
    }

    /// Advance one frame. `dt` is measured in nominal frames.
    pub fn update(&mut self, width: f32, height: f32, dt: f32) {
        self.wobble_phase = (self.wobble_phase + self.wobble_speed * dt).rem_euclid(TAU);

        match self.formation {
            Some(slot) => {
                self.vel += (slot.target - self.pos) * slot.gain * dt;
                let cap = self.cruise_speed * slot.max_speed_mult;
                if self.vel.length() > cap {
                    self.vel = self.vel.normalize_or_zero() * cap;
                }
            }
            None => {
                // Ease back to cruise speed after a formation pulled the ship around.
                let speed = self.vel.length();
                if speed > f32::EPSILON && (speed - self.cruise_speed).abs() > 0.01 {
                    let eased = speed + (self.cruise_speed - speed) * (0.02 * dt).min(1.0);
                    self.vel *= eased / speed;
                }
            }
        }

        let heading = self.vel.normalize_or_zero();
        let wobble = heading.perp() * self.wobble_phase.sin() * self.wobble_amount;
        self.pos += (self.vel * self.depth + wobble) * dt;

        if self.vel.length_squared() > 1e-6 {
            self.rotation_target = self.vel.y.atan2(self.vel.x);
        }
        let error = wrap_angle(self.rotation_target - self.rotation);
        self.rotation = wrap_angle(self.rotation + error * (self.rotation_smoothing * dt).min(1.0));

        self.pos.x = wrap_axis(self.pos.x, width, self.margin);
        self.pos.y = wrap_axis(self.pos.y, height, self.margin);

        self.trail.push_front(self.pos);
        self.trail.truncate(self.max_trail);
    }

    /// Effective opacity after focus boost/dim.
    pub fn opacity(&self, params: &DrawParams<'_>) -> f32 {
        let mut opacity = self.band_opacity.unwrap_or(params.intensity) * (1.0 - self.damage * 0.3);
        match params.focused {
            Some(t) if t == self.ticker => opacity *= 1.5,
            Some(_) => opacity *= 0.85,
            None => {}
        }
        opacity.clamp(0.0, 1.0)
    }

    pub fn draw<C: Canvas + ?Sized>(&self, canvas: &mut C, params: &DrawParams<'_>) {
        let style = self.style();
        let opacity = self.opacity(params);
        let size = self.sprite_size * style.size * self.scale();

        self.draw_trail(canvas, &style, opacity, size);

        let glow_radius = size * 0.9 * self.glow_mult * (1.0 + params.glow_boost) * params.glow_intensity;
        if glow_radius > 0.5 {
            canvas.fill_radial_gradient(
                self.pos,
                glow_radius,
                with_alpha(style.color, 0.35 * opacity),
                with_alpha(style.color, 0.0),
            );
        }

        if self.is_elite {
            canvas.fill_radial_gradient(
                self.pos,
                size * 1.2,
                with_alpha(ELITE_AURA, 0.18 * opacity),
                with_alpha(ELITE_AURA, 0.0),
            );
        }

        if self.is_support {
            self.draw_chevron(canvas, opacity, size);
        }

        match self.sprite.as_ref().and_then(SpriteHandle::decoded) {
            Some(image) => canvas.draw_image(&image, self.pos, Vec2::splat(size), self.rotation + FRAC_PI_2, opacity),
            None => canvas.fill_circle(self.pos, (size * 0.15).max(1.5), with_alpha(style.color, opacity)),
        }

        if self.has_mission {
            canvas.stroke_circle(self.pos, size * 0.75, 1.5, with_alpha(MISSION_RING, 0.7 * opacity));
        }
        for ring in 0..self.upgrade.rings() {
            let radius = size * (0.85 + 0.15 * ring as f32);
            canvas.stroke_circle(self.pos, radius, 1.0, with_alpha(UPGRADE_RING, 0.5 * opacity));
        }
    }

    fn draw_trail<C: Canvas + ?Sized>(&self, canvas: &mut C, style: &ShipStyle, opacity: f32, size: f32) {
        let n = self.trail.len();
        if n < 2 {
            return;
        }
        // A jump longer than this is a wrap, not motion.
        let max_step = self.margin * 2.0;
        for i in 1..n {
            let (a, b) = (self.trail[i - 1], self.trail[i]);
            if a.distance(b) > max_step {
                continue;
            }
            let fade = 1.0 - i as f32 / n as f32;
            let width = (size * 0.18 * fade).max(0.5);
            canvas.stroke_line(a, b, width, with_alpha(style.trail, 0.5 * opacity * fade));
        }
    }

    fn draw_chevron<C: Canvas + ?Sized>(&self, canvas: &mut C, opacity: f32, size: f32) {
        let forward = Vec2::from_angle(self.rotation);
        let side = forward.perp();
        let back = self.pos - forward * size * 0.55;
        let points = [
            back,
            back - forward * size * 0.25 + side * size * 0.3,
            back - forward * size * 0.12,
            back - forward * size * 0.25 - side * size * 0.3,
        ];
        canvas.fill_polygon(&points, with_alpha(SUPPORT_CHEVRON, 0.6 * opacity));
    }
}
