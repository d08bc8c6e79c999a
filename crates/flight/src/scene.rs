//! Scene lifecycle and the per-frame loop.
//!
//! A scene is constructed, started, ticked once per animation frame, and
//! finally stopped. Stopping is terminal. Only one scene runs per canvas:
//! constructing a scene on a canvas that already has one cancels the old
//! scene's [`RunToken`], and its next tick reports [`FrameStatus::Stopped`].

use std::sync::Arc;
use std::time::Duration;

use engine_core::{Clock, ManualClock, RunToken, Time};
use glam::Vec2;
use rand::rngs::StdRng;
use rand::SeedableRng;
use renderer::{Canvas, Rect};

use crate::collab::Collaborators;
use crate::config::{ModeConfig, SceneMode};
use crate::engine::FlightEngine;
use crate::formation::FormationController;
use crate::hud::{draw_hud, HudState};
use crate::record::ShipRecord;
use crate::ship::{DrawParams, Ship, SpawnContext};

/// Sparse rosters are padded with generic ships up to this many.
pub const MIN_SHIPS: usize = 6;

/// CSS size of the canvas's container and the device pixel ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    pub dpr: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32, dpr: f32) -> Self {
        Self { width, height, dpr }
    }

    /// Logical size, never below one pixel.
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width.max(1.0), self.height.max(1.0))
    }

    fn ratio(&self) -> f32 {
        if self.dpr.is_finite() && self.dpr > 0.0 {
            self.dpr
        } else {
            1.0
        }
    }

    /// Backing store size in device pixels.
    pub fn pixel_size(&self) -> (u32, u32) {
        let size = self.size() * self.ratio();
        (size.x.round().max(1.0) as u32, size.y.round().max(1.0) as u32)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(800.0, 600.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneState {
    Constructed,
    Running,
    Stopped,
}

/// Result of one frame: whether the caller should schedule another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    Continue,
    Stopped,
}

pub type ReadyCallback = Box<dyn FnOnce() + Send>;

pub struct SceneOptions {
    pub mode: SceneMode,
    pub roster: Vec<ShipRecord>,
    pub viewport: Viewport,
    /// Draw ships but never move them.
    pub reduced_motion: bool,
    /// Use the mode's mobile ship cap.
    pub is_mobile: bool,
    pub collaborators: Collaborators,
    /// Invoked once, after `signal_ready` and the minimum display time.
    pub on_ready: Option<ReadyCallback>,
}

impl Default for SceneOptions {
    fn default() -> Self {
        Self {
            mode: SceneMode::Loading,
            roster: Vec::new(),
            viewport: Viewport::default(),
            reduced_motion: false,
            is_mobile: false,
            collaborators: Collaborators::none(),
            on_ready: None,
        }
    }
}

pub struct Scene<C: Canvas> {
    engine: Arc<FlightEngine>,
    canvas: C,
    token: RunToken,
    state: SceneState,
    mode: SceneMode,
    mode_config: ModeConfig,
    viewport: Viewport,
    ships: Vec<Ship>,
    formation: FormationController,
    time: Time,
    rng: StdRng,
    reduced_motion: bool,
    collaborators: Collaborators,
    created_at: Duration,
    ready_requested: bool,
    ready_fired: bool,
    on_ready: Option<ReadyCallback>,
}

impl<C: Canvas> Scene<C> {
    /// Build a scene on `canvas`, replacing any scene already running there.
    pub fn new(engine: Arc<FlightEngine>, canvas: C, options: SceneOptions) -> Self {
        let token = engine.claim_canvas(canvas.id());
        let config = engine.config();
        let created_at = engine.now();
        let mode_config = config.mode(options.mode).clone();
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let time = Time::new(created_at).with_frame_limits(config.nominal_frame(), config.max_delta_frames);
        let formation = FormationController::new(mode_config.formation_interval_ms, config.formation.clone());

        let mut scene = Self {
            engine,
            canvas,
            token,
            state: SceneState::Constructed,
            mode: options.mode,
            mode_config,
            viewport: options.viewport,
            ships: Vec::new(),
            formation,
            time,
            rng,
            reduced_motion: options.reduced_motion,
            collaborators: options.collaborators,
            created_at,
            ready_requested: false,
            ready_fired: false,
            on_ready: options.on_ready,
        };
        scene.setup_canvas();
        scene.create_ships(&options.roster, options.is_mobile);
        log::info!(
            "Scene {:?} on canvas {}: {} ships at {}x{}",
            scene.mode,
            scene.canvas.id(),
            scene.ships.len(),
            scene.viewport.width,
            scene.viewport.height
        );
        scene
    }

    /// Size the backing store for the viewport and reset the scale.
    /// Safe to repeat; the scale is absolute.
    fn setup_canvas(&mut self) {
        let px = self.viewport.pixel_size();
        if self.canvas.pixel_size() != px {
            self.canvas.resize(px.0, px.1);
        }
        self.canvas.set_scale(self.viewport.ratio());
    }

    fn create_ships(&mut self, roster: &[ShipRecord], is_mobile: bool) {
        let cap = self.mode_config.ship_cap(is_mobile);
        let mut records: Vec<ShipRecord> = roster.iter().take(cap).cloned().collect();
        let floor = MIN_SHIPS.min(cap);
        let mut filler = 0;
        while records.len() < floor {
            records.push(ShipRecord::generic(filler));
            filler += 1;
        }
        if filler > 0 {
            log::debug!("Padded sparse roster with {} generic ships", filler);
        }

        if let Some(missions) = &self.collaborators.missions {
            for r in records.iter_mut() {
                r.has_mission |= missions.has_mission(&r.ticker);
                r.is_support |= missions.is_support(&r.ticker);
            }
        }

        let config = self.engine.config();
        let ctx = SpawnContext {
            bounds: self.viewport.size(),
            mode: &self.mode_config,
            tuning: &config.ship,
            bands: &config.depth_bands,
        };
        self.ships = records
            .iter()
            .map(|r| {
                let band = if self.mode_config.use_depth_bands {
                    Some(config.depth_bands.allocate(&mut self.rng))
                } else {
                    None
                };
                let sprite = self.engine.sprites().get_ship_sprite(&r.ticker);
                Ship::new(r, band, Some(sprite), &ctx, &mut self.rng)
            })
            .collect();
    }

    /// Begin running. Frame timing counts from `now`.
    pub fn start(&mut self, now: Duration) {
        if self.state != SceneState::Constructed {
            return;
        }
        if !self.token.is_running() {
            self.state = SceneState::Stopped;
            return;
        }
        let config = self.engine.config();
        self.time = Time::new(now).with_frame_limits(config.nominal_frame(), config.max_delta_frames);
        self.state = SceneState::Running;
    }

    /// One animation frame. `Stopped` means the loop should not reschedule.
    pub fn tick(&mut self, now: Duration) -> FrameStatus {
        if self.state == SceneState::Stopped {
            return FrameStatus::Stopped;
        }
        if !self.token.is_running() {
            log::debug!("Scene on canvas {} was replaced", self.canvas.id());
            self.state = SceneState::Stopped;
            return FrameStatus::Stopped;
        }
        if self.state == SceneState::Constructed {
            self.start(now);
        }

        self.time.update_at(now);
        let dt = self.time.delta_frames();
        let dt_ms = self.time.delta_ms();
        let bounds = self.viewport.size();

        let [r, g, b] = self.mode_config.background;
        self.canvas.fill_rect(
            Rect::new(0.0, 0.0, bounds.x, bounds.y),
            [r, g, b, self.mode_config.fade_alpha.clamp(0.0, 1.0)],
        );

        // Every ship moves before any is drawn.
        if !self.reduced_motion {
            self.formation.advance(&mut self.ships, bounds, dt_ms, &mut self.rng);
            for ship in self.ships.iter_mut() {
                ship.update(bounds.x, bounds.y, dt);
            }
        }

        // A focus on a ticker this canvas does not fly leaves every ship alone.
        let focused = self
            .engine
            .focused_at(now)
            .filter(|ticker| self.ships.iter().any(|s| &s.ticker == ticker));
        for ship in &self.ships {
            let params = DrawParams {
                intensity: self.mode_config.intensity,
                glow_intensity: self.mode_config.glow_intensity,
                focused: focused.as_deref(),
                glow_boost: self.collaborators.glow_boost(&ship.ticker),
            };
            ship.draw(&mut self.canvas, &params);
        }

        if self.mode == SceneMode::Loading && self.mode_config.show_hud {
            let hud = HudState {
                progress: self.progress(now),
                ready: self.ready_fired,
                active_missions: self.ships.iter().filter(|s| s.has_mission).count(),
                fleet_size: self.ships.len(),
            };
            draw_hud(&mut self.canvas, &hud);
        }

        self.poll_ready(now);
        FrameStatus::Continue
    }

    /// Stop for good. The next tick is a no-op.
    pub fn stop(&mut self) {
        if self.state == SceneState::Stopped {
            return;
        }
        self.state = SceneState::Stopped;
        self.token.cancel();
        self.engine.release_canvas(self.canvas.id(), &self.token);
        log::debug!("Scene on canvas {} stopped", self.canvas.id());
    }

    /// Apply a new container size. Ships keep their positions and wrap into
    /// the new bounds on their next update.
    pub fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.setup_canvas();
    }

    /// Application data is ready. The ready callback still waits for the
    /// minimum display time, counted from construction.
    pub fn signal_ready(&mut self, now: Duration) {
        self.ready_requested = true;
        self.poll_ready(now);
    }

    /// Fire the ready callback if it is due. Returns true once it has fired.
    pub fn poll_ready(&mut self, now: Duration) -> bool {
        if self.ready_fired {
            return true;
        }
        if !self.ready_requested || now.saturating_sub(self.created_at) < self.engine.config().min_display() {
            return false;
        }
        self.ready_fired = true;
        log::info!("Scene ready after {:?}", now.saturating_sub(self.created_at));
        if let Some(callback) = self.on_ready.take() {
            callback();
        }
        true
    }

    pub fn is_ready(&self) -> bool {
        self.ready_fired
    }

    /// Loading progress: elapsed over the minimum display time.
    pub fn progress(&self, now: Duration) -> f32 {
        if self.ready_fired {
            return 1.0;
        }
        let min = self.engine.config().min_display().as_secs_f32();
        if min <= 0.0 {
            return 1.0;
        }
        (now.saturating_sub(self.created_at).as_secs_f32() / min).min(1.0)
    }

    /// Ship under `point` (logical pixels), nearest first.
    pub fn pick(&self, point: Vec2) -> Option<&Ship> {
        let size = self.engine.config().ship.sprite_size;
        self.ships
            .iter()
            .filter(|s| s.pos.distance(point) <= size * s.style().size * s.scale() * 0.6)
            .min_by(|a, b| a.pos.distance(point).total_cmp(&b.pos.distance(point)))
    }

    pub fn ships(&self) -> &[Ship] {
        &self.ships
    }

    pub fn ships_mut(&mut self) -> &mut [Ship] {
        &mut self.ships
    }

    pub fn canvas(&self) -> &C {
        &self.canvas
    }

    pub fn canvas_mut(&mut self) -> &mut C {
        &mut self.canvas
    }

    pub fn state(&self) -> SceneState {
        self.state
    }

    pub fn mode(&self) -> SceneMode {
        self.mode
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn frame_count(&self) -> u64 {
        self.time.frame_count()
    }

    pub fn formations(&self) -> u64 {
        self.formation.triggers()
    }

    pub fn token(&self) -> &RunToken {
        &self.token
    }
}

impl<C: Canvas> Drop for Scene<C> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Drive `scene` the way a browser frame scheduler would: advance `clock` by
/// `frame`, tick, repeat `frames` times or until the scene stops. Returns the
/// number of frames that ran.
pub fn run_frames<C: Canvas>(scene: &mut Scene<C>, clock: &ManualClock, frames: usize, frame: Duration) -> usize {
    if scene.state() == SceneState::Constructed {
        scene.start(clock.now());
    }
    let mut ran = 0;
    for _ in 0..frames {
        clock.advance(frame);
        if scene.tick(clock.now()) == FrameStatus::Stopped {
            break;
        }
        ran += 1;
    }
    ran
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::StaticMissions;
    use crate::config::EngineConfig;
    use renderer::{CanvasId, DrawCommand, RecordingCanvas, SpriteCache, SpriteImage, DEFAULT_SHIP_URL};
    use std::sync::atomic::{AtomicBool, Ordering};

    const FRAME: Duration = Duration::from_micros(16_667);

    fn engine_with(config: EngineConfig, clock: &ManualClock) -> Arc<FlightEngine> {
        let sprites = SpriteCache::new("/nonexistent", DEFAULT_SHIP_URL);
        sprites.insert_decoded(DEFAULT_SHIP_URL, SpriteImage::solid(4, 4, [200, 200, 255, 255]));
        Arc::new(FlightEngine::new(config, Arc::new(clock.clone()), sprites))
    }

    fn engine(clock: &ManualClock) -> Arc<FlightEngine> {
        engine_with(
            EngineConfig {
                seed: Some(7),
                ..EngineConfig::default()
            },
            clock,
        )
    }

    fn canvas(id: &str) -> RecordingCanvas {
        RecordingCanvas::new(CanvasId::new(id), 800, 600)
    }

    fn roster(n: usize) -> Vec<ShipRecord> {
        (0..n).map(|i| ShipRecord::new(format!("T{i}"))).collect()
    }

    fn options(n: usize) -> SceneOptions {
        SceneOptions {
            roster: roster(n),
            ..SceneOptions::default()
        }
    }

    #[test]
    fn stop_means_no_further_frames() {
        let clock = ManualClock::new();
        let mut scene = Scene::new(engine(&clock), canvas("c"), options(8));
        assert_eq!(run_frames(&mut scene, &clock, 5, FRAME), 5);
        scene.stop();
        scene.canvas_mut().clear();
        assert_eq!(run_frames(&mut scene, &clock, 5, FRAME), 0);
        assert!(scene.canvas().commands.is_empty());
        assert_eq!(scene.state(), SceneState::Stopped);
    }

    #[test]
    fn second_scene_on_same_canvas_stops_the_first() {
        let clock = ManualClock::new();
        let e = engine(&clock);
        let mut first = Scene::new(e.clone(), canvas("splash"), options(8));
        run_frames(&mut first, &clock, 3, FRAME);
        let mut second = Scene::new(e.clone(), canvas("splash"), options(8));

        first.canvas_mut().clear();
        assert_eq!(first.tick(clock.now()), FrameStatus::Stopped);
        assert!(first.canvas().commands.is_empty());
        assert_eq!(run_frames(&mut second, &clock, 3, FRAME), 3);
        assert!(e.is_active(&CanvasId::new("splash")));

        // The replaced scene stopping must not unregister its successor.
        first.stop();
        assert!(e.is_active(&CanvasId::new("splash")));
    }

    #[test]
    fn scenes_on_different_canvases_coexist() {
        let clock = ManualClock::new();
        let e = engine(&clock);
        let mut a = Scene::new(e.clone(), canvas("a"), options(8));
        let mut b = Scene::new(e, canvas("b"), options(8));
        assert_eq!(run_frames(&mut a, &clock, 2, FRAME), 2);
        assert_eq!(run_frames(&mut b, &clock, 2, FRAME), 2);
    }

    #[test]
    fn setup_applies_device_pixel_ratio_without_compounding() {
        let clock = ManualClock::new();
        let opts = SceneOptions {
            viewport: Viewport::new(400.0, 300.0, 2.0),
            ..options(8)
        };
        let mut scene = Scene::new(engine(&clock), canvas("c"), opts);
        assert_eq!(scene.canvas().pixel_size(), (800, 600));
        for _ in 0..3 {
            scene.resize(Viewport::new(400.0, 300.0, 2.0));
        }
        assert_eq!(scene.canvas().scale(), 2.0);
        assert_eq!(scene.canvas().scale_calls, 4);
        assert_eq!(scene.canvas().logical_size(), Vec2::new(400.0, 300.0));

        scene.resize(Viewport::new(500.0, 250.0, 1.5));
        assert_eq!(scene.canvas().pixel_size(), (750, 375));
        assert_eq!(scene.canvas().scale(), 1.5);
    }

    #[test]
    fn ship_count_is_capped_and_padded() {
        let clock = ManualClock::new();
        let e = engine(&clock);
        assert_eq!(Scene::new(e.clone(), canvas("a"), options(40)).ships().len(), 24);
        assert_eq!(Scene::new(e.clone(), canvas("b"), options(2)).ships().len(), MIN_SHIPS);

        let mobile = SceneOptions {
            is_mobile: true,
            ..options(40)
        };
        assert_eq!(Scene::new(e.clone(), canvas("c"), mobile).ships().len(), 12);

        let sparse = Scene::new(e, canvas("d"), options(0));
        assert!(sparse.ships().iter().all(|s| s.ticker.starts_with("DRONE-")));
    }

    #[test]
    fn tiny_cap_wins_over_padding_floor() {
        let clock = ManualClock::new();
        let mut config = EngineConfig::default();
        config.loading.max_ships = 4;
        let scene = Scene::new(engine_with(config, &clock), canvas("c"), options(1));
        assert_eq!(scene.ships().len(), 4);
    }

    #[test]
    fn depth_bands_follow_the_mode() {
        let clock = ManualClock::new();
        let e = engine(&clock);
        let loading = Scene::new(e.clone(), canvas("a"), options(10));
        assert!(loading.ships().iter().all(|s| s.depth_band.is_some()));
        let ambient = Scene::new(
            e,
            canvas("b"),
            SceneOptions {
                mode: SceneMode::Ambient,
                ..options(10)
            },
        );
        assert!(ambient.ships().iter().all(|s| s.depth_band.is_none()));
    }

    #[test]
    fn ready_waits_for_minimum_display_time() {
        let clock = ManualClock::new();
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();
        let opts = SceneOptions {
            on_ready: Some(Box::new(move || flag.store(true, Ordering::SeqCst))),
            ..options(8)
        };
        let mut scene = Scene::new(engine(&clock), canvas("c"), opts);

        clock.advance(Duration::from_millis(100));
        scene.signal_ready(clock.now());
        assert!(!scene.is_ready());
        assert!(!fired.load(Ordering::SeqCst));

        clock.advance(Duration::from_millis(2399));
        assert!(!scene.poll_ready(clock.now()));

        clock.advance(Duration::from_millis(1));
        assert!(scene.poll_ready(clock.now()));
        assert!(fired.load(Ordering::SeqCst));
    }

    #[test]
    fn ready_fires_from_the_frame_loop() {
        let clock = ManualClock::new();
        let mut scene = Scene::new(engine(&clock), canvas("c"), options(8));
        scene.signal_ready(clock.now());
        run_frames(&mut scene, &clock, 200, FRAME);
        assert!(scene.is_ready());
        assert_eq!(scene.progress(clock.now()), 1.0);
    }

    #[test]
    fn reduced_motion_draws_without_moving() {
        let clock = ManualClock::new();
        let opts = SceneOptions {
            reduced_motion: true,
            ..options(8)
        };
        let mut scene = Scene::new(engine(&clock), canvas("c"), opts);
        let before: Vec<Vec2> = scene.ships().iter().map(|s| s.pos).collect();
        run_frames(&mut scene, &clock, 10, FRAME);
        let after: Vec<Vec2> = scene.ships().iter().map(|s| s.pos).collect();
        assert_eq!(before, after);
        assert_eq!(scene.canvas().images(), 8 * 10);
    }

    #[test]
    fn hud_is_drawn_only_in_loading_mode() {
        let clock = ManualClock::new();
        let e = engine(&clock);
        let mut loading = Scene::new(e.clone(), canvas("a"), options(8));
        run_frames(&mut loading, &clock, 1, FRAME);
        assert!(loading.canvas().texts().contains(&crate::hud::HUD_TITLE));

        let mut ambient = Scene::new(
            e,
            canvas("b"),
            SceneOptions {
                mode: SceneMode::Ambient,
                ..options(8)
            },
        );
        run_frames(&mut ambient, &clock, 1, FRAME);
        assert!(ambient.canvas().texts().is_empty());
    }

    #[test]
    fn each_frame_starts_with_a_translucent_fill() {
        let clock = ManualClock::new();
        let mut scene = Scene::new(engine(&clock), canvas("c"), options(8));
        run_frames(&mut scene, &clock, 1, FRAME);
        match &scene.canvas().commands[0] {
            DrawCommand::FillRect { rect, color } => {
                assert_eq!((rect.w, rect.h), (800.0, 600.0));
                assert_eq!(color[3], ModeConfig::loading().fade_alpha);
            }
            other => panic!("expected background fill, got {other:?}"),
        }
    }

    #[test]
    fn mission_collaborator_flags_ships() {
        let clock = ManualClock::new();
        let missions = Arc::new(StaticMissions::new(["T1"], ["T2"]));
        let opts = SceneOptions {
            collaborators: Collaborators::none().with_missions(missions),
            ..options(8)
        };
        let scene = Scene::new(engine(&clock), canvas("c"), opts);
        assert!(scene.ships()[1].has_mission);
        assert!(scene.ships()[2].is_support);
        assert!(!scene.ships()[0].has_mission);
    }

    #[test]
    fn large_gaps_are_clamped() {
        let clock = ManualClock::new();
        let mut scene = Scene::new(engine(&clock), canvas("c"), options(8));
        run_frames(&mut scene, &clock, 1, FRAME);
        let before: Vec<Vec2> = scene.ships().iter().map(|s| s.pos).collect();
        clock.advance(Duration::from_secs(30));
        scene.tick(clock.now());
        for (ship, prev) in scene.ships().iter().zip(before) {
            let step = ship.pos.distance(prev);
            // Wrapping can jump across the canvas; otherwise the step is small.
            assert!(step < 60.0 || step > 300.0, "moved {step}");
        }
    }

    #[test]
    fn pick_finds_the_ship_under_the_pointer() {
        let clock = ManualClock::new();
        let mut scene = Scene::new(engine(&clock), canvas("c"), options(8));
        scene.ships_mut()[3].pos = Vec2::new(123.0, 456.0);
        let picked = scene.pick(Vec2::new(125.0, 455.0)).map(|s| s.ticker.clone());
        assert_eq!(picked.as_deref(), Some("T3"));
        scene.ships_mut().iter_mut().for_each(|s| s.pos = Vec2::new(-40.0, -40.0));
        assert!(scene.pick(Vec2::new(400.0, 300.0)).is_none());
    }

    #[test]
    fn dropping_a_scene_releases_its_canvas() {
        let clock = ManualClock::new();
        let e = engine(&clock);
        let mut scene = Scene::new(e.clone(), canvas("splash"), options(8));
        run_frames(&mut scene, &clock, 2, FRAME);
        let token = scene.token().clone();
        assert!(e.is_active(&CanvasId::new("splash")));
        drop(scene);
        assert!(!e.is_active(&CanvasId::new("splash")));
        assert!(!token.is_running());
    }

    #[test]
    fn focus_on_an_absent_ticker_changes_nothing() {
        fn alphas(focus: Option<&str>) -> Vec<f32> {
            let clock = ManualClock::new();
            let e = engine(&clock);
            let opts = SceneOptions {
                mode: SceneMode::Ambient,
                ..options(6)
            };
            let mut scene = Scene::new(e.clone(), canvas("c"), opts);
            if let Some(ticker) = focus {
                e.set_focus(ticker, Duration::from_secs(10));
            }
            run_frames(&mut scene, &clock, 1, FRAME);
            scene
                .canvas()
                .commands
                .iter()
                .filter_map(|c| match c {
                    DrawCommand::Image { alpha, .. } => Some(*alpha),
                    _ => None,
                })
                .collect()
        }

        let plain = alphas(None);
        assert_eq!(plain.len(), 6);
        assert_eq!(alphas(Some("ZZZZ")), plain);
        // A real focus still dims the others.
        let focused = alphas(Some("T0"));
        assert!(focused.iter().zip(&plain).any(|(f, p)| f < p));
    }
}
