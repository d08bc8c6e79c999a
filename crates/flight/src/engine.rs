//! Engine context shared by every scene: config, clock, sprite cache, focus
//! and the canvas → running-scene registry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use engine_core::{Clock, RunToken, SystemClock};
use renderer::{CanvasId, SpriteCache, DEFAULT_SHIP_URL};

use crate::config::EngineConfig;
use crate::focus::FocusState;

pub struct FlightEngine {
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    sprites: SpriteCache,
    focus: Mutex<FocusState>,
    active: Mutex<HashMap<CanvasId, RunToken>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

impl FlightEngine {
    pub fn new(config: EngineConfig, clock: Arc<dyn Clock>, sprites: SpriteCache) -> Self {
        Self {
            config,
            clock,
            sprites,
            focus: Mutex::new(FocusState::new()),
            active: Mutex::new(HashMap::new()),
        }
    }

    /// Engine on the wall clock with sprites under `asset_root`.
    pub fn with_defaults(config: EngineConfig, asset_root: impl Into<std::path::PathBuf>) -> Self {
        Self::new(
            config,
            Arc::new(SystemClock::new()),
            SpriteCache::new(asset_root, DEFAULT_SHIP_URL),
        )
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn sprites(&self) -> &SpriteCache {
        &self.sprites
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    /// Register a new scene on `canvas`, stopping whatever ran there before.
    pub fn claim_canvas(&self, canvas: &CanvasId) -> RunToken {
        let token = RunToken::new();
        if let Some(previous) = lock(&self.active).insert(canvas.clone(), token.clone()) {
            if previous.is_running() {
                log::info!("Replacing running scene on canvas {}", canvas);
            }
            previous.cancel();
        }
        token
    }

    /// Drop the registry entry, but only if `token` still owns the canvas.
    pub fn release_canvas(&self, canvas: &CanvasId, token: &RunToken) {
        let mut active = lock(&self.active);
        if active.get(canvas).is_some_and(|t| t.same_as(token)) {
            active.remove(canvas);
        }
    }

    /// Whether a running scene currently owns `canvas`.
    pub fn is_active(&self, canvas: &CanvasId) -> bool {
        lock(&self.active).get(canvas).is_some_and(RunToken::is_running)
    }

    /// Highlight `ticker` for `duration`; replaces any previous focus.
    pub fn set_focus(&self, ticker: &str, duration: Duration) {
        let now = self.now();
        lock(&self.focus).set_focus(ticker, duration, now);
    }

    /// Highlight `ticker` until cleared.
    pub fn pin_focus(&self, ticker: &str) {
        lock(&self.focus).pin(ticker);
    }

    pub fn clear_focus(&self) {
        lock(&self.focus).clear();
    }

    pub fn focused_ticker(&self) -> Option<String> {
        self.focused_at(self.now())
    }

    pub(crate) fn focused_at(&self, now: Duration) -> Option<String> {
        lock(&self.focus).focused(now).map(str::to_string)
    }
}

impl std::fmt::Debug for FlightEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlightEngine")
            .field("sprites", &self.sprites.len())
            .field("active", &lock(&self.active).len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::ManualClock;

    fn engine(clock: &ManualClock) -> FlightEngine {
        FlightEngine::new(
            EngineConfig::default(),
            Arc::new(clock.clone()),
            SpriteCache::new("/nonexistent", DEFAULT_SHIP_URL),
        )
    }

    #[test]
    fn claiming_a_canvas_cancels_the_previous_owner() {
        let e = engine(&ManualClock::new());
        let id = CanvasId::new("splash");
        let first = e.claim_canvas(&id);
        let second = e.claim_canvas(&id);
        assert!(!first.is_running());
        assert!(second.is_running());
        assert!(e.is_active(&id));
    }

    #[test]
    fn stale_release_keeps_the_new_owner() {
        let e = engine(&ManualClock::new());
        let id = CanvasId::new("splash");
        let first = e.claim_canvas(&id);
        let second = e.claim_canvas(&id);
        e.release_canvas(&id, &first);
        assert!(e.is_active(&id));
        e.release_canvas(&id, &second);
        assert!(!e.is_active(&id));
    }

    #[test]
    fn canvases_are_independent() {
        let e = engine(&ManualClock::new());
        let a = e.claim_canvas(&CanvasId::new("a"));
        let _b = e.claim_canvas(&CanvasId::new("b"));
        assert!(a.is_running());
    }

    #[test]
    fn focus_follows_the_engine_clock() {
        let clock = ManualClock::new();
        let e = engine(&clock);
        e.set_focus("RKLB", Duration::from_millis(1000));
        assert_eq!(e.focused_ticker().as_deref(), Some("RKLB"));
        clock.advance(Duration::from_millis(1000));
        assert_eq!(e.focused_ticker(), None);
    }

    #[test]
    fn pinned_focus_outlasts_the_clock_until_cleared() {
        let clock = ManualClock::new();
        let e = engine(&clock);
        e.pin_focus("PL");
        clock.advance(Duration::from_secs(3600));
        assert_eq!(e.focused_ticker().as_deref(), Some("PL"));
        e.clear_focus();
        assert_eq!(e.focused_ticker(), None);
    }

    #[test]
    fn engines_do_not_share_focus() {
        let clock = ManualClock::new();
        let a = engine(&clock);
        let b = engine(&clock);
        a.set_focus("LUNR", Duration::from_secs(5));
        assert_eq!(b.focused_ticker(), None);
    }
}
