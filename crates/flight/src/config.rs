//! Engine configuration. Every field has a default, so a RON file only needs
//! the values it wants to change.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::depth::DepthBandTable;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

/// Which preset a scene runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SceneMode {
    /// Splash screen: busy, depth-banded, with the uplink HUD.
    #[default]
    Loading,
    /// Dim background fleet behind the dashboard panels.
    Ambient,
}

/// Per-mode scene preset.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModeConfig {
    pub max_ships: usize,
    /// Cap used instead of `max_ships` on small screens.
    pub mobile_max_ships: usize,
    /// Trail length before the firepower multiplier.
    pub trail_length: usize,
    /// Speed in logical pixels per nominal frame before the fit multiplier.
    pub base_speed: f32,
    pub glow_intensity: f32,
    pub use_depth_bands: bool,
    /// Formation trigger interval; zero disables formations.
    pub formation_interval_ms: f32,
    pub show_hud: bool,
    /// Alpha of the per-frame background fill (lower = longer smears).
    pub fade_alpha: f32,
    /// Opacity for ships without a depth band.
    pub intensity: f32,
    /// Background fill color (RGB, 0..1).
    pub background: [f32; 3],
}

impl Default for ModeConfig {
    fn default() -> Self {
        Self::loading()
    }
}

impl ModeConfig {
    pub fn loading() -> Self {
        Self {
            max_ships: 24,
            mobile_max_ships: 12,
            trail_length: 18,
            base_speed: 1.6,
            glow_intensity: 1.0,
            use_depth_bands: true,
            formation_interval_ms: 4000.0,
            show_hud: true,
            fade_alpha: 0.25,
            intensity: 1.0,
            background: [0.02, 0.03, 0.08],
        }
    }

    pub fn ambient() -> Self {
        Self {
            max_ships: 14,
            mobile_max_ships: 8,
            trail_length: 12,
            base_speed: 0.8,
            glow_intensity: 0.6,
            use_depth_bands: false,
            formation_interval_ms: 10_000.0,
            show_hud: false,
            fade_alpha: 0.18,
            intensity: 0.55,
            background: [0.02, 0.03, 0.08],
        }
    }

    /// Ship cap for the current form factor.
    pub fn ship_cap(&self, is_mobile: bool) -> usize {
        if is_mobile {
            self.mobile_max_ships.min(self.max_ships)
        } else {
            self.max_ships
        }
    }
}

/// Per-ship motion and look constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShipTuning {
    /// Ships wrap once they leave the canvas by more than this.
    pub edge_margin: f32,
    /// How far outside the edge ships spawn.
    pub spawn_offset: f32,
    /// Fraction of the heading error closed per nominal frame.
    pub rotation_smoothing: f32,
    pub wobble_speed: (f32, f32),
    pub wobble_amount: (f32, f32),
    pub velocity_jitter: f32,
    /// Depth range for ships without a band.
    pub generic_depth: (f32, f32),
    /// Sprite edge length in logical pixels at scale 1.
    pub sprite_size: f32,
}

impl Default for ShipTuning {
    fn default() -> Self {
        Self {
            edge_margin: 50.0,
            spawn_offset: 20.0,
            rotation_smoothing: 0.12,
            wobble_speed: (0.02, 0.05),
            wobble_amount: (0.15, 0.45),
            velocity_jitter: 0.3,
            generic_depth: (0.6, 1.3),
            sprite_size: 26.0,
        }
    }
}

/// Formation choreography constants. Tuned by feel; there is no correct value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FormationTuning {
    /// Proportional steering gain for leaders, per nominal frame.
    pub leader_gain: f32,
    pub support_gain: f32,
    pub leader_hold_ms: f32,
    pub support_hold_ms: f32,
    pub leader_spacing: f32,
    pub support_spacing: f32,
    /// Vertical offset of the support point below the leader point.
    pub support_drop: f32,
    /// Random scatter applied to support slots.
    pub support_scatter: f32,
    /// Speed cap while steering, as a multiple of the ship's cruise speed.
    pub max_speed_mult: f32,
}

impl Default for FormationTuning {
    fn default() -> Self {
        Self {
            leader_gain: 0.02,
            support_gain: 0.01,
            leader_hold_ms: 2000.0,
            support_hold_ms: 2500.0,
            leader_spacing: 48.0,
            support_spacing: 72.0,
            support_drop: 90.0,
            support_scatter: 20.0,
            max_speed_mult: 2.0,
        }
    }
}

/// Top-level engine configuration, loadable from RON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "ModeConfig::loading")]
    pub loading: ModeConfig,
    #[serde(default = "ModeConfig::ambient")]
    pub ambient: ModeConfig,
    #[serde(default)]
    pub depth_bands: DepthBandTable,
    #[serde(default)]
    pub ship: ShipTuning,
    #[serde(default)]
    pub formation: FormationTuning,
    /// Minimum time a scene stays up before its ready callback fires.
    #[serde(default = "default_min_display_ms")]
    pub min_display_ms: u64,
    #[serde(default = "default_nominal_frame_ms")]
    pub nominal_frame_ms: f32,
    /// Clamp for frame deltas, in nominal frames.
    #[serde(default = "default_max_delta_frames")]
    pub max_delta_frames: f32,
    /// Fixed RNG seed for reproducible runs; random when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_min_display_ms() -> u64 {
    2500
}
fn default_nominal_frame_ms() -> f32 {
    1000.0 / 60.0
}
fn default_max_delta_frames() -> f32 {
    3.0
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            loading: ModeConfig::loading(),
            ambient: ModeConfig::ambient(),
            depth_bands: DepthBandTable::default(),
            ship: ShipTuning::default(),
            formation: FormationTuning::default(),
            min_display_ms: default_min_display_ms(),
            nominal_frame_ms: default_nominal_frame_ms(),
            max_delta_frames: default_max_delta_frames(),
            seed: None,
        }
    }
}

impl EngineConfig {
    pub fn from_ron_str(s: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(s)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_ron_str(&data)
    }

    /// Load from `path`. A missing or invalid file yields the defaults.
    pub fn load(path: &Path) -> Self {
        match Self::from_path(path) {
            Ok(c) => c,
            Err(ConfigError::Io { .. }) => Self::default(),
            Err(e) => {
                log::warn!("Invalid engine config at {:?}: {}, using defaults", path, e);
                Self::default()
            }
        }
    }

    pub fn mode(&self, mode: SceneMode) -> &ModeConfig {
        match mode {
            SceneMode::Loading => &self.loading,
            SceneMode::Ambient => &self.ambient,
        }
    }

    pub fn min_display(&self) -> Duration {
        Duration::from_millis(self.min_display_ms)
    }

    pub fn nominal_frame(&self) -> Duration {
        Duration::from_secs_f32(self.nominal_frame_ms.max(1.0) / 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_ron_gives_defaults() {
        let c = EngineConfig::from_ron_str("()").unwrap();
        assert_eq!(c.loading.max_ships, 24);
        assert_eq!(c.ambient.max_ships, 14);
        assert_eq!(c.min_display_ms, 2500);
        assert!(c.seed.is_none());
    }

    #[test]
    fn partial_override_keeps_other_fields() {
        let c = EngineConfig::from_ron_str("(min_display_ms: 100, seed: Some(9), formation: (leader_gain: 0.05))").unwrap();
        assert_eq!(c.min_display_ms, 100);
        assert_eq!(c.seed, Some(9));
        assert_eq!(c.formation.leader_gain, 0.05);
        assert_eq!(c.formation.support_hold_ms, 2500.0);
    }

    #[test]
    fn invalid_ron_is_a_parse_error() {
        assert!(matches!(EngineConfig::from_ron_str("(min_display_ms: \"soon\")"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn missing_file_loads_defaults() {
        let c = EngineConfig::load(Path::new("/definitely/not/here/engine.ron"));
        assert_eq!(c.loading.trail_length, 18);
    }

    #[test]
    fn mobile_cap_never_exceeds_desktop_cap() {
        let mut m = ModeConfig::ambient();
        m.mobile_max_ships = 50;
        assert_eq!(m.ship_cap(true), m.max_ships);
        assert_eq!(ModeConfig::loading().ship_cap(true), 12);
    }
}
