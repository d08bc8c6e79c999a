//! Deck configuration and preferences. Loaded from `config.ron` and
//! `preferences.ron` in the current directory.

use flight::{RosterConfig, SceneMode};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Headless run settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeckConfig {
    /// Viewport width in logical pixels.
    #[serde(default = "default_width")]
    pub width: f32,
    /// Viewport height in logical pixels.
    #[serde(default = "default_height")]
    pub height: f32,
    /// Device pixel ratio.
    #[serde(default = "default_dpr")]
    pub dpr: f32,
    #[serde(default)]
    pub mode: SceneMode,
    /// Frames to simulate.
    #[serde(default = "default_frames")]
    pub frames: usize,
    /// Write every Nth frame as PNG; 0 writes only the last frame.
    #[serde(default = "default_every")]
    pub every: usize,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Directory holding stats.json, manifest.json and fleet.json.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Root the sprite URLs resolve against.
    #[serde(default = "default_asset_root")]
    pub asset_root: PathBuf,
    /// Optional engine tuning file (RON).
    #[serde(default)]
    pub engine_config: Option<PathBuf>,
    #[serde(default)]
    pub roster: RosterConfig,
    /// Tickers with an active mission.
    #[serde(default)]
    pub missions: Vec<String>,
    /// Tickers flying support.
    #[serde(default)]
    pub support: Vec<String>,
    /// How long the preferred ship stays focused; 0 keeps it focused for the whole run.
    #[serde(default = "default_focus_ms")]
    pub focus_ms: u64,
}

fn default_width() -> f32 {
    960.0
}
fn default_height() -> f32 {
    540.0
}
fn default_dpr() -> f32 {
    1.0
}
fn default_frames() -> usize {
    240
}
fn default_every() -> usize {
    60
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("frames")
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_asset_root() -> PathBuf {
    PathBuf::from("assets")
}
fn default_focus_ms() -> u64 {
    3000
}

impl Default for DeckConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            dpr: default_dpr(),
            mode: SceneMode::default(),
            frames: default_frames(),
            every: default_every(),
            output_dir: default_output_dir(),
            data_dir: default_data_dir(),
            asset_root: default_asset_root(),
            engine_config: None,
            roster: RosterConfig::default(),
            missions: Vec::new(),
            support: Vec::new(),
            focus_ms: default_focus_ms(),
        }
    }
}

impl DeckConfig {
    /// Load config from `config.ron`. If the file is missing, a default one is
    /// written for editing; if it is invalid, defaults are used.
    pub fn load() -> Self {
        let path = config_path("config.ron");
        if !path.exists() {
            let config = Self::default();
            config.save(&path);
            return config;
        }
        load_ron(&path)
    }

    /// Save to `path`. Logs on error.
    pub fn save(&self, path: &Path) {
        if let Ok(s) = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default()) {
            if let Err(e) = std::fs::write(path, s) {
                log::warn!("Could not write config to {:?}: {}", path, e);
            }
        }
    }

    /// Small screens use the mobile ship cap.
    pub fn is_mobile(&self) -> bool {
        self.width < 768.0
    }
}

/// Persisted user preferences. Plain values, no versioning.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Ticker of the ship the user last picked.
    pub selected_ship: Option<String>,
    /// Low-power mode: ships are drawn but never move.
    pub performance_mode: bool,
    /// Mini-game records, carried along untouched.
    pub best_distance: f64,
    pub games_played: u32,
}

impl Preferences {
    /// Load from `preferences.ron`; missing or invalid files give defaults.
    pub fn load() -> Self {
        let path = config_path("preferences.ron");
        if !path.exists() {
            return Self::default();
        }
        load_ron(&path)
    }
}

fn load_ron<T>(path: &Path) -> T
where
    T: Default + for<'de> Deserialize<'de>,
{
    if let Ok(data) = std::fs::read_to_string(path) {
        match ron::from_str(&data) {
            Ok(c) => return c,
            Err(e) => log::warn!("Invalid config at {:?}: {}, using defaults", path, e),
        }
    }
    T::default()
}

fn config_path(name: &str) -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")).join(name)
}
