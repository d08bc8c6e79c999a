//! The Space Capital flight scene.
//!
//! Tickers fly across a canvas as ships whose speed, trail and glow come from
//! market statistics:
//! - [`RosterBuilder`] turns the stats, manifest and telemetry resources into
//!   [`ShipRecord`]s and preloads their sprites
//! - [`Scene`] owns the ships of one canvas and runs the per-frame loop
//! - [`FormationController`] periodically pulls leaders into formation
//! - [`FlightEngine`] is the shared context: config, clock, sprite cache,
//!   focus and the canvas registry

pub mod collab;
pub mod config;
pub mod depth;
pub mod engine;
pub mod focus;
pub mod formation;
pub mod hud;
pub mod record;
pub mod roster;
pub mod scene;
pub mod ship;
pub mod stats;
pub mod upgrades;

pub use collab::{Collaborators, MissionTracker, Progression, StaticMissions};
pub use config::{ConfigError, EngineConfig, FormationTuning, ModeConfig, SceneMode, ShipTuning};
pub use depth::{BandSpec, DepthBand, DepthBandTable};
pub use engine::FlightEngine;
pub use focus::FocusState;
pub use formation::FormationController;
pub use record::ShipRecord;
pub use roster::{DirSource, FetchError, MemorySource, RosterBuilder, RosterConfig, RosterSource, FALLBACK_TICKERS};
pub use scene::{run_frames, FrameStatus, Scene, SceneOptions, SceneState, Viewport};
pub use ship::{Ship, ShipType};
pub use stats::{FleetTelemetry, Manifest, StatsTable, TickerStats};
pub use upgrades::UpgradeTier;
