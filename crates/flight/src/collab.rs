//! Optional collaborators the scene consults when they are present.

use std::collections::HashSet;
use std::sync::Arc;

/// Mission-tracking state owned by another part of the app.
pub trait MissionTracker: Send + Sync {
    fn has_mission(&self, ticker: &str) -> bool;
    fn is_support(&self, ticker: &str) -> bool;
}

/// Progression effects (e.g. earned upgrades) that boost a ship's glow.
pub trait Progression: Send + Sync {
    /// Extra glow as a fraction of the base glow radius (0 = none).
    fn glow_boost(&self, ticker: &str) -> f32;
}

/// Injected capabilities. `None` means the collaborator is not loaded and the
/// feature it drives is simply skipped.
#[derive(Clone, Default)]
pub struct Collaborators {
    pub missions: Option<Arc<dyn MissionTracker>>,
    pub progression: Option<Arc<dyn Progression>>,
}

impl Collaborators {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_missions(mut self, missions: Arc<dyn MissionTracker>) -> Self {
        self.missions = Some(missions);
        self
    }

    pub fn with_progression(mut self, progression: Arc<dyn Progression>) -> Self {
        self.progression = Some(progression);
        self
    }

    /// Glow boost for a ticker, zero without a progression collaborator.
    pub fn glow_boost(&self, ticker: &str) -> f32 {
        self.progression
            .as_ref()
            .map(|p| p.glow_boost(ticker))
            .filter(|b| b.is_finite())
            .map_or(0.0, |b| b.max(0.0))
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("missions", &self.missions.is_some())
            .field("progression", &self.progression.is_some())
            .finish()
    }
}

/// Fixed mission board, for tests and static demo data.
#[derive(Debug, Clone, Default)]
pub struct StaticMissions {
    pub missions: HashSet<String>,
    pub support: HashSet<String>,
}

impl StaticMissions {
    pub fn new<I, J, S, T>(missions: I, support: J) -> Self
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            missions: missions.into_iter().map(Into::into).collect(),
            support: support.into_iter().map(Into::into).collect(),
        }
    }
}

impl MissionTracker for StaticMissions {
    fn has_mission(&self, ticker: &str) -> bool {
        self.missions.contains(ticker)
    }

    fn is_support(&self, ticker: &str) -> bool {
        self.support.contains(ticker)
    }
}
