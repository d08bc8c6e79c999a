//! Ship records: the immutable per-ticker input a scene is built from.

use crate::stats::{TickerStats, VisualParams};
use crate::upgrades::UpgradeTier;

/// One ticker's normalized attributes and flags.
#[derive(Debug, Clone, PartialEq)]
pub struct ShipRecord {
    pub ticker: String,
    /// Suitability, 0..=100. Drives speed.
    pub fit: f32,
    /// 0..=100. Drives glow.
    pub threat: f32,
    /// 0..=100. Drives trail length.
    pub firepower: f32,
    pub has_mission: bool,
    pub is_support: bool,
    pub is_elite: bool,
    pub is_benchmark: bool,
    pub upgrade: UpgradeTier,
    pub visual: Option<VisualParams>,
}

fn percent(v: f32) -> f32 {
    if v.is_finite() {
        v.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

impl ShipRecord {
    /// Neutral record: middling fit, no threat or firepower, no flags.
    pub fn new(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            fit: 50.0,
            threat: 0.0,
            firepower: 0.0,
            has_mission: false,
            is_support: false,
            is_elite: false,
            is_benchmark: false,
            upgrade: UpgradeTier::None,
            visual: None,
        }
    }

    /// Low-priority filler ship used to pad sparse rosters.
    pub fn generic(index: usize) -> Self {
        Self::new(format!("DRONE-{}", index + 1))
            .with_fit(40.0)
            .with_threat(20.0)
            .with_firepower(20.0)
    }

    /// Normalize raw statistics into a record.
    ///
    /// fit: position in the 52-week range (50 when unknown);
    /// threat: weekly swing magnitude, else daily;
    /// firepower: yearly return around 50, else monthly.
    pub fn from_stats(ticker: impl Into<String>, stats: &TickerStats) -> Self {
        let fit = stats.range_position().unwrap_or(50.0) as f32;
        let threat = stats
            .w1
            .map(|w| w.abs() * 3.0)
            .or_else(|| stats.d1.map(|d| d.abs() * 8.0))
            .unwrap_or(20.0) as f32;
        let firepower = stats
            .y1
            .map(|y| 50.0 + y / 4.0)
            .or_else(|| stats.m1.map(|m| 50.0 + m))
            .unwrap_or(50.0) as f32;
        Self::new(ticker)
            .with_fit(fit)
            .with_threat(threat)
            .with_firepower(firepower)
            .with_upgrade(UpgradeTier::from_monthly_return(stats.m1))
    }

    pub fn with_fit(mut self, fit: f32) -> Self {
        self.fit = percent(fit);
        self
    }

    pub fn with_threat(mut self, threat: f32) -> Self {
        self.threat = percent(threat);
        self
    }

    pub fn with_firepower(mut self, firepower: f32) -> Self {
        self.firepower = percent(firepower);
        self
    }

    pub fn with_upgrade(mut self, upgrade: UpgradeTier) -> Self {
        self.upgrade = upgrade;
        self
    }

    pub fn with_visual(mut self, visual: VisualParams) -> Self {
        self.visual = Some(visual);
        self
    }

    pub fn mission(mut self, on: bool) -> Self {
        self.has_mission = on;
        self
    }

    pub fn support(mut self, on: bool) -> Self {
        self.is_support = on;
        self
    }

    pub fn elite(mut self, on: bool) -> Self {
        self.is_elite = on;
        self
    }

    pub fn benchmark(mut self, on: bool) -> Self {
        self.is_benchmark = on;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attributes_are_clamped_to_percent() {
        let r = ShipRecord::new("X").with_fit(140.0).with_threat(-5.0).with_firepower(f32::NAN);
        assert_eq!((r.fit, r.threat, r.firepower), (100.0, 0.0, 0.0));
    }

    #[test]
    fn from_stats_normalizes_fields() {
        let stats = TickerStats {
            d1: Some(2.0),
            w1: Some(-10.0),
            m1: Some(16.0),
            y1: Some(120.0),
            current: Some(15.0),
            high52: Some(20.0),
            low52: Some(10.0),
        };
        let r = ShipRecord::from_stats("RKLB", &stats);
        assert_eq!(r.fit, 50.0);
        assert_eq!(r.threat, 30.0);
        assert_eq!(r.firepower, 80.0);
        assert_eq!(r.upgrade, UpgradeTier::Mk2);
    }

    #[test]
    fn from_empty_stats_uses_defaults() {
        let r = ShipRecord::from_stats("LUNR", &TickerStats::default());
        assert_eq!((r.fit, r.threat, r.firepower), (50.0, 20.0, 50.0));
        assert_eq!(r.upgrade, UpgradeTier::None);
    }

    #[test]
    fn generic_ships_are_unflagged() {
        let r = ShipRecord::generic(2);
        assert_eq!(r.ticker, "DRONE-3");
        assert!(!r.has_mission && !r.is_support && !r.is_elite && !r.is_benchmark);
    }
}
