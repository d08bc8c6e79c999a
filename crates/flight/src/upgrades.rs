//! Upgrade mapper: one-month performance → hull upgrade tier.

use serde::{Deserialize, Serialize};

/// Minimum one-month return (percent) for Mk1, Mk2 and Mk3.
pub const UPGRADE_THRESHOLDS: [f64; 3] = [5.0, 15.0, 30.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum UpgradeTier {
    #[default]
    None,
    Mk1,
    Mk2,
    Mk3,
}

impl UpgradeTier {
    /// Highest tier whose threshold the return reaches. Missing data means no upgrade.
    pub fn from_monthly_return(m1: Option<f64>) -> Self {
        let Some(m1) = m1.filter(|v| v.is_finite()) else {
            return UpgradeTier::None;
        };
        match UPGRADE_THRESHOLDS.iter().rposition(|t| m1 >= *t) {
            Some(2) => UpgradeTier::Mk3,
            Some(1) => UpgradeTier::Mk2,
            Some(_) => UpgradeTier::Mk1,
            None => UpgradeTier::None,
        }
    }

    /// Number of upgrade rings drawn around the ship.
    pub fn rings(self) -> u8 {
        match self {
            UpgradeTier::None => 0,
            UpgradeTier::Mk1 => 1,
            UpgradeTier::Mk2 => 2,
            UpgradeTier::Mk3 => 3,
        }
    }
}
