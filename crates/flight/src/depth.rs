//! Depth bands: far/mid/near parallax tiers assigned once per ship.

use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DepthBand {
    Far,
    Mid,
    Near,
}

impl DepthBand {
    pub const ALL: [DepthBand; 3] = [DepthBand::Far, DepthBand::Mid, DepthBand::Near];

    pub fn name(self) -> &'static str {
        match self {
            DepthBand::Far => "far",
            DepthBand::Mid => "mid",
            DepthBand::Near => "near",
        }
    }
}

/// Visual ranges of one band. Ranges are `(min, max)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandSpec {
    /// Spawn probability weight.
    pub weight: f32,
    pub scale: (f32, f32),
    pub opacity: (f32, f32),
    pub speed_mult: f32,
}

impl BandSpec {
    pub fn sample_scale<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        sample_range(self.scale, rng)
    }

    pub fn sample_opacity<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        sample_range(self.opacity, rng)
    }
}

/// Uniform draw from `(min, max)`; degenerate ranges return `min`.
pub(crate) fn sample_range<R: Rng + ?Sized>(range: (f32, f32), rng: &mut R) -> f32 {
    let (lo, hi) = range;
    if hi > lo {
        rng.gen_range(lo..hi)
    } else {
        lo
    }
}

/// Static band configuration. Far ships are small, dim, slow and common;
/// near ships are large, bright and rare.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DepthBandTable {
    pub far: BandSpec,
    pub mid: BandSpec,
    pub near: BandSpec,
}

impl Default for DepthBandTable {
    fn default() -> Self {
        Self {
            far: BandSpec {
                weight: 0.45,
                scale: (0.35, 0.55),
                opacity: (0.30, 0.50),
                speed_mult: 0.5,
            },
            mid: BandSpec {
                weight: 0.45,
                scale: (0.60, 0.85),
                opacity: (0.55, 0.80),
                speed_mult: 0.8,
            },
            near: BandSpec {
                weight: 0.10,
                scale: (1.00, 1.35),
                opacity: (0.85, 1.00),
                speed_mult: 1.25,
            },
        }
    }
}

impl DepthBandTable {
    pub fn spec(&self, band: DepthBand) -> &BandSpec {
        match band {
            DepthBand::Far => &self.far,
            DepthBand::Mid => &self.mid,
            DepthBand::Near => &self.near,
        }
    }

    /// Weighted draw: far below the far weight, mid below far+mid, else near.
    /// Weights are normalized, so they need not sum to one.
    pub fn allocate<R: Rng + ?Sized>(&self, rng: &mut R) -> DepthBand {
        let far = self.far.weight.max(0.0);
        let mid = self.mid.weight.max(0.0);
        let near = self.near.weight.max(0.0);
        let total = far + mid + near;
        if total <= 0.0 {
            return DepthBand::Mid;
        }
        let r = rng.gen::<f32>() * total;
        if r < far {
            DepthBand::Far
        } else if r < far + mid {
            DepthBand::Mid
        } else {
            DepthBand::Near
        }
    }
}
