//! Periodic formation choreography.
//!
//! Every interval, elite and mission ships are pulled toward slots around one
//! random interior point and support ships toward a looser line below it.
//! Steering is proportional, so ships may be released before they arrive.

use glam::Vec2;
use rand::Rng;

use crate::config::FormationTuning;
use crate::ship::{FormationSlot, Ship, ShipType};

#[derive(Debug, Clone)]
pub struct FormationController {
    interval_ms: f32,
    elapsed_ms: f32,
    tuning: FormationTuning,
    triggers: u64,
}

/// Horizontal offset of slot `i` out of `n`, centered on zero.
fn slot_offset(i: usize, n: usize, spacing: f32) -> f32 {
    (i as f32 - (n as f32 - 1.0) * 0.5) * spacing
}

impl FormationController {
    /// `interval_ms <= 0` disables formations.
    pub fn new(interval_ms: f32, tuning: FormationTuning) -> Self {
        Self {
            interval_ms,
            elapsed_ms: 0.0,
            tuning,
            triggers: 0,
        }
    }

    /// Number of formations that actually formed.
    pub fn triggers(&self) -> u64 {
        self.triggers
    }

    /// Count down active assignments and fire a new formation when due.
    /// Returns true when a formation formed this frame.
    pub fn advance<R: Rng + ?Sized>(&mut self, ships: &mut [Ship], bounds: Vec2, dt_ms: f32, rng: &mut R) -> bool {
        for ship in ships.iter_mut() {
            if let Some(slot) = ship.formation.as_mut() {
                slot.remaining_ms -= dt_ms;
                if slot.remaining_ms <= 0.0 {
                    ship.release_formation();
                }
            }
        }

        if self.interval_ms <= 0.0 {
            return false;
        }
        self.elapsed_ms += dt_ms;
        if self.elapsed_ms < self.interval_ms {
            return false;
        }
        self.elapsed_ms = 0.0;
        self.trigger(ships, bounds, rng)
    }

    /// Form up now. A no-op (returns false) when there are no leaders.
    pub fn trigger<R: Rng + ?Sized>(&mut self, ships: &mut [Ship], bounds: Vec2, rng: &mut R) -> bool {
        let leaders: Vec<usize> = ships
            .iter()
            .enumerate()
            .filter(|(_, s)| s.kind.is_leader())
            .map(|(i, _)| i)
            .collect();
        if leaders.is_empty() {
            log::trace!("Formation skipped: no leaders");
            return false;
        }

        let t = &self.tuning;
        let center = Vec2::new(
            bounds.x * (0.3 + 0.4 * rng.gen::<f32>()),
            bounds.y * (0.3 + 0.4 * rng.gen::<f32>()),
        );

        let n = leaders.len();
        for (i, &idx) in leaders.iter().enumerate() {
            ships[idx].assign_formation(FormationSlot {
                target: center + Vec2::new(slot_offset(i, n, t.leader_spacing), 0.0),
                gain: t.leader_gain,
                remaining_ms: t.leader_hold_ms,
                max_speed_mult: t.max_speed_mult,
            });
        }

        let support_point = center + Vec2::new(0.0, t.support_drop);
        let support: Vec<usize> = ships
            .iter()
            .enumerate()
            .filter(|(_, s)| s.kind == ShipType::Support)
            .map(|(i, _)| i)
            .collect();
        let m = support.len();
        for (j, &idx) in support.iter().enumerate() {
            let scatter = Vec2::new(
                rng.gen_range(-1.0f32..=1.0) * t.support_scatter,
                rng.gen_range(-1.0f32..=1.0) * t.support_scatter,
            );
            ships[idx].assign_formation(FormationSlot {
                target: support_point + Vec2::new(slot_offset(j, m, t.support_spacing), 0.0) + scatter,
                gain: t.support_gain,
                remaining_ms: t.support_hold_ms,
                max_speed_mult: t.max_speed_mult,
            });
        }

        self.triggers += 1;
        log::debug!("Formation #{}: {} leaders, {} support at {:?}", self.triggers, n, m, center);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ModeConfig, ShipTuning};
    use crate::depth::DepthBandTable;
    use crate::record::ShipRecord;
    use crate::ship::SpawnContext;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn fleet(records: &[ShipRecord]) -> Vec<Ship> {
        let mode = ModeConfig::loading();
        let tuning = ShipTuning::default();
        let bands = DepthBandTable::default();
        let ctx = SpawnContext {
            bounds: Vec2::new(800.0, 600.0),
            mode: &mode,
            tuning: &tuning,
            bands: &bands,
        };
        let mut rng = StdRng::seed_from_u64(42);
        records.iter().map(|r| Ship::new(r, None, None, &ctx, &mut rng)).collect()
    }

    #[test]
    fn no_leaders_is_a_noop() {
        let mut ships = fleet(&[ShipRecord::new("A"), ShipRecord::new("B").support(true)]);
        let mut ctl = FormationController::new(1000.0, FormationTuning::default());
        let mut rng = StdRng::seed_from_u64(1);
        assert!(!ctl.advance(&mut ships, Vec2::new(800.0, 600.0), 1500.0, &mut rng));
        assert!(ships.iter().all(|s| !s.in_formation()));
        assert_eq!(ctl.triggers(), 0);
    }

    #[test]
    fn fires_on_interval_and_assigns_leaders_and_support() {
        let mut ships = fleet(&[
            ShipRecord::new("E").elite(true),
            ShipRecord::new("M").mission(true),
            ShipRecord::new("S").support(true),
            ShipRecord::new("N"),
        ]);
        let mut ctl = FormationController::new(4000.0, FormationTuning::default());
        let mut rng = StdRng::seed_from_u64(2);
        let bounds = Vec2::new(800.0, 600.0);

        assert!(!ctl.advance(&mut ships, bounds, 3999.0, &mut rng));
        assert!(ctl.advance(&mut ships, bounds, 1.0, &mut rng));

        assert!(ships[0].in_formation() && ships[1].in_formation() && ships[2].in_formation());
        assert!(!ships[3].in_formation());

        let a = ships[0].formation_target().unwrap();
        let b = ships[1].formation_target().unwrap();
        assert_eq!(a.y, b.y);
        assert!(((a.x - b.x).abs() - 48.0).abs() < 1e-3);
        let s = ships[2].formation_target().unwrap();
        assert!(s.y > a.y + 50.0, "support slot should sit below the leaders");
    }

    #[test]
    fn leaders_release_before_support() {
        let mut ships = fleet(&[ShipRecord::new("E").elite(true), ShipRecord::new("S").support(true)]);
        let mut ctl = FormationController::new(0.0, FormationTuning::default());
        let mut rng = StdRng::seed_from_u64(3);
        let bounds = Vec2::new(800.0, 600.0);
        assert!(ctl.trigger(&mut ships, bounds, &mut rng));

        ctl.advance(&mut ships, bounds, 2000.0, &mut rng);
        assert!(!ships[0].in_formation());
        assert!(ships[1].in_formation());

        ctl.advance(&mut ships, bounds, 500.0, &mut rng);
        assert!(!ships[1].in_formation());
    }

    #[test]
    fn disabled_interval_never_fires() {
        let mut ships = fleet(&[ShipRecord::new("E").elite(true)]);
        let mut ctl = FormationController::new(0.0, FormationTuning::default());
        let mut rng = StdRng::seed_from_u64(4);
        for _ in 0..100 {
            assert!(!ctl.advance(&mut ships, Vec2::new(800.0, 600.0), 1000.0, &mut rng));
        }
    }

    #[test]
    fn slot_offsets_are_centered() {
        assert_eq!(slot_offset(0, 1, 50.0), 0.0);
        assert_eq!(slot_offset(0, 3, 50.0), -50.0);
        assert_eq!(slot_offset(2, 3, 50.0), 50.0);
    }
}
