use crate::config::{LevelData, PickupConfig};
use crate::gameplay::terrain::SegmentSink;
use bevy::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickupKind {
    Coin,
    Fuel,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpawnRequest {
    pub kind: PickupKind,
    pub handle: String,
    pub position: Vec2,
}

#[derive(Resource)]
pub struct FeaturePlacer {
    rng: ChaCha8Rng,
    coin_frequency: f32,
    fuel_frequency: f32,
    coin_handle: Option<String>,
    fuel_handle: Option<String>,
    coin_offset: f32,
    fuel_offset: f32,
    pending: Vec<SpawnRequest>,
}

impl FeaturePlacer {
    pub fn new(level: &LevelData, pickups: &PickupConfig, seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            coin_frequency: level.coin_frequency,
            fuel_frequency: level.fuel_frequency,
            coin_handle: level.coin_pickup.clone(),
            fuel_handle: level.fuel_pickup.clone(),
            coin_offset: pickups.coin_offset,
            fuel_offset: pickups.fuel_offset,
            pending: Vec::new(),
        }
    }

    pub fn place(&mut self, x: f32, y: f32) -> Option<SpawnRequest> {
        if let Some(handle) = &self.coin_handle {
            if self.rng.gen::<f32>() < self.coin_frequency {
                return Some(SpawnRequest {
                    kind: PickupKind::Coin,
                    handle: handle.clone(),
                    position: Vec2::new(x, y + self.coin_offset),
                });
            }
        }

        if let Some(handle) = &self.fuel_handle {
            if self.rng.gen::<f32>() < self.fuel_frequency {
                return Some(SpawnRequest {
                    kind: PickupKind::Fuel,
                    handle: handle.clone(),
                    position: Vec2::new(x, y + self.fuel_offset),
                });
            }
        }

        None
    }

    pub fn drain_requests(&mut self) -> std::vec::Drain<'_, SpawnRequest> {
        self.pending.drain(..)
    }

    #[cfg(test)]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

impl SegmentSink for FeaturePlacer {
    fn segment_generated(&mut self, x: f32, y: f32) {
        if let Some(request) = self.place(x, y) {
            self.pending.push(request);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;

    fn placer(coin_frequency: f32, fuel_frequency: f32) -> FeaturePlacer {
        let config = test_config();
        let level = LevelData {
            coin_frequency,
            fuel_frequency,
            ..LevelData::default()
        };
        FeaturePlacer::new(&level, &config.game.pickups, 21)
    }

    #[test]
    fn coin_check_short_circuits_fuel() {
        let mut placer = placer(1.0, 1.0);

        for index in 0..300 {
            placer.segment_generated(index as f32, 2.0);
        }

        let requests: Vec<SpawnRequest> = placer.drain_requests().collect();
        assert_eq!(requests.len(), 300);
        assert!(requests.iter().all(|request| request.kind == PickupKind::Coin));
        assert_eq!(requests[7].position, Vec2::new(7.0, 3.5));
        assert_eq!(placer.pending_len(), 0);
    }

    #[test]
    fn fuel_spawns_when_coin_never_rolls() {
        let mut placer = placer(0.0, 1.0);

        let request = placer.place(4.0, -2.0).expect("fuel expected");
        assert_eq!(request.kind, PickupKind::Fuel);
        assert_eq!(request.handle, "fuel");
        assert_eq!(request.position, Vec2::new(4.0, -1.0));
    }

    #[test]
    fn zero_frequencies_spawn_nothing() {
        let mut placer = placer(0.0, 0.0);
        assert!((0..500).all(|index| placer.place(index as f32, 0.0).is_none()));
    }

    #[test]
    fn missing_handles_disable_their_pickup() {
        let config = test_config();
        let level = LevelData {
            coin_frequency: 1.0,
            fuel_frequency: 1.0,
            coin_pickup: None,
            ..LevelData::default()
        };
        let mut placer = FeaturePlacer::new(&level, &config.game.pickups, 5);

        let request = placer.place(0.0, 0.0).expect("fuel expected");
        assert_eq!(request.kind, PickupKind::Fuel);
    }

    #[test]
    fn spawn_rates_track_frequencies() {
        let mut placer = placer(0.2, 0.25);
        let mut coins = 0;
        let mut fuels = 0;
        for index in 0..20_000 {
            match placer.place(index as f32, 0.0).map(|request| request.kind) {
                Some(PickupKind::Coin) => coins += 1,
                Some(PickupKind::Fuel) => fuels += 1,
                None => {}
            }
        }

        // Fuel only rolls when the coin roll fails: 0.8 * 0.25 = 0.2.
        assert!((3_600..4_400).contains(&coins), "coins {coins}");
        assert!((3_600..4_400).contains(&fuels), "fuels {fuels}");
    }
}
