use crate::config::{GameConfig, LevelData, ProgressionConfig};
use crate::gameplay::vehicle::PlayerVehicle;
use crate::save::{SaveData, SaveRequested};
use crate::states::{GameState, InSession, RunSession, SessionSetup};
use bevy::prelude::*;
use bevy_rapier2d::prelude::Velocity;
use serde::{Deserialize, Serialize};

pub struct ProgressionGameplayPlugin;

impl Plugin for ProgressionGameplayPlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<RunOutcome>()
            .add_systems(
                OnEnter(InSession),
                begin_progression.in_set(SessionSetup::World),
            )
            .add_systems(OnExit(InSession), end_progression)
            .add_systems(
                Update,
                tick_progression
                    .run_if(in_state(GameState::InRun))
                    .run_if(resource_exists::<ProgressionController>)
                    .run_if(resource_exists::<SaveData>),
            );
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelResult {
    pub level_index: u32,
    pub stars: u8,
    pub score: i32,
    pub distance: i32,
    pub fuel_remaining: f32,
}

#[derive(Message, Debug, Clone, PartialEq)]
pub enum RunOutcome {
    LevelComplete(LevelResult),
    OutOfFuel { level_index: u32, distance: i32 },
}

pub trait ProgressStore {
    fn best_distance(&self) -> i32;
    fn record_best_distance(&mut self, distance: i32) -> bool;
    fn record_level_result(&mut self, result: LevelResult) -> bool;
    fn unlock_level(&mut self, level_index: u32) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerSample {
    pub x: f32,
    pub velocity_x: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressTick {
    pub persist: bool,
    pub outcome: Option<RunOutcome>,
}

pub fn star_rating(fuel_level: f32) -> u8 {
    if fuel_level > 0.8 {
        3
    } else if fuel_level > 0.5 {
        2
    } else {
        1
    }
}

pub fn level_score(fuel_level: f32, distance: i32) -> i32 {
    (fuel_level.max(0.0) * 1000.0).floor() as i32 + distance
}

#[derive(Resource, Debug, Clone)]
pub struct ProgressionController {
    fuel_level: f32,
    fuel_usage_rate: f32,
    current_distance: i32,
    best_distance: i32,
    level_index: u32,
    level_count: u32,
    distance_goal: i32,
    stop_speed_epsilon: f32,
    session_start_x: Option<f32>,
    finished: bool,
    unsaved_best: bool,
}

impl ProgressionController {
    pub fn new(
        level_index: u32,
        level_count: u32,
        level: &LevelData,
        config: &ProgressionConfig,
        best_distance: i32,
    ) -> Self {
        Self {
            fuel_level: 1.0,
            fuel_usage_rate: level.fuel_consumption_rate,
            current_distance: 0,
            best_distance,
            level_index,
            level_count,
            distance_goal: level.distance_to_finish,
            stop_speed_epsilon: config.stop_speed_epsilon,
            session_start_x: None,
            finished: false,
            unsaved_best: false,
        }
    }

    pub fn tick(
        &mut self,
        player: Option<PlayerSample>,
        dt: f32,
        store: &mut impl ProgressStore,
    ) -> ProgressTick {
        let mut tick = ProgressTick::default();
        if self.finished {
            return tick;
        }
        let Some(player) = player else {
            return tick;
        };
        let start_x = *self.session_start_x.get_or_insert(player.x);

        self.fuel_level = (self.fuel_level - self.fuel_usage_rate * dt).max(0.0);
        self.current_distance = (player.x - start_x).round() as i32;

        if self.current_distance > self.best_distance {
            self.best_distance = self.current_distance;
            // Held in memory; written out when the run ends.
            self.unsaved_best |= store.record_best_distance(self.current_distance);
        }

        if self.distance_goal > 0 && self.current_distance >= self.distance_goal {
            let result = LevelResult {
                level_index: self.level_index,
                stars: star_rating(self.fuel_level),
                score: level_score(self.fuel_level, self.current_distance),
                distance: self.current_distance,
                fuel_remaining: self.fuel_level,
            };

            store.record_level_result(result.clone());
            if self.level_index < self.level_count {
                store.unlock_level(self.level_index + 1);
            }
            // last_result always changes, so always flush.
            tick.persist = true;
            self.unsaved_best = false;
            tick.outcome = Some(RunOutcome::LevelComplete(result));
            self.finished = true;
            return tick;
        }

        if self.fuel_level <= 0.0 && player.velocity_x.abs() < self.stop_speed_epsilon {
            tick.outcome = Some(RunOutcome::OutOfFuel {
                level_index: self.level_index,
                distance: self.current_distance,
            });
            tick.persist = self.take_unsaved_best();
            self.finished = true;
        }

        tick
    }

    pub fn refuel(&mut self) {
        self.fuel_level = 1.0;
    }

    pub fn fuel_level(&self) -> f32 {
        self.fuel_level
    }

    pub fn fuel_percent(&self) -> u32 {
        (self.fuel_level * 100.0).round() as u32
    }

    pub fn is_fuel_empty(&self) -> bool {
        self.fuel_level <= 0.0
    }

    pub fn is_low_fuel(&self, threshold: f32) -> bool {
        self.fuel_level > 0.0 && self.fuel_level <= threshold
    }

    pub fn current_distance(&self) -> i32 {
        self.current_distance
    }

    pub fn best_distance(&self) -> i32 {
        self.best_distance
    }

    pub fn distance_goal(&self) -> i32 {
        self.distance_goal
    }

    pub fn level_index(&self) -> u32 {
        self.level_index
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn take_unsaved_best(&mut self) -> bool {
        std::mem::take(&mut self.unsaved_best)
    }
}

fn begin_progression(
    mut commands: Commands,
    config: Res<GameConfig>,
    session: Res<RunSession>,
    save_data: Option<Res<SaveData>>,
) {
    let best_distance = save_data.map(|save| save.best_distance()).unwrap_or(0);
    commands.insert_resource(ProgressionController::new(
        session.level_index,
        config.level_count(),
        &session.level,
        &config.game.progression,
        best_distance,
    ));
}

fn end_progression(mut commands: Commands, mut save_requests: MessageWriter<SaveRequested>) {
    // Coins and best distance accumulate in memory during the run.
    save_requests.write(SaveRequested);
    commands.remove_resource::<ProgressionController>();
}

fn tick_progression(
    time: Res<Time>,
    player_query: Query<(&Transform, &Velocity), With<PlayerVehicle>>,
    mut controller: ResMut<ProgressionController>,
    mut save_data: ResMut<SaveData>,
    mut save_requests: MessageWriter<SaveRequested>,
    mut outcomes: MessageWriter<RunOutcome>,
) {
    let player = player_query
        .single()
        .ok()
        .map(|(transform, velocity)| PlayerSample {
            x: transform.translation.x,
            velocity_x: velocity.linvel.x,
        });

    let tick = controller.tick(player, time.delta_secs(), &mut *save_data);
    if tick.persist {
        save_requests.write(SaveRequested);
    }

    if let Some(outcome) = tick.outcome {
        match &outcome {
            RunOutcome::LevelComplete(result) => info!(
                "Level {} complete: {} m, {} star(s), score {}.",
                result.level_index, result.distance, result.stars, result.score
            ),
            RunOutcome::OutOfFuel {
                level_index,
                distance,
            } => info!("Out of fuel on level {level_index} after {distance} m."),
        }
        outcomes.write(outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;

    #[derive(Default)]
    struct MemoryStore {
        best_distance: i32,
        best_distance_writes: usize,
        results: Vec<LevelResult>,
        unlocked: Vec<u32>,
    }

    impl ProgressStore for MemoryStore {
        fn best_distance(&self) -> i32 {
            self.best_distance
        }

        fn record_best_distance(&mut self, distance: i32) -> bool {
            self.best_distance_writes += 1;
            self.best_distance = self.best_distance.max(distance);
            true
        }

        fn record_level_result(&mut self, result: LevelResult) -> bool {
            self.results.push(result);
            true
        }

        fn unlock_level(&mut self, level_index: u32) -> bool {
            self.unlocked.push(level_index);
            true
        }
    }

    fn controller(distance_to_finish: i32, fuel_consumption_rate: f32) -> ProgressionController {
        let config = test_config();
        let level = LevelData {
            distance_to_finish,
            fuel_consumption_rate,
            ..LevelData::default()
        };
        ProgressionController::new(1, 3, &level, &config.game.progression, 0)
    }

    fn at(x: f32) -> Option<PlayerSample> {
        Some(PlayerSample { x, velocity_x: 5.0 })
    }

    #[test]
    fn fuel_decays_linearly_and_clamps_at_zero() {
        let mut controller = controller(1000, 0.05);
        let mut store = MemoryStore::default();

        for _ in 0..60 {
            controller.tick(at(0.0), 1.0 / 60.0, &mut store);
        }
        assert!((controller.fuel_level() - 0.95).abs() < 1e-4);
        assert_eq!(controller.fuel_percent(), 95);

        for _ in 0..30 {
            controller.tick(at(0.0), 1.0, &mut store);
        }
        assert_eq!(controller.fuel_level(), 0.0);
        assert!(controller.is_fuel_empty());
    }

    #[test]
    fn best_distance_never_decreases() {
        let mut controller = controller(1000, 0.0);
        let mut store = MemoryStore::default();

        for x in [0.0, 10.0, 42.4, 30.0, 5.0, 42.0] {
            controller.tick(at(x), 0.016, &mut store);
        }

        assert_eq!(controller.best_distance(), 42);
        assert_eq!(controller.current_distance(), 42);
        assert_eq!(store.best_distance, 42);
        assert_eq!(store.best_distance_writes, 2);
    }

    #[test]
    fn driving_further_defers_the_disk_flush() {
        let mut controller = controller(1000, 0.0);
        let mut store = MemoryStore::default();

        controller.tick(at(0.0), 0.016, &mut store);
        for step in 1..=200 {
            let tick = controller.tick(at(step as f32 * 0.4), 0.016, &mut store);
            assert!(!tick.persist, "flush requested on step {step}");
        }

        assert_eq!(store.best_distance, 80);
        assert!(store.best_distance_writes > 50);
        assert!(controller.take_unsaved_best());
        assert!(!controller.take_unsaved_best());
    }

    #[test]
    fn running_dry_flushes_the_new_best() {
        let mut controller = controller(1000, 1.0);
        let mut store = MemoryStore::default();

        controller.tick(at(0.0), 0.0, &mut store);
        controller.tick(at(25.0), 2.0, &mut store);
        let stopped = controller.tick(
            Some(PlayerSample {
                x: 25.0,
                velocity_x: 0.0,
            }),
            0.016,
            &mut store,
        );

        assert!(matches!(stopped.outcome, Some(RunOutcome::OutOfFuel { .. })));
        assert!(stopped.persist);
        assert!(!controller.take_unsaved_best());
    }

    #[test]
    fn distance_is_measured_from_first_seen_position() {
        let mut controller = controller(1000, 0.0);
        let mut store = MemoryStore::default();

        let tick = controller.tick(None, 0.5, &mut store);
        assert_eq!(tick, ProgressTick::default());
        assert_eq!(controller.fuel_level(), 1.0);

        controller.tick(at(-20.0), 0.016, &mut store);
        controller.tick(at(-7.6), 0.016, &mut store);
        assert_eq!(controller.current_distance(), 12);
    }

    #[test]
    fn reaching_the_goal_completes_once() {
        let mut controller = controller(100, 0.05);
        let mut store = MemoryStore::default();

        controller.tick(at(0.0), 0.0, &mut store);
        for step in 1..=50 {
            controller.tick(at(step as f32 * 1.9), 0.02, &mut store);
        }
        assert!(!controller.is_finished());

        let tick = controller.tick(at(100.2), 0.0, &mut store);
        let fuel = controller.fuel_level();
        assert!((fuel - 0.95).abs() < 1e-4);

        let Some(RunOutcome::LevelComplete(result)) = tick.outcome else {
            panic!("expected level completion, got {:?}", tick.outcome);
        };
        assert_eq!(result.stars, 3);
        assert_eq!(result.distance, 100);
        assert_eq!(result.score, (fuel * 1000.0).floor() as i32 + 100);
        assert!(tick.persist);
        assert_eq!(store.unlocked, vec![2]);

        let again = controller.tick(at(140.0), 0.02, &mut store);
        assert_eq!(again.outcome, None);
        assert_eq!(store.results.len(), 1);
    }

    #[test]
    fn last_level_does_not_unlock_past_the_end() {
        let config = test_config();
        let level = LevelData {
            distance_to_finish: 10,
            ..LevelData::default()
        };
        let mut controller =
            ProgressionController::new(3, 3, &level, &config.game.progression, 0);
        let mut store = MemoryStore::default();

        controller.tick(at(0.0), 0.0, &mut store);
        let tick = controller.tick(at(10.0), 0.0, &mut store);

        assert!(matches!(tick.outcome, Some(RunOutcome::LevelComplete(_))));
        assert!(store.unlocked.is_empty());
    }

    #[test]
    fn running_dry_and_stopping_fails_the_run() {
        let mut controller = controller(1000, 0.5);
        let mut store = MemoryStore::default();

        controller.tick(at(0.0), 0.0, &mut store);
        let rolling = controller.tick(at(30.0), 2.5, &mut store);
        assert!(controller.is_fuel_empty());
        assert_eq!(rolling.outcome, None);

        let stopped = controller.tick(
            Some(PlayerSample {
                x: 30.0,
                velocity_x: 0.05,
            }),
            0.016,
            &mut store,
        );
        assert_eq!(
            stopped.outcome,
            Some(RunOutcome::OutOfFuel {
                level_index: 1,
                distance: 30
            })
        );

        let after = controller.tick(at(30.0), 0.016, &mut store);
        assert_eq!(after.outcome, None);
    }

    #[test]
    fn zero_goal_never_completes() {
        let mut controller = controller(0, 0.0);
        let mut store = MemoryStore::default();

        controller.tick(at(0.0), 0.0, &mut store);
        let tick = controller.tick(at(5_000.0), 0.016, &mut store);
        assert_eq!(tick.outcome, None);
        assert!(!controller.is_finished());
    }

    #[test]
    fn refuel_restores_full_tank() {
        let mut controller = controller(1000, 0.1);
        let mut store = MemoryStore::default();

        controller.tick(at(0.0), 9.0, &mut store);
        assert!(controller.is_low_fuel(0.2));

        controller.refuel();
        assert_eq!(controller.fuel_percent(), 100);
        assert!(!controller.is_low_fuel(0.2));
    }

    #[test]
    fn star_thresholds_are_exclusive() {
        assert_eq!(star_rating(0.81), 3);
        assert_eq!(star_rating(0.8), 2);
        assert_eq!(star_rating(0.51), 2);
        assert_eq!(star_rating(0.5), 1);
        assert_eq!(star_rating(0.0), 1);
        assert_eq!(level_score(0.5004, 250), 750);
    }
}
