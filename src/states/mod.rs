use crate::config::{GameConfig, LevelData};
use crate::gameplay::progression::RunOutcome;
use bevy::prelude::*;

#[derive(States, Debug, Clone, Copy, Eq, PartialEq, Hash, Default)]
pub enum GameState {
    #[default]
    Boot,
    MainMenu,
    LevelSelect,
    InRun,
    Pause,
    Victory,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct InSession;

impl ComputedStates for InSession {
    type SourceStates = GameState;

    fn compute(source: GameState) -> Option<Self> {
        matches!(source, GameState::InRun | GameState::Pause).then_some(InSession)
    }
}

/// Ordering inside `OnEnter(InSession)`: `Begin` inserts `RunSession`,
/// `World` builds terrain and bookkeeping from it, `Actors` places the
/// vehicle on the finished ground.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionSetup {
    Begin,
    World,
    Actors,
}

#[derive(Resource, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectedLevel(pub u32);

impl Default for SelectedLevel {
    fn default() -> Self {
        Self(1)
    }
}

#[derive(Resource, Debug, Clone)]
pub struct RunSession {
    pub level_index: u32,
    pub level: LevelData,
    pub seed: u64,
}

pub struct GameStatePlugin;

impl Plugin for GameStatePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SelectedLevel>()
            .add_computed_state::<InSession>()
            .configure_sets(
                OnEnter(InSession),
                (
                    SessionSetup::Begin,
                    SessionSetup::World,
                    SessionSetup::Actors,
                )
                    .chain(),
            )
            .add_systems(Startup, setup_camera)
            .add_systems(
                Update,
                boot_to_main_menu
                    .run_if(in_state(GameState::Boot))
                    .run_if(resource_exists::<GameConfig>),
            )
            .add_systems(OnEnter(GameState::MainMenu), enter_main_menu)
            .add_systems(
                OnEnter(InSession),
                begin_run_session.in_set(SessionSetup::Begin),
            )
            .add_systems(OnExit(InSession), end_run_session)
            .add_systems(
                Update,
                (route_run_outcomes, in_run_controls)
                    .chain()
                    .run_if(in_state(GameState::InRun)),
            )
            .add_systems(OnEnter(GameState::Pause), enter_pause)
            .add_systems(OnExit(GameState::Pause), exit_pause)
            .add_systems(Update, pause_controls.run_if(in_state(GameState::Pause)))
            .add_systems(OnEnter(GameState::Victory), enter_victory)
            .add_systems(
                Update,
                victory_controls
                    .run_if(in_state(GameState::Victory))
                    .run_if(resource_exists::<GameConfig>),
            );
    }
}

pub fn advance_after_victory(selected: &mut SelectedLevel, level_count: u32) -> GameState {
    if selected.0 < level_count {
        selected.0 += 1;
        GameState::InRun
    } else {
        GameState::MainMenu
    }
}

fn setup_camera(mut commands: Commands) {
    commands.spawn((Name::new("MainCamera"), Camera2d));
}

fn boot_to_main_menu(mut next_state: ResMut<NextState<GameState>>) {
    next_state.set(GameState::MainMenu);
}

fn enter_main_menu() {
    info!("Entered state: MainMenu");
}

fn begin_run_session(
    mut commands: Commands,
    config: Res<GameConfig>,
    selected: Res<SelectedLevel>,
) {
    let resolved = config.level(selected.0);
    let seed = rand::random::<u64>();

    info!(
        "Starting level {} ({}), biome {:?}, goal {} m.",
        resolved.index, resolved.data.name, resolved.data.biome, resolved.data.distance_to_finish
    );
    commands.insert_resource(RunSession {
        level_index: resolved.index,
        level: resolved.data,
        seed,
    });
}

fn end_run_session(mut commands: Commands) {
    commands.remove_resource::<RunSession>();
    info!("Run session ended.");
}

fn route_run_outcomes(
    mut outcomes: MessageReader<RunOutcome>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    for outcome in outcomes.read() {
        match outcome {
            RunOutcome::LevelComplete(_) => next_state.set(GameState::Victory),
            RunOutcome::OutOfFuel { .. } => next_state.set(GameState::MainMenu),
        }
    }
}

fn in_run_controls(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    if keyboard.just_pressed(KeyCode::Escape) {
        next_state.set(GameState::Pause);
    }
}

fn enter_pause(mut time: ResMut<Time<Virtual>>) {
    time.pause();
    info!("Entered state: Pause");
}

fn exit_pause(mut time: ResMut<Time<Virtual>>) {
    time.unpause();
}

fn pause_controls(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    if keyboard.just_pressed(KeyCode::Escape) {
        next_state.set(GameState::InRun);
    }

    if keyboard.just_pressed(KeyCode::KeyQ) {
        next_state.set(GameState::MainMenu);
    }
}

fn enter_victory() {
    info!("Entered state: Victory");
}

fn victory_controls(
    keyboard: Res<ButtonInput<KeyCode>>,
    config: Res<GameConfig>,
    mut selected: ResMut<SelectedLevel>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    if keyboard.just_pressed(KeyCode::Enter) || keyboard.just_pressed(KeyCode::Space) {
        next_state.set(advance_after_victory(&mut selected, config.level_count()));
    }

    if keyboard.just_pressed(KeyCode::Escape) {
        next_state.set(GameState::MainMenu);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn victory_advances_to_next_level() {
        let mut selected = SelectedLevel(1);
        assert_eq!(advance_after_victory(&mut selected, 3), GameState::InRun);
        assert_eq!(selected, SelectedLevel(2));
    }

    #[test]
    fn victory_on_last_level_returns_to_menu() {
        let mut selected = SelectedLevel(3);
        assert_eq!(advance_after_victory(&mut selected, 3), GameState::MainMenu);
        assert_eq!(selected, SelectedLevel(3));
    }

    #[test]
    fn session_spans_run_and_pause_only() {
        assert_eq!(InSession::compute(GameState::InRun), Some(InSession));
        assert_eq!(InSession::compute(GameState::Pause), Some(InSession));
        for state in [
            GameState::Boot,
            GameState::MainMenu,
            GameState::LevelSelect,
            GameState::Victory,
        ] {
            assert_eq!(InSession::compute(state), None);
        }
    }
}
