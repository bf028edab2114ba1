mod config;
mod gameplay;
mod save;
mod states;
mod tween;
mod ui;

use bevy::prelude::*;
use bevy_egui::EguiPlugin;
use bevy_rapier2d::prelude::*;
use config::ConfigPlugin;
use gameplay::GameplayPlugin;
use save::SavePlugin;
use states::{GameState, GameStatePlugin};
use ui::GameUiPlugin;

fn main() {
    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Hill Courier".to_string(),
                resolution: (1280, 720).into(),
                ..default()
            }),
            ..default()
        }))
        .add_plugins(EguiPlugin::default())
        .add_plugins(RapierPhysicsPlugin::<NoUserData>::pixels_per_meter(1.0).in_fixed_schedule())
        .add_plugins(ConfigPlugin)
        .add_plugins(SavePlugin)
        .add_plugins(GameplayPlugin)
        .init_state::<GameState>()
        .add_plugins(GameStatePlugin)
        .add_plugins(GameUiPlugin)
        .run();
}
