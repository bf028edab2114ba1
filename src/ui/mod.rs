mod menus;

use crate::config::GameConfig;
use crate::gameplay::progression::ProgressionController;
use crate::gameplay::vehicle::drive::DriveMode;
use crate::gameplay::vehicle::input::TouchPedals;
use crate::gameplay::vehicle::VehicleTelemetry;
use crate::save::SaveData;
use crate::states::{GameState, InSession};
use crate::tween::{Easing, Tween};
use bevy::prelude::*;
use bevy_egui::EguiPrimaryContextPass;

const HUD_PANEL_Z_INDEX: i32 = 190;
const HUD_PANEL_BG: Color = Color::srgba(0.06, 0.09, 0.12, 0.86);
const HUD_PANEL_BORDER: Color = Color::srgba(0.58, 0.68, 0.76, 0.92);
const HUD_TEXT_PRIMARY: Color = Color::srgb(0.94, 0.97, 1.0);
const HUD_TEXT_MUTED: Color = Color::srgb(0.76, 0.83, 0.9);
const FUEL_BAR_WIDTH_PX: f32 = 220.0;
const LOW_FUEL_PULSE_SECONDS: f32 = 0.45;
const TOUCH_BUTTON_IDLE_ALPHA: f32 = 0.10;
const TOUCH_BUTTON_ACTIVE_ALPHA: f32 = 0.26;

pub struct GameUiPlugin;

impl Plugin for GameUiPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(OnEnter(InSession), (spawn_game_hud, spawn_touch_controls))
            .add_systems(OnExit(InSession), cleanup_game_hud)
            .add_systems(
                Update,
                (update_game_hud, update_low_fuel_indicator, update_touch_controls)
                    .run_if(in_state(InSession))
                    .run_if(resource_exists::<GameConfig>),
            )
            .add_systems(OnEnter(GameState::Victory), menus::start_victory_slide)
            .add_systems(OnExit(GameState::Victory), menus::clear_victory_slide)
            .add_systems(
                EguiPrimaryContextPass,
                (
                    menus::main_menu_ui.run_if(in_state(GameState::MainMenu)),
                    menus::level_select_ui.run_if(in_state(GameState::LevelSelect)),
                    menus::pause_ui.run_if(in_state(GameState::Pause)),
                    menus::victory_ui.run_if(in_state(GameState::Victory)),
                )
                    .run_if(resource_exists::<GameConfig>)
                    .run_if(resource_exists::<SaveData>),
            );
    }
}

#[derive(Component)]
struct GameHudRoot;

#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
enum HudTextKind {
    Fuel,
    Distance,
    Level,
    Coins,
    BestDistance,
    Speed,
}

#[derive(Component)]
struct HudFuelFill;

#[derive(Component, Default)]
struct LowFuelIndicator {
    pulse: Tween,
}

#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
enum TouchControlLane {
    Brake,
    Gas,
}

pub fn distance_label(current: i32, goal: i32) -> String {
    if goal > 0 {
        format!("{current}m / {goal}m")
    } else {
        format!("{current}m")
    }
}

fn hud_text(kind: HudTextKind, value: &str, font_size: f32, color: Color) -> impl Bundle {
    (
        kind,
        Text::new(value),
        TextFont {
            font_size,
            ..default()
        },
        TextColor(color),
    )
}

fn spawn_game_hud(mut commands: Commands, existing_hud: Query<Entity, With<GameHudRoot>>) {
    if !existing_hud.is_empty() {
        return;
    }

    commands
        .spawn((
            Name::new("GameHudRoot"),
            GameHudRoot,
            Node {
                position_type: PositionType::Absolute,
                left: Val::Px(12.0),
                right: Val::Px(12.0),
                top: Val::Px(10.0),
                justify_content: JustifyContent::SpaceBetween,
                align_items: AlignItems::FlexStart,
                ..default()
            },
            ZIndex(HUD_PANEL_Z_INDEX),
        ))
        .with_children(|root| {
            root.spawn((
                Name::new("GameHudFuelPanel"),
                Node {
                    flex_direction: FlexDirection::Column,
                    row_gap: Val::Px(6.0),
                    padding: UiRect::all(Val::Px(12.0)),
                    border: UiRect::all(Val::Px(1.0)),
                    ..default()
                },
                BackgroundColor(HUD_PANEL_BG),
                BorderColor::all(HUD_PANEL_BORDER),
            ))
            .with_children(|panel| {
                panel.spawn(hud_text(HudTextKind::Fuel, "FUEL 100%", 22.0, HUD_TEXT_PRIMARY));
                panel
                    .spawn((
                        Name::new("HudFuelBar"),
                        Node {
                            width: Val::Px(FUEL_BAR_WIDTH_PX),
                            height: Val::Px(14.0),
                            border: UiRect::all(Val::Px(1.0)),
                            ..default()
                        },
                        BackgroundColor(Color::srgba(0.02, 0.03, 0.04, 0.84)),
                        BorderColor::all(Color::srgba(0.56, 0.64, 0.70, 0.9)),
                    ))
                    .with_children(|bar| {
                        bar.spawn((
                            HudFuelFill,
                            Node {
                                width: Val::Px(FUEL_BAR_WIDTH_PX),
                                height: Val::Percent(100.0),
                                ..default()
                            },
                            BackgroundColor(Color::srgb(0.38, 0.90, 0.34)),
                        ));
                    });
                panel.spawn(hud_text(HudTextKind::Speed, "0 km/h", 16.0, HUD_TEXT_MUTED));
                panel.spawn((
                    Name::new("LowFuelIndicator"),
                    LowFuelIndicator::default(),
                    Text::new("LOW FUEL"),
                    TextFont {
                        font_size: 18.0,
                        ..default()
                    },
                    TextColor(Color::srgb(1.0, 0.28, 0.2)),
                    Visibility::Hidden,
                ));
            });

            root.spawn((
                Name::new("GameHudProgressPanel"),
                Node {
                    flex_direction: FlexDirection::Column,
                    align_items: AlignItems::FlexEnd,
                    row_gap: Val::Px(4.0),
                    padding: UiRect::all(Val::Px(12.0)),
                    border: UiRect::all(Val::Px(1.0)),
                    ..default()
                },
                BackgroundColor(HUD_PANEL_BG),
                BorderColor::all(HUD_PANEL_BORDER),
            ))
            .with_children(|panel| {
                panel.spawn(hud_text(HudTextKind::Distance, "0m", 28.0, HUD_TEXT_PRIMARY));
                panel.spawn(hud_text(HudTextKind::Level, "Level 1", 18.0, HUD_TEXT_MUTED));
                panel.spawn(hud_text(HudTextKind::Coins, "Coins 0", 18.0, HUD_TEXT_MUTED));
                panel.spawn(hud_text(
                    HudTextKind::BestDistance,
                    "Best 0m",
                    16.0,
                    HUD_TEXT_MUTED,
                ));
            });
        });
}

fn spawn_touch_controls(mut commands: Commands, config: Res<GameConfig>) {
    if !config.game.app.show_touch_controls {
        return;
    }

    commands
        .spawn((
            Name::new("TouchControlsRoot"),
            GameHudRoot,
            Node {
                position_type: PositionType::Absolute,
                left: Val::Px(0.0),
                right: Val::Px(0.0),
                bottom: Val::Px(0.0),
                padding: UiRect::all(Val::Px(14.0)),
                justify_content: JustifyContent::SpaceBetween,
                align_items: AlignItems::FlexEnd,
                ..default()
            },
            ZIndex(HUD_PANEL_Z_INDEX - 10),
        ))
        .with_children(|parent| {
            for (lane, label) in [
                (TouchControlLane::Brake, "BRAKE"),
                (TouchControlLane::Gas, "GAS"),
            ] {
                parent
                    .spawn((
                        Name::new(format!("TouchButton{lane:?}")),
                        lane,
                        Node {
                            width: Val::Percent(48.5),
                            min_height: Val::Px(112.0),
                            border: UiRect::all(Val::Px(1.0)),
                            justify_content: JustifyContent::Center,
                            align_items: AlignItems::Center,
                            ..default()
                        },
                        BackgroundColor(Color::srgba(0.08, 0.12, 0.16, TOUCH_BUTTON_IDLE_ALPHA)),
                        BorderColor::all(Color::srgba(0.72, 0.80, 0.86, 0.38)),
                    ))
                    .with_children(|button| {
                        button.spawn((
                            Text::new(label),
                            TextFont {
                                font_size: 24.0,
                                ..default()
                            },
                            TextColor(Color::srgba(0.92, 0.96, 0.99, 0.78)),
                        ));
                    });
            }
        });
}

fn cleanup_game_hud(mut commands: Commands, hud_query: Query<Entity, With<GameHudRoot>>) {
    for entity in &hud_query {
        commands.entity(entity).try_despawn();
    }
}

fn update_game_hud(
    progression: Option<Res<ProgressionController>>,
    save_data: Option<Res<SaveData>>,
    telemetry: Res<VehicleTelemetry>,
    mut text_query: Query<(&HudTextKind, &mut Text)>,
    mut fuel_fill_query: Query<(&mut Node, &mut BackgroundColor), With<HudFuelFill>>,
) {
    let Some(progression) = progression else {
        return;
    };
    let coins = save_data.map(|save| save.coins).unwrap_or(0);
    let fuel = progression.fuel_level().clamp(0.0, 1.0);

    if let Ok((mut bar_node, mut bar_color)) = fuel_fill_query.single_mut() {
        bar_node.width = Val::Px(FUEL_BAR_WIDTH_PX * fuel);
        let red = (1.0 - fuel).clamp(0.0, 1.0);
        let green = (0.25 + fuel * 0.75).clamp(0.0, 1.0);
        *bar_color = BackgroundColor(Color::srgb(red, green, 0.2));
    }

    for (kind, mut text) in &mut text_query {
        let value = match kind {
            HudTextKind::Fuel => format!("FUEL {}%", progression.fuel_percent()),
            HudTextKind::Distance => {
                distance_label(progression.current_distance(), progression.distance_goal())
            }
            HudTextKind::Level => format!("Level {}", progression.level_index()),
            HudTextKind::Coins => format!("Coins {coins}"),
            HudTextKind::BestDistance => format!("Best {}m", progression.best_distance()),
            HudTextKind::Speed => {
                let status = match (telemetry.mode, telemetry.on_ground) {
                    (DriveMode::Stop, _) => "  BRAKE",
                    (_, false) => "  AIR",
                    _ => "",
                };
                format!("{:.0} km/h{status}", telemetry.speed_mps.abs() * 3.6)
            }
        };
        if text.0 != value {
            text.0 = value;
        }
    }
}

fn update_low_fuel_indicator(
    time: Res<Time>,
    config: Res<GameConfig>,
    progression: Option<Res<ProgressionController>>,
    mut indicator_query: Query<(&mut LowFuelIndicator, &mut Visibility, &mut TextColor)>,
) {
    let Ok((mut indicator, mut visibility, mut color)) = indicator_query.single_mut() else {
        return;
    };
    let threshold = config.game.progression.low_fuel_warning;
    let low_fuel = progression.is_some_and(|progression| progression.is_low_fuel(threshold));

    if !low_fuel {
        *visibility = Visibility::Hidden;
        indicator.pulse = Tween::at(1.0);
        return;
    }
    *visibility = Visibility::Inherited;

    let alpha = indicator.pulse.advance(time.delta_secs());
    if !indicator.pulse.is_animating() {
        let target = if alpha > 0.5 { 0.2 } else { 1.0 };
        indicator
            .pulse
            .animate_to(target, LOW_FUEL_PULSE_SECONDS, Easing::EaseInOutSine);
    }
    color.0 = color.0.with_alpha(alpha);
}

fn update_touch_controls(
    pedals: Res<TouchPedals>,
    mut button_query: Query<(&TouchControlLane, &mut BackgroundColor)>,
) {
    for (lane, mut background) in &mut button_query {
        let pressed = match lane {
            TouchControlLane::Brake => pedals.brake,
            TouchControlLane::Gas => pedals.gas,
        };
        let alpha = if pressed {
            TOUCH_BUTTON_ACTIVE_ALPHA
        } else {
            TOUCH_BUTTON_IDLE_ALPHA
        };
        *background = BackgroundColor(Color::srgba(0.10, 0.20, 0.28, alpha));
    }
}
