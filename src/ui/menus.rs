use crate::config::GameConfig;
use crate::gameplay::progression::LevelResult;
use crate::save::SaveData;
use crate::states::{advance_after_victory, GameState, SelectedLevel};
use crate::tween::{Easing, Tween};
use bevy::app::AppExit;
use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts};

const MENU_WIDTH: f32 = 320.0;
const VICTORY_SLIDE_FROM: f32 = -360.0;
const VICTORY_SLIDE_SECONDS: f32 = 0.6;
const STAR_COUNT: u8 = 3;

#[derive(Resource, Debug, Clone, Copy)]
pub(super) struct VictorySlide(Tween);

pub(super) fn star_string(stars: u8) -> String {
    (0..STAR_COUNT)
        .map(|slot| if slot < stars { '★' } else { '☆' })
        .collect()
}

fn menu_window(title: &str) -> egui::Window<'static> {
    egui::Window::new(title)
        .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
        .collapsible(false)
        .resizable(false)
        .default_width(MENU_WIDTH)
}

fn wide_button(ui: &mut egui::Ui, enabled: bool, label: impl Into<egui::WidgetText>) -> bool {
    add_wide_button(ui, enabled, label).clicked()
}

fn add_wide_button(
    ui: &mut egui::Ui,
    enabled: bool,
    label: impl Into<egui::WidgetText>,
) -> egui::Response {
    ui.add_enabled(
        enabled,
        egui::Button::new(label).min_size(egui::vec2(MENU_WIDTH - 24.0, 32.0)),
    )
}

pub(super) fn main_menu_ui(
    mut egui_contexts: EguiContexts,
    save: Res<SaveData>,
    mut next_state: ResMut<NextState<GameState>>,
    mut exit: MessageWriter<AppExit>,
) {
    let Ok(ctx) = egui_contexts.ctx_mut() else {
        return;
    };

    menu_window("Hill Courier").show(ctx, |ui| {
        ui.vertical_centered(|ui| {
            ui.label(format!("Coins: {}", save.coins));
            ui.label(format!("Best distance: {}m", save.best_distance));
            ui.add_space(8.0);

            if wide_button(ui, true, "Play") {
                next_state.set(GameState::LevelSelect);
            }
            if wide_button(ui, true, "Quit") {
                exit.write(AppExit::Success);
            }
        });
    });
}

pub(super) fn level_select_ui(
    mut egui_contexts: EguiContexts,
    config: Res<GameConfig>,
    save: Res<SaveData>,
    mut selected: ResMut<SelectedLevel>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    let Ok(ctx) = egui_contexts.ctx_mut() else {
        return;
    };

    menu_window("Select Level").show(ctx, |ui| {
        ui.vertical_centered(|ui| {
            for (slot, level) in config.levels.iter().enumerate() {
                let level_index = slot as u32 + 1;
                let unlocked = save.is_unlocked(level_index);
                let label = if unlocked {
                    format!(
                        "{level_index}. {}  {}",
                        level.name,
                        star_string(save.stars_for(level_index))
                    )
                } else {
                    format!("{level_index}. {}  (locked)", level.name)
                };

                let button = add_wide_button(ui, unlocked, label);
                let button = if level.description.is_empty() {
                    button
                } else {
                    button.on_hover_text(level.description.as_str())
                };
                if button.clicked() {
                    selected.0 = level_index;
                    next_state.set(GameState::InRun);
                }
            }

            ui.add_space(8.0);
            if wide_button(ui, true, "Back") {
                next_state.set(GameState::MainMenu);
            }
        });
    });
}

pub(super) fn pause_ui(
    mut egui_contexts: EguiContexts,
    mut next_state: ResMut<NextState<GameState>>,
) {
    let Ok(ctx) = egui_contexts.ctx_mut() else {
        return;
    };

    menu_window("Paused").show(ctx, |ui| {
        ui.vertical_centered(|ui| {
            if wide_button(ui, true, "Resume") {
                next_state.set(GameState::InRun);
            }
            if wide_button(ui, true, "Main Menu") {
                next_state.set(GameState::MainMenu);
            }
        });
    });
}

pub(super) fn start_victory_slide(mut commands: Commands) {
    let mut slide = Tween::at(VICTORY_SLIDE_FROM);
    slide.animate_to(0.0, VICTORY_SLIDE_SECONDS, Easing::EaseOutCubic);
    commands.insert_resource(VictorySlide(slide));
}

pub(super) fn clear_victory_slide(mut commands: Commands) {
    commands.remove_resource::<VictorySlide>();
}

pub(super) fn victory_ui(
    mut egui_contexts: EguiContexts,
    time: Res<Time>,
    config: Res<GameConfig>,
    save: Res<SaveData>,
    slide: Option<ResMut<VictorySlide>>,
    mut selected: ResMut<SelectedLevel>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    let Ok(ctx) = egui_contexts.ctx_mut() else {
        return;
    };
    let offset = slide.map_or(0.0, |mut slide| slide.0.advance(time.delta_secs()));
    let has_next = selected.0 < config.level_count();

    egui::Window::new("Level Complete")
        .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, offset))
        .collapsible(false)
        .resizable(false)
        .default_width(MENU_WIDTH)
        .show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                match save.last_result.as_ref() {
                    Some(result) => result_summary(ui, result),
                    None => {
                        ui.label("No result recorded.");
                    }
                }
                ui.add_space(8.0);

                if wide_button(ui, has_next, "Next Level") {
                    next_state.set(advance_after_victory(&mut selected, config.level_count()));
                }
                if wide_button(ui, true, "Main Menu") {
                    next_state.set(GameState::MainMenu);
                }
            });
        });
}

fn result_summary(ui: &mut egui::Ui, result: &LevelResult) {
    ui.heading(egui::RichText::new(star_string(result.stars)).size(32.0));
    ui.label(format!("Level {}", result.level_index));
    ui.label(format!("Distance: {}m", result.distance));
    ui.label(format!("Fuel left: {:.0}%", result.fuel_remaining * 100.0));
    ui.label(egui::RichText::new(format!("Score: {}", result.score)).strong());
}
