use crate::config::GameConfig;
use bevy::prelude::*;
use bevy::window::PrimaryWindow;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DampedAxis {
    pub value: f32,
    pub raw: f32,
}

impl DampedAxis {
    pub fn set_raw(&mut self, raw: f32) {
        self.raw = raw.clamp(0.0, 1.0);
    }

    pub fn step(&mut self, rate_per_second: f32, dt: f32) {
        self.value = move_towards(self.value, self.raw, rate_per_second.max(0.0) * dt.max(0.0));
    }
}

#[derive(Resource, Debug, Clone, Copy, Default, PartialEq)]
pub struct PedalInput {
    pub brake: DampedAxis,
    pub gas: DampedAxis,
}

impl PedalInput {
    /// Signed damped command; brake wins over gas, gas is negative.
    pub fn final_value(&self) -> f32 {
        if self.brake.raw > 0.0 {
            self.brake.value
        } else {
            -self.gas.value
        }
    }

    pub fn final_raw(&self) -> f32 {
        if self.brake.raw > 0.0 {
            self.brake.raw
        } else {
            -self.gas.raw
        }
    }

    pub fn is_released(&self) -> bool {
        self.brake.raw == 0.0 && self.gas.raw == 0.0
    }

    pub fn step(&mut self, rate_per_second: f32, dt: f32) {
        self.brake.step(rate_per_second, dt);
        self.gas.step(rate_per_second, dt);
    }
}

#[derive(Resource, Debug, Clone)]
pub struct PedalBindings {
    pub gas: Vec<KeyCode>,
    pub brake: Vec<KeyCode>,
}

impl Default for PedalBindings {
    fn default() -> Self {
        Self {
            gas: vec![KeyCode::KeyD, KeyCode::ArrowRight],
            brake: vec![KeyCode::KeyA, KeyCode::ArrowLeft],
        }
    }
}

#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TouchPedals {
    pub gas: bool,
    pub brake: bool,
}

pub fn pedal_for_pointer(x: f32, window_width: f32) -> TouchPedals {
    let split_x = window_width.max(1.0) * 0.5;
    TouchPedals {
        gas: x >= split_x,
        brake: x < split_x,
    }
}

pub(super) fn read_touch_pedals(
    config: Res<GameConfig>,
    touches: Res<Touches>,
    mouse_buttons: Res<ButtonInput<MouseButton>>,
    window_query: Query<&Window, With<PrimaryWindow>>,
    mut pedals: ResMut<TouchPedals>,
) {
    *pedals = TouchPedals::default();
    if !config.game.app.show_touch_controls {
        return;
    }

    let Ok(window) = window_query.single() else {
        return;
    };
    let width = window.width();

    let mouse_position = mouse_buttons
        .pressed(MouseButton::Left)
        .then(|| window.cursor_position())
        .flatten();
    let pointers = touches
        .iter()
        .map(|touch| touch.position())
        .chain(mouse_position);

    for position in pointers {
        let lane = pedal_for_pointer(position.x, width);
        pedals.gas |= lane.gas;
        pedals.brake |= lane.brake;
    }
}

pub(super) fn read_pedal_input(
    time: Res<Time>,
    keyboard: Res<ButtonInput<KeyCode>>,
    bindings: Res<PedalBindings>,
    touch: Res<TouchPedals>,
    config: Res<GameConfig>,
    mut pedals: ResMut<PedalInput>,
) {
    let gas = touch.gas || bindings.gas.iter().any(|key| keyboard.pressed(*key));
    let brake = touch.brake || bindings.brake.iter().any(|key| keyboard.pressed(*key));

    pedals.gas.set_raw(if gas { 1.0 } else { 0.0 });
    pedals.brake.set_raw(if brake { 1.0 } else { 0.0 });

    let damping = config
        .default_vehicle()
        .map(|vehicle| vehicle.input_damping)
        .unwrap_or(3.0);
    pedals.step(damping, time.delta_secs());
}

pub(super) fn reset_pedal_input(mut pedals: ResMut<PedalInput>, mut touch: ResMut<TouchPedals>) {
    *pedals = PedalInput::default();
    *touch = TouchPedals::default();
}

fn move_towards(current: f32, target: f32, max_delta: f32) -> f32 {
    if (target - current).abs() <= max_delta {
        target
    } else {
        current + (target - current).signum() * max_delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn damped_axis_eases_toward_raw() {
        let mut axis = DampedAxis::default();
        axis.set_raw(1.0);

        axis.step(3.0, 0.1);
        assert!((axis.value - 0.3).abs() < 1e-6);

        for _ in 0..10 {
            axis.step(3.0, 0.1);
        }
        assert_eq!(axis.value, 1.0);

        axis.set_raw(0.0);
        axis.step(3.0, 0.2);
        assert!((axis.value - 0.4).abs() < 1e-6);
    }

    #[test]
    fn gas_is_sign_flipped() {
        let mut pedals = PedalInput::default();
        pedals.gas.set_raw(1.0);
        pedals.step(3.0, 0.25);

        assert_eq!(pedals.final_raw(), -1.0);
        assert!((pedals.final_value() + 0.75).abs() < 1e-6);
    }

    #[test]
    fn brake_takes_precedence_over_gas() {
        let mut pedals = PedalInput::default();
        pedals.gas.set_raw(1.0);
        pedals.step(3.0, 1.0);
        pedals.brake.set_raw(1.0);
        pedals.step(3.0, 0.1);

        assert_eq!(pedals.final_raw(), 1.0);
        assert!((pedals.final_value() - 0.3).abs() < 1e-6);
        assert!(!pedals.is_released());
    }

    #[test]
    fn released_pedals_report_idle() {
        let mut pedals = PedalInput::default();
        pedals.gas.set_raw(1.0);
        pedals.step(3.0, 1.0);
        pedals.gas.set_raw(0.0);

        assert!(pedals.is_released());
        assert!(pedals.gas.value > 0.0);
    }

    #[test]
    fn screen_halves_map_to_pedals() {
        assert_eq!(
            pedal_for_pointer(100.0, 1280.0),
            TouchPedals {
                gas: false,
                brake: true
            }
        );
        assert_eq!(
            pedal_for_pointer(640.0, 1280.0),
            TouchPedals {
                gas: true,
                brake: false
            }
        );
    }
}
