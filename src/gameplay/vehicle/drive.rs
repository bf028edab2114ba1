use super::input::PedalInput;
use crate::config::VehicleConfig;
use bevy::prelude::*;

// Below this spin (rad/s) braking torque scales with spin.
const BRAKE_HOLD_SPEED: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveMode {
    Stop,
    Idle,
    Drive,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WheelAction {
    Idle,
    Brake,
    Motor { torque: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriveCommand {
    pub mode: DriveMode,
    pub drive_wheel: WheelAction,
    pub second_wheel: WheelAction,
    pub body_torque: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChassisSample {
    pub forward_speed: f32,
    pub on_ground: bool,
    pub fuel_empty: bool,
}

pub fn decide_drive(
    pedals: &PedalInput,
    chassis: ChassisSample,
    tuning: &VehicleConfig,
) -> DriveCommand {
    if pedals.brake.raw == 1.0 && chassis.forward_speed > tuning.stop_speed_threshold {
        return DriveCommand {
            mode: DriveMode::Stop,
            drive_wheel: WheelAction::Brake,
            second_wheel: WheelAction::Brake,
            body_torque: 0.0,
        };
    }

    if pedals.is_released() || chassis.fuel_empty {
        return DriveCommand {
            mode: DriveMode::Idle,
            drive_wheel: WheelAction::Idle,
            second_wheel: WheelAction::Idle,
            body_torque: 0.0,
        };
    }

    let rotation_speed = if chassis.on_ground {
        tuning.on_ground_rotation_speed
    } else {
        tuning.on_air_rotation_speed
    };

    DriveCommand {
        mode: DriveMode::Drive,
        drive_wheel: WheelAction::Motor {
            torque: pedals.final_value() * tuning.motor_torque,
        },
        second_wheel: WheelAction::Idle,
        body_torque: -pedals.final_raw() * rotation_speed,
    }
}

pub fn wheel_torque(action: WheelAction, angular_velocity: f32, tuning: &VehicleConfig) -> f32 {
    match action {
        WheelAction::Idle => 0.0,
        WheelAction::Brake => {
            if angular_velocity.abs() < BRAKE_HOLD_SPEED {
                -angular_velocity / BRAKE_HOLD_SPEED * tuning.brake_torque
            } else {
                -angular_velocity.signum() * tuning.brake_torque
            }
        }
        WheelAction::Motor { torque } => {
            let spin_along_torque = angular_velocity * torque.signum();
            if spin_along_torque >= tuning.max_wheel_speed {
                0.0
            } else {
                torque
            }
        }
    }
}

pub fn wheel_in_contact(
    wheel_center: Vec2,
    wheel_radius: f32,
    ground_height: Option<f32>,
    epsilon: f32,
) -> bool {
    ground_height.is_some_and(|ground| wheel_center.y - wheel_radius - ground <= epsilon)
}
