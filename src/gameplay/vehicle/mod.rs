pub mod drive;
pub mod input;

use crate::config::{CameraConfig, DriveAxle, GameConfig, VehicleConfig};
use crate::gameplay::progression::ProgressionController;
use crate::gameplay::terrain::{TerrainState, TerrainSystems};
use crate::states::{GameState, InSession, RunSession, SessionSetup};
use bevy::prelude::*;
use bevy_rapier2d::prelude::*;
use drive::{decide_drive, wheel_in_contact, wheel_torque, ChassisSample, DriveMode};
use input::{PedalBindings, PedalInput, TouchPedals};

const SPAWN_X: f32 = 6.0;
const CHASSIS_Z: f32 = 10.0;
const WHEEL_Z: f32 = 11.0;
const CAMERA_Z: f32 = 999.9;

pub struct VehicleGameplayPlugin;

impl Plugin for VehicleGameplayPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PedalInput>()
            .init_resource::<PedalBindings>()
            .init_resource::<TouchPedals>()
            .init_resource::<VehicleTelemetry>()
            .add_systems(
                OnEnter(InSession),
                (configure_camera_units, spawn_vehicle).in_set(SessionSetup::Actors),
            )
            .add_systems(
                OnExit(InSession),
                (cleanup_vehicle, input::reset_pedal_input),
            )
            .add_systems(
                Update,
                (
                    input::read_touch_pedals,
                    input::read_pedal_input,
                    camera_follow_vehicle,
                )
                    .chain()
                    .run_if(in_state(GameState::InRun))
                    .run_if(resource_exists::<GameConfig>),
            )
            .add_systems(
                FixedUpdate,
                (update_wheel_contacts, apply_drive_forces)
                    .chain()
                    .after(TerrainSystems)
                    .run_if(in_state(GameState::InRun))
                    .run_if(resource_exists::<RunSession>),
            );
    }
}

#[derive(Component)]
pub struct PlayerVehicle;

#[derive(Component, Debug, Clone, Copy)]
pub struct VehicleWheel {
    pub axle: DriveAxle,
    pub radius: f32,
}

#[derive(Component, Debug, Clone, Copy, Default)]
pub struct WheelContact {
    pub grounded: bool,
}

#[derive(Resource, Debug, Clone)]
pub struct VehicleTelemetry {
    pub speed_mps: f32,
    pub on_ground: bool,
    pub mode: DriveMode,
}

impl Default for VehicleTelemetry {
    fn default() -> Self {
        Self {
            speed_mps: 0.0,
            on_ground: false,
            mode: DriveMode::Idle,
        }
    }
}

pub fn wheel_surface(level_friction: f32, tuning: &VehicleConfig) -> (Friction, Restitution) {
    (
        Friction::coefficient(level_friction.max(0.0)),
        Restitution::coefficient(tuning.wheel_restitution),
    )
}

fn configure_camera_units(
    config: Res<GameConfig>,
    mut camera_query: Query<&mut Projection, With<Camera2d>>,
) {
    let Ok(mut projection) = camera_query.single_mut() else {
        return;
    };

    if let Projection::Orthographic(ortho) = &mut *projection {
        ortho.scale = config.game.camera.ortho_scale;
    }
}

fn spawn_vehicle(
    mut commands: Commands,
    config: Res<GameConfig>,
    session: Res<RunSession>,
    terrain: Option<Res<TerrainState>>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<ColorMaterial>>,
    mut telemetry: ResMut<VehicleTelemetry>,
) {
    let Some(vehicle) = config.default_vehicle() else {
        error!(
            "Vehicle `{}` is missing from config; cannot spawn the player.",
            config.game.app.default_vehicle
        );
        return;
    };
    *telemetry = VehicleTelemetry::default();

    let ground_y = terrain
        .as_ref()
        .and_then(|terrain| terrain.stream.surface_height_at(SPAWN_X))
        .unwrap_or(0.0);
    let chassis_half_extents = Vec2::from(vehicle.chassis_half_extents);
    let chassis_position = Vec2::new(SPAWN_X, ground_y + vehicle.spawn_height);
    let level = &session.level;

    let chassis = commands
        .spawn((
            Name::new("PlayerVehicle"),
            PlayerVehicle,
            Sprite::from_color(Color::srgb(0.93, 0.34, 0.24), chassis_half_extents * 2.0),
            Transform::from_xyz(chassis_position.x, chassis_position.y, CHASSIS_Z),
        ))
        .insert((
            RigidBody::Dynamic,
            Collider::cuboid(chassis_half_extents.x, chassis_half_extents.y),
            ColliderMassProperties::Density(vehicle.chassis_density),
            Friction::coefficient(0.6),
            Restitution::coefficient(0.02),
            GravityScale(level.gravity_scale),
            Velocity::zero(),
            ExternalForce::default(),
            Damping {
                linear_damping: vehicle.linear_damping,
                angular_damping: vehicle.angular_damping,
            },
            Ccd::enabled(),
            Sleeping::disabled(),
        ))
        .id();

    let wheel_mesh = meshes.add(Circle::new(vehicle.wheel_radius));
    let wheel_material = materials.add(ColorMaterial::from(Color::srgb(0.16, 0.17, 0.19)));

    for (axle, offset) in [
        (DriveAxle::Front, vehicle.front_wheel_offset),
        (DriveAxle::Rear, vehicle.rear_wheel_offset),
    ] {
        let offset = Vec2::from(offset);
        let wheel_position = chassis_position + offset;
        let (friction, restitution) = wheel_surface(level.friction, vehicle);
        let joint = RevoluteJointBuilder::new()
            .local_anchor1(offset)
            .local_anchor2(Vec2::ZERO);

        commands
            .spawn((
                Name::new(format!("PlayerWheel{axle:?}")),
                VehicleWheel {
                    axle,
                    radius: vehicle.wheel_radius,
                },
                WheelContact::default(),
                Mesh2d(wheel_mesh.clone()),
                MeshMaterial2d(wheel_material.clone()),
                Transform::from_xyz(wheel_position.x, wheel_position.y, WHEEL_Z),
            ))
            .insert((
                RigidBody::Dynamic,
                Collider::ball(vehicle.wheel_radius),
                ColliderMassProperties::Density(vehicle.wheel_density),
                friction,
                restitution,
                GravityScale(level.gravity_scale),
                Velocity::zero(),
                ExternalForce::default(),
                Ccd::enabled(),
                Sleeping::disabled(),
                ImpulseJoint::new(chassis, joint),
            ));
    }

    info!(
        "Spawned `{}` at x = {:.1}, y = {:.1} (gravity x{:.2}, friction {:.2}).",
        vehicle.id, chassis_position.x, chassis_position.y, level.gravity_scale, level.friction
    );
}

#[allow(clippy::type_complexity)]
fn cleanup_vehicle(
    mut commands: Commands,
    cleanup_query: Query<Entity, Or<(With<PlayerVehicle>, With<VehicleWheel>)>>,
) {
    for entity in &cleanup_query {
        commands.entity(entity).try_despawn();
    }
}

fn update_wheel_contacts(
    config: Res<GameConfig>,
    terrain: Option<Res<TerrainState>>,
    mut wheel_query: Query<(&Transform, &VehicleWheel, &mut WheelContact)>,
) {
    let epsilon = config
        .default_vehicle()
        .map(|vehicle| vehicle.ground_contact_epsilon)
        .unwrap_or(0.05);

    for (transform, wheel, mut contact) in &mut wheel_query {
        let center = transform.translation.truncate();
        let ground = terrain
            .as_ref()
            .and_then(|terrain| terrain.stream.surface_height_at(center.x));
        contact.grounded = wheel_in_contact(center, wheel.radius, ground, epsilon);
    }
}

#[allow(clippy::type_complexity)]
fn apply_drive_forces(
    config: Res<GameConfig>,
    pedals: Res<PedalInput>,
    progression: Option<Res<ProgressionController>>,
    mut telemetry: ResMut<VehicleTelemetry>,
    mut chassis_query: Query<(&Velocity, &mut ExternalForce), With<PlayerVehicle>>,
    mut wheel_query: Query<
        (&VehicleWheel, &WheelContact, &Velocity, &mut ExternalForce),
        Without<PlayerVehicle>,
    >,
) {
    let Some(vehicle) = config.default_vehicle() else {
        return;
    };
    let Ok((chassis_velocity, mut chassis_force)) = chassis_query.single_mut() else {
        return;
    };

    let on_ground = wheel_query.iter().any(|(_, contact, _, _)| contact.grounded);
    let fuel_empty = progression.is_some_and(|progression| progression.is_fuel_empty());
    let command = decide_drive(
        &pedals,
        ChassisSample {
            forward_speed: chassis_velocity.linvel.x,
            on_ground,
            fuel_empty,
        },
        vehicle,
    );

    chassis_force.torque = command.body_torque;
    for (wheel, _, wheel_velocity, mut wheel_force) in &mut wheel_query {
        let action = if wheel.axle == vehicle.drive_axle {
            command.drive_wheel
        } else {
            command.second_wheel
        };
        wheel_force.torque = wheel_torque(action, wheel_velocity.angvel, vehicle);
    }

    telemetry.speed_mps = chassis_velocity.linvel.x;
    telemetry.on_ground = on_ground;
    telemetry.mode = command.mode;
}

fn camera_follow_vehicle(
    config: Res<GameConfig>,
    player_query: Query<&Transform, With<PlayerVehicle>>,
    mut camera_query: Query<&mut Transform, (With<Camera2d>, Without<PlayerVehicle>)>,
) {
    let Ok(player_transform) = player_query.single() else {
        return;
    };
    let Ok(mut camera_transform) = camera_query.single_mut() else {
        return;
    };

    let target = camera_target(player_transform.translation.truncate(), &config.game.camera);
    camera_transform.translation.x = target.x;
    camera_transform.translation.y = target.y;
    camera_transform.translation.z = CAMERA_Z;
}

fn camera_target(player: Vec2, camera: &CameraConfig) -> Vec2 {
    Vec2::new(player.x + camera.look_ahead, player.y + camera.height_offset)
}
