pub mod placement;

use crate::config::{GameConfig, PickupConfig};
use crate::gameplay::progression::ProgressionController;
use crate::gameplay::terrain::TerrainSystems;
use crate::gameplay::vehicle::PlayerVehicle;
use crate::save::SaveData;
use crate::states::{GameState, InSession, SessionSetup};
use bevy::prelude::*;
use placement::{FeaturePlacer, PickupKind, SpawnRequest};

const PICKUP_Z: f32 = 7.2;
const PICKUP_SPIN_RAD_S: f32 = 1.8;

pub struct PickupGameplayPlugin;

impl Plugin for PickupGameplayPlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<PickupCollectedEvent>()
            .add_systems(
                OnEnter(InSession),
                load_pickup_assets.in_set(SessionSetup::World),
            )
            .add_systems(OnExit(InSession), cleanup_pickups)
            .add_systems(
                FixedUpdate,
                (spawn_requested_pickups, despawn_passed_pickups)
                    .chain()
                    .after(TerrainSystems)
                    .run_if(in_state(GameState::InRun))
                    .run_if(resource_exists::<FeaturePlacer>),
            )
            .add_systems(
                Update,
                (spin_pickups, collect_pickups, apply_pickup_effects)
                    .chain()
                    .run_if(in_state(GameState::InRun))
                    .run_if(resource_exists::<GameConfig>),
            );
    }
}

#[derive(Message, Debug, Clone, Copy)]
pub struct PickupCollectedEvent {
    pub kind: PickupKind,
    pub coins_added: u32,
}

#[derive(Component, Debug, Clone, Copy)]
pub struct Pickup {
    pub kind: PickupKind,
    pub radius: f32,
}

#[derive(Resource)]
struct PickupAssets {
    coin_mesh: Handle<Mesh>,
    coin_material: Handle<ColorMaterial>,
    fuel_size: Vec2,
    coin_radius: f32,
}

pub fn is_left_behind(pickup_x: f32, player_x: f32, despawn_behind: f32) -> bool {
    pickup_x < player_x - despawn_behind
}

pub fn within_reach(pickup: Vec2, player: Vec2, pickup_radius: f32, collection_radius: f32) -> bool {
    pickup.distance_squared(player) <= (pickup_radius + collection_radius).powi(2)
}

fn load_pickup_assets(
    mut commands: Commands,
    config: Res<GameConfig>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<ColorMaterial>>,
) {
    let pickups: &PickupConfig = &config.game.pickups;
    commands.insert_resource(PickupAssets {
        coin_mesh: meshes.add(Circle::new(pickups.coin_radius)),
        coin_material: materials.add(ColorMaterial::from(Color::srgb(0.96, 0.79, 0.18))),
        fuel_size: Vec2::splat(pickups.fuel_size),
        coin_radius: pickups.coin_radius,
    });
}

fn cleanup_pickups(mut commands: Commands, pickup_query: Query<Entity, With<Pickup>>) {
    for entity in &pickup_query {
        commands.entity(entity).try_despawn();
    }
    commands.remove_resource::<PickupAssets>();
}

fn spawn_requested_pickups(
    mut commands: Commands,
    mut placer: ResMut<FeaturePlacer>,
    assets: Option<Res<PickupAssets>>,
) {
    let Some(assets) = assets else {
        return;
    };

    for request in placer.drain_requests() {
        spawn_pickup(&mut commands, &assets, request);
    }
}

fn spawn_pickup(commands: &mut Commands, assets: &PickupAssets, request: SpawnRequest) {
    let transform = Transform::from_xyz(request.position.x, request.position.y, PICKUP_Z);
    let name = Name::new(format!("Pickup:{}", request.handle));

    match request.kind {
        PickupKind::Coin => {
            commands.spawn((
                name,
                Pickup {
                    kind: PickupKind::Coin,
                    radius: assets.coin_radius,
                },
                Mesh2d(assets.coin_mesh.clone()),
                MeshMaterial2d(assets.coin_material.clone()),
                transform,
            ));
        }
        PickupKind::Fuel => {
            commands.spawn((
                name,
                Pickup {
                    kind: PickupKind::Fuel,
                    radius: assets.fuel_size.x * 0.5,
                },
                Sprite::from_color(Color::srgb(0.86, 0.16, 0.14), assets.fuel_size),
                transform,
            ));
        }
    }
}

fn despawn_passed_pickups(
    mut commands: Commands,
    config: Res<GameConfig>,
    player_query: Query<&Transform, With<PlayerVehicle>>,
    pickup_query: Query<(Entity, &Transform), (With<Pickup>, Without<PlayerVehicle>)>,
) {
    let Ok(player_transform) = player_query.single() else {
        return;
    };
    let player_x = player_transform.translation.x;

    for (entity, transform) in &pickup_query {
        if is_left_behind(
            transform.translation.x,
            player_x,
            config.game.pickups.despawn_behind,
        ) {
            commands.entity(entity).try_despawn();
        }
    }
}

fn spin_pickups(time: Res<Time>, mut pickup_query: Query<(&Pickup, &mut Transform)>) {
    for (pickup, mut transform) in &mut pickup_query {
        if pickup.kind == PickupKind::Coin {
            let phase = time.elapsed_secs() * PICKUP_SPIN_RAD_S + transform.translation.x;
            transform.scale.x = phase.cos().abs().max(0.15);
        }
    }
}

fn collect_pickups(
    mut commands: Commands,
    config: Res<GameConfig>,
    mut pickup_events: MessageWriter<PickupCollectedEvent>,
    player_query: Query<&Transform, With<PlayerVehicle>>,
    pickup_query: Query<(Entity, &Transform, &Pickup), Without<PlayerVehicle>>,
) {
    let Ok(player_transform) = player_query.single() else {
        return;
    };
    let player_position = player_transform.translation.truncate();
    let pickups = &config.game.pickups;

    for (entity, pickup_transform, pickup) in &pickup_query {
        let pickup_position = pickup_transform.translation.truncate();
        if !within_reach(
            pickup_position,
            player_position,
            pickup.radius,
            pickups.collection_radius,
        ) {
            continue;
        }

        let coins_added = match pickup.kind {
            PickupKind::Coin => pickups.coin_value,
            PickupKind::Fuel => 0,
        };
        pickup_events.write(PickupCollectedEvent {
            kind: pickup.kind,
            coins_added,
        });
        commands.entity(entity).try_despawn();
    }
}

fn apply_pickup_effects(
    mut pickup_events: MessageReader<PickupCollectedEvent>,
    mut progression: Option<ResMut<ProgressionController>>,
    mut save_data: Option<ResMut<SaveData>>,
) {
    let mut coins_added = 0_u32;

    for event in pickup_events.read() {
        match event.kind {
            PickupKind::Coin => coins_added = coins_added.saturating_add(event.coins_added),
            PickupKind::Fuel => {
                if let Some(progression) = progression.as_mut() {
                    progression.refuel();
                }
            }
        }
    }

    if coins_added == 0 {
        return;
    }
    if let Some(save_data) = save_data.as_mut() {
        save_data.add_coins(coins_added);
    }
}
