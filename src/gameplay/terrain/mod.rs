pub mod noise;
pub mod stream;
pub mod surface;

use crate::config::GameConfig;
use crate::gameplay::pickups::placement::FeaturePlacer;
use crate::gameplay::vehicle::PlayerVehicle;
use crate::states::{GameState, InSession, RunSession, SessionSetup};
use bevy::prelude::*;
use bevy_rapier2d::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

pub use noise::{NoiseField, NoiseParams};
pub use stream::{SegmentSink, StreamSettings, StreamTickReport, TerrainSegment, TerrainStream};
pub use surface::TerrainSurface;

const TERRAIN_RNG_STREAM: u64 = 0x7e44_a1b0;

pub struct TerrainGameplayPlugin;

impl Plugin for TerrainGameplayPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            OnEnter(InSession),
            spawn_terrain.in_set(SessionSetup::World),
        )
        .add_systems(OnExit(InSession), cleanup_terrain)
        .add_systems(
            FixedUpdate,
            (stream_terrain_around_player, upload_ground_surface)
                .chain()
                .in_set(TerrainSystems)
                .run_if(in_state(GameState::InRun))
                .run_if(resource_exists::<TerrainState>),
        );
    }
}

#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TerrainSystems;

#[derive(Resource)]
pub struct TerrainState {
    pub stream: TerrainStream,
    pub streaming: bool,
    uploaded_revision: Option<u64>,
}

#[derive(Component)]
pub struct GroundStrip;

fn spawn_terrain(
    mut commands: Commands,
    config: Res<GameConfig>,
    session: Res<RunSession>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<ColorMaterial>>,
) {
    let level = &session.level;
    let terrain = &config.game.terrain;
    let settings = StreamSettings {
        chunk_size: terrain.chunk_size,
        generation_threshold: terrain.generation_threshold,
        destroy_threshold: terrain.destroy_threshold,
        segment_length: level.segment_length,
        ground_depth: level.ground_depth,
        uv_scale: terrain.uv_scale,
    };

    let mut rng = ChaCha8Rng::seed_from_u64(session.seed ^ TERRAIN_RNG_STREAM);
    let mut placer = FeaturePlacer::new(level, &config.game.pickups, session.seed);
    let noise = NoiseField::new(NoiseParams::from_level(level), 0.0);
    let mut stream = TerrainStream::new(settings, noise);

    if level.use_procedural_generation {
        stream.initialize(level.initial_segments, &mut rng, &mut placer);
        info!(
            "Terrain initialized: {} segments, frontier at x = {:.1}, seed offset {:.2}.",
            stream.segments().len(),
            stream.frontier_x(),
            stream.noise().seed_offset()
        );
    } else {
        warn!(
            "Level `{}` disables procedural generation; no terrain will stream.",
            level.name
        );
    }

    let [r, g, b] = level.ground_color;
    commands.spawn((
        Name::new("GroundStrip"),
        GroundStrip,
        Mesh2d(meshes.add(stream.surface().to_mesh())),
        MeshMaterial2d(materials.add(ColorMaterial::from(Color::srgb(r, g, b)))),
        Transform::default(),
        RigidBody::Fixed,
        ground_collider(stream.surface()),
        Friction::coefficient(level.friction),
    ));

    commands.insert_resource(TerrainState {
        uploaded_revision: Some(stream.revision()),
        streaming: level.use_procedural_generation,
        stream,
    });
    commands.insert_resource(placer);
}

fn cleanup_terrain(mut commands: Commands, ground_query: Query<Entity, With<GroundStrip>>) {
    for entity in &ground_query {
        commands.entity(entity).try_despawn();
    }
    commands.remove_resource::<TerrainState>();
    commands.remove_resource::<FeaturePlacer>();
}

fn stream_terrain_around_player(
    mut terrain: ResMut<TerrainState>,
    mut placer: ResMut<FeaturePlacer>,
    player_query: Query<&Transform, With<PlayerVehicle>>,
) {
    if !terrain.streaming {
        return;
    }
    let Ok(player_transform) = player_query.single() else {
        return;
    };

    let report = terrain
        .stream
        .tick(player_transform.translation.x, &mut *placer);
    if report.generated > terrain.stream.settings().chunk_size as usize {
        debug!(
            "Terrain caught up after a large jump: {} segments generated.",
            report.generated
        );
    }
}

fn upload_ground_surface(
    mut terrain: ResMut<TerrainState>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut ground_query: Query<(&Mesh2d, &mut Collider), With<GroundStrip>>,
) {
    let revision = terrain.stream.revision();
    if terrain.uploaded_revision == Some(revision) {
        return;
    }
    let Ok((mesh_handle, mut collider)) = ground_query.single_mut() else {
        return;
    };

    let surface = terrain.stream.surface();
    if let Some(mesh) = meshes.get_mut(&mesh_handle.0) {
        *mesh = surface.to_mesh();
    }
    *collider = ground_collider(surface);
    terrain.uploaded_revision = Some(revision);
}

fn ground_collider(surface: &TerrainSurface) -> Collider {
    if surface.is_empty() {
        // Rapier rejects an empty polyline.
        return Collider::segment(Vec2::new(-0.5, -1_000.0), Vec2::new(0.5, -1_000.0));
    }
    Collider::polyline(surface.boundary.clone(), None)
}
