use bevy::prelude::*;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const CONFIG_DIR: &str = "config";

pub struct ConfigPlugin;

impl Plugin for ConfigPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(PreStartup, load_game_config)
            .add_systems(Update, reload_game_config_hotkey);
    }
}

fn load_game_config(mut commands: Commands) {
    let config = GameConfig::load_from_dir(Path::new(CONFIG_DIR)).unwrap_or_else(|error| {
        panic!("failed to load configuration from `{CONFIG_DIR}`: {error}");
    });

    log_config_summary("Loaded", &config);
    info!("Press F5 to hot-reload config files from `{CONFIG_DIR}`.");

    commands.insert_resource(Time::<Fixed>::from_hz(
        config.game.app.fixed_timestep_hz as f64,
    ));
    commands.insert_resource(config);
}

fn reload_game_config_hotkey(
    keyboard: Res<ButtonInput<KeyCode>>,
    game_config: Option<ResMut<GameConfig>>,
) {
    if !keyboard.just_pressed(KeyCode::F5) {
        return;
    }

    let Some(mut current_config) = game_config else {
        warn!("Config hot-reload requested, but `GameConfig` resource is not initialized yet.");
        return;
    };

    match GameConfig::load_from_dir(Path::new(CONFIG_DIR)) {
        Ok(new_config) => {
            *current_config = new_config;
            log_config_summary("Hot-reloaded", &current_config);
        }
        Err(error) => {
            error!("Config hot-reload failed; keeping previous config: {error}");
        }
    }
}

fn log_config_summary(prefix: &str, config: &GameConfig) {
    info!(
        "{prefix} config: {} levels, {} vehicles, chunk size {}.",
        config.levels.len(),
        config.vehicles_by_id.len(),
        config.game.terrain.chunk_size
    );
}

#[derive(Resource, Debug, Clone)]
pub struct GameConfig {
    pub game: GameFile,
    pub vehicles: VehiclesFile,
    pub levels: Vec<LevelData>,
    pub vehicles_by_id: HashMap<String, VehicleConfig>,
}

impl GameConfig {
    pub fn load_from_dir(config_dir: &Path) -> Result<Self, ConfigError> {
        let game: GameFile = read_toml(&config_dir.join("game.toml"))?;
        let vehicles: VehiclesFile = read_toml(&config_dir.join("vehicles.toml"))?;
        let levels = match read_optional_toml::<LevelsFile>(&config_dir.join("levels.toml"))? {
            Some(file) if !file.levels.is_empty() => file.levels,
            Some(_) => {
                warn!("levels.toml defines no levels; using built-in levels.");
                builtin_levels()
            }
            None => {
                warn!("levels.toml not found; using built-in levels.");
                builtin_levels()
            }
        };

        let config = Self {
            vehicles_by_id: to_index("vehicles.toml::vehicles", &vehicles.vehicles)?,
            game,
            vehicles,
            levels,
        };

        config.validate_references()?;
        Ok(config)
    }

    pub fn default_vehicle(&self) -> Option<&VehicleConfig> {
        self.vehicles_by_id.get(&self.game.app.default_vehicle)
    }

    pub fn level_count(&self) -> u32 {
        self.levels.len() as u32
    }

    /// Looks up a 1-based level index. Out-of-range indices resolve to the
    /// first level; an empty level list resolves to the built-in default.
    pub fn level(&self, level_index: u32) -> ResolvedLevel {
        let slot = level_index.checked_sub(1).map(|slot| slot as usize);
        if let Some(level) = slot.and_then(|slot| self.levels.get(slot)) {
            return ResolvedLevel {
                index: level_index,
                data: level.clone(),
            };
        }

        warn!("Level {level_index} not found; falling back to the first level.");
        match self.levels.first() {
            Some(first) => ResolvedLevel {
                index: 1,
                data: first.clone(),
            },
            None => {
                warn!("No level data configured; using default level settings.");
                ResolvedLevel {
                    index: 1,
                    data: LevelData::default(),
                }
            }
        }
    }

    fn validate_references(&self) -> Result<(), ConfigError> {
        if !self
            .vehicles_by_id
            .contains_key(&self.game.app.default_vehicle)
        {
            return Err(ConfigError::Validation(format!(
                "game.toml::app.default_vehicle references unknown vehicle id `{}`",
                self.game.app.default_vehicle
            )));
        }

        if self.game.app.fixed_timestep_hz <= 0.0 {
            return Err(ConfigError::Validation(
                "game.toml::app.fixed_timestep_hz must be > 0".to_string(),
            ));
        }

        let terrain = &self.game.terrain;
        if terrain.chunk_size == 0 {
            return Err(ConfigError::Validation(
                "game.toml::terrain.chunk_size must be >= 1".to_string(),
            ));
        }
        if terrain.generation_threshold < 0.0 || terrain.destroy_threshold < 0.0 {
            return Err(ConfigError::Validation(
                "game.toml::terrain thresholds must be >= 0".to_string(),
            ));
        }

        if self.game.pickups.collection_radius <= 0.0 {
            return Err(ConfigError::Validation(
                "game.toml::pickups.collection_radius must be > 0".to_string(),
            ));
        }

        for (index, level) in self.levels.iter().enumerate() {
            if level.segment_length <= 0.0 {
                return Err(ConfigError::Validation(format!(
                    "levels.toml::levels[{index}].segment_length must be > 0"
                )));
            }
            if level.ground_depth < 0.0 {
                return Err(ConfigError::Validation(format!(
                    "levels.toml::levels[{index}].ground_depth must be >= 0"
                )));
            }
            if level.noise_scale < 0.0 {
                return Err(ConfigError::Validation(format!(
                    "levels.toml::levels[{index}].noise_scale must be >= 0"
                )));
            }
            if !(0.0..=1.0).contains(&level.coin_frequency)
                || !(0.0..=1.0).contains(&level.fuel_frequency)
            {
                return Err(ConfigError::Validation(format!(
                    "levels.toml::levels[{index}] coin/fuel frequencies must be in [0, 1]"
                )));
            }
            if level.fuel_consumption_rate < 0.0 {
                return Err(ConfigError::Validation(format!(
                    "levels.toml::levels[{index}].fuel_consumption_rate must be >= 0"
                )));
            }
            if level.distance_to_finish < 0 {
                return Err(ConfigError::Validation(format!(
                    "levels.toml::levels[{index}].distance_to_finish must be >= 0"
                )));
            }
            if level.friction < 0.0 {
                return Err(ConfigError::Validation(format!(
                    "levels.toml::levels[{index}].friction must be >= 0"
                )));
            }
        }

        for (index, vehicle) in self.vehicles.vehicles.iter().enumerate() {
            if vehicle.wheel_radius <= 0.0 {
                return Err(ConfigError::Validation(format!(
                    "vehicles.toml::vehicles[{index}].wheel_radius must be > 0"
                )));
            }
            if vehicle.chassis_half_extents[0] <= 0.0 || vehicle.chassis_half_extents[1] <= 0.0 {
                return Err(ConfigError::Validation(format!(
                    "vehicles.toml::vehicles[{index}].chassis_half_extents must be > 0"
                )));
            }
            if vehicle.motor_torque < 0.0 || vehicle.brake_torque < 0.0 {
                return Err(ConfigError::Validation(format!(
                    "vehicles.toml::vehicles[{index}] motor/brake torque must be >= 0"
                )));
            }
            if vehicle.max_wheel_speed <= 0.0 {
                return Err(ConfigError::Validation(format!(
                    "vehicles.toml::vehicles[{index}].max_wheel_speed must be > 0"
                )));
            }
            if vehicle.input_damping <= 0.0 {
                return Err(ConfigError::Validation(format!(
                    "vehicles.toml::vehicles[{index}].input_damping must be > 0"
                )));
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedLevel {
    pub index: u32,
    pub data: LevelData,
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: Box<toml::de::Error>,
    },
    Validation(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "failed to parse `{}`: {source}", path.display())
            }
            Self::Validation(message) => write!(f, "{message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::Validation(_) => None,
        }
    }
}

fn read_toml<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_toml(path, &raw)
}

fn read_optional_toml<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, ConfigError> {
    match fs::read_to_string(path) {
        Ok(raw) => parse_toml(path, &raw).map(Some),
        Err(source) if source.kind() == ErrorKind::NotFound => Ok(None),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn parse_toml<T: DeserializeOwned>(path: &Path, raw: &str) -> Result<T, ConfigError> {
    toml::from_str(raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source: Box::new(source),
    })
}

fn to_index<T>(label: &str, rows: &[T]) -> Result<HashMap<String, T>, ConfigError>
where
    T: HasId + Clone,
{
    let mut map = HashMap::new();

    for row in rows {
        let id = row.id();
        if id.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "{label} contains an empty id"
            )));
        }

        if map.insert(id.to_string(), row.clone()).is_some() {
            return Err(ConfigError::Validation(format!(
                "{label} contains duplicate id `{id}`"
            )));
        }
    }

    Ok(map)
}

trait HasId {
    fn id(&self) -> &str;
}

#[derive(Debug, Clone, Deserialize)]
pub struct GameFile {
    pub app: AppConfig,
    pub terrain: TerrainStreamConfig,
    pub pickups: PickupConfig,
    pub progression: ProgressionConfig,
    pub camera: CameraConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub fixed_timestep_hz: f32,
    pub default_vehicle: String,
    #[serde(default = "default_save_path")]
    pub save_path: String,
    #[serde(default)]
    pub show_touch_controls: bool,
}

fn default_save_path() -> String {
    "save/progress.json".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct TerrainStreamConfig {
    pub chunk_size: u32,
    pub generation_threshold: f32,
    pub destroy_threshold: f32,
    #[serde(default = "default_terrain_uv_scale")]
    pub uv_scale: f32,
}

fn default_terrain_uv_scale() -> f32 {
    0.5
}

#[derive(Debug, Clone, Deserialize)]
pub struct PickupConfig {
    pub coin_offset: f32,
    pub fuel_offset: f32,
    pub coin_value: u32,
    pub collection_radius: f32,
    pub despawn_behind: f32,
    pub coin_radius: f32,
    pub fuel_size: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProgressionConfig {
    pub stop_speed_epsilon: f32,
    pub low_fuel_warning: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CameraConfig {
    pub ortho_scale: f32,
    pub look_ahead: f32,
    pub height_offset: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VehiclesFile {
    pub vehicles: Vec<VehicleConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriveAxle {
    Front,
    Rear,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VehicleConfig {
    pub id: String,
    pub chassis_half_extents: [f32; 2],
    pub chassis_density: f32,
    pub wheel_radius: f32,
    pub wheel_density: f32,
    pub front_wheel_offset: [f32; 2],
    pub rear_wheel_offset: [f32; 2],
    pub drive_axle: DriveAxle,
    pub motor_torque: f32,
    pub max_wheel_speed: f32,
    pub brake_torque: f32,
    pub on_air_rotation_speed: f32,
    pub on_ground_rotation_speed: f32,
    pub stop_speed_threshold: f32,
    pub input_damping: f32,
    pub ground_contact_epsilon: f32,
    #[serde(default = "default_wheel_restitution")]
    pub wheel_restitution: f32,
    pub spawn_height: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
}

fn default_wheel_restitution() -> f32 {
    0.2
}

impl HasId for VehicleConfig {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LevelsFile {
    #[serde(default)]
    pub levels: Vec<LevelData>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Biome {
    Plains,
    Desert,
    Mountain,
    Moon,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LevelData {
    pub name: String,
    pub description: String,
    pub biome: Biome,
    pub ground_color: [f32; 3],
    pub use_procedural_generation: bool,
    pub noise_scale: f32,
    pub noise_amplitude: f32,
    pub octaves: u32,
    pub persistence: f32,
    pub lacunarity: f32,
    pub segment_length: f32,
    pub ground_depth: f32,
    pub initial_segments: u32,
    pub coin_frequency: f32,
    pub fuel_frequency: f32,
    pub coin_pickup: Option<String>,
    pub fuel_pickup: Option<String>,
    pub gravity_scale: f32,
    pub friction: f32,
    pub fuel_consumption_rate: f32,
    pub distance_to_finish: i32,
}

impl Default for LevelData {
    fn default() -> Self {
        Self {
            name: "Default".to_string(),
            description: String::new(),
            biome: Biome::Plains,
            ground_color: [0.36, 0.55, 0.24],
            use_procedural_generation: true,
            noise_scale: 0.05,
            noise_amplitude: 5.0,
            octaves: 1,
            persistence: 0.5,
            lacunarity: 2.0,
            segment_length: 1.0,
            ground_depth: 10.0,
            initial_segments: 100,
            coin_frequency: 0.1,
            fuel_frequency: 0.02,
            coin_pickup: Some("coin".to_string()),
            fuel_pickup: Some("fuel".to_string()),
            gravity_scale: 1.0,
            friction: 1.0,
            fuel_consumption_rate: 0.05,
            distance_to_finish: 1000,
        }
    }
}

fn builtin_levels() -> Vec<LevelData> {
    vec![
        LevelData {
            name: "Green Hills".to_string(),
            description: "A nice drive through the hills.".to_string(),
            biome: Biome::Plains,
            noise_scale: 0.03,
            noise_amplitude: 3.0,
            coin_frequency: 0.15,
            fuel_frequency: 0.03,
            distance_to_finish: 500,
            ..LevelData::default()
        },
        LevelData {
            name: "Desert Dunes".to_string(),
            description: "Hot and sandy. Watch your fuel!".to_string(),
            biome: Biome::Desert,
            ground_color: [0.86, 0.72, 0.42],
            noise_scale: 0.06,
            noise_amplitude: 6.0,
            gravity_scale: 1.2,
            friction: 0.8,
            fuel_consumption_rate: 0.08,
            distance_to_finish: 1000,
            ..LevelData::default()
        },
        LevelData {
            name: "Moon Base".to_string(),
            description: "Low gravity madness.".to_string(),
            biome: Biome::Moon,
            ground_color: [0.62, 0.63, 0.66],
            noise_scale: 0.04,
            noise_amplitude: 10.0,
            coin_frequency: 0.2,
            fuel_frequency: 0.015,
            gravity_scale: 0.4,
            friction: 0.5,
            fuel_consumption_rate: 0.03,
            distance_to_finish: 1500,
            ..LevelData::default()
        },
    ]
}

#[cfg(test)]
pub(crate) fn test_config() -> GameConfig {
    let vehicle = VehicleConfig {
        id: "jeepney".to_string(),
        chassis_half_extents: [1.6, 0.45],
        chassis_density: 1.0,
        wheel_radius: 0.55,
        wheel_density: 1.0,
        front_wheel_offset: [1.15, -0.6],
        rear_wheel_offset: [-1.15, -0.6],
        drive_axle: DriveAxle::Rear,
        motor_torque: 60.0,
        max_wheel_speed: 40.0,
        brake_torque: 80.0,
        on_air_rotation_speed: 8.0,
        on_ground_rotation_speed: 1.0,
        stop_speed_threshold: 3.0,
        input_damping: 3.0,
        ground_contact_epsilon: 0.08,
        wheel_restitution: 0.2,
        spawn_height: 3.0,
        linear_damping: 0.05,
        angular_damping: 0.5,
    };

    GameConfig {
        game: GameFile {
            app: AppConfig {
                fixed_timestep_hz: 60.0,
                default_vehicle: "jeepney".to_string(),
                save_path: default_save_path(),
                show_touch_controls: false,
            },
            terrain: TerrainStreamConfig {
                chunk_size: 50,
                generation_threshold: 50.0,
                destroy_threshold: 100.0,
                uv_scale: 0.5,
            },
            pickups: PickupConfig {
                coin_offset: 1.5,
                fuel_offset: 1.0,
                coin_value: 5,
                collection_radius: 1.2,
                despawn_behind: 100.0,
                coin_radius: 0.35,
                fuel_size: 0.7,
            },
            progression: ProgressionConfig {
                stop_speed_epsilon: 0.1,
                low_fuel_warning: 0.2,
            },
            camera: CameraConfig {
                ortho_scale: 0.03,
                look_ahead: 6.0,
                height_offset: 2.0,
            },
        },
        vehicles: VehiclesFile {
            vehicles: vec![vehicle.clone()],
        },
        levels: builtin_levels(),
        vehicles_by_id: HashMap::from([("jeepney".to_string(), vehicle)]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_fails_for_missing_vehicle_reference() {
        let mut config = test_config();
        config.game.app.default_vehicle = "missing_car".to_string();

        let error = config
            .validate_references()
            .expect_err("validation should fail");
        let message = error.to_string();

        assert!(message.contains("default_vehicle"));
        assert!(message.contains("missing_car"));
    }

    #[test]
    fn validation_rejects_non_positive_segment_length() {
        let mut config = test_config();
        config.levels[1].segment_length = 0.0;

        let message = config
            .validate_references()
            .expect_err("validation should fail")
            .to_string();

        assert!(message.contains("levels[1].segment_length"));
    }

    #[test]
    fn out_of_range_level_falls_back_to_first_level() {
        let config = test_config();

        let resolved = config.level(9);
        assert_eq!(resolved.index, 1);
        assert_eq!(resolved.data.name, "Green Hills");

        let resolved = config.level(0);
        assert_eq!(resolved.index, 1);

        let resolved = config.level(2);
        assert_eq!(resolved.index, 2);
        assert_eq!(resolved.data.name, "Desert Dunes");
    }

    #[test]
    fn empty_level_list_resolves_to_default_level() {
        let mut config = test_config();
        config.levels.clear();

        let resolved = config.level(1);
        assert_eq!(resolved.index, 1);
        assert!(resolved.data.use_procedural_generation);
        assert_eq!(resolved.data.distance_to_finish, 1000);
    }

    #[test]
    fn level_rows_fill_missing_fields_from_defaults() {
        let file: LevelsFile = toml::from_str(
            r#"
            [[levels]]
            name = "Canyon"
            biome = "mountain"
            noise_amplitude = 8.0
            octaves = 3
            "#,
        )
        .expect("levels should parse");

        let level = &file.levels[0];
        assert_eq!(level.biome, Biome::Mountain);
        assert_eq!(level.octaves, 3);
        assert_eq!(level.segment_length, 1.0);
        assert_eq!(level.coin_pickup.as_deref(), Some("coin"));
    }

    #[test]
    fn shipped_config_directory_loads() {
        let config = GameConfig::load_from_dir(Path::new(CONFIG_DIR))
            .expect("shipped config should be valid");

        assert!(config.default_vehicle().is_some());
        assert!(config.level_count() >= 3);
    }
}
