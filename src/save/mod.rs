use crate::config::GameConfig;
use crate::gameplay::progression::{LevelResult, ProgressStore};
use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub struct SavePlugin;

impl Plugin for SavePlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<SaveRequested>()
            .add_systems(Startup, load_save_data)
            .add_systems(
                PostUpdate,
                flush_save_requests.run_if(resource_exists::<SaveData>),
            );
    }
}

#[derive(Message, Debug, Clone, Copy, Default)]
pub struct SaveRequested;

#[derive(Resource, Debug, Clone)]
pub struct SavePath(pub PathBuf);

#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveData {
    pub coins: u32,
    pub best_distance: i32,
    pub unlocked_level: u32,
    pub level_stars: BTreeMap<u32, u8>,
    pub level_scores: BTreeMap<u32, i32>,
    pub last_result: Option<LevelResult>,
}

impl Default for SaveData {
    fn default() -> Self {
        Self {
            coins: 0,
            best_distance: 0,
            unlocked_level: 1,
            level_stars: BTreeMap::new(),
            level_scores: BTreeMap::new(),
            last_result: None,
        }
    }
}

impl SaveData {
    pub fn load(path: &Path) -> Result<Self, SaveError> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(source) if source.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(SaveError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        serde_json::from_str(&raw).map_err(|source| SaveError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn store(&self, path: &Path) -> Result<(), SaveError> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| SaveError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let raw = serde_json::to_string_pretty(self).map_err(|source| SaveError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, raw).map_err(|source| SaveError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn stars_for(&self, level_index: u32) -> u8 {
        self.level_stars.get(&level_index).copied().unwrap_or(0)
    }

    pub fn is_unlocked(&self, level_index: u32) -> bool {
        level_index >= 1 && level_index <= self.unlocked_level
    }

    pub fn add_coins(&mut self, amount: u32) {
        self.coins = self.coins.saturating_add(amount);
    }
}

impl ProgressStore for SaveData {
    fn best_distance(&self) -> i32 {
        self.best_distance
    }

    fn record_best_distance(&mut self, distance: i32) -> bool {
        if distance <= self.best_distance {
            return false;
        }
        self.best_distance = distance;
        true
    }

    fn record_level_result(&mut self, result: LevelResult) -> bool {
        let mut improved = false;

        let stars = self.level_stars.entry(result.level_index).or_insert(0);
        if result.stars > *stars {
            *stars = result.stars;
            improved = true;
        }

        let score = self.level_scores.entry(result.level_index).or_insert(0);
        if result.score > *score {
            *score = result.score;
            improved = true;
        }

        self.last_result = Some(result);
        improved
    }

    fn unlock_level(&mut self, level_index: u32) -> bool {
        if level_index <= self.unlocked_level {
            return false;
        }
        self.unlocked_level = level_index;
        true
    }
}

#[derive(Debug)]
pub enum SaveError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl Display for SaveError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "save file I/O failed for `{}`: {source}", path.display())
            }
            Self::Json { path, source } => {
                write!(f, "save file `{}` is not valid JSON: {source}", path.display())
            }
        }
    }
}

impl Error for SaveError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
        }
    }
}

fn load_save_data(mut commands: Commands, config: Res<GameConfig>) {
    let path = PathBuf::from(&config.game.app.save_path);
    let data = SaveData::load(&path).unwrap_or_else(|error| {
        warn!("{error}; starting from a fresh save.");
        SaveData::default()
    });

    info!(
        "Save loaded: {} coins, best distance {} m, {} level(s) unlocked.",
        data.coins, data.best_distance, data.unlocked_level
    );
    commands.insert_resource(data);
    commands.insert_resource(SavePath(path));
}

fn flush_save_requests(
    mut requests: MessageReader<SaveRequested>,
    save_data: Res<SaveData>,
    save_path: Option<Res<SavePath>>,
) {
    if requests.read().count() == 0 {
        return;
    }
    let Some(save_path) = save_path else {
        return;
    };

    if let Err(error) = save_data.store(&save_path.0) {
        error!("Failed to persist progress: {error}");
    }
}
