pub mod pickups;
pub mod progression;
pub mod terrain;
pub mod vehicle;

use bevy::prelude::*;
use pickups::PickupGameplayPlugin;
use progression::ProgressionGameplayPlugin;
use terrain::TerrainGameplayPlugin;
use vehicle::VehicleGameplayPlugin;

pub struct GameplayPlugin;

impl Plugin for GameplayPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(TerrainGameplayPlugin)
            .add_plugins(PickupGameplayPlugin)
            .add_plugins(VehicleGameplayPlugin)
            .add_plugins(ProgressionGameplayPlugin);
    }
}
