use bevy::prelude::*;
use tt_core::WorldConfig;

pub mod accumulator;
pub mod batch;
pub mod colorize;
pub mod hash;
pub mod octave;
pub mod resource;
pub mod tile;

pub use accumulator::{HeightBuffer, OctaveAccumulator};
pub use batch::{synthesize_batch, BatchProgress, BatchResult};
pub use colorize::{colorize, BYTES_PER_PIXEL};
pub use hash::{mix, WorldSeed};
pub use octave::{octaves_for_zoom, total_amplitude_for, Octave};
pub use resource::TerrainWorld;
pub use tile::{synthesize_tile, TileRequest, TileResponse};

/// Terrain synthesis plugin for Terratile.
/// Derives the `TerrainWorld` resource from the active `WorldConfig`.
pub struct TtNoisePlugin;

impl Plugin for TtNoisePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<WorldConfig>();
        let world = TerrainWorld::from_config(app.world().resource::<WorldConfig>());
        app.insert_resource(world);
    }
}
