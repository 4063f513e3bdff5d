pub mod config;
pub mod coords;
pub mod error;
pub mod palette;
pub mod terrain;

pub use config::{ConfigError, StreamingConfig, WorldConfig};
pub use coords::{PixelRegion, TileCoord, TileKey, MAX_TILE_RESOLUTION, MAX_ZOOM};
pub use error::SynthesisError;
pub use palette::{GrayscalePalette, Palette, RenderMode, TerrainPalette};
pub use terrain::{TerrainCensus, TerrainClass};
