use serde::{Deserialize, Serialize};

use crate::terrain::TerrainClass;

/// Maps a normalized height to an RGBA pixel.
///
/// Palettes are shared across worker threads, so implementations must be
/// stateless or internally synchronized.
pub trait Palette: Send + Sync {
    /// Color for one normalized height. Alpha must be 255.
    fn color(&self, height: f64) -> [u8; 4];

    /// Returns the name of this palette for logging.
    fn name(&self) -> &'static str {
        "Palette"
    }
}

/// The fixed terrain threshold table.
#[derive(Clone, Copy, Debug, Default)]
pub struct TerrainPalette;

impl Palette for TerrainPalette {
    fn color(&self, height: f64) -> [u8; 4] {
        TerrainClass::from_height(height).color()
    }

    fn name(&self) -> &'static str {
        "Terrain"
    }
}

/// Raw height view: one grey level per four height units.
#[derive(Clone, Copy, Debug, Default)]
pub struct GrayscalePalette;

impl Palette for GrayscalePalette {
    fn color(&self, height: f64) -> [u8; 4] {
        let grey = (height / 4.0).round().clamp(0.0, 255.0) as u8;
        [grey, grey, grey, 255]
    }

    fn name(&self) -> &'static str {
        "Grayscale"
    }
}

/// Which palette tiles are rendered with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RenderMode {
    #[default]
    Terrain,
    Grayscale,
}

impl RenderMode {
    pub fn all() -> &'static [RenderMode] {
        &[Self::Terrain, Self::Grayscale]
    }

    pub fn name(&self) -> &'static str {
        self.palette().name()
    }

    pub fn palette(&self) -> &'static dyn Palette {
        match self {
            Self::Terrain => &TerrainPalette,
            Self::Grayscale => &GrayscalePalette,
        }
    }
}
