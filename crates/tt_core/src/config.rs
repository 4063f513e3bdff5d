use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::coords::{MAX_TILE_RESOLUTION, MAX_ZOOM};
use crate::palette::RenderMode;

/// World configuration resource.
///
/// This is the top-level serializable structure for a world: everything a
/// tile request needs besides the tile's own key.
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldConfig {
    /// Human-readable name for this world.
    pub name: String,
    /// World seed. Identifies one deterministic world.
    pub seed: i32,
    /// Pixels per tile edge.
    pub tile_resolution: u32,
    /// Shallowest zoom the viewer may request.
    pub min_zoom: u32,
    /// Deepest zoom the viewer may request.
    pub max_zoom: u32,
    /// Palette tiles are rendered with.
    pub render_mode: RenderMode,
    /// Tile streaming parameters.
    pub streaming: StreamingConfig,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            name: "New World".to_string(),
            seed: 42,
            tile_resolution: 128,
            min_zoom: 0,
            max_zoom: 18,
            render_mode: RenderMode::Terrain,
            streaming: StreamingConfig::default(),
        }
    }
}

impl WorldConfig {
    /// Check the configuration against the limits of the synthesizer.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tile_resolution == 0 {
            return Err(ConfigError::ZeroResolution);
        }
        if self.tile_resolution > MAX_TILE_RESOLUTION {
            return Err(ConfigError::ResolutionTooLarge {
                resolution: self.tile_resolution,
                max: MAX_TILE_RESOLUTION,
            });
        }
        if self.min_zoom > self.max_zoom {
            return Err(ConfigError::ZoomRangeInverted {
                min: self.min_zoom,
                max: self.max_zoom,
            });
        }
        if self.max_zoom > MAX_ZOOM {
            return Err(ConfigError::ZoomTooDeep {
                max: self.max_zoom,
                limit: MAX_ZOOM,
            });
        }
        if self.streaming.max_in_flight == 0 {
            return Err(ConfigError::NoTaskBudget);
        }
        Ok(())
    }

    /// Clamp a requested zoom into `[min_zoom, max_zoom]`.
    pub fn clamp_zoom(&self, zoom: u32) -> u32 {
        zoom.clamp(self.min_zoom, self.max_zoom.max(self.min_zoom))
    }
}

/// Parameters for streaming tiles into a viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamingConfig {
    /// Upper bound on tile tasks running at once.
    pub max_in_flight: usize,
    /// Extra ring of tiles requested around the visible area.
    pub padding: u32,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            max_in_flight: 16,
            padding: 1,
        }
    }
}

/// A configuration value outside what the synthesizer supports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    ZeroResolution,
    ResolutionTooLarge { resolution: u32, max: u32 },
    ZoomRangeInverted { min: u32, max: u32 },
    ZoomTooDeep { max: u32, limit: u32 },
    NoTaskBudget,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroResolution => write!(f, "tile_resolution must be positive"),
            Self::ResolutionTooLarge { resolution, max } => {
                write!(f, "tile_resolution {} exceeds the maximum of {}", resolution, max)
            }
            Self::ZoomRangeInverted { min, max } => {
                write!(f, "min_zoom {} is greater than max_zoom {}", min, max)
            }
            Self::ZoomTooDeep { max, limit } => {
                write!(f, "max_zoom {} exceeds the supported limit of {}", max, limit)
            }
            Self::NoTaskBudget => write!(f, "streaming.max_in_flight must be at least 1"),
        }
    }
}

impl std::error::Error for ConfigError {}
