use bevy::prelude::*;
use tt_core::{Palette, RenderMode, TileKey, WorldConfig};

use crate::tile::TileRequest;

/// Bevy resource describing the world tiles are synthesized for.
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct TerrainWorld {
    seed: i32,
    tile_resolution: u32,
    min_zoom: u32,
    max_zoom: u32,
    render_mode: RenderMode,
}

impl TerrainWorld {
    pub fn from_config(config: &WorldConfig) -> Self {
        Self {
            seed: config.seed,
            tile_resolution: config.tile_resolution,
            min_zoom: config.min_zoom,
            max_zoom: config.max_zoom,
            render_mode: config.render_mode,
        }
    }

    /// Build the synthesis request for one tile of this world.
    pub fn request(&self, key: TileKey) -> TileRequest {
        TileRequest::new(self.seed, key, self.tile_resolution)
    }

    pub fn palette(&self) -> &'static dyn Palette {
        self.render_mode.palette()
    }

    pub fn clamp_zoom(&self, zoom: u32) -> u32 {
        zoom.clamp(self.min_zoom, self.max_zoom.max(self.min_zoom))
    }

    pub fn seed(&self) -> i32 {
        self.seed
    }

    pub fn tile_resolution(&self) -> u32 {
        self.tile_resolution
    }

    pub fn render_mode(&self) -> RenderMode {
        self.render_mode
    }

    /// Switch palettes. Tiles already delivered keep their old colors.
    pub fn set_render_mode(&mut self, mode: RenderMode) {
        self.render_mode = mode;
    }
}

impl Default for TerrainWorld {
    fn default() -> Self {
        Self::from_config(&WorldConfig::default())
    }
}
