use serde::{Deserialize, Serialize};
use std::fmt;

/// Deepest zoom whose finest octave still quantizes to an exact fixed-point corner.
pub const MAX_ZOOM: u32 = 23;

/// Largest accepted tile edge, in pixels.
pub const MAX_TILE_RESOLUTION: u32 = 4096;

/// Grid position of a tile at some zoom level.
///
/// The world is unbounded in both directions, so either component may be negative.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct TileCoord {
    pub x: i32,
    pub y: i32,
}

impl TileCoord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x.saturating_add(dx), self.y.saturating_add(dy))
    }
}

/// A tile's identity: its grid coordinate together with its zoom level.
///
/// Coordinates alone are ambiguous across zoom levels, so every request,
/// response and cache entry is keyed by the pair.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Debug)]
pub struct TileKey {
    pub zoom: u32,
    pub coord: TileCoord,
}

impl TileKey {
    pub const fn new(zoom: u32, coord: TileCoord) -> Self {
        Self { zoom, coord }
    }

    /// The tile one zoom level up that covers this one, if any.
    pub fn parent(&self) -> Option<TileKey> {
        let zoom = self.zoom.checked_sub(1)?;
        Some(TileKey::new(
            zoom,
            TileCoord::new(self.coord.x.div_euclid(2), self.coord.y.div_euclid(2)),
        ))
    }

    /// The four tiles one zoom level down, in row-major order.
    pub fn children(&self) -> [TileKey; 4] {
        let zoom = self.zoom + 1;
        let x = self.coord.x.saturating_mul(2);
        let y = self.coord.y.saturating_mul(2);
        [
            TileKey::new(zoom, TileCoord::new(x, y)),
            TileKey::new(zoom, TileCoord::new(x.saturating_add(1), y)),
            TileKey::new(zoom, TileCoord::new(x, y.saturating_add(1))),
            TileKey::new(zoom, TileCoord::new(x.saturating_add(1), y.saturating_add(1))),
        ]
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.coord.x, self.coord.y)
    }
}

/// Rectangle in global pixel space for one zoom level and tile resolution.
///
/// Global pixel `gx` of tile `x` is `x * resolution + px`, so a region can
/// straddle tile borders and still address exactly the same samples the
/// individual tiles would produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PixelRegion {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

impl PixelRegion {
    pub const fn new(x: i64, y: i64, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The region covered by one tile.
    pub fn tile(coord: TileCoord, resolution: u32) -> Self {
        Self::new(
            coord.x as i64 * resolution as i64,
            coord.y as i64 * resolution as i64,
            resolution,
            resolution,
        )
    }

    pub fn len(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Grow the region by the given number of columns and rows on its far edges.
    pub fn extend(self, columns: u32, rows: u32) -> Self {
        Self::new(
            self.x,
            self.y,
            self.width.saturating_add(columns),
            self.height.saturating_add(rows),
        )
    }
}
