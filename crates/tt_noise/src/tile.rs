use bevy::log::debug;
use tt_core::{Palette, PixelRegion, SynthesisError, TerrainCensus, TileCoord, TileKey};

use crate::accumulator::OctaveAccumulator;
use crate::colorize::{colorize, BYTES_PER_PIXEL};

/// Everything needed to synthesize one tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TileRequest {
    pub seed: i32,
    pub zoom: u32,
    pub coord: TileCoord,
    pub tile_resolution: u32,
}

impl TileRequest {
    pub fn new(seed: i32, key: TileKey, tile_resolution: u32) -> Self {
        Self {
            seed,
            zoom: key.zoom,
            coord: key.coord,
            tile_resolution,
        }
    }

    pub fn key(&self) -> TileKey {
        TileKey::new(self.zoom, self.coord)
    }

    pub fn region(&self) -> PixelRegion {
        PixelRegion::tile(self.coord, self.tile_resolution)
    }

    /// Check every precondition of the request and return the accumulator
    /// that will serve it.
    pub fn validate(&self) -> Result<OctaveAccumulator, SynthesisError> {
        let accumulator = OctaveAccumulator::new(self.seed, self.zoom, self.tile_resolution)?;
        accumulator.check_region(self.region(), accumulator.octaves())?;
        Ok(accumulator)
    }
}

/// A synthesized tile, tagged with the key it was requested for so late
/// deliveries can be matched against what is still wanted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TileResponse {
    pub key: TileKey,
    pub resolution: u32,
    /// Row-major RGBA, `4 * resolution^2` bytes.
    pub pixels: Vec<u8>,
}

impl TileResponse {
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let start = (y as usize * self.resolution as usize + x as usize) * BYTES_PER_PIXEL;
        let mut px = [0; 4];
        px.copy_from_slice(&self.pixels[start..start + BYTES_PER_PIXEL]);
        px
    }

    pub fn census(&self) -> TerrainCensus {
        TerrainCensus::from_pixels(&self.pixels)
    }
}

/// Synthesize and colorize one tile.
///
/// The request is validated up front; a malformed request produces an error
/// and no pixels at all.
pub fn synthesize_tile(
    request: &TileRequest,
    palette: &dyn Palette,
) -> Result<TileResponse, SynthesisError> {
    let accumulator = request.validate()?;
    let heights = accumulator.tile_heights(request.coord)?;
    let pixels = colorize(&heights, palette);

    debug!(
        "Synthesized tile {} ({} octaves, {} palette)",
        request.key(),
        heights.octaves().len(),
        palette.name()
    );

    Ok(TileResponse {
        key: request.key(),
        resolution: request.tile_resolution,
        pixels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tt_core::{TerrainClass, TerrainPalette, MAX_ZOOM};

    /// FNV-1a, 64 bit.
    fn digest(bytes: &[u8]) -> u64 {
        bytes.iter().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
            (hash ^ *byte as u64).wrapping_mul(0x0000_0100_0000_01b3)
        })
    }

    fn render(seed: i32, zoom: u32, x: i32, y: i32, resolution: u32) -> TileResponse {
        let key = TileKey::new(zoom, TileCoord::new(x, y));
        synthesize_tile(&TileRequest::new(seed, key, resolution), &TerrainPalette).unwrap()
    }

    #[test]
    fn response_echoes_key_and_size() {
        let response = render(2, 4, -3, 9, 16);
        assert_eq!(response.key, TileKey::new(4, TileCoord::new(-3, 9)));
        assert_eq!(response.pixels.len(), 4 * 16 * 16);
    }

    #[test]
    fn synthesis_is_deterministic() {
        let first = render(2, 6, 12, -40, 64);
        let second = render(2, 6, 12, -40, 64);
        assert_eq!(first, second);
    }

    #[test]
    fn seeds_produce_different_worlds() {
        assert_ne!(render(1, 0, 0, 0, 64).pixels, render(2, 0, 0, 0, 64).pixels);
    }

    #[test]
    fn golden_seed_two_zoom_zero() {
        let response = render(2, 0, 0, 0, 128);
        assert_eq!(response.pixels.len(), 128 * 128 * 4);
        assert_eq!(digest(&response.pixels), 0x8739_4c56_6fdc_021b);

        let census = response.census();
        assert_eq!(census.count(TerrainClass::DeepWater), 10537);
        assert_eq!(census.count(TerrainClass::Shore), 2106);
        assert_eq!(census.count(TerrainClass::Lowland), 2518);
        assert_eq!(census.count(TerrainClass::Forest), 1160);
        assert_eq!(census.count(TerrainClass::Rock), 61);
        assert_eq!(census.count(TerrainClass::HighRock), 2);
        assert_eq!(census.count(TerrainClass::Peak), 0);
    }

    #[test]
    fn golden_seed_two_zoom_three() {
        let origin = render(2, 3, 0, 0, 128);
        let far = render(2, 3, 7, 7, 128);
        assert_ne!(origin.pixels, far.pixels);
        assert_eq!(digest(&origin.pixels), 0x9a82_93e7_e56c_2325);
        assert_eq!(digest(&far.pixels), 0x226b_faee_ffef_6087);

        let census = far.census();
        assert_eq!(census.count(TerrainClass::DeepWater), 16044);
        assert_eq!(census.count(TerrainClass::Shore), 267);
        assert_eq!(census.count(TerrainClass::Lowland), 73);
    }

    // Below 128 pixels a subtile covers less than one pixel; every
    // contribution still lands on the pixel that samples it.
    #[test]
    fn golden_small_resolutions() {
        let response = render(2, 0, 0, 0, 16);
        assert_eq!(digest(&response.pixels), 0x69eb_2e8c_6d7e_e21c);

        let census = response.census();
        assert_eq!(census.count(TerrainClass::DeepWater), 162);
        assert_eq!(census.count(TerrainClass::Shore), 37);
        assert_eq!(census.count(TerrainClass::Lowland), 37);
        assert_eq!(census.count(TerrainClass::Forest), 19);
        assert_eq!(census.count(TerrainClass::Rock), 1);
        assert_eq!(census.count(TerrainClass::HighRock), 0);
        assert_eq!(census.count(TerrainClass::Peak), 0);

        assert_eq!(digest(&render(2, 1, 0, 0, 16).pixels), 0x607c_de94_f4e9_0d90);
        assert_eq!(digest(&render(7, 0, -1, 0, 16).pixels), 0xa4b1_be28_d6e3_64ff);
    }

    #[test]
    fn golden_negative_coordinates() {
        let response = render(7, 2, -1, -2, 256);
        assert_eq!(digest(&response.pixels), 0xdfe1_58f8_2849_4fa7);

        let census = response.census();
        assert_eq!(census.count(TerrainClass::DeepWater), 63404);
        assert_eq!(census.count(TerrainClass::Shore), 1587);
        assert_eq!(census.count(TerrainClass::Lowland), 545);
    }

    #[test]
    fn rejects_malformed_requests_without_pixels() {
        let key = TileKey::new(0, TileCoord::new(0, 0));
        let zero = TileRequest::new(2, key, 0);
        assert_eq!(
            synthesize_tile(&zero, &TerrainPalette),
            Err(SynthesisError::ZeroResolution)
        );

        let deep = TileRequest::new(2, TileKey::new(MAX_ZOOM + 1, TileCoord::new(0, 0)), 8);
        assert!(matches!(
            synthesize_tile(&deep, &TerrainPalette),
            Err(SynthesisError::ZoomTooDeep { .. })
        ));

        let far = TileRequest::new(2, TileKey::new(0, TileCoord::new(i32::MAX, 0)), 8);
        assert!(matches!(
            far.validate(),
            Err(SynthesisError::CoordinateOverflow { .. })
        ));
    }

    #[test]
    fn pixel_reads_row_major() {
        let response = render(2, 0, 0, 0, 16);
        let index = (3 * 16 + 5) * 4;
        assert_eq!(response.pixel(5, 3).as_slice(), &response.pixels[index..index + 4]);
    }
}
