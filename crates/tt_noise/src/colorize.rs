use tt_core::Palette;

use crate::accumulator::HeightBuffer;

/// Bytes per output pixel (RGBA).
pub const BYTES_PER_PIXEL: usize = 4;

/// Render normalized heights into a row-major RGBA buffer.
pub fn colorize(heights: &HeightBuffer, palette: &dyn Palette) -> Vec<u8> {
    let mut pixels = Vec::with_capacity(heights.len() * BYTES_PER_PIXEL);
    for height in heights.normalized_values() {
        pixels.extend_from_slice(&palette.color(height));
    }
    pixels
}
