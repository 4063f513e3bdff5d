use std::ops::RangeInclusive;

use tt_core::{SynthesisError, MAX_ZOOM};

/// Octaves below this index all contribute with amplitude 1.
pub const OCTAVES_WITH_AMPLITUDE_ONE: u32 = 3;

/// Octaves computed beyond the one matching the tile size.
pub const OCTAVE_DEPTH: u32 = 6;

/// Corner coordinates are scaled by `2^FIXED_POINT_SHIFT` before hashing.
pub const FIXED_POINT_SHIFT: u32 = 30;

/// Brings hashed corner values into the height range of the color table.
pub const HEIGHT_DIVISOR: f64 = 2_147_484.0;

/// Fixed-point corners must stay below this magnitude to remain exact.
const EXACT_LIMIT: i64 = 1 << 53;

const _: () = assert!(MAX_ZOOM + 1 + OCTAVE_DEPTH == FIXED_POINT_SHIFT);

/// One frequency band of the noise.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Octave {
    pub index: u32,
    pub amplitude: f64,
    /// Edge length of one interpolation cell in world units (`2^-index`).
    pub period: f64,
}

impl Octave {
    pub fn new(index: u32) -> Self {
        Self {
            index,
            amplitude: Self::amplitude_for(index),
            period: (-(index as f64)).exp2(),
        }
    }

    /// 1.0 for the first octaves, then halving with every octave.
    pub fn amplitude_for(index: u32) -> f64 {
        if index < OCTAVES_WITH_AMPLITUDE_ONE {
            1.0
        } else {
            (-((index - OCTAVES_WITH_AMPLITUDE_ONE) as f64)).exp2()
        }
    }

    /// Interpolation cells per tile edge at `zoom`: `max(1, 2^(index - zoom))`.
    pub fn subdivisions(&self, zoom: u32) -> u64 {
        match self.index.checked_sub(zoom) {
            Some(shift) => 1u64.checked_shl(shift).unwrap_or(u64::MAX),
            None => 1,
        }
    }

    /// Contribution multiplier applied to a bilinear corner blend.
    pub fn scaling(&self) -> f64 {
        self.amplitude / HEIGHT_DIVISOR
    }

    /// Fixed-point hash key of the cell edge `cell * period`.
    ///
    /// The edge is scaled by `2^30` and wrapped to 32 bits. The product is
    /// formed in integers, which is exact as long as it stays below `2^53`.
    pub fn quantize(&self, cell: i64) -> Result<i32, SynthesisError> {
        let overflow = SynthesisError::CoordinateOverflow {
            octave: self.index,
            cell,
        };
        let shift = FIXED_POINT_SHIFT
            .checked_sub(self.index)
            .ok_or(overflow.clone())?;
        let scaled = cell.checked_mul(1i64 << shift).ok_or(overflow.clone())?;
        if scaled.abs() >= EXACT_LIMIT {
            return Err(overflow);
        }
        Ok(scaled as i32)
    }
}

/// Every octave index a tile at `zoom` accumulates, coarsest first.
pub fn octaves_for_zoom(zoom: u32) -> RangeInclusive<u32> {
    0..=zoom + 1 + OCTAVE_DEPTH
}

/// Sum of the amplitude formula over a range of octave indices.
pub fn total_amplitude_for(octaves: RangeInclusive<u32>) -> f64 {
    octaves.map(Octave::amplitude_for).sum()
}
