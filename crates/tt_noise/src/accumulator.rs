use smallvec::SmallVec;
use std::ops::RangeInclusive;
use tt_core::{PixelRegion, SynthesisError, TileCoord, MAX_TILE_RESOLUTION, MAX_ZOOM};

use crate::hash::WorldSeed;
use crate::octave::{octaves_for_zoom, Octave};

/// Accumulated octave heights for a rectangle of pixels, row-major.
///
/// Each octave's contribution is computed in `f64` and stored back into
/// `f32` accumulators. The amplitude total is summed in the same loop that
/// adds the octaves, so normalization always divides by exactly the
/// amplitudes that were accumulated.
#[derive(Clone, Debug)]
pub struct HeightBuffer {
    region: PixelRegion,
    values: Vec<f32>,
    total_amplitude: f64,
    octaves: Vec<u32>,
}

impl HeightBuffer {
    fn new(region: PixelRegion) -> Self {
        Self {
            region,
            values: vec![0.0; region.len()],
            total_amplitude: 0.0,
            octaves: Vec::new(),
        }
    }

    pub fn region(&self) -> PixelRegion {
        self.region
    }

    pub fn width(&self) -> u32 {
        self.region.width
    }

    pub fn height(&self) -> u32 {
        self.region.height
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Unnormalized accumulator at a pixel of the buffer.
    pub fn raw(&self, x: u32, y: u32) -> f32 {
        self.values[y as usize * self.region.width as usize + x as usize]
    }

    pub fn raw_values(&self) -> &[f32] {
        &self.values
    }

    pub fn total_amplitude(&self) -> f64 {
        self.total_amplitude
    }

    /// Octave indices accumulated, in order.
    pub fn octaves(&self) -> &[u32] {
        &self.octaves
    }

    /// Height at a pixel divided by the total amplitude.
    pub fn normalized(&self, x: u32, y: u32) -> f64 {
        self.normalize(self.raw(x, y))
    }

    pub fn normalized_values(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().map(|value| self.normalize(*value))
    }

    fn normalize(&self, value: f32) -> f64 {
        if self.total_amplitude == 0.0 {
            return 0.0;
        }
        value as f64 / self.total_amplitude
    }

    fn record(&mut self, octave: &Octave) {
        self.total_amplitude += octave.amplitude;
        self.octaves.push(octave.index);
    }
}

/// Pixels along one axis that fall into the same interpolation cell.
#[derive(Clone, Copy, Debug)]
struct CellSpan {
    cell: i64,
    start: usize,
    end: usize,
}

/// Cell fractions and cell spans of one axis of a region, for one octave.
struct AxisSamples {
    fractions: Vec<f64>,
    spans: SmallVec<[CellSpan; 8]>,
}

/// Bilinear basis of one cell: `b1 + b2*f + b3*g + b4*f*g`.
#[derive(Clone, Copy, Debug)]
struct CellBasis {
    b1: f64,
    b2: f64,
    b3: f64,
    b4: f64,
}

impl CellBasis {
    fn hash(
        seed: &WorldSeed,
        octave: &Octave,
        cell_x: i64,
        cell_y: i64,
    ) -> Result<Self, SynthesisError> {
        let x0 = octave.quantize(cell_x)?;
        let x1 = octave.quantize(next_cell(octave, cell_x)?)?;
        let y0 = octave.quantize(cell_y)?;
        let y1 = octave.quantize(next_cell(octave, cell_y)?)?;

        let c1 = seed.corner_value(octave.index, x0, y0) as f64; // (0,0)
        let c2 = seed.corner_value(octave.index, x1, y0) as f64; // (1,0)
        let c3 = seed.corner_value(octave.index, x1, y1) as f64; // (1,1)
        let c4 = seed.corner_value(octave.index, x0, y1) as f64; // (0,1)

        Ok(Self {
            b1: c1,
            b2: c2 - c1,
            b3: c4 - c1,
            b4: c1 - c2 - c4 + c3,
        })
    }

    fn value(&self, f: f64, g: f64) -> f64 {
        self.b1 + self.b2 * f + self.b3 * g + self.b4 * f * g
    }
}

fn next_cell(octave: &Octave, cell: i64) -> Result<i64, SynthesisError> {
    cell.checked_add(1)
        .ok_or(SynthesisError::CoordinateOverflow {
            octave: octave.index,
            cell,
        })
}

fn pow2(shift: u32) -> Option<i64> {
    1i64.checked_shl(shift).filter(|value| *value > 0)
}

/// Synthesizes octave noise for one world seed at one zoom level.
///
/// Every sample is addressed by its global pixel coordinate, so tiles (or
/// arbitrary regions) computed independently agree wherever they overlap
/// or touch.
#[derive(Clone, Copy, Debug)]
pub struct OctaveAccumulator {
    seed: WorldSeed,
    zoom: u32,
    resolution: u32,
}

impl OctaveAccumulator {
    pub fn new(seed: i32, zoom: u32, resolution: u32) -> Result<Self, SynthesisError> {
        if resolution == 0 {
            return Err(SynthesisError::ZeroResolution);
        }
        if resolution > MAX_TILE_RESOLUTION {
            return Err(SynthesisError::ResolutionTooLarge {
                resolution,
                max: MAX_TILE_RESOLUTION,
            });
        }
        if zoom > MAX_ZOOM {
            return Err(SynthesisError::ZoomTooDeep {
                zoom,
                max: MAX_ZOOM,
            });
        }
        Ok(Self {
            seed: WorldSeed::new(seed),
            zoom,
            resolution,
        })
    }

    pub fn seed(&self) -> WorldSeed {
        self.seed
    }

    pub fn zoom(&self) -> u32 {
        self.zoom
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    /// Octaves a full synthesis at this zoom accumulates.
    pub fn octaves(&self) -> RangeInclusive<u32> {
        octaves_for_zoom(self.zoom)
    }

    /// Heights of one tile with every octave of the zoom level.
    pub fn tile_heights(&self, coord: TileCoord) -> Result<HeightBuffer, SynthesisError> {
        self.synthesize_region(PixelRegion::tile(coord, self.resolution))
    }

    /// Heights of an arbitrary region with every octave of the zoom level.
    pub fn synthesize_region(&self, region: PixelRegion) -> Result<HeightBuffer, SynthesisError> {
        self.accumulate_region(region, self.octaves())
    }

    /// Accumulate a chosen range of octaves over a region.
    ///
    /// The whole region is checked for fixed-point overflow first; on error
    /// no octave is accumulated.
    pub fn accumulate_region(
        &self,
        region: PixelRegion,
        octaves: RangeInclusive<u32>,
    ) -> Result<HeightBuffer, SynthesisError> {
        self.check_region(region, octaves.clone())?;

        let mut buffer = HeightBuffer::new(region);
        for index in octaves {
            let octave = Octave::new(index);
            self.accumulate_octave(&octave, &mut buffer)?;
        }
        Ok(buffer)
    }

    /// Verify every cell corner the region touches quantizes exactly.
    ///
    /// Cells grow monotonically with the pixel coordinate, so checking the
    /// first and last pixel of each axis covers the region.
    pub(crate) fn check_region(
        &self,
        region: PixelRegion,
        octaves: RangeInclusive<u32>,
    ) -> Result<(), SynthesisError> {
        if region.is_empty() {
            return Ok(());
        }
        for index in octaves {
            let octave = Octave::new(index);
            for (origin, len) in [(region.x, region.width), (region.y, region.height)] {
                let last = origin.checked_add(len as i64 - 1).ok_or(
                    SynthesisError::CoordinateOverflow {
                        octave: index,
                        cell: origin,
                    },
                )?;
                for global in [origin, last] {
                    let (cell, _) = self.locate(global, &octave)?;
                    octave.quantize(cell)?;
                    octave.quantize(next_cell(&octave, cell)?)?;
                }
            }
        }
        Ok(())
    }

    /// Add one octave to every pixel of the buffer.
    ///
    /// Octaves at least as coarse as the tile produce a single cell span per
    /// axis; finer octaves split the tile into `2^(index - zoom)` spans.
    fn accumulate_octave(
        &self,
        octave: &Octave,
        buffer: &mut HeightBuffer,
    ) -> Result<(), SynthesisError> {
        let region = buffer.region;
        let columns = self.axis_samples(region.x, region.width, octave)?;
        let rows = self.axis_samples(region.y, region.height, octave)?;
        let scaling = octave.scaling();
        let width = region.width as usize;

        for row_span in &rows.spans {
            for column_span in &columns.spans {
                let basis = CellBasis::hash(&self.seed, octave, column_span.cell, row_span.cell)?;
                for y in row_span.start..row_span.end {
                    let g = rows.fractions[y];
                    let row = &mut buffer.values[y * width..(y + 1) * width];
                    for x in column_span.start..column_span.end {
                        let f = columns.fractions[x];
                        row[x] = (row[x] as f64 + basis.value(f, g) * scaling) as f32;
                    }
                }
            }
        }

        buffer.record(octave);
        Ok(())
    }

    fn axis_samples(
        &self,
        origin: i64,
        len: u32,
        octave: &Octave,
    ) -> Result<AxisSamples, SynthesisError> {
        let mut fractions = Vec::with_capacity(len as usize);
        let mut spans: SmallVec<[CellSpan; 8]> = SmallVec::new();

        for offset in 0..len as usize {
            let global = origin + offset as i64;
            let (cell, fraction) = self.locate(global, octave)?;
            fractions.push(fraction);
            match spans.last_mut() {
                Some(span) if span.cell == cell => span.end = offset + 1,
                _ => spans.push(CellSpan {
                    cell,
                    start: offset,
                    end: offset + 1,
                }),
            }
        }

        Ok(AxisSamples { fractions, spans })
    }

    /// Interpolation cell containing a global pixel, and the pixel's
    /// fractional offset inside it.
    ///
    /// The pixel sits at `global / resolution` tiles, i.e.
    /// `global / resolution * 2^(index - zoom)` cells. Numerator and
    /// denominator are kept as integers so the cell boundary is exact.
    fn locate(&self, global: i64, octave: &Octave) -> Result<(i64, f64), SynthesisError> {
        let overflow = || SynthesisError::CoordinateOverflow {
            octave: octave.index,
            cell: global,
        };
        let (up, down) = if octave.index >= self.zoom {
            (octave.index - self.zoom, 0)
        } else {
            (0, self.zoom - octave.index)
        };

        let numerator = pow2(up)
            .and_then(|scale| global.checked_mul(scale))
            .ok_or_else(overflow)?;
        let denominator = pow2(down)
            .and_then(|scale| (self.resolution as i64).checked_mul(scale))
            .ok_or_else(overflow)?;

        let cell = numerator.div_euclid(denominator);
        let fraction = numerator.rem_euclid(denominator) as f64 / denominator as f64;
        Ok((cell, fraction))
    }
}
