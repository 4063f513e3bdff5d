use std::fmt;

/// A tile request that cannot be synthesized.
///
/// Synthesis is total over its valid domain, so every variant is a
/// precondition violation detected before any octave is accumulated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthesisError {
    /// Tiles must be at least one pixel wide.
    ZeroResolution,
    ResolutionTooLarge { resolution: u32, max: u32 },
    /// The finest octave of this zoom would lose fixed-point precision.
    ZoomTooDeep { zoom: u32, max: u32 },
    /// A cell corner scaled to fixed point no longer fits exactly.
    CoordinateOverflow { octave: u32, cell: i64 },
}

impl fmt::Display for SynthesisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroResolution => write!(f, "tile resolution must be positive"),
            Self::ResolutionTooLarge { resolution, max } => {
                write!(f, "tile resolution {} exceeds the maximum of {}", resolution, max)
            }
            Self::ZoomTooDeep { zoom, max } => {
                write!(f, "zoom {} is deeper than the supported maximum of {}", zoom, max)
            }
            Self::CoordinateOverflow { octave, cell } => write!(
                f,
                "cell {} of octave {} overflows the fixed-point corner representation",
                cell, octave
            ),
        }
    }
}

impl std::error::Error for SynthesisError {}
