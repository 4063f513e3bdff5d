//! Integer hashing, the only source of randomness in the noise.
//!
//! Spatial coordinates are quantized to fixed-point integers before they
//! reach these functions; floating-point values are never hashed.

/// Thomas Wang's 32-bit avalanche mix.
///
/// Every addition wraps at 32 bits and right shifts propagate the sign bit,
/// so the result is bit-identical on every platform.
pub const fn mix(key: i32) -> i32 {
    let mut key = key;
    key = key.wrapping_add(!(key << 15));
    key ^= key >> 10;
    key = key.wrapping_add(key << 3);
    key ^= key >> 6;
    key = key.wrapping_add(!(key << 11));
    key ^= key >> 16;
    key
}

/// A world seed, mixed once so that small seeds (0, 1, 2, ...) do not
/// produce correlated worlds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WorldSeed {
    raw: i32,
    mixed: i32,
}

impl WorldSeed {
    pub const fn new(seed: i32) -> Self {
        Self {
            raw: seed,
            mixed: mix(seed),
        }
    }

    /// The seed as configured.
    pub const fn raw(&self) -> i32 {
        self.raw
    }

    pub const fn mixed(&self) -> i32 {
        self.mixed
    }

    /// Hash value of one cell corner: `mix(octave ^ mix(x ^ mix(y ^ seed)))`.
    ///
    /// `x` and `y` are fixed-point corner coordinates. The nesting order is
    /// part of the world format and must not change.
    pub const fn corner_value(&self, octave: u32, x: i32, y: i32) -> i32 {
        mix(octave as i32 ^ mix(x ^ mix(y ^ self.mixed)))
    }
}
