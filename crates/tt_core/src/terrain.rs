use std::fmt;

/// Terrain bands of the height-to-color table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum TerrainClass {
    #[default]
    DeepWater,
    Shore,
    Lowland,
    Forest,
    Rock,
    HighRock,
    Peak,
}

impl TerrainClass {
    /// All classes, lowest band first.
    pub fn all() -> &'static [TerrainClass] {
        &[
            Self::DeepWater,
            Self::Shore,
            Self::Lowland,
            Self::Forest,
            Self::Rock,
            Self::HighRock,
            Self::Peak,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::DeepWater => "deep water",
            Self::Shore => "shore",
            Self::Lowland => "lowland",
            Self::Forest => "forest",
            Self::Rock => "rock",
            Self::HighRock => "high rock",
            Self::Peak => "peak",
        }
    }

    pub fn rgb(&self) -> [u8; 3] {
        match self {
            Self::DeepWater => [0, 0, 128],
            Self::Shore => [189, 183, 107],
            Self::Lowland => [34, 139, 34],
            Self::Forest => [5, 87, 5],
            Self::Rock => [150, 150, 150],
            Self::HighRock => [200, 200, 200],
            Self::Peak => [100, 100, 100],
        }
    }

    /// RGBA color; alpha is always opaque.
    pub fn color(&self) -> [u8; 4] {
        let [r, g, b] = self.rgb();
        [r, g, b, 255]
    }

    /// Inclusive lower height bound of the band. Deep water is unbounded below.
    pub fn lower_bound(&self) -> Option<f64> {
        match self {
            Self::DeepWater => None,
            Self::Shore => Some(510.0),
            Self::Lowland => Some(550.0),
            Self::Forest => Some(620.0),
            Self::Rock => Some(700.0),
            Self::HighRock => Some(770.0),
            Self::Peak => Some(800.0),
        }
    }

    /// Classify a normalized height. Bands are half-open: `[lower, next lower)`.
    pub fn from_height(height: f64) -> Self {
        if height < 510.0 {
            Self::DeepWater
        } else if height < 550.0 {
            Self::Shore
        } else if height < 620.0 {
            Self::Lowland
        } else if height < 700.0 {
            Self::Forest
        } else if height < 770.0 {
            Self::Rock
        } else if height < 800.0 {
            Self::HighRock
        } else {
            Self::Peak
        }
    }

    /// Inverse of [`TerrainClass::color`].
    pub fn from_color(rgba: [u8; 4]) -> Option<Self> {
        Self::all().iter().copied().find(|class| class.color() == rgba)
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

/// Per-class pixel counts of a rendered tile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TerrainCensus {
    counts: [usize; 7],
    unclassified: usize,
}

impl TerrainCensus {
    /// Count classes in a row-major RGBA buffer.
    pub fn from_pixels(pixels: &[u8]) -> Self {
        let mut census = Self::default();
        for px in pixels.chunks_exact(4) {
            match TerrainClass::from_color([px[0], px[1], px[2], px[3]]) {
                Some(class) => census.counts[class.index()] += 1,
                None => census.unclassified += 1,
            }
        }
        census
    }

    pub fn count(&self, class: TerrainClass) -> usize {
        self.counts[class.index()]
    }

    /// Pixels whose color is not in the terrain table.
    pub fn unclassified(&self) -> usize {
        self.unclassified
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum::<usize>() + self.unclassified
    }

    /// The most common class, if any pixel was classified.
    pub fn dominant(&self) -> Option<TerrainClass> {
        TerrainClass::all()
            .iter()
            .copied()
            .filter(|class| self.count(*class) > 0)
            .max_by_key(|class| self.count(*class))
    }
}

impl fmt::Display for TerrainCensus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.total().max(1) as f64;
        let mut first = true;
        for class in TerrainClass::all() {
            let count = self.count(*class);
            if count == 0 {
                continue;
            }
            if !first {
                write!(f, ", ")?;
            }
            first = false;
            write!(f, "{} {:.1}%", class.name(), count as f64 * 100.0 / total)?;
        }
        if self.unclassified > 0 {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "other {:.1}%", self.unclassified as f64 * 100.0 / total)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_are_half_open() {
        assert_eq!(TerrainClass::from_height(509.999), TerrainClass::DeepWater);
        assert_eq!(TerrainClass::from_height(510.0), TerrainClass::Shore);
        assert_eq!(TerrainClass::from_height(550.0), TerrainClass::Lowland);
        assert_eq!(TerrainClass::from_height(620.0), TerrainClass::Forest);
        assert_eq!(TerrainClass::from_height(700.0), TerrainClass::Rock);
        assert_eq!(TerrainClass::from_height(770.0), TerrainClass::HighRock);
        assert_eq!(TerrainClass::from_height(800.0), TerrainClass::Peak);
        assert_eq!(TerrainClass::from_height(1000.0), TerrainClass::Peak);
        assert_eq!(TerrainClass::from_height(-1000.0), TerrainClass::DeepWater);
    }

    #[test]
    fn lower_bounds_match_classification() {
        for class in TerrainClass::all() {
            if let Some(bound) = class.lower_bound() {
                assert_eq!(TerrainClass::from_height(bound), *class);
            }
        }
    }

    #[test]
    fn colors_are_opaque_and_distinct() {
        let mut colors: Vec<_> = TerrainClass::all().iter().map(|c| c.color()).collect();
        assert!(colors.iter().all(|c| c[3] == 255));
        let len = colors.len();
        colors.sort();
        colors.dedup();
        assert_eq!(colors.len(), len);
    }

    #[test]
    fn census_counts_pixels() {
        let mut pixels = Vec::new();
        pixels.extend_from_slice(&TerrainClass::Shore.color());
        pixels.extend_from_slice(&TerrainClass::Shore.color());
        pixels.extend_from_slice(&TerrainClass::Peak.color());
        pixels.extend_from_slice(&[1, 2, 3, 255]);

        let census = TerrainCensus::from_pixels(&pixels);
        assert_eq!(census.count(TerrainClass::Shore), 2);
        assert_eq!(census.count(TerrainClass::Peak), 1);
        assert_eq!(census.unclassified(), 1);
        assert_eq!(census.total(), 4);
        assert_eq!(census.dominant(), Some(TerrainClass::Shore));
        assert_eq!(census.to_string(), "shore 50.0%, peak 25.0%, other 25.0%");
    }
}
