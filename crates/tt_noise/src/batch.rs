use bevy::log::warn;
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use tt_core::{Palette, SynthesisError, TileKey};

use crate::tile::{synthesize_tile, TileRequest, TileResponse};

/// Thread-safe progress tracker for a batch of tiles.
/// Uses atomic counters for lock-free updates from rayon workers.
pub struct BatchProgress {
    completed: AtomicUsize,
    failed: AtomicUsize,
    total: usize,
}

impl BatchProgress {
    /// Create a new progress tracker for the given number of tiles.
    pub fn new(total: usize) -> Self {
        Self {
            completed: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            total,
        }
    }

    pub fn record_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Fraction of tiles finished (successfully or not), 0.0 to 1.0.
    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            return 0.0;
        }
        (self.completed() + self.failed()) as f32 / self.total as f32
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        self.completed.store(0, Ordering::Relaxed);
        self.failed.store(0, Ordering::Relaxed);
    }
}

/// Outcome of one tile in a batch.
pub type BatchResult = (TileKey, Result<TileResponse, SynthesisError>);

/// Synthesize many tiles on the rayon pool.
///
/// Tiles share nothing but the palette, so they run fully in parallel. A
/// malformed request yields an error for that tile only.
pub fn synthesize_batch(
    requests: &[TileRequest],
    palette: &dyn Palette,
    progress: &BatchProgress,
) -> Vec<BatchResult> {
    requests
        .par_iter()
        .map(|request| {
            let result = synthesize_tile(request, palette);
            match &result {
                Ok(_) => progress.record_completed(),
                Err(err) => {
                    warn!("Tile {} rejected: {}", request.key(), err);
                    progress.record_failed();
                }
            }
            (request.key(), result)
        })
        .collect()
}
