//! State guarded by the loader mutex.

use std::collections::HashMap;

use crate::cache::TileCache;
use crate::coord::{TileKey, ZoomRange};

#[derive(Debug)]
pub(super) struct LoaderState {
    pub cache: TileCache,
    /// key → generation of the load currently responsible for it
    pub in_flight: HashMap<TileKey, u64>,
    pub zoom_range: ZoomRange,
    next_generation: u64,
}

impl LoaderState {
    pub fn new(cache: TileCache, zoom_range: ZoomRange) -> Self {
        Self {
            cache,
            in_flight: HashMap::new(),
            zoom_range,
            next_generation: 0,
        }
    }

    /// Register a new in-flight load and return its generation.
    pub fn begin(&mut self, key: TileKey) -> u64 {
        let generation = self.next_generation;
        self.next_generation += 1;
        self.in_flight.insert(key, generation);
        generation
    }

    /// Retire a load. False when the load was abandoned in the meantime.
    pub fn finish(&mut self, key: TileKey, generation: u64) -> bool {
        match self.in_flight.get(&key) {
            Some(&current) if current == generation => {
                self.in_flight.remove(&key);
                true
            }
            _ => false,
        }
    }
}
