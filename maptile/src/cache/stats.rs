//! Cache statistics snapshot.

use std::fmt;

/// Point-in-time view of cache and loading counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Cached tiles plus tiles currently loading.
    pub total_tiles: usize,
    /// Cached tiles in the `Loaded` state.
    pub loaded_tiles: usize,
    /// Tiles with a fetch in flight.
    pub loading_tiles: usize,
    /// Lookups that found a cached tile.
    pub hits: u64,
    /// Lookups that found nothing.
    pub misses: u64,
    /// Tiles in the persistent store, when one is attached and can count.
    pub stored_tiles: Option<u64>,
}

impl CacheStats {
    /// Fraction of lookups that hit, in `0.0..=1.0`; zero before any lookup.
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }

    /// Hit rate as a percentage.
    pub fn hit_rate_percent(&self) -> f64 {
        self.hit_rate() * 100.0
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} tiles ({} loaded, {} loading), {} hits / {} misses ({:.1}% hit rate)",
            self.total_tiles,
            self.loaded_tiles,
            self.loading_tiles,
            self.hits,
            self.misses,
            self.hit_rate_percent()
        )?;
        if let Some(stored) = self.stored_tiles {
            write!(f, ", {} stored", stored)?;
        }
        Ok(())
    }
}
