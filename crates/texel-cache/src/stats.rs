//! Cache counters for diagnostics.

/// Statistics about texture cache usage.
///
/// Soft failures never surface as errors, so these counters are where they
/// show up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Live logical textures.
    pub nodes_in_use: usize,
    /// Textures currently backed by a device object.
    pub resident: usize,
    /// Current turn.
    pub turn: u64,

    /// Acquires served by an already resident texture.
    pub hits: u64,
    /// Acquires that had to materialize a texture.
    pub misses: u64,
    /// Device textures created by the cache.
    pub materializations: u64,

    /// Times the residency budget was full on a miss.
    pub pressure_sweeps: u64,
    /// Textures evicted to make room for another.
    pub pressure_evictions: u64,
    /// Textures evicted by housekeeping.
    pub housekeeping_evictions: u64,

    /// Misses that failed because nothing was evictable.
    pub out_of_handles: u64,
    /// Loads whose compressed data did not fit in the backing heap.
    pub heap_failures: u64,
    /// Acquires of nodes that have no compressed data.
    pub unusable_acquires: u64,
    /// Acquires with a stale or unknown id.
    pub bad_handles: u64,
    /// Device texture creations that failed.
    pub device_failures: u64,

    /// Uncompressed bytes accepted by loads.
    pub raw_bytes: u64,
    /// Compressed bytes produced by loads.
    pub compressed_bytes: u64,
    /// Bytes in use in the compressed data heap.
    pub blob_heap_used: usize,
    /// Highest `blob_heap_used` has reached.
    pub blob_heap_peak: usize,
    /// Bytes in use in the name heap.
    pub name_heap_used: usize,
    /// Highest `name_heap_used` has reached.
    pub name_heap_peak: usize,
}

impl CacheStats {
    /// Calculate the cache hit rate (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Compressed size as a fraction of the raw size.
    pub fn compression_ratio(&self) -> f64 {
        if self.raw_bytes == 0 {
            0.0
        } else {
            self.compressed_bytes as f64 / self.raw_bytes as f64
        }
    }

    /// Total of all soft failures.
    pub fn soft_failures(&self) -> u64 {
        self.out_of_handles
            + self.heap_failures
            + self.unusable_acquires
            + self.bad_handles
            + self.device_failures
    }
}
