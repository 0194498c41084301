//! Texel Cache - bounded texture residency
//!
//! Keeps every loaded texture as a compressed CPU copy and materializes
//! device textures on demand, under a fixed residency budget:
//! - [`TextureManager`]: load, acquire, evict and release textures
//! - [`Codec`]: LZ4 compression through owned scratch buffers
//! - [`BackingHeap`]: fixed-capacity accounting for blobs and names
//! - [`CacheStats`]: hit, eviction and failure counters

pub mod codec;
pub mod heap;
pub mod manager;
pub mod node;
pub mod stats;
mod table;

pub use codec::Codec;
pub use heap::{BackingHeap, HeapBlock};
pub use manager::TextureManager;
pub use node::{Footprint, NodeState};
pub use stats::CacheStats;
