//! Texel Core - Foundation types for the texture residency cache
//!
//! This crate provides the types shared by every Texel crate:
//! - Error type and result alias
//! - Cache configuration
//! - Node and device identifiers
//! - Format, hint and exemption tags

pub mod config;
pub mod error;
pub mod format;
pub mod handle;

pub use config::CacheConfig;
pub use error::{Result, TexelError};
pub use format::{FormatKey, NeverFlush, TextureHints};
pub use handle::{DeviceHandle, NodeId};

/// Default cache limits.
pub mod limits {
    /// Logical texture slots in the node table.
    pub const NODE_SLOTS: usize = 4096;

    /// Textures alive on the device at once (256 pages of 256x256).
    pub const MAX_RESIDENT: usize = 256;

    /// Scratch ceiling: one 1024x1024 RGBA texture plus file header room.
    pub const MAX_TEXTURE_BYTES: usize = 1024 * 1024 * 4 + 4096;

    /// Compressed texture data heap.
    pub const BLOB_HEAP_BYTES: usize = 64 * 1024 * 1024; // 64 MB

    /// Texture name heap.
    pub const NAME_HEAP_BYTES: usize = 512_000;

    /// Pressure eviction tiers (idle turns, strictly greater than).
    pub const EVICTION_TIERS: [u64; 3] = [150, 30, 0];

    /// Background eviction threshold (idle turns, strictly greater than).
    pub const HOUSEKEEPING_IDLE_TURNS: u64 = 60;
}
