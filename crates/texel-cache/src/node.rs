//! Logical texture records.

use crate::heap::HeapBlock;
use texel_core::{DeviceHandle, FormatKey, NeverFlush, TextureHints};

/// What the compressed blob of a node decompresses to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Footprint {
    /// Decoded square texels, `dim * dim * bytes_per_texel` bytes. Uploaded
    /// into an empty texture through a lock.
    RawPixels { dim: u32, bytes_per_texel: u32 },
    /// Encoded file bytes handed to the device as-is.
    EncodedBytes { len: usize },
}

impl Footprint {
    /// Size of the uncompressed data in bytes, or `None` if it does not fit
    /// in a `usize`.
    pub fn original_size(self) -> Option<usize> {
        match self {
            Self::RawPixels {
                dim,
                bytes_per_texel,
            } => (dim as usize)
                .checked_mul(dim as usize)?
                .checked_mul(bytes_per_texel as usize),
            Self::EncodedBytes { len } => Some(len),
        }
    }
}

/// Externally visible state of a node id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// No live node behind the id.
    Free,
    /// Compressed copy only.
    CachedOut,
    /// Backed by a live device texture.
    Resident(DeviceHandle),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Residency {
    CachedOut,
    Resident(DeviceHandle),
}

/// One logical texture.
#[derive(Debug)]
pub(crate) struct TextureNode {
    pub name: Option<HeapBlock<str>>,
    pub format: FormatKey,
    pub hints: TextureHints,
    pub ref_count: u32,
    pub unique_instance: bool,
    pub never_flush: NeverFlush,
    pub last_touch: u64,
    pub footprint: Footprint,
    /// `None` when the backing heap was full at load time.
    pub blob: Option<HeapBlock<[u8]>>,
    pub residency: Residency,
}

impl TextureNode {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<memory>")
    }

    pub fn resident_handle(&self) -> Option<DeviceHandle> {
        match self.residency {
            Residency::Resident(handle) => Some(handle),
            Residency::CachedOut => None,
        }
    }

    pub fn state(&self) -> NodeState {
        match self.residency {
            Residency::Resident(handle) => NodeState::Resident(handle),
            Residency::CachedOut => NodeState::CachedOut,
        }
    }

    /// Resident, not exempt, and idle for strictly more than `idle_turns`.
    pub fn is_evictable(&self, turn: u64, idle_turns: u64) -> bool {
        self.resident_handle().is_some()
            && !self.unique_instance
            && !self.never_flush.is_pinned()
            && turn.saturating_sub(self.last_touch) > idle_turns
    }

    /// Whether `path` names this node for deduplication.
    pub fn matches_name(&self, path: &str) -> bool {
        !self.unique_instance
            && self
                .name
                .as_deref()
                .is_some_and(|name| name.eq_ignore_ascii_case(path))
    }
}
