//! The residency controller.
//!
//! Every texture is held as an LZ4-compressed CPU copy from the moment it is
//! loaded. A device texture is only created when a renderer asks for it with
//! [`TextureManager::acquire_resident`], and at most `max_resident` of them
//! exist at once. Device textures are reclaimed in two ways:
//!
//! - **Pressure**: a miss with a full budget runs [`TextureManager::evict_one`],
//!   which walks the eviction tiers from the most to the least idle threshold
//!   and evicts the first candidate in table order, not the least recently
//!   used one.
//! - **Housekeeping**: [`TextureManager::housekeeping`] runs once per turn and
//!   evicts everything idle past `housekeeping_idle_turns`.
//!
//! Nodes marked `unique_instance` or pinned with bit 0 of their never-flush
//! mask count against the budget but are never evicted.
//!
//! Errors for which [`TexelError::is_fatal`] is true are logged at error level
//! before they are returned. Soft failures return `Ok(None)`, log a warning
//! and bump a [`CacheStats`] counter.

use crate::codec::Codec;
use crate::heap::BackingHeap;
use crate::node::{Footprint, NodeState, Residency, TextureNode};
use crate::stats::CacheStats;
use crate::table::NodeTable;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use texel_core::{
    CacheConfig, DeviceHandle, FormatKey, NeverFlush, NodeId, Result, TexelError, TextureHints,
};
use texel_gpu::GraphicsDevice;
use tracing::{debug, error, info, warn};

fn fatal(err: TexelError) -> TexelError {
    error!("{}", err);
    err
}

/// Bounded texture residency cache over a graphics device.
pub struct TextureManager<D: GraphicsDevice> {
    config: CacheConfig,
    device: D,
    table: NodeTable,
    codec: Codec,
    blob_heap: BackingHeap,
    name_heap: BackingHeap,
    turn: u64,
    resident: usize,
    stats: CacheStats,
}

impl<D: GraphicsDevice> TextureManager<D> {
    /// Create a cache. The scratch buffers are allocated here, once.
    pub fn new(config: CacheConfig, device: D) -> Result<Self> {
        config.validate()?;
        info!(
            slots = config.node_slots,
            max_resident = config.max_resident,
            max_texture_bytes = config.max_texture_bytes,
            "Texture cache started"
        );
        Ok(Self {
            table: NodeTable::new(config.node_slots),
            codec: Codec::new(config.max_texture_bytes),
            blob_heap: BackingHeap::new("TXMCache", config.blob_heap_bytes),
            name_heap: BackingHeap::new("TXMString", config.name_heap_bytes),
            config,
            device,
            turn: 0,
            resident: 0,
            stats: CacheStats::default(),
        })
    }

    // ── Loading ─────────────────────────────────────────────────

    /// Load a texture file, or share an already loaded one.
    ///
    /// Unless `unique_instance` is set, a non-unique node with the same path
    /// (compared case-insensitively) gains a reference and is returned. A
    /// miss reads and compresses the file; no device texture is created.
    pub fn load(
        &mut self,
        path: impl AsRef<Path>,
        format: FormatKey,
        hints: TextureHints,
        unique_instance: bool,
        never_flush: NeverFlush,
    ) -> Result<NodeId> {
        let path = path.as_ref();
        let name = path.to_string_lossy();

        if !unique_instance {
            if let Some(id) = self.find_loaded(&name) {
                if let Some(node) = self.table.get_mut(id) {
                    node.ref_count += 1;
                    debug!(%id, name = %name, refs = node.ref_count, "Texture already loaded");
                }
                return Ok(id);
            }
        }

        if self.table.is_full() {
            return Err(fatal(TexelError::TableFull {
                capacity: self.table.capacity(),
            }));
        }

        let open_error = |source| {
            fatal(TexelError::SourceOpen {
                path: path.to_path_buf(),
                source,
            })
        };
        let read_error = |source| {
            fatal(TexelError::SourceRead {
                path: path.to_path_buf(),
                source,
            })
        };
        let mut file = File::open(path).map_err(open_error)?;
        let len = file.metadata().map_err(read_error)?.len();
        let len = usize::try_from(len).unwrap_or(usize::MAX);

        let staged = self.codec.stage(&name, len).map_err(fatal)?;
        file.read_exact(staged).map_err(read_error)?;
        let packed = self.codec.compress_staged(&name, len).map_err(fatal)?;

        self.stats.raw_bytes += len as u64;
        self.stats.compressed_bytes += packed.len() as u64;
        let blob = self.blob_heap.alloc_bytes(packed);
        if blob.is_none() {
            self.stats.heap_failures += 1;
            warn!(name = %name, size = packed.len(), "Texture cache is out of RAM");
        }

        let Some(name_block) = self.name_heap.alloc_str(&name) else {
            if let Some(blob) = blob {
                self.blob_heap.free(blob);
            }
            return Err(fatal(TexelError::NameHeapExhausted {
                requested: name.len(),
                capacity: self.name_heap.capacity(),
            }));
        };

        let node = TextureNode {
            name: Some(name_block),
            format,
            hints,
            ref_count: 1,
            unique_instance,
            never_flush,
            last_touch: self.turn,
            footprint: Footprint::EncodedBytes { len },
            blob,
            residency: Residency::CachedOut,
        };
        let id = self.insert(node)?;
        debug!(%id, name = %name, size = len, "Loaded texture");
        Ok(id)
    }

    /// Create a texture from decoded square texels.
    ///
    /// `pixels` must hold at least `dim * dim * bytes_per_texel` bytes; only
    /// that prefix is kept. `bytes_per_texel` must match `format`.
    pub fn load_from_memory(
        &mut self,
        pixels: &[u8],
        format: FormatKey,
        hints: TextureHints,
        dim: u32,
        bytes_per_texel: u32,
    ) -> Result<NodeId> {
        let footprint = Footprint::RawPixels {
            dim,
            bytes_per_texel,
        };
        let too_large = |size| {
            fatal(TexelError::TooLarge {
                name: "<memory>".to_string(),
                size,
                limit: self.codec.max_bytes(),
            })
        };
        let size = footprint
            .original_size()
            .ok_or_else(|| too_large(usize::MAX))?;
        if size > self.codec.max_bytes() {
            return Err(too_large(size));
        }

        if bytes_per_texel as usize != format.bytes_per_texel() {
            return Err(fatal(TexelError::TexelSizeMismatch {
                format: format.name(),
                expected: format.bytes_per_texel(),
                actual: bytes_per_texel as usize,
            }));
        }
        if pixels.len() < size {
            return Err(fatal(TexelError::ShortPixelData {
                expected: size,
                actual: pixels.len(),
            }));
        }

        if self.table.is_full() {
            return Err(fatal(TexelError::TableFull {
                capacity: self.table.capacity(),
            }));
        }

        let packed = self
            .codec
            .compress("<memory>", &pixels[..size])
            .map_err(fatal)?;

        self.stats.raw_bytes += size as u64;
        self.stats.compressed_bytes += packed.len() as u64;
        let blob = self.blob_heap.alloc_bytes(packed);
        if blob.is_none() {
            self.stats.heap_failures += 1;
            warn!(size = packed.len(), "Texture cache is out of RAM");
        }

        let node = TextureNode {
            name: None,
            format,
            hints,
            ref_count: 1,
            unique_instance: false,
            never_flush: NeverFlush::NONE,
            last_touch: self.turn,
            footprint,
            blob,
            residency: Residency::CachedOut,
        };
        let id = self.insert(node)?;
        debug!(%id, dim, bytes_per_texel, "Created texture from memory");
        Ok(id)
    }

    fn insert(&mut self, node: TextureNode) -> Result<NodeId> {
        match self.table.insert(node) {
            Some(id) => Ok(id),
            None => Err(fatal(TexelError::TableFull {
                capacity: self.table.capacity(),
            })),
        }
    }

    /// Id of the loaded, non-unique texture with this path, without taking
    /// a reference.
    pub fn find_loaded(&self, path: &str) -> Option<NodeId> {
        self.table.find(|node| node.matches_name(path))
    }

    // ── Residency ───────────────────────────────────────────────

    /// Device texture for `id`, creating it if needed.
    ///
    /// Returns `Ok(None)` ("no texture") when the budget is full and nothing
    /// is evictable, when the id is stale, when the node has no compressed
    /// data, or when the device fails to create the texture. Callers draw
    /// untextured in that case.
    pub fn acquire_resident(&mut self, id: NodeId) -> Result<Option<DeviceHandle>> {
        let turn = self.turn;
        let Some(node) = self.table.get_mut(id) else {
            self.stats.bad_handles += 1;
            warn!(%id, "Bad texture handle");
            return Ok(None);
        };

        if let Residency::Resident(handle) = node.residency {
            node.last_touch = turn;
            self.stats.hits += 1;
            return Ok(Some(handle));
        }

        self.stats.misses += 1;
        if node.blob.is_none() {
            self.stats.unusable_acquires += 1;
            warn!(%id, name = node.display_name(), "Texture has no cached data");
            return Ok(None);
        }

        if self.resident >= self.config.max_resident && !self.evict_one() {
            self.stats.out_of_handles += 1;
            warn!(%id, resident = self.resident, "Out of texture handles");
            return Ok(None);
        }

        self.materialize(id)
    }

    fn materialize(&mut self, id: NodeId) -> Result<Option<DeviceHandle>> {
        let Some(node) = self.table.get(id) else {
            return Ok(None);
        };
        let Some(blob) = node.blob.as_deref() else {
            return Ok(None);
        };
        let name = node.display_name();

        let texels = self
            .codec
            .decompress(name, blob, node.footprint.original_size().unwrap_or(usize::MAX))
            .map_err(fatal)?;

        let created = match node.footprint {
            Footprint::EncodedBytes { .. } => self.device.create_texture_from_bytes(
                node.format,
                node.name.as_deref(),
                texels,
                node.hints,
            ),
            Footprint::RawPixels { dim, .. } => {
                match self
                    .device
                    .create_empty_texture(node.format, node.name.as_deref(), dim, node.hints)
                {
                    Ok(handle) => match self.device.write_texture(handle, texels) {
                        Ok(()) => Ok(handle),
                        Err(e) => {
                            self.device.destroy_texture(handle);
                            Err(e)
                        }
                    },
                    Err(e) => Err(e),
                }
            }
        };

        let handle = match created {
            Ok(handle) => handle,
            Err(e) => {
                self.stats.device_failures += 1;
                warn!(%id, name, "Failed to create device texture: {}", e);
                return Ok(None);
            }
        };
        debug!(%id, name, %handle, "Cached texture in");

        let turn = self.turn;
        if let Some(node) = self.table.get_mut(id) {
            node.residency = Residency::Resident(handle);
            node.last_touch = turn;
        }
        self.resident += 1;
        self.stats.materializations += 1;
        debug_assert!(self.resident <= self.config.max_resident);
        Ok(Some(handle))
    }

    /// Evict one resident texture to free a slot in the budget.
    ///
    /// Tries each eviction tier in turn and evicts the first candidate in
    /// table order, not the most idle one. Returns false when no tier finds
    /// a candidate, which happens when every evictable node was touched this
    /// turn.
    pub fn evict_one(&mut self) -> bool {
        self.stats.pressure_sweeps += 1;
        let turn = self.turn;

        for tier in 0..self.config.eviction_tiers.len() {
            let idle = self.config.eviction_tiers[tier];
            if let Some(id) = self.table.find(|node| node.is_evictable(turn, idle)) {
                self.cache_out(id);
                self.stats.pressure_evictions += 1;
                debug!(%id, tier, idle, "Evicted texture under pressure");
                return true;
            }
        }
        false
    }

    /// Destroy the device texture of a resident node, keeping its data.
    fn cache_out(&mut self, id: NodeId) {
        let Some(node) = self.table.get_mut(id) else {
            return;
        };
        if let Residency::Resident(handle) = node.residency {
            self.device.destroy_texture(handle);
            node.residency = Residency::CachedOut;
            self.resident -= 1;
        }
    }

    /// Start a new turn and evict every eligible texture that has been idle
    /// too long. Returns the number of textures evicted.
    pub fn housekeeping(&mut self) -> usize {
        self.turn += 1;
        let turn = self.turn;
        let idle = self.config.housekeeping_idle_turns;

        let mut freed = 0;
        for (_, node) in self.table.iter_mut() {
            if !node.is_evictable(turn, idle) {
                continue;
            }
            if let Residency::Resident(handle) = node.residency {
                self.device.destroy_texture(handle);
                node.residency = Residency::CachedOut;
                freed += 1;
            }
        }

        self.resident -= freed;
        self.stats.housekeeping_evictions += freed as u64;
        debug_assert_eq!(
            self.resident,
            self.table.iter().filter(|(_, n)| n.resident_handle().is_some()).count()
        );
        if freed > 0 {
            debug!(turn, freed, resident = self.resident, "Housekeeping");
        }
        freed
    }

    /// Destroy every device texture, pinned and unique ones included. The
    /// nodes stay loaded and rematerialize on their next acquire.
    pub fn evict_all(&mut self) -> usize {
        let mut freed = 0;
        for (_, node) in self.table.iter_mut() {
            if let Residency::Resident(handle) = node.residency {
                self.device.destroy_texture(handle);
                node.residency = Residency::CachedOut;
                freed += 1;
            }
        }
        self.resident = 0;
        freed
    }

    // ── Ownership ───────────────────────────────────────────────

    /// Take another reference to a live node.
    pub fn share(&mut self, id: NodeId) -> Result<NodeId> {
        let node = self
            .table
            .get_mut(id)
            .ok_or_else(|| fatal(TexelError::InvalidNode(id)))?;
        node.ref_count += 1;
        Ok(id)
    }

    /// Drop a reference. The last release destroys the node and frees its
    /// slot; the id is stale afterwards.
    pub fn release(&mut self, id: NodeId) -> Result<()> {
        let node = self
            .table
            .get_mut(id)
            .ok_or_else(|| fatal(TexelError::InvalidNode(id)))?;
        node.ref_count -= 1;
        if node.ref_count == 0 {
            self.destroy(id);
        }
        Ok(())
    }

    /// Release the node currently resident under a device handle. Returns
    /// whether one was found.
    pub fn release_by_handle(&mut self, handle: DeviceHandle) -> Result<bool> {
        match self
            .table
            .find(|node| node.resident_handle() == Some(handle))
        {
            Some(id) => self.release(id).map(|()| true),
            None => Ok(false),
        }
    }

    /// Destroy every node whose never-flush mask is zero, whatever its
    /// reference count. Returns the number of nodes destroyed.
    pub fn purge(&mut self) -> usize {
        let doomed: Vec<NodeId> = self
            .table
            .iter()
            .filter(|(_, node)| !node.never_flush.survives_purge())
            .map(|(id, _)| id)
            .collect();
        for &id in &doomed {
            self.destroy(id);
        }
        info!(purged = doomed.len(), remaining = self.table.len(), "Purged textures");
        doomed.len()
    }

    fn destroy(&mut self, id: NodeId) {
        let Some(node) = self.table.remove(id) else {
            return;
        };
        if let Residency::Resident(handle) = node.residency {
            self.device.destroy_texture(handle);
            self.resident -= 1;
        }
        debug!(%id, name = node.display_name(), "Destroyed texture");
        if let Some(blob) = node.blob {
            self.blob_heap.free(blob);
        }
        if let Some(name) = node.name {
            self.name_heap.free(name);
        }
    }

    // ── Persistence ─────────────────────────────────────────────

    /// Write the original bytes of a texture to `path`, with no header.
    pub fn save_texture(&mut self, id: NodeId, path: impl AsRef<Path>) -> Result<()> {
        let node = self.table.get(id).ok_or(TexelError::NotFound(id))?;
        let blob = node.blob.as_deref().ok_or(TexelError::Unusable(id))?;
        let texels = self
            .codec
            .decompress(
                node.display_name(),
                blob,
                node.footprint.original_size().unwrap_or(usize::MAX),
            )
            .map_err(fatal)?;

        let mut file = File::create(path.as_ref())?;
        file.write_all(texels)?;
        debug!(%id, path = %path.as_ref().display(), size = texels.len(), "Saved texture");
        Ok(())
    }

    // ── Inspection ──────────────────────────────────────────────

    /// State of an id. Stale ids report [`NodeState::Free`].
    pub fn state(&self, id: NodeId) -> NodeState {
        self.table.get(id).map_or(NodeState::Free, TextureNode::state)
    }

    /// Reference count of a live node.
    pub fn ref_count(&self, id: NodeId) -> Option<u32> {
        self.table.get(id).map(|node| node.ref_count)
    }

    /// Name of a live node loaded from a file.
    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.table.get(id).and_then(|node| node.name.as_deref())
    }

    /// What a live node's data decompresses to.
    pub fn footprint(&self, id: NodeId) -> Option<Footprint> {
        self.table.get(id).map(|node| node.footprint)
    }

    /// Turn at which a live node was last acquired.
    pub fn last_touch(&self, id: NodeId) -> Option<u64> {
        self.table.get(id).map(|node| node.last_touch)
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Whether no node is live.
    pub fn is_empty(&self) -> bool {
        self.table.len() == 0
    }

    /// Number of resident nodes.
    pub fn resident_count(&self) -> usize {
        self.resident
    }

    /// Current turn.
    pub fn turn(&self) -> u64 {
        self.turn
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            nodes_in_use: self.table.len(),
            resident: self.resident,
            turn: self.turn,
            blob_heap_used: self.blob_heap.used(),
            blob_heap_peak: self.blob_heap.peak(),
            name_heap_used: self.name_heap.used(),
            name_heap_peak: self.name_heap.peak(),
            ..self.stats
        }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    /// Mutable device access. Textures owned by the cache must not be
    /// destroyed through it.
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }
}

impl<D: GraphicsDevice> Drop for TextureManager<D> {
    fn drop(&mut self) {
        self.evict_all();
    }
}
