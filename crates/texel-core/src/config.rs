//! Cache configuration.
//!
//! Every field has a default taken from [`crate::limits`], so a JSON file only
//! needs to name the values it overrides.

use crate::error::{Result, TexelError};
use crate::limits;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Sizing and eviction policy of a texture cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Number of logical texture slots in the node table.
    pub node_slots: usize,
    /// Maximum number of textures alive on the device at once.
    pub max_resident: usize,
    /// Largest uncompressed texture the scratch buffers can hold, in bytes.
    pub max_texture_bytes: usize,
    /// Capacity of the heap holding compressed texture data, in bytes.
    pub blob_heap_bytes: usize,
    /// Capacity of the heap holding texture names, in bytes.
    pub name_heap_bytes: usize,
    /// Pressure eviction tiers, tried in order. A resident node is evictable
    /// by a tier when it has been idle for strictly more turns than the value.
    pub eviction_tiers: Vec<u64>,
    /// Housekeeping evicts nodes idle for strictly more turns than this.
    pub housekeeping_idle_turns: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            node_slots: limits::NODE_SLOTS,
            max_resident: limits::MAX_RESIDENT,
            max_texture_bytes: limits::MAX_TEXTURE_BYTES,
            blob_heap_bytes: limits::BLOB_HEAP_BYTES,
            name_heap_bytes: limits::NAME_HEAP_BYTES,
            eviction_tiers: limits::EVICTION_TIERS.to_vec(),
            housekeeping_idle_turns: limits::HOUSEKEEPING_IDLE_TURNS,
        }
    }
}

impl CacheConfig {
    /// Default configuration with a different slot and residency budget.
    pub fn with_budget(node_slots: usize, max_resident: usize) -> Self {
        Self {
            node_slots,
            max_resident,
            ..Self::default()
        }
    }

    /// Check the configuration for values the cache cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.node_slots == 0 {
            return Err(TexelError::Config("node_slots must be non-zero".into()));
        }
        if self.node_slots > u32::MAX as usize {
            return Err(TexelError::Config(format!(
                "node_slots {} exceeds the id range",
                self.node_slots
            )));
        }
        if self.max_resident == 0 || self.max_resident >= self.node_slots {
            return Err(TexelError::Config(format!(
                "max_resident must be in 1..{}, got {}",
                self.node_slots, self.max_resident
            )));
        }
        if self.max_texture_bytes == 0 {
            return Err(TexelError::Config(
                "max_texture_bytes must be non-zero".into(),
            ));
        }
        if self.eviction_tiers.is_empty() {
            return Err(TexelError::Config(
                "at least one eviction tier is required".into(),
            ));
        }
        if self.eviction_tiers.windows(2).any(|w| w[0] <= w[1]) {
            return Err(TexelError::Config(format!(
                "eviction tiers must be strictly descending, got {:?}",
                self.eviction_tiers
            )));
        }
        Ok(())
    }

    /// Parse and validate a configuration from JSON bytes.
    pub fn from_json(data: &[u8]) -> Result<Self> {
        let config: Self = serde_json::from_slice(data)
            .map_err(|e| TexelError::Config(format!("Invalid cache config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty JSON bytes.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
            .map_err(|e| TexelError::Config(format!("Failed to serialize cache config: {}", e)))
    }

    /// Load a configuration file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_json(&data)
    }
}
