//! Error types for Texel.

use crate::handle::NodeId;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Texel operations.
///
/// Variants split into two tiers. Fatal ones (see [`TexelError::is_fatal`])
/// mean the cache can no longer guarantee its invariants and the host should
/// stop; the rest are ordinary recoverable failures.
#[derive(Error, Debug)]
pub enum TexelError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not open texture source {path:?}: {source}")]
    SourceOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not read texture source {path:?}: {source}")]
    SourceRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Too many textures: all {capacity} texture slots are in use")]
    TableFull { capacity: usize },

    #[error("Texture name heap exhausted: {requested} bytes requested, {capacity} byte capacity")]
    NameHeapExhausted { requested: usize, capacity: usize },

    #[error("Texture too large: {name} is {size} bytes, limit is {limit}")]
    TooLarge {
        name: String,
        size: usize,
        limit: usize,
    },

    #[error("Pixel buffer too short: expected {expected} bytes, got {actual}")]
    ShortPixelData { expected: usize, actual: usize },

    #[error("{format} textures store {expected} bytes per texel, got {actual}")]
    TexelSizeMismatch {
        format: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Decompressed to different size from original: {name} expected {expected} bytes, got {actual}")]
    Corrupted {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid texture node {0}")]
    InvalidNode(NodeId),

    #[error("Texture node {0} does not exist")]
    NotFound(NodeId),

    #[error("Texture node {0} has no backing data")]
    Unusable(NodeId),

    #[error("Compression error: {0}")]
    Codec(String),

    #[error("GPU error: {0}")]
    Device(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl TexelError {
    /// Whether this error must terminate the host.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::SourceOpen { .. }
                | Self::SourceRead { .. }
                | Self::TableFull { .. }
                | Self::NameHeapExhausted { .. }
                | Self::TooLarge { .. }
                | Self::ShortPixelData { .. }
                | Self::TexelSizeMismatch { .. }
                | Self::Corrupted { .. }
                | Self::InvalidNode(_)
                | Self::Codec(_)
        )
    }
}

/// Result type alias for Texel operations.
pub type Result<T> = std::result::Result<T, TexelError>;
