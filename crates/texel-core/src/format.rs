//! Format and usage tags attached to every texture.
//!
//! The cache never interprets these; they travel untouched from the caller
//! that loads a texture to the device that creates it.

use serde::{Deserialize, Serialize};

/// Texture storage format requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FormatKey {
    /// Opaque colour, alpha ignored.
    #[default]
    Solid,
    /// One-bit colour key transparency.
    Keyed,
    /// Full 8-bit alpha channel.
    Alpha,
    /// Single-channel 8-bit data (masks, light maps).
    Gray8,
}

impl FormatKey {
    /// Bytes per texel of the decoded representation.
    pub fn bytes_per_texel(self) -> usize {
        match self {
            Self::Solid | Self::Keyed | Self::Alpha => 4,
            Self::Gray8 => 1,
        }
    }

    /// Short name for logs.
    pub fn name(self) -> &'static str {
        match self {
            Self::Solid => "solid",
            Self::Keyed => "keyed",
            Self::Alpha => "alpha",
            Self::Gray8 => "gray8",
        }
    }
}

/// Usage hints forwarded to the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TextureHints(pub u32);

impl TextureHints {
    pub const NONE: Self = Self(0);
    /// Build a full mip chain when the texture is created.
    pub const MIPMAP: Self = Self(1 << 0);
    /// Texture is sampled with filtering disabled.
    pub const NEAREST: Self = Self(1 << 1);
    /// Contents are written by the CPU after creation.
    pub const DYNAMIC: Self = Self(1 << 2);

    /// Whether every bit of `other` is set.
    #[inline]
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for TextureHints {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Eviction exemption mask.
///
/// Bit 0 exempts a node from every eviction tier. Any non-zero mask keeps it
/// alive through a purge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct NeverFlush(pub u32);

impl NeverFlush {
    pub const NONE: Self = Self(0);
    pub const PINNED: Self = Self(1);

    /// Exempt from background and pressure eviction.
    #[inline]
    pub fn is_pinned(self) -> bool {
        self.0 & 1 != 0
    }

    /// Survives a purge.
    #[inline]
    pub fn survives_purge(self) -> bool {
        self.0 != 0
    }
}
