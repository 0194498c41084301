//! A [`GraphicsDevice`] that keeps textures in CPU memory.
//!
//! Used where no adapter is available: tests, benches and dry runs of the
//! `texel` binary. Encoded bytes are stored undecoded, so the device never
//! rejects a file format.

use crate::device::GraphicsDevice;
use std::collections::BTreeMap;
use texel_core::{DeviceHandle, FormatKey, Result, TexelError, TextureHints};
use tracing::warn;

/// How a headless texture was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureOrigin {
    /// Created from encoded file bytes; `data` holds those bytes.
    Encoded,
    /// Created empty and filled through a lock.
    Empty,
}

/// A texture living in a [`HeadlessDevice`].
#[derive(Debug, Clone)]
pub struct HeadlessTexture {
    pub name: Option<String>,
    pub format: FormatKey,
    pub hints: TextureHints,
    pub origin: TextureOrigin,
    /// Side length for empty textures, 0 for encoded ones.
    pub width: u32,
    pub data: Vec<u8>,
    locked: bool,
}

impl HeadlessTexture {
    /// Whether the texture is currently locked.
    pub fn is_locked(&self) -> bool {
        self.locked
    }
}

/// CPU-side texture device.
#[derive(Debug)]
pub struct HeadlessDevice {
    textures: BTreeMap<DeviceHandle, HeadlessTexture>,
    next_handle: u64,
    created: u64,
    destroyed: u64,
    fail_creates: bool,
}

impl Default for HeadlessDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessDevice {
    pub fn new() -> Self {
        Self {
            textures: BTreeMap::new(),
            next_handle: 1,
            created: 0,
            destroyed: 0,
            fail_creates: false,
        }
    }

    /// Make every subsequent texture creation fail, as a lost device would.
    pub fn set_fail_creates(&mut self, fail: bool) {
        self.fail_creates = fail;
    }

    /// Look up a live texture.
    pub fn texture(&self, handle: DeviceHandle) -> Option<&HeadlessTexture> {
        self.textures.get(&handle)
    }

    /// Number of live textures.
    pub fn live_count(&self) -> usize {
        self.textures.len()
    }

    /// Textures created since construction.
    pub fn created_count(&self) -> u64 {
        self.created
    }

    /// Textures destroyed since construction.
    pub fn destroyed_count(&self) -> u64 {
        self.destroyed
    }

    /// Whether any texture is still locked.
    pub fn any_locked(&self) -> bool {
        self.textures.values().any(|t| t.locked)
    }

    fn insert(&mut self, texture: HeadlessTexture) -> Result<DeviceHandle> {
        if self.fail_creates {
            return Err(TexelError::Device("Texture creation failed".to_string()));
        }
        let handle = DeviceHandle(self.next_handle);
        self.next_handle += 1;
        self.created += 1;
        self.textures.insert(handle, texture);
        Ok(handle)
    }

    fn get_mut(&mut self, handle: DeviceHandle) -> Result<&mut HeadlessTexture> {
        self.textures
            .get_mut(&handle)
            .ok_or_else(|| TexelError::Device(format!("Unknown texture {}", handle)))
    }
}

impl GraphicsDevice for HeadlessDevice {
    fn create_texture_from_bytes(
        &mut self,
        format: FormatKey,
        name: Option<&str>,
        bytes: &[u8],
        hints: TextureHints,
    ) -> Result<DeviceHandle> {
        self.insert(HeadlessTexture {
            name: name.map(str::to_owned),
            format,
            hints,
            origin: TextureOrigin::Encoded,
            width: 0,
            data: bytes.to_vec(),
            locked: false,
        })
    }

    fn create_empty_texture(
        &mut self,
        format: FormatKey,
        name: Option<&str>,
        width: u32,
        hints: TextureHints,
    ) -> Result<DeviceHandle> {
        let side = width as usize;
        self.insert(HeadlessTexture {
            name: name.map(str::to_owned),
            format,
            hints,
            origin: TextureOrigin::Empty,
            width,
            data: vec![0u8; side * side * format.bytes_per_texel()],
            locked: false,
        })
    }

    fn lock(&mut self, handle: DeviceHandle, mip: u32, _read_only: bool) -> Result<&mut [u8]> {
        let texture = self.get_mut(handle)?;
        if mip != 0 {
            return Err(TexelError::Device(format!(
                "Texture {} has no mip level {}",
                handle, mip
            )));
        }
        if texture.locked {
            return Err(TexelError::Device(format!("Texture {} is already locked", handle)));
        }
        texture.locked = true;
        Ok(texture.data.as_mut_slice())
    }

    fn unlock(&mut self, handle: DeviceHandle) -> Result<()> {
        let texture = self.get_mut(handle)?;
        if !texture.locked {
            return Err(TexelError::Device(format!("Texture {} is not locked", handle)));
        }
        texture.locked = false;
        Ok(())
    }

    fn destroy_texture(&mut self, handle: DeviceHandle) {
        match self.textures.remove(&handle) {
            Some(texture) => {
                if texture.locked {
                    warn!(%handle, "Destroying a locked texture");
                }
                self.destroyed += 1;
            }
            None => warn!(%handle, "Destroy of unknown texture"),
        }
    }
}
