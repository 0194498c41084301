//! [`GraphicsDevice`] backed by wgpu.
//!
//! Locks are emulated with a CPU staging buffer per texture; unlocking a
//! writable lock uploads the staging buffer with `Queue::write_texture`.

use crate::context::GpuContext;
use crate::device::GraphicsDevice;
use crate::texture::GpuTexture;
use std::collections::HashMap;
use texel_core::{DeviceHandle, FormatKey, Result, TexelError, TextureHints};
use tracing::{debug, warn};

struct Lock {
    staging: Vec<u8>,
    mip: u32,
    read_only: bool,
}

/// Texture device on top of a wgpu device and queue.
pub struct WgpuDevice {
    context: GpuContext,
    textures: HashMap<DeviceHandle, GpuTexture>,
    locks: HashMap<DeviceHandle, Lock>,
    next_handle: u64,
}

impl WgpuDevice {
    /// Wrap an existing GPU context.
    pub fn new(context: GpuContext) -> Self {
        Self {
            context,
            textures: HashMap::new(),
            locks: HashMap::new(),
            next_handle: 1,
        }
    }

    /// Open the default adapter and wrap it.
    pub fn new_blocking() -> Result<Self> {
        Ok(Self::new(GpuContext::new_blocking()?))
    }

    /// The underlying context.
    pub fn context(&self) -> &GpuContext {
        &self.context
    }

    /// Look up a live texture, e.g. to bind its view for drawing.
    pub fn texture(&self, handle: DeviceHandle) -> Option<&GpuTexture> {
        self.textures.get(&handle)
    }

    /// Number of live textures.
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Estimated VRAM in use by live textures.
    pub fn memory_usage(&self) -> usize {
        self.textures.values().map(GpuTexture::memory_size).sum()
    }

    fn insert(&mut self, texture: GpuTexture) -> DeviceHandle {
        let handle = DeviceHandle(self.next_handle);
        self.next_handle += 1;
        self.textures.insert(handle, texture);
        handle
    }

    fn check_dimensions(&self, width: u32, height: u32) -> Result<()> {
        let max = self.context.max_texture_dimension();
        if width == 0 || height == 0 || width > max || height > max {
            return Err(TexelError::Device(format!(
                "Texture size {}x{} outside 1..={}",
                width, height, max
            )));
        }
        Ok(())
    }
}

impl GraphicsDevice for WgpuDevice {
    fn create_texture_from_bytes(
        &mut self,
        format: FormatKey,
        name: Option<&str>,
        bytes: &[u8],
        hints: TextureHints,
    ) -> Result<DeviceHandle> {
        let image = image::load_from_memory(bytes).map_err(|e| {
            TexelError::Device(format!(
                "Failed to decode {}: {}",
                name.unwrap_or("<memory>"),
                e
            ))
        })?;

        let (width, height, texels) = match format {
            FormatKey::Gray8 => {
                let luma = image.to_luma8();
                (luma.width(), luma.height(), luma.into_raw())
            }
            _ => {
                let rgba = image.to_rgba8();
                (rgba.width(), rgba.height(), rgba.into_raw())
            }
        };
        self.check_dimensions(width, height)?;

        let texture = GpuTexture::new(&self.context.device, width, height, format, hints, name);
        texture.upload(&self.context.queue, 0, &texels)?;

        let handle = self.insert(texture);
        debug!(%handle, width, height, format = format.name(), "Created texture from bytes");
        Ok(handle)
    }

    fn create_empty_texture(
        &mut self,
        format: FormatKey,
        name: Option<&str>,
        width: u32,
        hints: TextureHints,
    ) -> Result<DeviceHandle> {
        self.check_dimensions(width, width)?;
        let texture = GpuTexture::new(&self.context.device, width, width, format, hints, name);
        let handle = self.insert(texture);
        debug!(%handle, width, format = format.name(), "Created empty texture");
        Ok(handle)
    }

    fn lock(&mut self, handle: DeviceHandle, mip: u32, read_only: bool) -> Result<&mut [u8]> {
        let texture = self
            .textures
            .get(&handle)
            .ok_or_else(|| TexelError::Device(format!("Lock of unknown texture {}", handle)))?;
        if read_only {
            return Err(TexelError::Device(
                "Read-back locks are not supported by the wgpu backend".to_string(),
            ));
        }
        if self.locks.contains_key(&handle) {
            return Err(TexelError::Device(format!("Texture {} is already locked", handle)));
        }
        if mip >= texture.texture.mip_level_count() {
            return Err(TexelError::Device(format!(
                "Mip level {} out of range for texture {}",
                mip, handle
            )));
        }

        let lock = Lock {
            staging: vec![0u8; texture.mip_bytes(mip)],
            mip,
            read_only,
        };
        Ok(self.locks.entry(handle).or_insert(lock).staging.as_mut_slice())
    }

    fn unlock(&mut self, handle: DeviceHandle) -> Result<()> {
        let lock = self
            .locks
            .remove(&handle)
            .ok_or_else(|| TexelError::Device(format!("Unlock of unlocked texture {}", handle)))?;
        if lock.read_only {
            return Ok(());
        }
        let texture = self
            .textures
            .get(&handle)
            .ok_or_else(|| TexelError::Device(format!("Unlock of unknown texture {}", handle)))?;
        texture.upload(&self.context.queue, lock.mip, &lock.staging)
    }

    fn destroy_texture(&mut self, handle: DeviceHandle) {
        if self.locks.remove(&handle).is_some() {
            warn!(%handle, "Destroying a locked texture");
        }
        match self.textures.remove(&handle) {
            Some(texture) => texture.texture.destroy(),
            None => warn!(%handle, "Destroy of unknown texture"),
        }
    }
}
