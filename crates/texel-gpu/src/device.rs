//! The graphics device facade consumed by the texture cache.
//!
//! A device creates, fills and destroys texture objects. It knows nothing
//! about nodes, reference counts or residency; the cache drives it.

use texel_core::{DeviceHandle, FormatKey, Result, TexelError, TextureHints};

/// Minimal set of texture operations the cache needs from a rendering backend.
pub trait GraphicsDevice {
    /// Create a texture from encoded file bytes (TGA, PNG, ...).
    fn create_texture_from_bytes(
        &mut self,
        format: FormatKey,
        name: Option<&str>,
        bytes: &[u8],
        hints: TextureHints,
    ) -> Result<DeviceHandle>;

    /// Create an uninitialised square texture `width` texels on a side.
    fn create_empty_texture(
        &mut self,
        format: FormatKey,
        name: Option<&str>,
        width: u32,
        hints: TextureHints,
    ) -> Result<DeviceHandle>;

    /// Map a mip level for CPU access. Every successful lock must be
    /// followed by exactly one [`GraphicsDevice::unlock`].
    fn lock(&mut self, handle: DeviceHandle, mip: u32, read_only: bool) -> Result<&mut [u8]>;

    /// Release a lock taken with [`GraphicsDevice::lock`], publishing writes.
    fn unlock(&mut self, handle: DeviceHandle) -> Result<()>;

    /// Destroy a texture. Unknown handles are ignored.
    fn destroy_texture(&mut self, handle: DeviceHandle);

    /// Copy `data` into mip 0 of a texture under a paired lock/unlock.
    ///
    /// `data` must be exactly the size of the locked level; anything else is
    /// rejected without writing. The unlock runs either way.
    fn write_texture(&mut self, handle: DeviceHandle, data: &[u8]) -> Result<()> {
        let target = self.lock(handle, 0, false)?;
        let locked_len = target.len();
        if locked_len == data.len() {
            target.copy_from_slice(data);
        }
        self.unlock(handle)?;
        if locked_len != data.len() {
            return Err(TexelError::Device(format!(
                "Write of {} bytes doesn't match texture {} of {} bytes",
                data.len(),
                handle,
                locked_len
            )));
        }
        Ok(())
    }
}

impl<D: GraphicsDevice + ?Sized> GraphicsDevice for Box<D> {
    fn create_texture_from_bytes(
        &mut self,
        format: FormatKey,
        name: Option<&str>,
        bytes: &[u8],
        hints: TextureHints,
    ) -> Result<DeviceHandle> {
        (**self).create_texture_from_bytes(format, name, bytes, hints)
    }

    fn create_empty_texture(
        &mut self,
        format: FormatKey,
        name: Option<&str>,
        width: u32,
        hints: TextureHints,
    ) -> Result<DeviceHandle> {
        (**self).create_empty_texture(format, name, width, hints)
    }

    fn lock(&mut self, handle: DeviceHandle, mip: u32, read_only: bool) -> Result<&mut [u8]> {
        (**self).lock(handle, mip, read_only)
    }

    fn unlock(&mut self, handle: DeviceHandle) -> Result<()> {
        (**self).unlock(handle)
    }

    fn destroy_texture(&mut self, handle: DeviceHandle) {
        (**self).destroy_texture(handle)
    }
}
