//! GPU texture management.

use texel_core::{FormatKey, Result, TexelError, TextureHints};

/// Device format used to store a texture of the given format key.
pub fn wgpu_format(format: FormatKey) -> wgpu::TextureFormat {
    match format {
        FormatKey::Solid | FormatKey::Keyed | FormatKey::Alpha => {
            wgpu::TextureFormat::Rgba8UnormSrgb
        }
        FormatKey::Gray8 => wgpu::TextureFormat::R8Unorm,
    }
}

/// A GPU texture created for a cache node.
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub width: u32,
    pub height: u32,
    pub format: FormatKey,
    /// Hints as given by the caller, for the renderer's sampler choice.
    pub hints: TextureHints,
}

impl GpuTexture {
    /// Create a new GPU texture with the given dimensions.
    pub fn new(
        device: &wgpu::Device,
        width: u32,
        height: u32,
        format: FormatKey,
        hints: TextureHints,
        label: Option<&str>,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label,
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu_format(format),
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            texture,
            view,
            width,
            height,
            format,
            hints,
        }
    }

    /// Width and height of a mip level.
    pub fn mip_size(&self, mip: u32) -> (u32, u32) {
        ((self.width >> mip).max(1), (self.height >> mip).max(1))
    }

    /// Bytes needed to hold one mip level.
    pub fn mip_bytes(&self, mip: u32) -> usize {
        let (w, h) = self.mip_size(mip);
        w as usize * h as usize * self.format.bytes_per_texel()
    }

    /// Upload tightly packed texel data to a mip level.
    pub fn upload(&self, queue: &wgpu::Queue, mip: u32, data: &[u8]) -> Result<()> {
        if mip >= self.texture.mip_level_count() {
            return Err(TexelError::Device(format!(
                "Mip level {} out of range for {}x{} texture",
                mip, self.width, self.height
            )));
        }

        let expected = self.mip_bytes(mip);
        if data.len() != expected {
            return Err(TexelError::Device(format!(
                "Upload of {} bytes doesn't match mip size of {} bytes",
                data.len(),
                expected
            )));
        }

        let (width, height) = self.mip_size(mip);

        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &self.texture,
                mip_level: mip,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(width * self.format.bytes_per_texel() as u32),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );

        Ok(())
    }

    /// Memory usage estimate in bytes.
    pub fn memory_size(&self) -> usize {
        self.mip_bytes(0)
    }
}
