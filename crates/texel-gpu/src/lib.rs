//! Texel GPU - graphics device facade and backends
//!
//! Uses Metal backend on macOS through wgpu. A headless device is provided
//! for machines without an adapter.

pub mod context;
pub mod device;
pub mod headless;
pub mod texture;
pub mod wgpu_device;

pub use context::GpuContext;
pub use device::GraphicsDevice;
pub use headless::{HeadlessDevice, HeadlessTexture, TextureOrigin};
pub use texture::GpuTexture;
pub use wgpu_device::WgpuDevice;
