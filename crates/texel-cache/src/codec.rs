//! LZ4 compression of texture data through a pair of owned scratch buffers.
//!
//! One buffer holds uncompressed texels (the size ceiling of any texture),
//! the other the worst-case compressed output. Results are borrowed from the
//! buffers, so the borrow checker keeps any two codec calls from overlapping.

use lz4_flex::block;
use texel_core::{Result, TexelError};

/// Compressor/decompressor with a fixed size ceiling.
pub struct Codec {
    texels: Vec<u8>,
    packed: Vec<u8>,
    max_bytes: usize,
}

impl Codec {
    /// Allocate scratch buffers for textures of up to `max_bytes`.
    pub fn new(max_bytes: usize) -> Self {
        Self {
            texels: vec![0u8; max_bytes],
            packed: vec![0u8; block::get_maximum_output_size(max_bytes)],
            max_bytes,
        }
    }

    /// Largest uncompressed size accepted.
    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    fn check_size(&self, name: &str, size: usize) -> Result<()> {
        if size > self.max_bytes {
            return Err(TexelError::TooLarge {
                name: name.to_string(),
                size,
                limit: self.max_bytes,
            });
        }
        Ok(())
    }

    /// Borrow the first `len` bytes of the texel buffer for filling, e.g.
    /// straight from a file. Pair with [`Codec::compress_staged`].
    pub fn stage(&mut self, name: &str, len: usize) -> Result<&mut [u8]> {
        self.check_size(name, len)?;
        Ok(&mut self.texels[..len])
    }

    /// Compress the first `len` bytes of the texel buffer.
    pub fn compress_staged(&mut self, name: &str, len: usize) -> Result<&[u8]> {
        self.check_size(name, len)?;
        let written = block::compress_into(&self.texels[..len], &mut self.packed)
            .map_err(|e| TexelError::Codec(format!("Failed to compress {}: {}", name, e)))?;
        Ok(&self.packed[..written])
    }

    /// Compress `input`.
    pub fn compress(&mut self, name: &str, input: &[u8]) -> Result<&[u8]> {
        self.check_size(name, input.len())?;
        let written = block::compress_into(input, &mut self.packed)
            .map_err(|e| TexelError::Codec(format!("Failed to compress {}: {}", name, e)))?;
        Ok(&self.packed[..written])
    }

    /// Decompress `blob`, which must expand to exactly `declared` bytes.
    ///
    /// Any other outcome, including a blob that does not decode at all, is
    /// reported as [`TexelError::Corrupted`].
    pub fn decompress(&mut self, name: &str, blob: &[u8], declared: usize) -> Result<&[u8]> {
        self.check_size(name, declared)?;
        let corrupted = |actual| TexelError::Corrupted {
            name: name.to_string(),
            expected: declared,
            actual,
        };
        let actual = block::decompress_into(blob, &mut self.texels).map_err(|_| corrupted(0))?;
        if actual != declared {
            return Err(corrupted(actual));
        }
        Ok(&self.texels[..actual])
    }
}
