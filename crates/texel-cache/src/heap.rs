//! Bounded backing store for compressed texture data and texture names.
//!
//! A heap only does accounting; each allocation is its own boxed buffer. A
//! full heap refuses allocations instead of growing, and the caller decides
//! whether that is fatal.

use std::ops::Deref;

/// An allocation owned by a [`BackingHeap`].
///
/// Blocks are returned to their heap with [`BackingHeap::free`]. Dropping a
/// block without freeing it leaks its accounting, not its memory.
#[derive(Debug)]
pub struct HeapBlock<T: ?Sized> {
    data: Box<T>,
}

impl<T: ?Sized> HeapBlock<T> {
    /// Size of the allocation in bytes.
    pub fn size(&self) -> usize {
        std::mem::size_of_val(&*self.data)
    }
}

impl<T: ?Sized> Deref for HeapBlock<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.data
    }
}

/// Fixed-capacity allocation arena.
#[derive(Debug)]
pub struct BackingHeap {
    label: &'static str,
    capacity: usize,
    used: usize,
    peak: usize,
}

impl BackingHeap {
    /// Create a heap that can hold at most `capacity` bytes.
    pub fn new(label: &'static str, capacity: usize) -> Self {
        Self {
            label,
            capacity,
            used: 0,
            peak: 0,
        }
    }

    /// Copy `bytes` into a new block, or `None` if the heap is full.
    pub fn alloc_bytes(&mut self, bytes: &[u8]) -> Option<HeapBlock<[u8]>> {
        self.reserve(bytes.len())?;
        Some(HeapBlock { data: bytes.into() })
    }

    /// Copy `text` into a new block, or `None` if the heap is full.
    pub fn alloc_str(&mut self, text: &str) -> Option<HeapBlock<str>> {
        self.reserve(text.len())?;
        Some(HeapBlock { data: text.into() })
    }

    /// Return a block to the heap.
    pub fn free<T: ?Sized>(&mut self, block: HeapBlock<T>) {
        let size = block.size();
        debug_assert!(size <= self.used, "{} heap freed more than it holds", self.label);
        self.used = self.used.saturating_sub(size);
    }

    fn reserve(&mut self, size: usize) -> Option<()> {
        if size > self.available() {
            return None;
        }
        self.used += size;
        self.peak = self.peak.max(self.used);
        Some(())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes currently allocated.
    pub fn used(&self) -> usize {
        self.used
    }

    /// Bytes still available.
    pub fn available(&self) -> usize {
        self.capacity - self.used
    }

    /// Highest value `used` has reached.
    pub fn peak(&self) -> usize {
        self.peak
    }
}
