//! # Block Allocators
//!
//! Allocation boundary consumed by the message factory and by attached
//! blocks.
//!
//! The factory never owns its allocator; it holds a shared handle injected
//! at construction, and every block attached to a message carries the handle
//! of whichever allocator produced its buffer so the buffer is returned to
//! the right place exactly once.
//!
//! ## Components
//! - **BlockAllocator**: `allocate`/`free` trait boundary
//! - **HeapAllocator**: plain heap-backed implementation
//! - **PoolAllocator**: free-list reuse for small, frequently allocated buffers
//!
//! Interior mutability is `RefCell`, not a mutex: the message model is
//! single-threaded per factory, with plain non-atomic bookkeeping.

use crate::config::MessageConfig;
use std::cell::RefCell;

/// Buffers above this capacity are not retained by the pool
const MAX_POOLED_BUFFER_SIZE: usize = 4096;

/// Allocation boundary for message storage and attached blocks.
///
/// `allocate` returns a zeroed buffer of exactly `size` bytes, or `None` if
/// the allocator cannot satisfy the request. Every buffer obtained from
/// `allocate` must eventually be passed back to `free` on the same
/// allocator, exactly once.
pub trait BlockAllocator {
    fn allocate(&self, size: usize) -> Option<Vec<u8>>;
    fn free(&self, buffer: Vec<u8>);
}

/// Plain heap-backed allocator.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeapAllocator;

impl HeapAllocator {
    pub fn new() -> Self {
        Self
    }
}

impl BlockAllocator for HeapAllocator {
    fn allocate(&self, size: usize) -> Option<Vec<u8>> {
        Some(vec![0u8; size])
    }

    fn free(&self, buffer: Vec<u8>) {
        drop(buffer);
    }
}

/// Free-list allocator for small buffers.
///
/// Pre-allocates `pool_size` buffers of `buffer_capacity` bytes and reuses
/// them across allocations. Buffers that grew past
/// `MAX_POOLED_BUFFER_SIZE` are released to the heap instead of retained.
pub struct PoolAllocator {
    pool: RefCell<Vec<Vec<u8>>>,
    buffer_capacity: usize,
}

impl PoolAllocator {
    /// Create a pool with `pool_size` pre-allocated buffers.
    pub fn new(pool_size: usize, buffer_capacity: usize) -> Self {
        let mut pool = Vec::with_capacity(pool_size);
        for _ in 0..pool_size {
            pool.push(Vec::with_capacity(buffer_capacity));
        }

        Self {
            pool: RefCell::new(pool),
            buffer_capacity,
        }
    }

    pub fn from_config(config: &MessageConfig) -> Self {
        Self::new(config.pool_size, config.pool_buffer_capacity)
    }

    /// Number of buffers currently available for reuse.
    pub fn available(&self) -> usize {
        self.pool.borrow().len()
    }
}

impl BlockAllocator for PoolAllocator {
    fn allocate(&self, size: usize) -> Option<Vec<u8>> {
        let mut buffer = self
            .pool
            .borrow_mut()
            .pop()
            .unwrap_or_else(|| Vec::with_capacity(self.buffer_capacity));

        buffer.clear();
        buffer.resize(size, 0);
        Some(buffer)
    }

    fn free(&self, mut buffer: Vec<u8>) {
        if buffer.capacity() <= MAX_POOLED_BUFFER_SIZE {
            buffer.clear();
            self.pool.borrow_mut().push(buffer);
        }
        // Oversized buffers fall back to the heap
    }
}
