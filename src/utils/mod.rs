//! # Utility Modules
//!
//! Supporting utilities for the message object model.
//!
//! ## Components
//! - **Allocator**: the `allocate`/`free` boundary plus heap and pooled
//!   implementations
//!
//! ## Memory Discipline
//! - Every buffer handed out by an allocator is returned to that same
//!   allocator exactly once
//! - Pools retain only small buffers (4KB bound) to keep resident memory flat

pub mod allocator;

// Re-export public types for advanced users
pub use allocator::{BlockAllocator, HeapAllocator, PoolAllocator};
