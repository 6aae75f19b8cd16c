//! # Error Types
//!
//! Error handling for the message object model.
//!
//! This module defines the error variants surfaced by factory and stream
//! operations. Only genuinely recoverable conditions are represented here.
//!
//! ## Error Categories
//! - **Allocation Errors**: The allocator backing a factory refused a request
//! - **Stream Errors**: Bit-level decode failures (short buffer, bad range)
//! - **Block Errors**: Attached-block policy violations callers can back off from
//! - **Registry Errors**: Invalid message type registration
//! - **Configuration Errors**: Invalid or unreadable configuration
//!
//! Programming-contract violations (acquiring a destroyed message, attaching a
//! second block, requesting an unregistered type index, leaking messages past
//! factory teardown) are **not** represented as errors. They panic loudly in
//! diagnostic builds instead, because silently tolerating them corrupts the
//! reference-counting discipline.
//!
//! All errors implement `std::error::Error` for interoperability.

use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
/// Static strings are borrowed, avoiding heap allocations for common cases.
pub mod constants {
    /// Factory errors
    pub const ERR_FAILED_TO_ALLOCATE: &str = "Allocator failed to reserve message storage";

    /// Stream errors
    pub const ERR_STREAM_OVERFLOW: &str = "Bit stream read past end of buffer";
    pub const ERR_VALUE_OUT_OF_RANGE: &str = "Decoded value outside serialized range";

    /// Contract-violation panic messages (used with assert!, never returned)
    pub const ERR_BLOCK_ALREADY_ATTACHED: &str = "a block is already attached to this message";
    pub const ERR_NOT_BLOCK_SHAPE: &str = "block operations require a block-shape message";
    pub const ERR_TYPE_OUT_OF_RANGE: &str = "message type index out of range";
}

// MessageError is the primary error type for all message model operations
#[derive(Error, Debug)]
pub enum MessageError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The allocator backing the factory could not reserve storage for a new
    /// message instance. Also recorded on the factory's sticky error level.
    #[error("failed to allocate message of type {type_index}")]
    FailedToAllocate { type_index: u16 },

    /// A read stream was asked for more bits than the buffer holds.
    #[error("bit stream overflow: wanted {wanted} bits, {available} available")]
    StreamOverflow { wanted: u64, available: u64 },

    /// A range-compressed integer decoded to a value outside [min, max].
    #[error("decoded value {value} outside range [{min}, {max}]")]
    ValueOutOfRange { value: i64, min: i64, max: i64 },

    /// An attached block exceeded the configured maximum size.
    #[error("block of {size} bytes exceeds maximum of {max} bytes")]
    BlockTooLarge { size: usize, max: usize },

    #[error("registry error: {0}")]
    Registry(String),

    #[error("configuration error: {0}")]
    ConfigError(String),
}

/// Type alias for Results using MessageError
pub type Result<T> = std::result::Result<T, MessageError>;
