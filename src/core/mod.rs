//! # Core Serialization Components
//!
//! Low-level bit packing and the three-mode serialization streams.
//!
//! This module provides the foundation every message type serializes
//! through: a bit-exact writer/reader pair and the decode/encode/measure
//! stream trio built on top of them.
//!
//! ## Components
//! - **BitIo**: word-based bit packing with byte alignment
//! - **Stream**: object-safe trait with one implementation per mode
//!
//! ## Guarantee
//! A message type describes its fields once; the three stream kinds replay
//! that single description, so a measure pass always returns the exact bit
//! count the encode pass produces.

pub mod bitio;
pub mod stream;
