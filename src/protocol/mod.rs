//! # Message Object Model
//!
//! Reference-counted messages, optional block attachments, and the factory
//! that owns their lifetime.
//!
//! ## Components
//! - **Message**: shared-ownership handle; clone acquires, drop releases
//! - **MessageBlock**: out-of-band buffer freed through its allocator exactly once
//! - **MessageFactory**: type-indexed creation, sticky error level, leak detection
//!
//! ## Lifetime Discipline
//! A channel or connection requests an instance from the factory, clones the
//! handle for every structure that retains it, and drops each handle exactly
//! once. The instance is destroyed when the last handle goes — never before,
//! never by any other path.

pub mod factory;
pub mod message;
