//! # message-core
//!
//! Reference-counted message object model for reliable and unreliable game
//! networking transports.
//!
//! Everything a transport's channel and connection layers pass around — send
//! queues, retransmit buffers, receive queues — is a [`Message`] created by a
//! [`MessageFactory`]. The factory owns type registration, allocation and
//! destruction policy; the handle owns the reference-counting discipline.
//!
//! ## Features
//! - **Shared-ownership handles**: clone acquires, drop releases, the last
//!   release destroys through the factory's allocator
//! - **Block attachments**: a message may own one out-of-band byte buffer,
//!   freed through its allocator exactly once no matter which path ends the
//!   message's life
//! - **Three-mode serialization**: decode, encode and exact bit-count measure
//!   generated from a single field traversal per message type
//! - **Leak detection**: diagnostic builds report and abort on messages still
//!   live at factory teardown
//!
//! ## Example
//! ```
//! use message_core::core::stream::Stream;
//! use message_core::error::Result;
//! use message_core::protocol::factory::{MessageFactory, MessageRegistry, MessageShape};
//! use message_core::protocol::message::MessagePayload;
//! use message_core::utils::allocator::HeapAllocator;
//! use std::any::Any;
//! use std::rc::Rc;
//!
//! #[derive(Debug, Default)]
//! struct Ping { sequence: u16 }
//!
//! impl MessagePayload for Ping {
//!     fn serialize_fields(&mut self, stream: &mut dyn Stream) -> Result<()> {
//!         stream.serialize_u16(&mut self.sequence)
//!     }
//!     fn as_any(&self) -> &dyn Any { self }
//!     fn as_any_mut(&mut self) -> &mut dyn Any { self }
//! }
//!
//! let registry = MessageRegistry::builder()
//!     .register(0, "ping", MessageShape::Plain, || Box::new(Ping::default()))
//!     .build()
//!     .unwrap();
//!
//! let factory = MessageFactory::new(Rc::new(HeapAllocator::new()), registry).unwrap();
//! let message = factory.create_message(0).unwrap();
//! assert_eq!(message.ref_count(), 1);
//!
//! let retained = factory.acquire_message(&message);
//! assert_eq!(message.ref_count(), 2);
//!
//! factory.release_message(retained);
//! factory.release_message(message); // destroyed here
//! ```
//!
//! ## Threading Model
//! Single-threaded per factory: reference counts and factory bookkeeping are
//! plain, non-atomic state. Share a factory and its messages across threads
//! only behind external synchronization or by confining them to one event
//! loop.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod utils;

// Re-export the types nearly every consumer touches
pub use config::MessageConfig;
pub use error::{MessageError, Result};
pub use protocol::factory::{
    FactoryErrorLevel, MessageFactory, MessageRegistry, MessageRegistryBuilder, MessageShape,
};
pub use protocol::message::{Message, MessageBlock, MessageBody, MessagePayload};
pub use utils::allocator::{BlockAllocator, HeapAllocator, PoolAllocator};
