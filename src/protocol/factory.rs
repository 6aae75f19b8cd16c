//! # Message Factory
//!
//! The sole authority for creating and destroying messages.
//!
//! A factory is constructed once per connection/session from an injected
//! allocator and an explicit type registry, and every message instance that
//! flows through the transport is created by it and destroyed through it.
//!
//! ## Components
//! - **MessageRegistry / MessageRegistryBuilder**: explicit type-index →
//!   constructor table, validated once at build (no gaps, no duplicates)
//! - **MessageFactory**: creation, acquire/release routing, sticky error
//!   level, live-instance tracking and leak detection
//!
//! ## Error Discipline
//! Allocation failure is the only recoverable error: `create_message`
//! returns `Err(FailedToAllocate)` and latches the factory's sticky error
//! level, which the session layer polls to decide on disconnects. Requesting
//! an out-of-range type index is a programming error and panics.
//!
//! ## Leak Detection
//! Every live instance is tracked. In diagnostic builds, tearing down a
//! factory while instances are still live reports each leak (identity, type,
//! reference count) and panics.

use crate::config::MessageConfig;
use crate::error::{constants, MessageError, Result};
use crate::protocol::message::{Message, MessageBody, MessageInner, MessagePayload};
use crate::utils::allocator::BlockAllocator;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::mem;
use std::rc::{Rc, Weak};
use tracing::{trace, warn};

/// Shape of a registered message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageShape {
    /// Ordinary fields only
    Plain,
    /// May carry an attached out-of-band block
    Block,
}

type PayloadCtor = Box<dyn Fn() -> Box<dyn MessagePayload>>;

struct MessageKind {
    name: &'static str,
    shape: MessageShape,
    ctor: PayloadCtor,
}

/// Dense table of registered message types. Valid indices are
/// `[0, num_types)`.
pub struct MessageRegistry {
    kinds: Vec<MessageKind>,
}

impl MessageRegistry {
    pub fn builder() -> MessageRegistryBuilder {
        MessageRegistryBuilder {
            slots: Vec::new(),
            duplicates: Vec::new(),
        }
    }

    pub fn num_types(&self) -> u16 {
        self.kinds.len() as u16
    }

    /// Registered name for a type index, if in range.
    pub fn type_name(&self, type_index: u16) -> Option<&'static str> {
        self.kinds.get(usize::from(type_index)).map(|k| k.name)
    }

    pub fn shape(&self, type_index: u16) -> Option<MessageShape> {
        self.kinds.get(usize::from(type_index)).map(|k| k.shape)
    }

    fn kind(&self, type_index: u16) -> &MessageKind {
        &self.kinds[usize::from(type_index)]
    }
}

impl fmt::Debug for MessageRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageRegistry")
            .field("num_types", &self.kinds.len())
            .finish()
    }
}

/// Builder for a [`MessageRegistry`]. Registration order does not matter;
/// `build` validates that the indices form a dense `[0, num_types)` range
/// with no duplicates.
pub struct MessageRegistryBuilder {
    slots: Vec<Option<MessageKind>>,
    duplicates: Vec<u16>,
}

impl MessageRegistryBuilder {
    /// Register a constructor for `type_index`. `shape` decides whether
    /// instances can carry an attached block.
    pub fn register<F>(
        mut self,
        type_index: u16,
        name: &'static str,
        shape: MessageShape,
        ctor: F,
    ) -> Self
    where
        F: Fn() -> Box<dyn MessagePayload> + 'static,
    {
        let index = usize::from(type_index);
        if self.slots.len() <= index {
            self.slots.resize_with(index + 1, || None);
        }

        if self.slots[index].is_some() {
            self.duplicates.push(type_index);
        } else {
            self.slots[index] = Some(MessageKind {
                name,
                shape,
                ctor: Box::new(ctor),
            });
        }
        self
    }

    /// Validate and build the registry.
    pub fn build(self) -> Result<MessageRegistry> {
        if !self.duplicates.is_empty() {
            return Err(MessageError::Registry(format!(
                "duplicate type indices: {:?}",
                self.duplicates
            )));
        }

        if self.slots.is_empty() {
            return Err(MessageError::Registry(
                "registry must declare at least one message type".to_string(),
            ));
        }

        let num_types = self.slots.len();
        let mut kinds = Vec::with_capacity(num_types);
        for (index, slot) in self.slots.into_iter().enumerate() {
            match slot {
                Some(kind) => kinds.push(kind),
                None => {
                    return Err(MessageError::Registry(format!(
                        "missing type index {index} (registry declares {num_types} types)"
                    )))
                }
            }
        }

        Ok(MessageRegistry { kinds })
    }
}

/// Sticky factory error level.
///
/// Latches on the first allocation failure and persists across subsequent
/// successful creations until explicitly cleared. The session layer treats a
/// non-`None` level as cause to disconnect; this module only maintains the
/// flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FactoryErrorLevel {
    #[default]
    None,
    FailedToAllocate,
}

struct LiveEntry {
    type_index: u16,
    handle: Weak<MessageInner>,
}

/// Factory state shared with every message instance it created, so
/// destruction can be routed back through the factory's allocator even if
/// the instance outlives the factory handle itself.
pub(crate) struct FactoryShared {
    allocator: Rc<dyn BlockAllocator>,
    registry: MessageRegistry,
    config: MessageConfig,
    error_level: Cell<FactoryErrorLevel>,
    live: RefCell<HashMap<usize, LiveEntry>>,
    created: Cell<u64>,
    destroyed: Cell<u64>,
}

impl FactoryShared {
    pub(crate) fn max_block_size(&self) -> usize {
        self.config.max_block_size
    }

    pub(crate) fn on_message_created(
        &self,
        identity: usize,
        type_index: u16,
        inner: &Rc<MessageInner>,
    ) {
        self.live.borrow_mut().insert(
            identity,
            LiveEntry {
                type_index,
                handle: Rc::downgrade(inner),
            },
        );
        self.created.set(self.created.get() + 1);
    }

    pub(crate) fn on_message_destroyed(
        &self,
        identity: usize,
        type_index: u16,
        reservation: Vec<u8>,
    ) {
        self.live.borrow_mut().remove(&identity);
        if reservation.capacity() > 0 {
            self.allocator.free(reservation);
        }
        self.destroyed.set(self.destroyed.get() + 1);
        trace!(type_index, "destroyed message");
    }
}

/// Creates messages by type index, tracks live instances, and owns the
/// destruction policy for everything it creates.
pub struct MessageFactory {
    shared: Rc<FactoryShared>,
}

impl MessageFactory {
    /// Construct a factory with the default configuration. The allocator is
    /// shared, not owned; the caller guarantees it outlives the factory.
    pub fn new(allocator: Rc<dyn BlockAllocator>, registry: MessageRegistry) -> Result<Self> {
        Self::with_config(allocator, registry, MessageConfig::default())
    }

    pub fn with_config(
        allocator: Rc<dyn BlockAllocator>,
        registry: MessageRegistry,
        config: MessageConfig,
    ) -> Result<Self> {
        config.validate_strict()?;

        if registry.num_types() > config.max_message_types {
            return Err(MessageError::Registry(format!(
                "registry declares {} types, configuration allows {}",
                registry.num_types(),
                config.max_message_types
            )));
        }

        Ok(Self {
            shared: Rc::new(FactoryShared {
                allocator,
                registry,
                config,
                error_level: Cell::new(FactoryErrorLevel::None),
                live: RefCell::new(HashMap::new()),
                created: Cell::new(0),
                destroyed: Cell::new(0),
            }),
        })
    }

    /// Create a message of the given type with reference count 1.
    ///
    /// On allocator refusal, returns `Err(FailedToAllocate)` and latches the
    /// sticky error level. Requesting an index outside `[0, num_types)` is a
    /// contract violation and panics.
    pub fn create_message(&self, type_index: u16) -> Result<Message> {
        assert!(
            type_index < self.shared.registry.num_types(),
            "{}: {} (registry declares {} types)",
            constants::ERR_TYPE_OUT_OF_RANGE,
            type_index,
            self.shared.registry.num_types()
        );

        let kind = self.shared.registry.kind(type_index);
        let payload = (kind.ctor)();

        // Reserve the instance's backing storage from the injected allocator.
        // This is where creation can fail.
        let size = mem::size_of_val(payload.as_ref()).max(1);
        let Some(reservation) = self.shared.allocator.allocate(size) else {
            warn!(type_index, name = kind.name, "failed to allocate message");
            self.shared
                .error_level
                .set(FactoryErrorLevel::FailedToAllocate);
            return Err(MessageError::FailedToAllocate { type_index });
        };

        let body = match kind.shape {
            MessageShape::Plain => MessageBody::Plain(payload),
            MessageShape::Block => MessageBody::Block {
                payload,
                block: None,
            },
        };

        trace!(type_index, name = kind.name, "created message");
        Ok(Message::create(
            Rc::clone(&self.shared),
            type_index,
            body,
            reservation,
        ))
    }

    /// Add a reference: returns a new handle to the same instance. Call when
    /// retaining the message in a send, retransmit, or receive structure.
    pub fn acquire_message(&self, message: &Message) -> Message {
        trace!(
            type_index = message.type_index(),
            ref_count = message.ref_count() + 1,
            "acquired message"
        );
        message.clone()
    }

    /// Remove a reference. When this was the last handle, the instance is
    /// destroyed and its storage returned to the allocator. This is the only
    /// path by which a message is destroyed.
    pub fn release_message(&self, message: Message) {
        trace!(
            type_index = message.type_index(),
            ref_count = message.ref_count() - 1,
            "released message"
        );
        drop(message);
    }

    pub fn error_level(&self) -> FactoryErrorLevel {
        self.shared.error_level.get()
    }

    /// Reset the sticky error level to `None`.
    pub fn clear_error_level(&self) {
        self.shared.error_level.set(FactoryErrorLevel::None);
    }

    pub fn num_types(&self) -> u16 {
        self.shared.registry.num_types()
    }

    pub fn registry(&self) -> &MessageRegistry {
        &self.shared.registry
    }

    pub fn config(&self) -> &MessageConfig {
        &self.shared.config
    }

    pub fn allocator(&self) -> Rc<dyn BlockAllocator> {
        Rc::clone(&self.shared.allocator)
    }

    /// Number of instances created by this factory and not yet destroyed.
    pub fn live_messages(&self) -> usize {
        self.shared.live.borrow().len()
    }

    pub fn messages_created(&self) -> u64 {
        self.shared.created.get()
    }

    pub fn messages_destroyed(&self) -> u64 {
        self.shared.destroyed.get()
    }
}

impl Drop for MessageFactory {
    fn drop(&mut self) {
        // Leaked messages at factory teardown are programming errors, not
        // runtime conditions. Diagnostic builds report and abort.
        #[cfg(debug_assertions)]
        {
            let live = self.shared.live.borrow();
            if !live.is_empty() {
                for (identity, entry) in live.iter() {
                    tracing::error!(
                        identity = *identity,
                        type_index = entry.type_index,
                        type_name = ?self.shared.registry.type_name(entry.type_index),
                        ref_count = entry.handle.strong_count(),
                        "leaked message"
                    );
                }
                let count = live.len();
                drop(live);
                panic!("message factory torn down with {count} live messages");
            }
        }
    }
}

impl fmt::Debug for MessageFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageFactory")
            .field("num_types", &self.num_types())
            .field("error_level", &self.error_level())
            .field("live_messages", &self.live_messages())
            .finish()
    }
}
