//! # Messages
//!
//! Reference-counted, typed, serializable units of application data.
//!
//! A [`Message`] is the shared-ownership handle every transport structure
//! (send queue, retransmit buffer, receive queue) holds. Cloning the handle
//! acquires a reference; dropping it releases one; when the last reference
//! goes, the instance is destroyed through the factory that created it.
//! Construct messages only through
//! [`MessageFactory`](crate::protocol::factory::MessageFactory) — there is
//! deliberately no way to build one directly.
//!
//! ## Shapes
//! - **Plain**: ordinary fields only
//! - **Block**: ordinary fields plus at most one attached out-of-band byte
//!   buffer ([`MessageBlock`]), which may exceed a single packet and is
//!   fragmented by the channel layer, never by this module
//!
//! ## Serialization
//! Each concrete payload describes its fields once in
//! [`MessagePayload::serialize_fields`]; decode, encode and measure all
//! replay that description. Block bytes are not part of the field list.

use crate::core::stream::{MeasureStream, Stream};
use crate::error::{constants, Result};
use crate::protocol::factory::FactoryShared;
use crate::utils::allocator::BlockAllocator;
use std::any::Any;
use std::cell::{Cell, Ref, RefCell, RefMut};
use std::fmt;
use std::mem;
use std::rc::Rc;

/// A concrete message type's data and its single field-traversal description.
///
/// Implementations must route every field through the [`Stream`] passed in,
/// in a fixed order, with no branching on stream kind beyond what the
/// provided combinators do internally. That is what guarantees decode,
/// encode and measure agree bit-for-bit.
pub trait MessagePayload: Any {
    /// Decode populates fields from the stream, encode emits them, measure
    /// counts their encoded size. One body serves all three.
    fn serialize_fields(&mut self, stream: &mut dyn Stream) -> Result<()>;

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// An out-of-band byte buffer owned by exactly one allocator.
///
/// Dropping a `MessageBlock` returns the buffer to its allocator exactly
/// once. Detaching a block from a message hands this value to the caller,
/// and with it the responsibility for the buffer's lifetime.
pub struct MessageBlock {
    allocator: Rc<dyn BlockAllocator>,
    data: Vec<u8>,
}

impl MessageBlock {
    /// Wrap an existing buffer produced by `allocator`. The buffer must be
    /// non-empty.
    pub fn new(allocator: Rc<dyn BlockAllocator>, data: Vec<u8>) -> Self {
        assert!(!data.is_empty(), "block data must be non-empty");
        Self { allocator, data }
    }

    /// Allocate a zeroed block of `size` bytes from `allocator`.
    pub fn allocate(allocator: &Rc<dyn BlockAllocator>, size: usize) -> Option<Self> {
        assert!(size > 0, "block size must be greater than zero");
        let data = allocator.allocate(size)?;
        Some(Self {
            allocator: Rc::clone(allocator),
            data,
        })
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn allocator(&self) -> &Rc<dyn BlockAllocator> {
        &self.allocator
    }

    /// Take the allocator handle and buffer, bypassing the drop-time free.
    /// The caller must return the buffer to the allocator itself.
    pub fn into_parts(mut self) -> (Rc<dyn BlockAllocator>, Vec<u8>) {
        let data = mem::take(&mut self.data);
        (Rc::clone(&self.allocator), data)
    }
}

impl Drop for MessageBlock {
    fn drop(&mut self) {
        // Empty data means into_parts() already transferred ownership
        if self.data.capacity() > 0 {
            self.allocator.free(mem::take(&mut self.data));
        }
    }
}

impl fmt::Debug for MessageBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageBlock")
            .field("size", &self.data.len())
            .finish()
    }
}

/// Closed set of message shapes. Channel code matches on this instead of
/// downcasting to discover whether a message can carry a block.
pub enum MessageBody {
    /// Ordinary fields only
    Plain(Box<dyn MessagePayload>),
    /// Ordinary fields plus zero-or-one attached block
    Block {
        payload: Box<dyn MessagePayload>,
        block: Option<MessageBlock>,
    },
}

impl MessageBody {
    pub fn is_block(&self) -> bool {
        matches!(self, MessageBody::Block { .. })
    }

    fn payload(&self) -> &dyn MessagePayload {
        match self {
            MessageBody::Plain(payload) => payload.as_ref(),
            MessageBody::Block { payload, .. } => payload.as_ref(),
        }
    }

    fn payload_mut(&mut self) -> &mut dyn MessagePayload {
        match self {
            MessageBody::Plain(payload) => payload.as_mut(),
            MessageBody::Block { payload, .. } => payload.as_mut(),
        }
    }
}

/// Shared state behind every message handle.
pub(crate) struct MessageInner {
    shared: Rc<FactoryShared>,
    type_index: u16,
    id: Cell<u16>,
    body: RefCell<MessageBody>,
    /// Instance storage reserved from the factory allocator at creation,
    /// returned to it at destruction.
    reservation: RefCell<Vec<u8>>,
}

impl Drop for MessageInner {
    fn drop(&mut self) {
        let reservation = mem::take(self.reservation.get_mut());
        let identity = self as *const MessageInner as usize;
        self.shared
            .on_message_destroyed(identity, self.type_index, reservation);
    }
}

/// Shared-ownership handle to a factory-created message.
///
/// `Clone` is acquire: it adds a reference. `Drop` is release: when the last
/// handle goes, the instance is destroyed and its storage returned to the
/// factory's allocator. Incrementing a zero count is impossible by
/// construction — a handle cannot exist for a destroyed message.
///
/// All accessors take `&self`; the model is single-threaded per factory and
/// uses plain interior mutability, no locking.
pub struct Message {
    inner: Rc<MessageInner>,
}

impl Clone for Message {
    fn clone(&self) -> Self {
        Message {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl Message {
    /// Factory-internal constructor. Registers the instance in the factory's
    /// live registry.
    pub(crate) fn create(
        shared: Rc<FactoryShared>,
        type_index: u16,
        body: MessageBody,
        reservation: Vec<u8>,
    ) -> Self {
        let inner = Rc::new(MessageInner {
            shared,
            type_index,
            id: Cell::new(0),
            body: RefCell::new(body),
            reservation: RefCell::new(reservation),
        });

        inner
            .shared
            .on_message_created(Rc::as_ptr(&inner) as usize, type_index, &inner);

        Message { inner }
    }

    /// The message id. Assigned by the channel layer: a monotonic counter on
    /// reliable-ordered channels, the carrying packet's sequence number on
    /// unreliable-unordered channels. Not interpreted here.
    pub fn id(&self) -> u16 {
        self.inner.id.get()
    }

    pub fn set_id(&self, id: u16) {
        self.inner.id.set(id);
    }

    /// The registry type index this message was created with. Immutable.
    pub fn type_index(&self) -> u16 {
        self.inner.type_index
    }

    /// Current reference count. Exactly 1 immediately after creation.
    pub fn ref_count(&self) -> usize {
        Rc::strong_count(&self.inner)
    }

    /// True for block-shape messages, whether or not a block is attached.
    pub fn is_block_message(&self) -> bool {
        self.inner.body.borrow().is_block()
    }

    /// Run the payload's field traversal against `stream`. Block bytes are
    /// never serialized here; the channel fragments them separately.
    pub fn serialize(&self, stream: &mut dyn Stream) -> Result<()> {
        self.inner
            .body
            .borrow_mut()
            .payload_mut()
            .serialize_fields(stream)
    }

    /// Exact bit count an encode pass would produce. Allocation-free.
    pub fn measure_bits(&self) -> Result<u64> {
        let mut measure = MeasureStream::new();
        self.serialize(&mut measure)?;
        Ok(measure.bits_processed())
    }

    /// Typed view of the payload, or `None` if `T` is not the concrete type.
    pub fn payload<T: MessagePayload>(&self) -> Option<Ref<'_, T>> {
        Ref::filter_map(self.inner.body.borrow(), |body| {
            body.payload().as_any().downcast_ref::<T>()
        })
        .ok()
    }

    /// Typed mutable view of the payload.
    pub fn payload_mut<T: MessagePayload>(&self) -> Option<RefMut<'_, T>> {
        RefMut::filter_map(self.inner.body.borrow_mut(), |body| {
            body.payload_mut().as_any_mut().downcast_mut::<T>()
        })
        .ok()
    }

    /// Attach a block. The message takes ownership of the buffer; no copy is
    /// made.
    ///
    /// Returns `BlockTooLarge` if the buffer exceeds the factory's configured
    /// maximum. Attaching to a plain-shape message, or attaching while a
    /// block is already attached, is a contract violation and panics.
    pub fn attach_block(&self, block: MessageBlock) -> Result<()> {
        let max = self.inner.shared.max_block_size();
        if block.len() > max {
            return Err(crate::error::MessageError::BlockTooLarge {
                size: block.len(),
                max,
            });
        }

        match &mut *self.inner.body.borrow_mut() {
            MessageBody::Block { block: slot, .. } => {
                assert!(slot.is_none(), "{}", constants::ERR_BLOCK_ALREADY_ATTACHED);
                *slot = Some(block);
                Ok(())
            }
            MessageBody::Plain(_) => panic!("{}", constants::ERR_NOT_BLOCK_SHAPE),
        }
    }

    /// Detach the block, if any, transferring ownership (and the obligation
    /// to free) to the caller. A block-shape message with nothing attached
    /// is a no-op returning `None`. Calling this on a plain-shape message is
    /// a contract violation and panics.
    pub fn detach_block(&self) -> Option<MessageBlock> {
        match &mut *self.inner.body.borrow_mut() {
            MessageBody::Block { block, .. } => block.take(),
            MessageBody::Plain(_) => panic!("{}", constants::ERR_NOT_BLOCK_SHAPE),
        }
    }

    pub fn has_block(&self) -> bool {
        matches!(
            &*self.inner.body.borrow(),
            MessageBody::Block { block: Some(_), .. }
        )
    }

    /// Size in bytes of the attached block; 0 when none is attached.
    pub fn block_size(&self) -> usize {
        match &*self.inner.body.borrow() {
            MessageBody::Block {
                block: Some(block), ..
            } => block.len(),
            _ => 0,
        }
    }

    /// Borrow the attached block's bytes, if any.
    pub fn with_block<R>(&self, f: impl FnOnce(&[u8]) -> R) -> Option<R> {
        match &*self.inner.body.borrow() {
            MessageBody::Block {
                block: Some(block), ..
            } => Some(f(block.data())),
            _ => None,
        }
    }

    /// Mutably borrow the attached block's bytes, if any. Used by the
    /// receive path when reassembling fragments into the block.
    pub fn with_block_mut<R>(&self, f: impl FnOnce(&mut [u8]) -> R) -> Option<R> {
        match &mut *self.inner.body.borrow_mut() {
            MessageBody::Block {
                block: Some(block), ..
            } => Some(f(block.data_mut())),
            _ => None,
        }
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("type_index", &self.type_index())
            .field("id", &self.id())
            .field("ref_count", &self.ref_count())
            .field("block_message", &self.is_block_message())
            .field("block_size", &self.block_size())
            .finish()
    }
}
