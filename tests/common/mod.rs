//! Shared fixtures for the integration suites: a small game-flavored message
//! set, instrumented allocators, and the three-mode round-trip helper every
//! serialization test goes through.

#![allow(dead_code)]
#![allow(clippy::unwrap_used, clippy::expect_used)]

use message_core::core::stream::{ReadStream, Stream, WriteStream};
use message_core::error::Result;
use message_core::{
    BlockAllocator, Message, MessageFactory, MessagePayload, MessageRegistry, MessageShape,
};
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

pub const MSG_MOVE: u16 = 0;
pub const MSG_CHAT: u16 = 1;
pub const MSG_LEVEL_DATA: u16 = 2;

pub const COORD_MIN: i32 = -4096;
pub const COORD_MAX: i32 = 4095;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MoveMessage {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub jumping: bool,
}

impl MessagePayload for MoveMessage {
    fn serialize_fields(&mut self, stream: &mut dyn Stream) -> Result<()> {
        stream.serialize_int_range(&mut self.x, COORD_MIN, COORD_MAX)?;
        stream.serialize_int_range(&mut self.y, COORD_MIN, COORD_MAX)?;
        stream.serialize_int_range(&mut self.z, COORD_MIN, COORD_MAX)?;
        stream.serialize_bool(&mut self.jumping)?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub channel: u8,
    pub text: Vec<u8>,
}

impl MessagePayload for ChatMessage {
    fn serialize_fields(&mut self, stream: &mut dyn Stream) -> Result<()> {
        stream.serialize_u8(&mut self.channel)?;

        let mut len = self.text.len() as u8;
        stream.serialize_u8(&mut len)?;
        if stream.is_reading() {
            self.text.resize(usize::from(len), 0);
        }
        stream.serialize_bytes(&mut self.text)?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Block-shape message: header fields travel here, the level bytes travel as
/// the attached block through the fragmentation path.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LevelDataMessage {
    pub level_index: u16,
    pub checksum: u32,
}

impl MessagePayload for LevelDataMessage {
    fn serialize_fields(&mut self, stream: &mut dyn Stream) -> Result<()> {
        stream.serialize_u16(&mut self.level_index)?;
        stream.serialize_u32(&mut self.checksum)?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

pub fn game_registry() -> MessageRegistry {
    MessageRegistry::builder()
        .register(MSG_MOVE, "move", MessageShape::Plain, || {
            Box::new(MoveMessage::default())
        })
        .register(MSG_CHAT, "chat", MessageShape::Plain, || {
            Box::new(ChatMessage::default())
        })
        .register(MSG_LEVEL_DATA, "level_data", MessageShape::Block, || {
            Box::new(LevelDataMessage::default())
        })
        .build()
        .expect("game registry is valid")
}

/// Allocator that records every allocate/free it services.
#[derive(Default)]
pub struct CountingAllocator {
    pub allocs: Cell<usize>,
    pub frees: Cell<usize>,
    pub freed_sizes: RefCell<Vec<usize>>,
}

impl BlockAllocator for CountingAllocator {
    fn allocate(&self, size: usize) -> Option<Vec<u8>> {
        self.allocs.set(self.allocs.get() + 1);
        Some(vec![0u8; size])
    }

    fn free(&self, buffer: Vec<u8>) {
        self.frees.set(self.frees.get() + 1);
        self.freed_sizes.borrow_mut().push(buffer.len());
    }
}

/// Allocator that satisfies a fixed number of requests, then refuses.
pub struct FailingAllocator {
    remaining: Cell<usize>,
}

impl FailingAllocator {
    pub fn new(successes: usize) -> Self {
        Self {
            remaining: Cell::new(successes),
        }
    }

    /// Grant `n` further successful allocations.
    pub fn refill(&self, n: usize) {
        self.remaining.set(self.remaining.get() + n);
    }
}

impl BlockAllocator for FailingAllocator {
    fn allocate(&self, size: usize) -> Option<Vec<u8>> {
        let remaining = self.remaining.get();
        if remaining == 0 {
            return None;
        }
        self.remaining.set(remaining - 1);
        Some(vec![0u8; size])
    }

    fn free(&self, buffer: Vec<u8>) {
        drop(buffer);
    }
}

pub fn counting_factory() -> (Rc<CountingAllocator>, MessageFactory) {
    let allocator = Rc::new(CountingAllocator::default());
    let factory =
        MessageFactory::new(allocator.clone(), game_registry()).expect("factory construction");
    (allocator, factory)
}

/// Exercise all three stream modes against one message: measure, encode
/// (asserting measure matches the emitted bit count), then decode into a
/// fresh instance (asserting decode consumes exactly what encode produced).
pub fn round_trip(factory: &MessageFactory, type_index: u16, original: &Message) -> Message {
    let measured = original.measure_bits().expect("measure");

    let mut writer = WriteStream::new();
    original.serialize(&mut writer).expect("encode");
    assert_eq!(
        writer.bits_processed(),
        measured,
        "measure must return exactly the bits encode writes"
    );
    let encoded = writer.finish();

    let decoded = factory.create_message(type_index).expect("create");
    let mut reader = ReadStream::new(&encoded);
    decoded.serialize(&mut reader).expect("decode");
    assert_eq!(
        reader.bits_processed(),
        measured,
        "decode must consume exactly the bits encode wrote"
    );

    decoded
}
