//! Property-based coverage: random payloads through the three-mode pipeline,
//! random bit sequences through the packing layer.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::*;
use message_core::core::bitio::{BitReader, BitWriter};
use message_core::core::stream::bits_required;
use proptest::prelude::*;

proptest! {
    #[test]
    fn prop_move_message_three_mode_equivalence(
        x in COORD_MIN..=COORD_MAX,
        y in COORD_MIN..=COORD_MAX,
        z in COORD_MIN..=COORD_MAX,
        jumping in any::<bool>(),
    ) {
        let (_allocator, factory) = counting_factory();

        let message = factory.create_message(MSG_MOVE).expect("create");
        {
            let mut payload = message.payload_mut::<MoveMessage>().expect("typed");
            payload.x = x;
            payload.y = y;
            payload.z = z;
            payload.jumping = jumping;
        }

        // round_trip asserts measure == encode == decode bit counts
        let decoded = round_trip(&factory, MSG_MOVE, &message);
        {
            let payload = decoded.payload::<MoveMessage>().expect("typed");
            prop_assert_eq!(payload.x, x);
            prop_assert_eq!(payload.y, y);
            prop_assert_eq!(payload.z, z);
            prop_assert_eq!(payload.jumping, jumping);
        }

        factory.release_message(message);
        factory.release_message(decoded);
    }

    #[test]
    fn prop_chat_message_roundtrip(
        channel in any::<u8>(),
        text in proptest::collection::vec(any::<u8>(), 0..=255),
    ) {
        let (_allocator, factory) = counting_factory();

        let message = factory.create_message(MSG_CHAT).expect("create");
        {
            let mut payload = message.payload_mut::<ChatMessage>().expect("typed");
            payload.channel = channel;
            payload.text = text.clone();
        }

        let decoded = round_trip(&factory, MSG_CHAT, &message);
        {
            let payload = decoded.payload::<ChatMessage>().expect("typed");
            prop_assert_eq!(payload.channel, channel);
            prop_assert_eq!(&payload.text, &text);
        }

        factory.release_message(message);
        factory.release_message(decoded);
    }

    #[test]
    fn prop_bit_sequences_roundtrip(
        fields in proptest::collection::vec((1u32..=32, any::<u32>()), 1..64),
    ) {
        let mut writer = BitWriter::new();
        let mut total = 0u64;
        for &(bits, value) in &fields {
            writer.write_bits(value, bits);
            total += u64::from(bits);
        }
        prop_assert_eq!(writer.bits_written(), total);

        let encoded = writer.finish();
        let mut reader = BitReader::new(&encoded);
        for &(bits, value) in &fields {
            let mask = if bits == 32 { u32::MAX } else { (1u32 << bits) - 1 };
            prop_assert_eq!(reader.read_bits(bits).expect("read"), value & mask);
        }
        prop_assert_eq!(reader.bits_read(), total);
    }

    #[test]
    fn prop_bits_required_covers_span(min in -100_000i32..100_000, span in 1i32..100_000) {
        let max = min.saturating_add(span);
        let bits = bits_required(min, max);

        prop_assert!(bits >= 1 && bits <= 32);
        // every value in [min, max] fits in an unsigned offset of `bits` bits
        let unsigned_span = (max as i64 - min as i64) as u64;
        prop_assert!(unsigned_span < (1u64 << bits));
    }

    #[test]
    fn prop_mismatched_type_decode_is_detected_or_clean(
        x in COORD_MIN..=COORD_MAX,
        y in COORD_MIN..=COORD_MAX,
    ) {
        // Decoding a move payload into a chat instance must never panic;
        // it either errors (overflow) or produces in-range garbage.
        let (_allocator, factory) = counting_factory();

        let message = factory.create_message(MSG_MOVE).expect("create");
        {
            let mut payload = message.payload_mut::<MoveMessage>().expect("typed");
            payload.x = x;
            payload.y = y;
        }

        let mut writer = message_core::core::stream::WriteStream::new();
        message.serialize(&mut writer).expect("encode");
        let encoded = writer.finish();

        let wrong = factory.create_message(MSG_CHAT).expect("create");
        let mut reader = message_core::core::stream::ReadStream::new(&encoded);
        let _ = wrong.serialize(&mut reader);

        factory.release_message(message);
        factory.release_message(wrong);
    }
}
