//! Property-based tests for the stream parser.
//!
//! These tests use proptest to generate random payloads and split points,
//! verifying the framing invariants hold across the full input space.

use proptest::prelude::*;
use tagbridge_protocol::{DeviceMessage, Frame, StreamParser};

/// Strategy for payloads within the reader's realistic size range.
fn valid_payload() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..64)
}

/// Strategy for command family/code pairs, valid and arbitrary alike —
/// the parser must frame anything, interpretation comes later.
fn any_message() -> impl Strategy<Value = DeviceMessage> {
    (any::<[u8; 2]>(), any::<u8>(), valid_payload())
        .prop_map(|(family, code, payload)| DeviceMessage::new(family, code, payload))
}

proptest! {
    /// Property: splitting a valid encoded frame at ANY byte boundary into
    /// two deliveries yields the identical message as the unsplit bytes
    /// (fragmentation transparency, spec'd behavior of serial links).
    #[test]
    fn prop_fragmentation_transparency(message in any_message(), split_frac in 0.0f64..=1.0) {
        let wire = Frame::encode(&message);
        let bytes = wire.as_bytes();
        let split = ((bytes.len() as f64) * split_frac) as usize;
        let split = split.min(bytes.len());

        let mut whole = StreamParser::new();
        whole.feed(bytes);

        let mut fragmented = StreamParser::new();
        fragmented.feed(&bytes[..split]);
        fragmented.feed(&bytes[split..]);

        let from_whole = whole.next_message();
        let from_fragments = fragmented.next_message();

        prop_assert_eq!(from_whole.as_ref(), Some(&message));
        prop_assert_eq!(from_fragments, from_whole);
    }

    /// Property: a frame survives leading garbage. The parser must
    /// resynchronize and still yield the valid frame.
    ///
    /// Garbage bytes are drawn from 0x80..=0xFF: any such byte in the
    /// length-high position declares a frame far beyond MAX_FRAME_SIZE, so
    /// the garbage can never alias a plausible header and swallow the real
    /// frame. (Aliasing recovery itself is covered by the corrupt-frame
    /// test in the stream_parser unit tests.)
    #[test]
    fn prop_resync_past_garbage(
        message in any_message(),
        garbage in prop::collection::vec(0x80u8..=0xFF, 1..32),
    ) {
        let wire = Frame::encode(&message);

        let mut parser = StreamParser::new();
        parser.feed(&garbage);
        parser.feed(wire.as_bytes());

        prop_assert_eq!(parser.next_message(), Some(message));
        prop_assert_eq!(parser.discarded_bytes(), garbage.len() as u64);
    }

    /// Property: encode is deterministic and length-accurate.
    #[test]
    fn prop_encode_declares_its_own_length(message in any_message()) {
        let wire = Frame::encode(&message);
        let bytes = wire.as_bytes();
        let declared = u16::from_be_bytes([bytes[0], bytes[1]]) as usize;

        prop_assert_eq!(declared, bytes.len());
        let reencoded = Frame::encode(&message);
        prop_assert_eq!(reencoded.as_bytes(), bytes);
    }
}
