//! Stateful stream parser for the reader's framed binary protocol.
//!
//! Serial byte delivery has no frame alignment: a single chunk may hold a
//! partial frame, several frames, or garbage from line noise. The parser
//! accumulates bytes in an internal buffer and extracts complete, CRC-valid
//! frames as [`DeviceMessage`]s.
//!
//! # Resynchronization
//!
//! A frame candidate starts wherever the buffer currently begins. The
//! 3-byte header is checked first (plausible declared length, matching
//! length checksum); once the declared number of bytes has arrived the CRC
//! trailer is verified. Any violation discards exactly ONE byte and rescans,
//! so a corrupt frame costs at most its own length in skipped bytes and can
//! never stall the stream. Until a complete candidate has accumulated,
//! `feed` yields nothing and retains the partial bytes.
//!
//! # Usage
//!
//! ```
//! use tagbridge_protocol::{Frame, StreamParser, commands};
//!
//! let wire = Frame::encode(&commands::start_stream());
//! let (first, rest) = wire.as_bytes().split_at(4);
//!
//! let mut parser = StreamParser::new();
//! parser.feed(first);
//! assert!(parser.next_message().is_none()); // partial frame retained
//!
//! parser.feed(rest);
//! assert!(parser.next_message().is_some());
//! ```

use bytes::BytesMut;
use std::collections::VecDeque;
use tagbridge_core::constants::{FRAME_HEADER_SIZE, FRAME_OVERHEAD, MAX_FRAME_SIZE};

use crate::frame::Frame;
use crate::message::DeviceMessage;

/// Cap on buffered bytes. The resynchronization logic discards garbage as
/// it scans, so the buffer only grows while waiting for a declared frame to
/// complete; this cap is the backstop against a pathological stream.
const MAX_BUFFER_SIZE: usize = 64 * 1024;

/// Initial buffer capacity, sized for typical serial read chunks.
const INITIAL_BUFFER_CAPACITY: usize = 1024;

/// Stateful parser turning an unaligned byte stream into device messages.
#[derive(Debug)]
pub struct StreamParser {
    /// Accumulated bytes not yet consumed by a complete frame.
    buffer: BytesMut,

    /// Complete messages ready for extraction, in frame-completion order.
    messages: VecDeque<DeviceMessage>,

    /// Total bytes discarded during resynchronization.
    discarded: u64,
}

impl StreamParser {
    /// Create an empty parser.
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            messages: VecDeque::new(),
            discarded: 0,
        }
    }

    /// Feed bytes from the serial link into the parser.
    ///
    /// Appends the bytes to the internal buffer and extracts every complete
    /// frame now available. A single call may yield zero, one or many
    /// messages; retrieve them with [`next_message`](Self::next_message) or
    /// [`drain_messages`](Self::drain_messages).
    pub fn feed(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);

        if self.buffer.len() > MAX_BUFFER_SIZE {
            self.discarded += self.buffer.len() as u64;
            self.buffer.clear();
            return;
        }

        self.extract_messages();
    }

    /// Extract the next complete message, if any.
    pub fn next_message(&mut self) -> Option<DeviceMessage> {
        self.messages.pop_front()
    }

    /// Number of messages ready for extraction.
    #[must_use]
    pub fn messages_available(&self) -> usize {
        self.messages.len()
    }

    /// Total bytes discarded while resynchronizing. Useful for link-quality
    /// diagnostics; a healthy link stays at zero.
    #[must_use]
    pub fn discarded_bytes(&self) -> u64 {
        self.discarded
    }

    /// Drop all buffered bytes and queued messages.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.messages.clear();
    }

    /// Iterator draining all currently queued messages.
    ///
    /// Does not process more buffered data; call [`feed`](Self::feed) first.
    pub fn drain_messages(&mut self) -> DrainMessages<'_> {
        DrainMessages { parser: self }
    }

    /// Scan the buffer, extracting frames and resynchronizing past garbage.
    fn extract_messages(&mut self) {
        loop {
            if self.buffer.len() < FRAME_HEADER_SIZE {
                return;
            }

            let declared = u16::from_be_bytes([self.buffer[0], self.buffer[1]]) as usize;
            if !self.header_is_plausible(declared) {
                self.skip_one_byte();
                continue;
            }

            if self.buffer.len() < declared {
                // Header looks valid; wait for the rest of the frame.
                return;
            }

            let candidate = Frame::from_bytes(&self.buffer[..declared]);
            match DeviceMessage::try_from(&candidate) {
                Ok(message) => {
                    let _ = self.buffer.split_to(declared);
                    self.messages.push_back(message);
                }
                Err(_) => self.skip_one_byte(),
            }
        }
    }

    /// Check the declared length and length checksum of the buffer head.
    fn header_is_plausible(&self, declared: usize) -> bool {
        let lcs = self.buffer[0].wrapping_add(self.buffer[1]);
        self.buffer[2] == lcs && (FRAME_OVERHEAD..=MAX_FRAME_SIZE).contains(&declared)
    }

    /// Discard one byte and account for it.
    fn skip_one_byte(&mut self) {
        let _ = self.buffer.split_to(1);
        self.discarded += 1;
    }
}

impl Default for StreamParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator created by [`StreamParser::drain_messages`].
pub struct DrainMessages<'a> {
    parser: &'a mut StreamParser,
}

impl<'a> Iterator for DrainMessages<'a> {
    type Item = DeviceMessage;

    fn next(&mut self) -> Option<Self::Item> {
        self.parser.next_message()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.parser.messages_available();
        (len, Some(len))
    }
}

impl<'a> ExactSizeIterator for DrainMessages<'a> {
    fn len(&self) -> usize {
        self.parser.messages_available()
    }
}
