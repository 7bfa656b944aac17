//! Incremental frame decoding.
//!
//! Inbound bytes arrive in arbitrarily sized chunks, so [`FrameDecoder`] is a
//! resumable single-pass state machine: it is fed one byte at a time, keeps its
//! progress between calls, and reports a [`DecodeOutcome`] for every byte.

use std::fmt;

use log::{trace, warn};
use thiserror::Error;

use crate::{checksum::xor_checksum, FRAME_HEADER, VALID_LENGTHS};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Command payload too short")]
    UnexpectedEnd,

    #[error("Could not decode command with unexpected id. Found {value:x}, expected one of: {expected:x?}")]
    UnexpectedId { value: u8, expected: &'static [u8] },
}

/// A decoded (or to-be-encoded) protocol message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Command {
    /// Command or telemetry type discriminator.
    pub id: u8,
    /// Sequence number assigned by the sender of the frame.
    pub seq: u8,
    /// Command specific data. Always one byte shorter than the frame's length field.
    pub payload: Vec<u8>,
}

impl Command {
    /// The diagnostic form of a frame that failed its checksum: sentinel id and
    /// sequence of zero, with the entire raw frame as the payload.
    pub fn checksum_failure(raw: Vec<u8>) -> Self {
        Self {
            id: 0,
            seq: 0,
            payload: raw,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id: {}, Seq: {}, Payload:", self.id, self.seq)?;
        for byte in &self.payload {
            write!(f, " {byte:x}")?;
        }
        Ok(())
    }
}

/// The result of feeding a single byte to a [`FrameDecoder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeOutcome {
    /// More bytes are needed before anything can be reported.
    Incomplete,
    /// A complete frame passed its checksum.
    CommandReady(Command),
    /// A complete frame failed its checksum. Carries the whole raw frame,
    /// header and length byte included.
    ChecksumMismatch(Vec<u8>),
}

impl DecodeOutcome {
    pub fn is_incomplete(&self) -> bool {
        matches!(self, DecodeOutcome::Incomplete)
    }
}

/// Progress of a [`FrameDecoder`] through the current frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DecodeState {
    /// Discarding bytes until the first header byte.
    #[default]
    SeekFirstMagic,
    /// The first header byte was seen; expecting the second.
    SeekSecondMagic,
    /// Expecting the length byte.
    ReadLength,
    /// Filling the frame buffer. `cursor` is the index the next byte is written to.
    Fill { buffer: Vec<u8>, cursor: usize },
}

/// Stateful decoder for inbound frames.
///
/// Any anomaly (a length outside [`VALID_LENGTHS`], a failed checksum) drops the
/// decoder back to [`DecodeState::SeekFirstMagic`], so it always resynchronizes.
#[derive(Debug, Clone, Default)]
pub struct FrameDecoder {
    state: DecodeState,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DecodeState {
        &self.state
    }

    /// Drops any partially received frame.
    pub fn reset(&mut self) {
        self.state = DecodeState::SeekFirstMagic;
    }

    /// Advances the state machine by one byte.
    pub fn feed(&mut self, byte: u8) -> DecodeOutcome {
        let state = std::mem::take(&mut self.state);

        self.state = match state {
            DecodeState::SeekFirstMagic if byte == FRAME_HEADER[0] => DecodeState::SeekSecondMagic,
            DecodeState::SeekFirstMagic => DecodeState::SeekFirstMagic,
            DecodeState::SeekSecondMagic if byte == FRAME_HEADER[1] => DecodeState::ReadLength,
            DecodeState::SeekSecondMagic => DecodeState::SeekFirstMagic,
            DecodeState::ReadLength => {
                if !VALID_LENGTHS.contains(&byte) {
                    trace!("Dropping frame with unexpected length byte {byte:#x}");
                    DecodeState::SeekFirstMagic
                } else {
                    let mut buffer = vec![0; byte as usize + 5];
                    buffer[..2].copy_from_slice(&FRAME_HEADER);
                    buffer[2] = byte;
                    DecodeState::Fill { buffer, cursor: 3 }
                }
            }
            DecodeState::Fill { mut buffer, cursor } => {
                buffer[cursor] = byte;
                let cursor = cursor + 1;

                if cursor == buffer.len() {
                    return self.complete(buffer);
                }

                DecodeState::Fill { buffer, cursor }
            }
        };

        DecodeOutcome::Incomplete
    }

    /// Feeds every byte of `bytes` in order, returning only the outcomes that
    /// are not [`DecodeOutcome::Incomplete`].
    pub fn feed_all(&mut self, bytes: &[u8]) -> Vec<DecodeOutcome> {
        bytes
            .iter()
            .map(|&byte| self.feed(byte))
            .filter(|outcome| !outcome.is_incomplete())
            .collect()
    }

    fn complete(&mut self, buffer: Vec<u8>) -> DecodeOutcome {
        self.state = DecodeState::SeekFirstMagic;

        let last = buffer.len() - 1;
        let expected = xor_checksum(&buffer[..last]);

        if expected != buffer[last] {
            warn!(
                "Checksum mismatch: expected {expected:#x}, found {:#x} in {buffer:x?}",
                buffer[last]
            );
            return DecodeOutcome::ChecksumMismatch(buffer);
        }

        trace!("received frame: {buffer:x?}");

        DecodeOutcome::CommandReady(Command {
            id: buffer[4],
            seq: buffer[3],
            payload: buffer[5..last].to_vec(),
        })
    }
}

/// A type that can be decoded from the payload of a received [`Command`].
pub trait Decode {
    /// # Errors
    ///
    /// Returns a [`DecodeError`] if the command has a different id or its
    /// payload is too short to contain `Self`.
    fn decode(command: &Command) -> Result<Self, DecodeError>
    where
        Self: Sized;
}

#[cfg(test)]
mod tests {
    use super::{Command, DecodeOutcome, DecodeState, FrameDecoder};
    use crate::encode::encode_frame;

    fn velocity_frame(seq: u8) -> Vec<u8> {
        encode_frame(&[1u8, 0, 5, 0, 7, 0, 0, 0, 0], seq).unwrap()
    }

    fn battery_frame(seq: u8, level: u8) -> Vec<u8> {
        encode_frame(&[2u8, level], seq).unwrap()
    }

    #[test]
    fn decodes_encoded_frames() {
        let mut decoder = FrameDecoder::new();

        assert_eq!(
            decoder.feed_all(&velocity_frame(3)),
            vec![DecodeOutcome::CommandReady(Command {
                id: 1,
                seq: 3,
                payload: vec![0, 5, 0, 7, 0, 0, 0, 0],
            })]
        );
        assert_eq!(
            decoder.feed_all(&battery_frame(200, 87)),
            vec![DecodeOutcome::CommandReady(Command {
                id: 2,
                seq: 200,
                payload: vec![87],
            })]
        );
    }

    #[test]
    fn decodes_literal_wire_bytes() {
        let mut decoder = FrameDecoder::new();
        let wire = [
            0x55, 0xAA, 0x09, 0x03, 0x01, 0x00, 0x05, 0x00, 0x07, 0x00, 0x00, 0x00, 0x00, 0xF6,
            0x55, 0xAA, 0x02, 0x10, 0x02, 0x4D, 0xA2,
        ];

        assert_eq!(
            decoder.feed_all(&wire),
            vec![
                DecodeOutcome::CommandReady(Command {
                    id: 1,
                    seq: 3,
                    payload: vec![0, 5, 0, 7, 0, 0, 0, 0],
                }),
                DecodeOutcome::CommandReady(Command {
                    id: 2,
                    seq: 0x10,
                    payload: vec![0x4D],
                }),
            ]
        );
        assert_eq!(decoder.state(), &DecodeState::SeekFirstMagic);
    }

    #[test]
    fn state_transitions() {
        let mut decoder = FrameDecoder::new();
        assert_eq!(decoder.state(), &DecodeState::SeekFirstMagic);

        decoder.feed(0x13);
        assert_eq!(decoder.state(), &DecodeState::SeekFirstMagic);

        decoder.feed(0x55);
        assert_eq!(decoder.state(), &DecodeState::SeekSecondMagic);

        decoder.feed(0xAA);
        assert_eq!(decoder.state(), &DecodeState::ReadLength);

        decoder.feed(0x02);
        assert_eq!(
            decoder.state(),
            &DecodeState::Fill {
                buffer: vec![0x55, 0xAA, 0x02, 0, 0, 0, 0],
                cursor: 3
            }
        );

        decoder.feed(0x09);
        assert!(matches!(decoder.state(), DecodeState::Fill { cursor: 4, .. }));

        decoder.reset();
        assert_eq!(decoder.state(), &DecodeState::SeekFirstMagic);
    }

    #[test]
    fn second_magic_mismatch_is_discarded() {
        let mut decoder = FrameDecoder::new();

        decoder.feed(0x55);
        decoder.feed(0x55);
        assert_eq!(decoder.state(), &DecodeState::SeekFirstMagic);

        // The 0xAA following a doubled first magic byte is not rescanned.
        let mut stream = vec![0x55];
        stream.extend(battery_frame(0, 1));
        assert!(FrameDecoder::new().feed_all(&stream).is_empty());
    }

    #[test]
    fn byte_wise_and_batch_feeding_agree() {
        let mut stream = vec![0x00, 0x55, 0x13, 0xAA];
        stream.extend(velocity_frame(1));
        stream.extend([0x55, 0xAA, 0x04]);
        stream.extend(battery_frame(2, 50));
        let mut corrupted = velocity_frame(3);
        corrupted[7] ^= 0x40;
        stream.extend(corrupted);
        stream.extend(battery_frame(4, 49));
        stream.extend([0x55, 0xAA, 0x09, 0x01]);

        let batch = FrameDecoder::new().feed_all(&stream);

        let mut decoder = FrameDecoder::new();
        let byte_wise: Vec<_> = stream
            .iter()
            .map(|&byte| decoder.feed(byte))
            .filter(|outcome| !outcome.is_incomplete())
            .collect();

        for chunk_size in [2, 3, 5, 7, 11] {
            let mut decoder = FrameDecoder::new();
            let chunked: Vec<_> = stream
                .chunks(chunk_size)
                .flat_map(|chunk| decoder.feed_all(chunk))
                .collect();
            assert_eq!(chunked, batch);
        }

        assert_eq!(byte_wise, batch);
        assert_eq!(batch.len(), 4);
        assert!(matches!(batch[2], DecodeOutcome::ChecksumMismatch(_)));
    }

    #[test]
    fn recovers_after_checksum_mismatch() {
        let mut corrupted = battery_frame(9, 80);
        let last = corrupted.len() - 1;
        corrupted[last] ^= 0x01;

        let mut stream = corrupted.clone();
        stream.extend(battery_frame(10, 79));

        let outcomes = FrameDecoder::new().feed_all(&stream);

        assert_eq!(
            outcomes,
            vec![
                DecodeOutcome::ChecksumMismatch(corrupted.clone()),
                DecodeOutcome::CommandReady(Command {
                    id: 2,
                    seq: 10,
                    payload: vec![79],
                }),
            ]
        );

        // The diagnostic form reports the full raw frame under sentinel id and seq.
        let diagnostic = Command::checksum_failure(corrupted.clone());
        assert_eq!(diagnostic.id, 0);
        assert_eq!(diagnostic.seq, 0);
        assert_eq!(diagnostic.payload, corrupted);
    }

    #[test]
    fn invalid_length_resynchronizes() {
        for bad_len in [0u8, 1, 3, 8, 10, 0x55, 0xFF] {
            let mut stream = vec![0x55, 0xAA, bad_len];
            stream.extend(velocity_frame(5));

            let mut decoder = FrameDecoder::new();
            assert_eq!(decoder.feed(0x55), DecodeOutcome::Incomplete);
            assert_eq!(decoder.feed(0xAA), DecodeOutcome::Incomplete);
            assert_eq!(decoder.feed(bad_len), DecodeOutcome::Incomplete);
            assert_eq!(decoder.state(), &DecodeState::SeekFirstMagic);

            let outcomes = FrameDecoder::new().feed_all(&stream);
            assert_eq!(outcomes.len(), 1, "length byte {bad_len:#x}");
            assert!(matches!(
                &outcomes[0],
                DecodeOutcome::CommandReady(Command { id: 1, seq: 5, .. })
            ));
        }
    }

    #[test]
    fn display() {
        let command = Command {
            id: 2,
            seq: 17,
            payload: vec![0x5a, 0x0f],
        };

        assert_eq!(command.to_string(), "Id: 2, Seq: 17, Payload: 5a f");
    }
}
