use thiserror::Error;

use crate::{checksum::xor_checksum, FRAME_HEADER, FRAME_OVERHEAD};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeError {
    #[error("Payload of {len} bytes does not fit in a single-byte length field")]
    PayloadTooLong { len: usize },
}

/// A type that can be encoded into a sequence of bytes.
pub trait Encode {
    /// Returns the number of bytes this value will take when encoded.
    fn size(&self) -> usize;

    /// Encodes this instance into the provided byte slice.
    fn encode(&self, data: &mut [u8]);
}

impl<E: Encode + ?Sized> Encode for &E {
    fn size(&self) -> usize {
        (**self).size()
    }

    fn encode(&self, data: &mut [u8]) {
        (**self).encode(data)
    }
}

impl Encode for [u8] {
    fn size(&self) -> usize {
        self.len()
    }

    fn encode(&self, data: &mut [u8]) {
        data[..self.len()].copy_from_slice(self);
    }
}

impl<const N: usize> Encode for [u8; N] {
    fn size(&self) -> usize {
        N
    }

    fn encode(&self, data: &mut [u8]) {
        data[..N].copy_from_slice(self);
    }
}

impl Encode for Vec<u8> {
    fn size(&self) -> usize {
        self.len()
    }

    fn encode(&self, data: &mut [u8]) {
        self.as_slice().encode(data)
    }
}

/// Wraps an encodable payload in a complete wire frame.
///
/// # Encoding
///
/// | Field      | Size | Description |
/// |------------|------|-------------|
/// | `header`   | 2    | Always [`FRAME_HEADER`]. |
/// | `len`      | 1    | Size of `payload`. |
/// | `seq`      | 1    | Sender sequence number. |
/// | `payload`  | n    | Encoded payload. By convention its first byte is the command id. |
/// | `checksum` | 1    | XOR of every preceding byte. |
///
/// # Errors
///
/// Returns [`EncodeError::PayloadTooLong`] if the payload is 256 bytes or longer.
pub fn encode_frame(payload: &impl Encode, seq: u8) -> Result<Vec<u8>, EncodeError> {
    let len = payload.size();
    let len_byte = u8::try_from(len).map_err(|_| EncodeError::PayloadTooLong { len })?;

    let mut frame = vec![0; len + FRAME_OVERHEAD];
    frame[..2].copy_from_slice(&FRAME_HEADER);
    frame[2] = len_byte;
    frame[3] = seq;
    payload.encode(&mut frame[4..4 + len]);

    let last = frame.len() - 1;
    frame[last] = xor_checksum(&frame[..last]);

    Ok(frame)
}
