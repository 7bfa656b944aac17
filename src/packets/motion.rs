//! Wheel velocity and encoder packets.

use crate::{
    decode::{Command, Decode, DecodeError},
    encode::Encode,
};

use super::cmds::{CLEAR_ENCODER, VELOCITY};

/// Sets the target velocity of both wheels.
///
/// # Encoding
///
/// | Field     | Size | Description |
/// |-----------|------|-------------|
/// | `id`      | 1    | [`VELOCITY`] |
/// | `left`    | 2    | Left wheel, signed big-endian. |
/// | `right`   | 2    | Right wheel, signed big-endian. |
/// | reserved  | 4    | Zero. |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VelocityCommand {
    pub left: i16,
    pub right: i16,
}

impl VelocityCommand {
    pub const STOP: Self = Self { left: 0, right: 0 };

    pub fn new(left: i16, right: i16) -> Self {
        Self { left, right }
    }
}

impl Encode for VelocityCommand {
    fn size(&self) -> usize {
        9
    }

    fn encode(&self, data: &mut [u8]) {
        data[0] = VELOCITY;
        data[1..3].copy_from_slice(&self.left.to_be_bytes());
        data[3..5].copy_from_slice(&self.right.to_be_bytes());
        data[5..9].fill(0);
    }
}

/// Resets the chassis' encoder counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClearEncoder;

impl Encode for ClearEncoder {
    fn size(&self) -> usize {
        2
    }

    fn encode(&self, data: &mut [u8]) {
        data[..2].copy_from_slice(&[CLEAR_ENCODER, 0]);
    }
}

/// Encoder counters reported by the chassis.
///
/// Counts are read as signed big-endian 16-bit values, the same encoding
/// [`VelocityCommand`] uses, so `0xFFFF` is `-1` rather than `65535`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderReport {
    pub left: i16,
    pub right: i16,
}

impl Decode for EncoderReport {
    fn decode(command: &Command) -> Result<Self, DecodeError> {
        if command.id != VELOCITY {
            return Err(DecodeError::UnexpectedId {
                value: command.id,
                expected: &[VELOCITY],
            });
        }

        let Some(bytes) = command.payload.get(..4) else {
            return Err(DecodeError::UnexpectedEnd);
        };

        Ok(Self {
            left: i16::from_be_bytes([bytes[0], bytes[1]]),
            right: i16::from_be_bytes([bytes[2], bytes[3]]),
        })
    }
}
