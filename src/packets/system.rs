//! Battery and timeout handling packets.

use crate::{
    decode::{Command, Decode, DecodeError},
    encode::Encode,
};

use super::cmds::{BATTERY, RESET_TIMEOUT};

/// Asks the chassis for its battery level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatteryQuery;

impl Encode for BatteryQuery {
    fn size(&self) -> usize {
        2
    }

    fn encode(&self, data: &mut [u8]) {
        data[..2].copy_from_slice(&[BATTERY, 0]);
    }
}

/// Acknowledges a timeout report so the chassis resumes accepting commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResetTimeout;

impl Encode for ResetTimeout {
    fn size(&self) -> usize {
        2
    }

    fn encode(&self, data: &mut [u8]) {
        data[..2].copy_from_slice(&[RESET_TIMEOUT, 0]);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatteryReport {
    pub level: u8,
}

impl Decode for BatteryReport {
    fn decode(command: &Command) -> Result<Self, DecodeError> {
        if command.id != BATTERY {
            return Err(DecodeError::UnexpectedId {
                value: command.id,
                expected: &[BATTERY],
            });
        }

        let level = *command.payload.first().ok_or(DecodeError::UnexpectedEnd)?;

        Ok(Self { level })
    }
}
