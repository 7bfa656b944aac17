//! Typed payloads for the commands and telemetry understood by the chassis.
//!
//! By convention the first payload byte of every frame is its command id, so
//! every outbound payload here encodes its id first and every inbound report is
//! decoded from a [`Command`] whose `id` has already been split off.

use crate::decode::{Command, Decode};

pub mod motion;
pub mod system;

use motion::EncoderReport;
use system::BatteryReport;

/// Command ids.
///
/// The same id is used for a command and the report that answers it.
pub mod cmds {
    pub const VELOCITY: u8 = 0x01;
    pub const BATTERY: u8 = 0x02;
    pub const RESET_TIMEOUT: u8 = 0x05;
    pub const CLEAR_ENCODER: u8 = 0x06;
    /// Sent by the chassis when it stopped receiving commands in time.
    pub const TIMEOUT: u8 = 0xFF;
}

/// A received command interpreted according to its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Telemetry {
    Encoder(EncoderReport),
    Battery(BatteryReport),
    /// The chassis reported a command timeout and expects a [`system::ResetTimeout`].
    Timeout,
    /// An id this crate does not interpret, or a payload too short for its id.
    Other(Command),
}

impl Telemetry {
    pub fn from_command(command: Command) -> Self {
        match command.id {
            cmds::VELOCITY => EncoderReport::decode(&command)
                .map(Self::Encoder)
                .unwrap_or(Self::Other(command)),
            cmds::BATTERY => BatteryReport::decode(&command)
                .map(Self::Battery)
                .unwrap_or(Self::Other(command)),
            cmds::TIMEOUT => Self::Timeout,
            _ => Self::Other(command),
        }
    }
}

impl From<Command> for Telemetry {
    fn from(command: Command) -> Self {
        Self::from_command(command)
    }
}
