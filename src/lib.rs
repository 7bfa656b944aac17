//! Crate for driving Autolabor wheeled chassis over a serial link.
//!
//! Frames on the wire look like `55 AA LEN SEQ ID PAYLOAD.. CHECKSUM`, where `LEN`
//! counts the id and payload and the checksum is the XOR of every preceding byte.
//!
//! Outbound payloads implement [`Encode`](encode::Encode) and are framed by
//! [`encode_frame`](encode::encode_frame). Inbound bytes are fed to a
//! [`FrameDecoder`](decode::FrameDecoder), which yields [`Command`](decode::Command)s
//! that can be interpreted as [`Telemetry`](packets::Telemetry).
//!
//! The [`CommandChannel`](channel::CommandChannel) serializes writes to a
//! [`Transport`](channel::Transport), and the
//! [`PollingSupervisor`](supervisor::PollingSupervisor) keeps the battery poll and
//! the velocity loop running against it. [`RobotLink`](link::RobotLink) bundles
//! all of the above for a single chassis.

pub mod channel;
pub mod checksum;
pub mod decode;
pub mod encode;
pub mod link;
pub mod packets;
pub mod receiver;
pub mod supervisor;

#[cfg(feature = "serial")]
pub mod serial;

#[cfg(test)]
mod test_util;

/// Starting byte sequence of every frame.
pub const FRAME_HEADER: [u8; 2] = [0x55, 0xAA];

/// Bytes a frame adds around its payload: two header bytes, then one byte each
/// for length, sequence and checksum.
pub const FRAME_OVERHEAD: usize = 5;

/// The only length bytes an inbound frame may carry. Anything else is treated
/// as loss of synchronization.
pub const VALID_LENGTHS: [u8; 2] = [2, 9];

pub use channel::{ChannelError, CommandChannel, Transport};
pub use decode::{Command, Decode, DecodeError, DecodeOutcome, FrameDecoder};
pub use encode::{encode_frame, Encode, EncodeError};
pub use link::{LinkConfig, RobotLink};
pub use receiver::{FrameHandler, Receiver};
pub use supervisor::{PollingSupervisor, SupervisorConfig};
