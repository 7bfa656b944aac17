//! Inbound side of a link: turns raw bytes into handler callbacks.

use std::sync::{Mutex, PoisonError};

use crate::decode::{Command, DecodeOutcome, FrameDecoder};

/// Receives the results of decoding inbound bytes.
pub trait FrameHandler {
    /// Called for every frame that passed its checksum, in wire order.
    fn on_decoded(&mut self, command: Command);

    /// Called with the entire raw frame when a frame fails its checksum.
    fn on_checksum_failure(&mut self, raw: Vec<u8>);
}

/// The single decoder of a link, guarded so that it can be fed from any reader context.
///
/// The lock is only held while bytes are being decoded, never while a handler runs.
#[derive(Debug, Default)]
pub struct Receiver {
    decoder: Mutex<FrameDecoder>,
}

impl Receiver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes `bytes`, returning every completed outcome in order.
    pub fn receive(&self, bytes: &[u8]) -> Vec<DecodeOutcome> {
        // The decoder is valid in every state, so a poisoned lock is still usable.
        let mut decoder = self.decoder.lock().unwrap_or_else(PoisonError::into_inner);
        decoder.feed_all(bytes)
    }

    /// Decodes `bytes` and forwards the outcomes to `handler`.
    pub fn dispatch(&self, bytes: &[u8], handler: &mut impl FrameHandler) {
        for outcome in self.receive(bytes) {
            forward(outcome, handler);
        }
    }
}

pub(crate) fn forward(outcome: DecodeOutcome, handler: &mut impl FrameHandler) {
    match outcome {
        DecodeOutcome::Incomplete => {}
        DecodeOutcome::CommandReady(command) => handler.on_decoded(command),
        DecodeOutcome::ChecksumMismatch(raw) => handler.on_checksum_failure(raw),
    }
}
