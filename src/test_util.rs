use std::{
    io,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
};

use tokio::time::Instant;

use crate::{
    channel::Transport,
    decode::{Command, DecodeOutcome, FrameDecoder},
};

#[derive(Debug, Default)]
struct Shared {
    open: AtomicBool,
    failing: AtomicBool,
    wire: Mutex<Vec<u8>>,
    write_times: Mutex<Vec<Instant>>,
}

/// In-memory transport recording everything written to it.
///
/// Writes go out one byte at a time with a yield in between, so frames written
/// by unsynchronized callers would visibly interleave.
#[derive(Debug, Clone, Default)]
pub(crate) struct MockTransport {
    shared: Arc<Shared>,
}

impl MockTransport {
    pub fn open() -> Self {
        let transport = Self::default();
        transport.set_open(true);
        transport
    }

    pub fn closed() -> Self {
        Self::default()
    }

    pub fn set_open(&self, open: bool) {
        self.shared.open.store(open, Ordering::SeqCst);
    }

    pub fn set_failing(&self, failing: bool) {
        self.shared.failing.store(failing, Ordering::SeqCst);
    }

    pub fn wire(&self) -> Vec<u8> {
        self.shared.wire.lock().unwrap().clone()
    }

    pub fn write_times(&self) -> Vec<Instant> {
        self.shared.write_times.lock().unwrap().clone()
    }

    fn outcomes(&self) -> Vec<DecodeOutcome> {
        FrameDecoder::new().feed_all(&self.wire())
    }

    /// Every frame on the wire that passes its checksum.
    pub fn commands(&self) -> Vec<Command> {
        self.outcomes()
            .into_iter()
            .filter_map(|outcome| match outcome {
                DecodeOutcome::CommandReady(command) => Some(command),
                _ => None,
            })
            .collect()
    }

    pub fn checksum_failures(&self) -> usize {
        self.outcomes()
            .iter()
            .filter(|outcome| matches!(outcome, DecodeOutcome::ChecksumMismatch(_)))
            .count()
    }
}

impl Transport for MockTransport {
    fn is_open(&self) -> bool {
        self.shared.open.load(Ordering::SeqCst)
    }

    async fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        if self.shared.failing.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "mock write failure"));
        }

        self.shared.write_times.lock().unwrap().push(Instant::now());
        for &byte in bytes {
            self.shared.wire.lock().unwrap().push(byte);
            tokio::task::yield_now().await;
        }

        Ok(())
    }

    fn close(&mut self) {
        self.set_open(false);
    }
}
