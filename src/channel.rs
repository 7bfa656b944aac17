//! Serialized, rate-limited access to the outbound side of a transport.

use std::{future::Future, time::Duration};

use log::{trace, warn};
use thiserror::Error;
use tokio::{sync::Mutex, time::sleep};

use crate::encode::{encode_frame, Encode, EncodeError};

/// Minimum spacing between two frames, giving the chassis time to process the first.
pub const DEFAULT_SEND_DELAY: Duration = Duration::from_millis(20);

/// The outbound half of a link to the chassis.
///
/// Opening the underlying device is the caller's business; a transport only
/// reports whether it is currently usable, writes bytes, and can be closed.
pub trait Transport: Send + 'static {
    fn is_open(&self) -> bool;

    /// Writes all of `bytes` to the device.
    fn write_bytes(&mut self, bytes: &[u8]) -> impl Future<Output = std::io::Result<()>> + Send;

    fn close(&mut self);
}

#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("Frame encoding error: {0}")]
    EncodeError(#[from] EncodeError),

    #[error("IO Error: {0}")]
    IoError(#[from] std::io::Error),
}

#[derive(Debug)]
struct ChannelInner<T> {
    transport: T,
    sequence: u8,
}

/// Owns a transport and the outbound sequence counter.
///
/// Every frame is encoded and written while holding the transport lock, and the
/// lock is only released after the inter-send delay, so frames from concurrent
/// senders never interleave and always respect the delay.
#[derive(Debug)]
pub struct CommandChannel<T: Transport> {
    inner: Mutex<ChannelInner<T>>,
    send_delay: Duration,
}

impl<T: Transport> CommandChannel<T> {
    pub fn new(transport: T) -> Self {
        Self::with_send_delay(transport, DEFAULT_SEND_DELAY)
    }

    pub fn with_send_delay(transport: T, send_delay: Duration) -> Self {
        Self {
            inner: Mutex::new(ChannelInner {
                transport,
                sequence: 0,
            }),
            send_delay,
        }
    }

    /// Frames and writes a payload.
    ///
    /// Returns the sequence number the frame was sent with, or `None` if the
    /// transport is closed, in which case nothing is written.
    pub async fn send(&self, payload: &(impl Encode + Sync)) -> Result<Option<u8>, ChannelError> {
        let mut inner = self.inner.lock().await;

        if !inner.transport.is_open() {
            trace!("Transport closed, dropping outbound payload");
            return Ok(None);
        }

        let seq = inner.sequence;
        let frame = encode_frame(payload, seq)?;

        trace!("sent frame: {:x?}", frame);

        if let Err(e) = inner.transport.write_bytes(&frame).await {
            warn!("Failed to write frame {}: {}", seq, e);
            return Err(ChannelError::IoError(e));
        }
        inner.sequence = seq.wrapping_add(1);

        sleep(self.send_delay).await;

        Ok(Some(seq))
    }

    pub async fn is_open(&self) -> bool {
        self.inner.lock().await.transport.is_open()
    }

    /// Closes the transport. Subsequent sends are no-ops.
    pub async fn close(&self) {
        self.inner.lock().await.transport.close();
    }

    /// The sequence number the next frame will carry.
    pub async fn next_sequence(&self) -> u8 {
        self.inner.lock().await.sequence
    }

    /// Runs `f` with exclusive access to the transport.
    pub async fn with_transport<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.inner.lock().await.transport)
    }
}
