//! Serial port transport for a chassis connected over USB/UART.

use std::{io, sync::Arc, time::Duration};

use log::{debug, trace, warn};
use thiserror::Error;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf},
    select,
    sync::watch,
    task::JoinHandle,
};
use tokio_serial::SerialStream;

use crate::{
    channel::Transport,
    link::RobotLink,
    receiver::FrameHandler,
};

pub const DEFAULT_BAUD_RATE: u32 = 115200;

/// Outbound half of an open serial port.
#[derive(Debug)]
pub struct SerialTransport {
    port: Option<WriteHalf<SerialStream>>,
    open: watch::Sender<bool>,
}

/// Inbound half of an open serial port, consumed by [`spawn_reader`].
#[derive(Debug)]
pub struct SerialReader {
    port: ReadHalf<SerialStream>,
    open: watch::Receiver<bool>,
}

/// Opens a serial port with the chassis' line settings (8N1).
pub fn open(
    path: &str,
    baud_rate: u32,
    timeout: Duration,
) -> Result<(SerialTransport, SerialReader), SerialError> {
    let stream = match SerialStream::open(
        &tokio_serial::new(path, baud_rate)
            .parity(tokio_serial::Parity::None)
            .timeout(timeout)
            .stop_bits(tokio_serial::StopBits::One),
    ) {
        Ok(v) => Ok(v),
        Err(e) => Err(SerialError::SerialportError(e)),
    }?;

    debug!("Opened serial port {} at {} baud", path, baud_rate);

    let (read, write) = tokio::io::split(stream);
    let (open_tx, open_rx) = watch::channel(true);

    Ok((
        SerialTransport {
            port: Some(write),
            open: open_tx,
        },
        SerialReader {
            port: read,
            open: open_rx,
        },
    ))
}

impl Transport for SerialTransport {
    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    async fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        let Some(port) = &mut self.port else {
            return Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "serial port is closed",
            ));
        };

        port.write_all(bytes).await?;
        port.flush().await
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            debug!("Closing serial port");
            self.open.send_replace(false);
        }
    }
}

/// Feeds everything read from `reader` through `link` into `handler` until the
/// port is closed or a read fails. Failures to answer inbound frames are logged
/// and do not stop the reader.
pub fn spawn_reader<H>(
    mut reader: SerialReader,
    link: Arc<RobotLink<SerialTransport>>,
    mut handler: H,
) -> JoinHandle<Result<(), SerialError>>
where
    H: FrameHandler + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = [0u8; 256];

        loop {
            let read = select! {
                read = reader.port.read(&mut buf) => read,
                // Fires on close, or once the transport is dropped.
                _ = reader.open.changed() => {
                    debug!("Serial reader stopped: port closed");
                    return Ok(());
                }
            };

            let len = match read {
                Ok(0) => {
                    warn!("Serial port reached end of stream");
                    return Ok(());
                }
                Ok(len) => len,
                Err(e) if e.kind() == io::ErrorKind::TimedOut => continue,
                Err(e) => {
                    warn!("Serial read failed: {}", e);
                    link.shutdown().await;
                    return Err(SerialError::IoError(e));
                }
            };

            trace!("read {} bytes: {:x?}", len, &buf[..len]);
            if let Err(e) = link.handle_bytes(&buf[..len], &mut handler).await {
                warn!("Failed to answer inbound frames: {}", e);
            }
        }
    })
}

#[derive(Error, Debug)]
pub enum SerialError {
    #[error("IO Error: {0}")]
    IoError(#[from] io::Error),

    #[error("Serialport Error")]
    SerialportError(#[from] tokio_serial::Error),
}
