//! A complete link to one chassis.

use std::{sync::Arc, time::Duration};

use log::{debug, info, warn};
use tokio::task::JoinHandle;

use crate::{
    channel::{ChannelError, CommandChannel, Transport, DEFAULT_SEND_DELAY},
    decode::DecodeOutcome,
    packets::{
        cmds,
        motion::{ClearEncoder, VelocityCommand},
        system::ResetTimeout,
    },
    receiver::{forward, FrameHandler, Receiver},
    supervisor::{PollingSupervisor, SupervisorConfig},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LinkConfig {
    /// Minimum spacing between two outbound frames.
    pub send_delay: Duration,
    pub supervisor: SupervisorConfig,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            send_delay: DEFAULT_SEND_DELAY,
            supervisor: SupervisorConfig::default(),
        }
    }
}

/// Ties the outbound channel, the polling loops and the inbound decoder of a
/// single transport together.
pub struct RobotLink<T: Transport> {
    channel: Arc<CommandChannel<T>>,
    supervisor: PollingSupervisor<T>,
    receiver: Receiver,
}

impl<T: Transport> RobotLink<T> {
    pub fn new(transport: T, config: LinkConfig) -> Self {
        let channel = Arc::new(CommandChannel::with_send_delay(transport, config.send_delay));

        Self {
            supervisor: PollingSupervisor::new(channel.clone(), config.supervisor),
            channel,
            receiver: Receiver::new(),
        }
    }

    pub fn channel(&self) -> &Arc<CommandChannel<T>> {
        &self.channel
    }

    pub fn supervisor(&self) -> &PollingSupervisor<T> {
        &self.supervisor
    }

    pub fn receiver(&self) -> &Receiver {
        &self.receiver
    }

    /// Runs the sequence expected right after the transport opened: starts the
    /// battery poll and sets a stop target, which keeps the chassis fed.
    ///
    /// Returns the battery poll's handle, or `None` if it was already running.
    pub fn start(&self) -> Option<JoinHandle<()>> {
        info!("Starting link");

        let battery = self.supervisor.start_battery_poll();
        let stop = VelocityCommand::STOP;
        self.supervisor.set_velocity(stop.left, stop.right);
        battery
    }

    /// Sets a new velocity target. Ignored while the transport is closed.
    pub async fn drive(&self, left: i16, right: i16) -> bool {
        if !self.channel.is_open().await {
            debug!("Ignoring velocity target on a closed link");
            return false;
        }

        self.supervisor.set_velocity(left, right);
        true
    }

    pub async fn clear_encoder(&self) -> Result<Option<u8>, ChannelError> {
        self.channel.send(&ClearEncoder).await
    }

    /// Decodes inbound bytes and forwards the outcomes to `handler`.
    ///
    /// A timeout report from the chassis is acknowledged with a
    /// [`ResetTimeout`] before the handler sees it. Every decoded outcome is
    /// forwarded even if an acknowledgement fails to send; the first such
    /// failure is returned once the whole batch has been handled.
    pub async fn handle_bytes(
        &self,
        bytes: &[u8],
        handler: &mut impl FrameHandler,
    ) -> Result<(), ChannelError> {
        let mut reset_error = None;

        for outcome in self.receiver.receive(bytes) {
            if let DecodeOutcome::CommandReady(command) = &outcome {
                if command.id == cmds::TIMEOUT {
                    warn!("Chassis reported a command timeout, resetting");
                    if let Err(e) = self.channel.send(&ResetTimeout).await {
                        warn!("Timeout reset failed: {}", e);
                        reset_error.get_or_insert(e);
                    }
                }
            }

            forward(outcome, handler);
        }

        match reset_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Closes the transport. Both polling loops end at their next check.
    pub async fn shutdown(&self) {
        info!("Shutting down link");

        self.supervisor.stop_velocity();
        self.channel.close().await;
    }
}
