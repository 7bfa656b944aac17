//! Periodic command producers sharing one [`CommandChannel`].
//!
//! Two activities run against the channel:
//!
//! - The battery poll, which queries the battery level at a fixed interval for
//!   as long as the transport stays open.
//! - The velocity loop, which repeats the current velocity target so the chassis
//!   does not time out. Setting a new target starts a new loop and retires the
//!   previous one through a generation token: every loop captures the token when
//!   it starts and stops as soon as the token has moved on.

use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering},
        Arc,
    },
    time::Duration,
};

use log::{debug, trace, warn};
use tokio::{task::JoinHandle, time::sleep};

use crate::{
    channel::{CommandChannel, Transport},
    packets::{motion::VelocityCommand, system::BatteryQuery},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SupervisorConfig {
    /// Time between two battery queries.
    pub battery_interval: Duration,
    /// Time between two repetitions of the velocity target.
    pub velocity_interval: Duration,
    /// Wheel values are multiplied by `speed_step * (speed_level + 1)` before sending.
    pub speed_step: i16,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            battery_interval: Duration::from_millis(1000),
            velocity_interval: Duration::from_millis(100),
            speed_step: 8,
        }
    }
}

pub struct PollingSupervisor<T: Transport> {
    channel: Arc<CommandChannel<T>>,
    generation: Arc<AtomicU64>,
    battery_running: Arc<AtomicBool>,
    speed_level: AtomicU8,
    config: SupervisorConfig,
}

impl<T: Transport> PollingSupervisor<T> {
    pub fn new(channel: Arc<CommandChannel<T>>, config: SupervisorConfig) -> Self {
        Self {
            channel,
            generation: Arc::new(AtomicU64::new(0)),
            battery_running: Arc::new(AtomicBool::new(false)),
            speed_level: AtomicU8::new(0),
            config,
        }
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    /// The current generation token. Only the newest velocity loop carries it.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn speed_level(&self) -> u8 {
        self.speed_level.load(Ordering::Relaxed)
    }

    /// Selects the speed level used by subsequent [`set_velocity`](Self::set_velocity) calls.
    pub fn set_speed_level(&self, level: u8) {
        self.speed_level.store(level, Ordering::Relaxed);
    }

    pub fn speed_multiplier(&self) -> i16 {
        self.config
            .speed_step
            .saturating_mul(i16::from(self.speed_level()) + 1)
    }

    /// Starts the battery poll.
    ///
    /// Returns `None` if a poll is already running. The poll ends once the
    /// transport is observed closed and has to be started again after reopening.
    pub fn start_battery_poll(&self) -> Option<JoinHandle<()>> {
        if self
            .battery_running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Battery poll already running");
            return None;
        }

        let channel = self.channel.clone();
        let running = self.battery_running.clone();
        let interval = self.config.battery_interval;

        debug!("Starting battery poll every {:?}", interval);

        Some(tokio::spawn(async move {
            while channel.is_open().await {
                sleep(interval).await;
                if let Err(e) = channel.send(&BatteryQuery).await {
                    warn!("Battery query failed: {}", e);
                }
            }

            running.store(false, Ordering::SeqCst);
            debug!("Battery poll stopped");
        }))
    }

    /// Sets a new velocity target, scaled by the current speed multiplier.
    ///
    /// Any previously running velocity loop stops before its next send. A send
    /// that already passed its check may still go out, so at most one stale
    /// frame follows this call.
    pub fn set_velocity(&self, left: i16, right: i16) -> JoinHandle<()> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let multiplier = self.speed_multiplier();
        let command = VelocityCommand::new(
            left.saturating_mul(multiplier),
            right.saturating_mul(multiplier),
        );

        let channel = self.channel.clone();
        let current = self.generation.clone();
        let interval = self.config.velocity_interval;

        debug!(
            "Velocity target ({}, {}) under generation {}",
            command.left, command.right, generation
        );

        tokio::spawn(async move {
            let is_current = || current.load(Ordering::SeqCst) == generation;

            while is_current() && channel.is_open().await {
                sleep(interval).await;
                if !is_current() {
                    break;
                }
                if let Err(e) = channel.send(&command).await {
                    warn!("Velocity command failed: {}", e);
                }
            }

            trace!("Velocity loop of generation {} retired", generation);
        })
    }

    /// Retires the running velocity loop without starting a new one.
    pub fn stop_velocity(&self) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("Velocity loops retired at generation {}", generation);
    }
}
