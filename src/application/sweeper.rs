//! Periodic removal of stale signature counters.
//!
//! Without sweeps every distinct error ever seen keeps a counter. The sweeper
//! asks the registry to drop counters idle for longer than their limiter's
//! `window + cooldown` on a fixed cadence.

use crate::application::registry::LimiterRegistry;
use std::time::Duration;

#[cfg(feature = "async")]
use tokio::{sync::oneshot, task::JoinHandle, time::MissedTickBehavior};

/// Error returned when sweeper configuration validation fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SweeperConfigError {
    /// Sweep interval duration must be greater than zero
    ZeroSweepInterval,
}

impl std::fmt::Display for SweeperConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SweeperConfigError::ZeroSweepInterval => {
                write!(f, "sweep interval must be greater than 0")
            }
        }
    }
}

impl std::error::Error for SweeperConfigError {}

/// Configuration for the sweeper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweeperConfig {
    interval: Duration,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
        }
    }
}

impl SweeperConfig {
    /// Create a sweeper config with the specified interval.
    ///
    /// # Errors
    /// Returns `SweeperConfigError::ZeroSweepInterval` if `interval` is zero.
    pub fn new(interval: Duration) -> Result<Self, SweeperConfigError> {
        if interval.is_zero() {
            return Err(SweeperConfigError::ZeroSweepInterval);
        }
        Ok(Self { interval })
    }

    /// Time between sweeps.
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

/// Sweeps a registry, on demand or on a timer.
#[derive(Debug, Clone)]
pub struct Sweeper {
    registry: LimiterRegistry,
    config: SweeperConfig,
}

impl Sweeper {
    /// Create a sweeper for `registry`.
    pub fn new(registry: LimiterRegistry, config: SweeperConfig) -> Self {
        Self { registry, config }
    }

    /// Sweep every limiter once. Returns the number of counters removed.
    pub fn sweep_once(&self) -> usize {
        self.registry.sweep()
    }

    /// Start sweeping periodically in a background task.
    ///
    /// The first sweep happens one interval after the start. The task runs
    /// until the returned handle is shut down or dropped.
    ///
    /// # Panics
    /// Panics if called outside of a tokio runtime.
    #[cfg(feature = "async")]
    pub fn start(self) -> SweeperHandle {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let interval = self.config.interval;

        tracing::info!(interval_ms = interval.as_millis() as u64, "error signature sweeper started");

        let join = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // Completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => {
                        let removed = self.sweep_once();
                        tracing::debug!(removed, "periodic sweep finished");
                    }
                }
            }

            tracing::info!("error signature sweeper stopped");
        });

        SweeperHandle {
            shutdown_tx: Some(shutdown_tx),
            join: Some(join),
        }
    }

    /// Get the sweeper configuration.
    pub fn config(&self) -> &SweeperConfig {
        &self.config
    }

    /// Get a reference to the registry.
    pub fn registry(&self) -> &LimiterRegistry {
        &self.registry
    }
}

/// Error returned when the sweeper task did not stop cleanly.
#[cfg(feature = "async")]
#[derive(Debug)]
pub enum ShutdownError {
    /// The task panicked
    TaskPanicked,
    /// The task was cancelled before it could finish
    TaskCancelled,
}

#[cfg(feature = "async")]
impl std::fmt::Display for ShutdownError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShutdownError::TaskPanicked => write!(f, "sweeper task panicked"),
            ShutdownError::TaskCancelled => write!(f, "sweeper task was cancelled"),
        }
    }
}

#[cfg(feature = "async")]
impl std::error::Error for ShutdownError {}

/// Handle to a running sweeper task.
///
/// Dropping the handle stops the task without waiting for it; call
/// [`SweeperHandle::shutdown`] to wait until it has stopped.
#[cfg(feature = "async")]
#[derive(Debug)]
pub struct SweeperHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    join: Option<JoinHandle<()>>,
}

#[cfg(feature = "async")]
impl SweeperHandle {
    /// Stop the task and wait for it to finish.
    ///
    /// # Errors
    /// Returns `ShutdownError` if the task panicked or was cancelled.
    pub async fn shutdown(mut self) -> Result<(), ShutdownError> {
        if let Some(tx) = self.shutdown_tx.take() {
            // The task may already be gone, in which case join reports why
            let _ = tx.send(());
        }
        match self.join.take() {
            Some(join) => join.await.map_err(|e| {
                if e.is_panic() {
                    ShutdownError::TaskPanicked
                } else {
                    ShutdownError::TaskCancelled
                }
            }),
            None => Ok(()),
        }
    }

    /// Check if the task has stopped.
    pub fn is_finished(&self) -> bool {
        self.join.as_ref().map_or(true, JoinHandle::is_finished)
    }
}

#[cfg(feature = "async")]
impl Drop for SweeperHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
