//! Entropy source health monitoring.
//!
//! [`HealthMonitor`] runs an optional periodic task, independent of the worker
//! pool, that performs a one-byte read from the [`EntropySource`] and records
//! the outcome as a [`HealthStatus`]. The status is advisory: generation keeps
//! running (and retrying) regardless of what the monitor reports.
//!
//! ## State machine
//!
//! - `Dormant -> Running` on [`HealthMonitor::start`]
//! - `Running -> Running` on [`HealthMonitor::set_interval`]
//! - `Running -> Dormant` on [`HealthMonitor::stop`]

use crate::{EntropySource, Error, Result, telemetry::Counters};
use core::time::Duration;
use parking_lot::Mutex;
use portable_atomic::{AtomicU8, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::{runtime::Handle, time::sleep};
use tokio_util::sync::CancellationToken;

/// Last observed health of the entropy source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum HealthStatus {
    /// No probe has completed yet.
    Unknown = 0,
    /// The most recent probe succeeded.
    Healthy = 1,
    /// The most recent probe failed.
    Degraded = 2,
}

impl HealthStatus {
    const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Healthy,
            2 => Self::Degraded,
            _ => Self::Unknown,
        }
    }

    pub const fn is_degraded(self) -> bool {
        matches!(self, Self::Degraded)
    }
}

struct MonitorTask {
    token: CancellationToken,
    interval: Arc<AtomicU64>,
}

pub(crate) struct HealthMonitor {
    source: Arc<dyn EntropySource>,
    counters: Arc<Counters>,
    status: Arc<AtomicU8>,
    task: Mutex<Option<MonitorTask>>,
    runtime: Handle,
    parent_token: CancellationToken,
}

impl HealthMonitor {
    /// Creates a dormant monitor. The task is spawned on `runtime` and stops
    /// when `parent_token` is cancelled.
    pub(crate) fn new(
        source: Arc<dyn EntropySource>,
        counters: Arc<Counters>,
        runtime: Handle,
        parent_token: CancellationToken,
    ) -> Self {
        Self {
            source,
            counters,
            status: Arc::new(AtomicU8::new(HealthStatus::Unknown as u8)),
            task: Mutex::new(None),
            runtime,
            parent_token,
        }
    }

    pub(crate) fn status(&self) -> HealthStatus {
        HealthStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    /// The interval of the running task, or `None` when dormant.
    pub(crate) fn interval(&self) -> Option<Duration> {
        self.task
            .lock()
            .as_ref()
            .map(|task| Duration::from_nanos(task.interval.load(Ordering::Relaxed)))
    }

    #[cfg(test)]
    pub(crate) fn is_running(&self) -> bool {
        self.task.lock().is_some()
    }

    /// Starts probing every `interval`, beginning immediately.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidInterval`] if `interval` is zero.
    /// - [`Error::MonitorAlreadyStarted`] if a task is already running.
    /// - [`Error::Shutdown`] if the parent token has been cancelled.
    pub(crate) fn start(&self, interval: Duration) -> Result<()> {
        if interval.is_zero() {
            return Err(Error::InvalidInterval);
        }

        let mut task = self.task.lock();
        if self.parent_token.is_cancelled() {
            return Err(Error::Shutdown);
        }
        if task.is_some() {
            return Err(Error::MonitorAlreadyStarted);
        }

        let token = self.parent_token.child_token();
        let shared_interval = Arc::new(AtomicU64::new(to_nanos(interval)));
        self.runtime.spawn(monitor_loop(
            Arc::clone(&self.source),
            Arc::clone(&self.counters),
            Arc::clone(&self.status),
            Arc::clone(&shared_interval),
            token.clone(),
        ));
        *task = Some(MonitorTask {
            token,
            interval: shared_interval,
        });

        #[cfg(feature = "tracing")]
        tracing::info!("Health monitor started with interval {interval:?}");
        Ok(())
    }

    /// Signals the running task to terminate and clears its interval. The last
    /// recorded status is kept.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MonitorAlreadyStopped`] if no task is running.
    pub(crate) fn stop(&self) -> Result<()> {
        let task = self.task.lock().take().ok_or(Error::MonitorAlreadyStopped)?;
        task.token.cancel();

        #[cfg(feature = "tracing")]
        tracing::info!("Health monitor stopped");
        Ok(())
    }

    /// Changes the interval used from the next sleep onwards. A sleep already
    /// in progress completes with the previous interval.
    ///
    /// # Errors
    ///
    /// - [`Error::MonitorAlreadyStopped`] if no task is running.
    /// - [`Error::InvalidInterval`] if `interval` is zero.
    pub(crate) fn set_interval(&self, interval: Duration) -> Result<()> {
        let task = self.task.lock();
        let task = task.as_ref().ok_or(Error::MonitorAlreadyStopped)?;
        if interval.is_zero() {
            return Err(Error::InvalidInterval);
        }
        task.interval.store(to_nanos(interval), Ordering::Relaxed);

        #[cfg(feature = "tracing")]
        tracing::debug!("Health check interval set to {interval:?}");
        Ok(())
    }
}

fn to_nanos(interval: Duration) -> u64 {
    u64::try_from(interval.as_nanos()).unwrap_or(u64::MAX)
}

async fn monitor_loop(
    source: Arc<dyn EntropySource>,
    counters: Arc<Counters>,
    status: Arc<AtomicU8>,
    interval: Arc<AtomicU64>,
    token: CancellationToken,
) {
    loop {
        let healthy = probe(source.as_ref());
        counters.record_health_probe(healthy);

        let next = if healthy {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        };
        let _previous = HealthStatus::from_u8(status.swap(next as u8, Ordering::AcqRel));

        #[cfg(feature = "tracing")]
        {
            match (_previous, next) {
                (HealthStatus::Healthy | HealthStatus::Unknown, HealthStatus::Degraded) => {
                    tracing::warn!("Entropy source degraded");
                }
                (HealthStatus::Degraded, HealthStatus::Healthy) => {
                    tracing::info!("Entropy source recovered");
                }
                _ => {}
            }
        }

        let wait = Duration::from_nanos(interval.load(Ordering::Relaxed));
        tokio::select! {
            biased;
            () = token.cancelled() => break,
            () = sleep(wait) => {}
        }
    }
}

fn probe(source: &dyn EntropySource) -> bool {
    let mut byte = [0_u8; 1];
    source.try_fill(&mut byte).is_ok()
}
