//! The public generator facade.
//!
//! [`Generator`] composes the worker pool, the scaling coordinator, the health
//! monitor and deterministic generation behind one handle. Share it across
//! tasks with an `Arc`.

#[cfg(test)]
mod tests;

use crate::{
    EntropySource, Error, GeneratorConfig, HealthStatus, Namespace, OsRandom, Result, Stats,
    health::HealthMonitor,
    pool::{
        ScalingCoordinator,
        buffer::Retired,
        manager::WorkerPool,
        worker::{RetryBackoff, WorkerContext},
    },
    telemetry::Counters,
};
use core::{fmt, time::Duration};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Pooled UUID generator.
///
/// Random (version 4) identifiers are served from a bounded buffer that a pool
/// of background workers keeps filled. Deterministic (version 5) identifiers
/// are computed on demand from the configured namespace.
///
/// The worker count and the buffer capacity can be changed at runtime. Scaling
/// requests are applied one at a time; a buffer resize discards the
/// identifiers still buffered.
///
/// Workers and the optional health monitor run as Tokio tasks on the runtime
/// the generator was created in. Dropping the generator stops them.
///
/// # Example
/// ```
/// use uuid_pool::{Generator, GeneratorConfig};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> uuid_pool::Result<()> {
/// let generator = Generator::new(
///     GeneratorConfig::default()
///         .with_namespace("dns")
///         .with_buffer_capacity(64)
///         .with_workers(2),
/// )?;
///
/// let random = generator.generate_random().await?;
/// assert_eq!(random.get_version_num(), 4);
///
/// let a = generator.generate_deterministic("example.com");
/// let b = generator.generate_deterministic("example.com");
/// assert_eq!(a, b);
/// # Ok(())
/// # }
/// ```
pub struct Generator {
    namespace: Namespace,
    coordinator: ScalingCoordinator,
    monitor: HealthMonitor,
    counters: Arc<Counters>,
    shutdown_token: CancellationToken,
}

impl Generator {
    /// Creates a generator reading entropy from the operating system.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidNamespace`] if the namespace fails to parse. No
    ///   worker or monitor task is started in that case.
    /// - [`Error::CapacityTooLarge`] / [`Error::TooManyWorkers`] /
    ///   [`Error::InvalidConfig`] for out of range configuration.
    /// - [`Error::RuntimeUnavailable`] when called outside a Tokio runtime.
    pub fn new(config: GeneratorConfig) -> Result<Self> {
        Self::with_source(config, OsRandom)
    }

    /// Creates a generator reading entropy from `source`.
    ///
    /// # Errors
    ///
    /// See [`Generator::new`].
    pub fn with_source<S: EntropySource>(config: GeneratorConfig, source: S) -> Result<Self> {
        Self::with_shared_source(config, Arc::new(source))
    }

    /// Creates a generator reading entropy from a shared `source`.
    ///
    /// # Errors
    ///
    /// See [`Generator::new`].
    pub fn with_shared_source(
        config: GeneratorConfig,
        source: Arc<dyn EntropySource>,
    ) -> Result<Self> {
        let namespace = config.validate()?;
        let runtime = Handle::try_current().map_err(|_| Error::RuntimeUnavailable)?;

        let shutdown_token = CancellationToken::new();
        let counters = Arc::new(Counters::default());
        let context = Arc::new(WorkerContext {
            source: Arc::clone(&source),
            counters: Arc::clone(&counters),
            backoff: RetryBackoff {
                min: config.retry_backoff_min,
                max: config.retry_backoff_max,
            },
        });

        let pool = WorkerPool::new(
            context,
            runtime.clone(),
            shutdown_token.clone(),
            config.stop_timeout,
        );
        let coordinator = ScalingCoordinator::start(
            pool,
            config.buffer_capacity,
            config.workers,
            shutdown_token.clone(),
        )?;
        let monitor = HealthMonitor::new(
            source,
            Arc::clone(&counters),
            runtime,
            shutdown_token.clone(),
        );

        let generator = Self {
            namespace,
            coordinator,
            monitor,
            counters,
            shutdown_token,
        };

        if let Some(interval) = config.auto_start_interval() {
            generator.monitor.start(interval)?;
        }

        #[cfg(feature = "tracing")]
        tracing::info!(
            "Generator started: capacity {}, {} workers, namespace {}",
            config.buffer_capacity,
            config.workers,
            generator.namespace
        );

        Ok(generator)
    }

    /// Takes one random identifier from the buffer.
    ///
    /// Waits, without limit, while the buffer is empty. If production has
    /// stalled (no workers, a zero capacity, or a persistently failing entropy
    /// source) this call does not return until production resumes; use
    /// [`Self::generate_random_timeout`] or
    /// [`Self::generate_random_cancellable`] to bound the wait. Entropy
    /// failures are never reported here.
    ///
    /// Cancel-safe: dropping the future consumes no identifier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Shutdown`] once the generator has been shut down.
    pub async fn generate_random(&self) -> Result<Uuid> {
        loop {
            let buffer = self.coordinator.current_buffer();
            match buffer.pop().await {
                Ok(id) => return Ok(id),
                // The buffer was replaced: wait on its successor.
                Err(Retired) => self.ensure_running()?,
            }
        }
    }

    /// Like [`Self::generate_random`], giving up after `timeout`.
    ///
    /// # Errors
    ///
    /// - [`Error::Timeout`] if no identifier arrived in time.
    /// - [`Error::Shutdown`] once the generator has been shut down.
    pub async fn generate_random_timeout(&self, timeout: Duration) -> Result<Uuid> {
        tokio::time::timeout(timeout, self.generate_random())
            .await
            .map_err(|_| Error::Timeout(timeout))?
    }

    /// Like [`Self::generate_random`], giving up when `token` is cancelled.
    ///
    /// # Errors
    ///
    /// - [`Error::Cancelled`] if `token` was cancelled first.
    /// - [`Error::Shutdown`] once the generator has been shut down.
    pub async fn generate_random_cancellable(&self, token: &CancellationToken) -> Result<Uuid> {
        tokio::select! {
            biased;
            () = token.cancelled() => Err(Error::Cancelled),
            res = self.generate_random() => res,
        }
    }

    /// Takes one random identifier if one is buffered, without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Shutdown`] once the generator has been shut down.
    pub fn try_generate_random(&self) -> Result<Option<Uuid>> {
        loop {
            match self.coordinator.current_buffer().try_pop() {
                Ok(id) => return Ok(id),
                Err(Retired) => self.ensure_running()?,
            }
        }
    }

    /// Computes the version 5 identifier of `name` in the configured
    /// namespace.
    ///
    /// Pure and synchronous: identical names always yield identical
    /// identifiers, across calls and across generators built with the same
    /// namespace. Distinct names are not guaranteed distinct identifiers.
    pub fn generate_deterministic(&self, name: impl AsRef<[u8]>) -> Uuid {
        self.namespace.derive(name)
    }

    /// Starts `count` additional workers.
    ///
    /// # Errors
    ///
    /// - [`Error::TooManyWorkers`] if the total would exceed
    ///   [`GeneratorConfig::MAX_WORKERS`]. No worker is started.
    /// - [`Error::Shutdown`] once the generator has been shut down.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self)))]
    pub async fn increase_workers_by(&self, count: usize) -> Result<()> {
        self.coordinator.increase_workers_by(count).await
    }

    /// Stops `count` workers, or all of them if fewer are running.
    ///
    /// Workers are stopped cooperatively, including workers waiting on a full
    /// buffer, so this never waits for buffer space to free up.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Shutdown`] once the generator has been shut down.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self)))]
    pub async fn decrease_workers_by(&self, count: usize) -> Result<()> {
        self.coordinator.decrease_workers_by(count).await
    }

    /// Sets the number of workers. Equal counts are a no-op.
    ///
    /// # Errors
    ///
    /// - [`Error::TooManyWorkers`] if `count` exceeds
    ///   [`GeneratorConfig::MAX_WORKERS`].
    /// - [`Error::Shutdown`] once the generator has been shut down.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self)))]
    pub async fn set_worker_count(&self, count: usize) -> Result<()> {
        self.coordinator.set_worker_count(count).await
    }

    /// Grows the buffer capacity by `count`. See [`Self::set_buffer_size`].
    ///
    /// # Errors
    ///
    /// - [`Error::CapacityTooLarge`] if the result is too large.
    /// - [`Error::Shutdown`] once the generator has been shut down.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self)))]
    pub async fn increase_buffer_size_by(&self, count: usize) -> Result<()> {
        self.coordinator.increase_capacity_by(count).await
    }

    /// Shrinks the buffer capacity by `count`, stopping at zero. See
    /// [`Self::set_buffer_size`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Shutdown`] once the generator has been shut down.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self)))]
    pub async fn decrease_buffer_size_by(&self, count: usize) -> Result<()> {
        self.coordinator.decrease_capacity_by(count).await
    }

    /// Replaces the buffer with an empty one of `capacity`.
    ///
    /// All workers are stopped, identifiers still buffered are discarded, and
    /// the same number of workers is restarted against the new buffer. Pending
    /// [`Self::generate_random`] calls keep waiting and are served from the
    /// new buffer.
    ///
    /// # Errors
    ///
    /// - [`Error::CapacityTooLarge`] if `capacity` is too large.
    /// - [`Error::Shutdown`] once the generator has been shut down.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self)))]
    pub async fn set_buffer_size(&self, capacity: usize) -> Result<()> {
        self.coordinator.resize(capacity).await
    }

    /// Starts the health monitor, probing immediately and then every
    /// `interval`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidInterval`] if `interval` is zero.
    /// - [`Error::MonitorAlreadyStarted`] if the monitor is running.
    /// - [`Error::Shutdown`] once the generator has been shut down.
    pub fn start_health_monitor(&self, interval: Duration) -> Result<()> {
        self.ensure_running()?;
        self.monitor.start(interval)
    }

    /// Stops the health monitor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MonitorAlreadyStopped`] if the monitor is dormant.
    pub fn stop_health_monitor(&self) -> Result<()> {
        self.monitor.stop()
    }

    /// Changes the health-check interval, effective after the current sleep.
    ///
    /// # Errors
    ///
    /// - [`Error::MonitorAlreadyStopped`] if the monitor is dormant.
    /// - [`Error::InvalidInterval`] if `interval` is zero.
    pub fn set_health_check_interval(&self, interval: Duration) -> Result<()> {
        self.monitor.set_interval(interval)
    }

    /// Stops every worker and the health monitor and releases waiting
    /// consumers with [`Error::Shutdown`].
    ///
    /// Deterministic generation keeps working afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Shutdown`] if the generator was already shut down.
    pub async fn shutdown(&self) -> Result<()> {
        // Cancels the root token first so no monitor can start afterwards.
        self.coordinator.shutdown().await?;
        // Dormant is fine here.
        let _ = self.monitor.stop();
        Ok(())
    }

    pub const fn namespace(&self) -> Namespace {
        self.namespace
    }

    /// Recorded number of workers.
    pub fn worker_count(&self) -> usize {
        self.coordinator.worker_count()
    }

    /// Capacity of the current buffer.
    pub fn buffer_capacity(&self) -> usize {
        self.coordinator.capacity()
    }

    /// Identifiers currently buffered.
    pub fn buffered(&self) -> usize {
        self.coordinator.buffered()
    }

    pub fn health_status(&self) -> HealthStatus {
        self.monitor.status()
    }

    /// Interval of the running health monitor, `None` when dormant.
    pub fn health_check_interval(&self) -> Option<Duration> {
        self.monitor.interval()
    }

    pub fn stats(&self) -> Stats {
        self.counters.snapshot()
    }

    fn ensure_running(&self) -> Result<()> {
        if self.coordinator.is_shutdown() {
            return Err(Error::Shutdown);
        }
        Ok(())
    }
}

impl Drop for Generator {
    fn drop(&mut self) {
        self.shutdown_token.cancel();
    }
}

impl fmt::Debug for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Generator")
            .field("namespace", &self.namespace)
            .field("worker_count", &self.worker_count())
            .field("buffer_capacity", &self.buffer_capacity())
            .field("buffered", &self.buffered())
            .field("health_status", &self.health_status())
            .field("health_check_interval", &self.health_check_interval())
            .field("shutdown", &self.coordinator.is_shutdown())
            .finish()
    }
}
