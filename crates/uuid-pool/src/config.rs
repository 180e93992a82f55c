use crate::{
    Error, Namespace, Result,
    pool::{PoolBuffer, manager::WorkerPool},
};
use core::time::Duration;
use uuid::Uuid;

/// Namespace setting as supplied by the caller, parsed at construction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NamespaceConfig {
    /// No namespace: deterministic generation uses the nil UUID.
    #[default]
    None,
    /// A namespace string, parsed with [`Namespace::parse`].
    Text(String),
    /// An already-parsed namespace.
    Uuid(Uuid),
}

/// Construction parameters for a [`crate::Generator`].
///
/// Defaults are tuned for a single process serving moderate demand: a buffer
/// of 1024 identifiers, one worker, no health monitoring.
///
/// # Example
/// ```
/// use core::time::Duration;
/// use uuid_pool::GeneratorConfig;
///
/// let config = GeneratorConfig::default()
///     .with_namespace("6ba7b810-9dad-11d1-80b4-00c04fd430c8")
///     .with_buffer_capacity(256)
///     .with_workers(4)
///     .with_health_check_interval(Duration::from_secs(30));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Seed for deterministic generation.
    pub namespace: NamespaceConfig,

    /// Initial capacity of the buffer.
    ///
    /// Zero is accepted: workers then wait until the capacity is raised and
    /// random generation blocks in the meantime.
    pub buffer_capacity: usize,

    /// Initial number of producer workers. Zero is accepted.
    pub workers: usize,

    /// Health monitor interval. `None` or zero leaves the monitor dormant
    /// until started explicitly.
    pub health_check_interval: Option<Duration>,

    /// How long a scaling request waits for a cancelled worker to exit before
    /// aborting it.
    pub stop_timeout: Duration,

    /// First backoff after an entropy failure.
    pub retry_backoff_min: Duration,

    /// Upper bound of the backoff after consecutive entropy failures.
    pub retry_backoff_max: Duration,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            namespace: NamespaceConfig::None,
            buffer_capacity: Self::DEFAULT_BUFFER_CAPACITY,
            workers: Self::DEFAULT_WORKERS,
            health_check_interval: None,
            stop_timeout: Duration::from_secs(3),
            retry_backoff_min: Duration::from_millis(1),
            retry_backoff_max: Duration::from_millis(250),
        }
    }
}

impl GeneratorConfig {
    pub const DEFAULT_BUFFER_CAPACITY: usize = 1024;
    pub const DEFAULT_WORKERS: usize = 1;
    /// Largest worker count accepted at construction or when scaling.
    pub const MAX_WORKERS: usize = WorkerPool::MAX_WORKERS;

    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = NamespaceConfig::Text(namespace.into());
        self
    }

    #[must_use]
    pub fn with_namespace_uuid(mut self, namespace: Uuid) -> Self {
        self.namespace = NamespaceConfig::Uuid(namespace);
        self
    }

    #[must_use]
    pub const fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    #[must_use]
    pub const fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    #[must_use]
    pub const fn with_health_check_interval(mut self, interval: Duration) -> Self {
        self.health_check_interval = Some(interval);
        self
    }

    #[must_use]
    pub const fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_retry_backoff(mut self, min: Duration, max: Duration) -> Self {
        self.retry_backoff_min = min;
        self.retry_backoff_max = max;
        self
    }

    /// Parses the configured namespace.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidNamespace`] if a namespace string fails to
    /// parse.
    pub fn namespace(&self) -> Result<Namespace> {
        match &self.namespace {
            NamespaceConfig::None => Ok(Namespace::default()),
            NamespaceConfig::Text(text) => Namespace::parse(text),
            NamespaceConfig::Uuid(uuid) => Ok(Namespace::from(*uuid)),
        }
    }

    /// The health-check interval to auto-start with, if any.
    pub fn auto_start_interval(&self) -> Option<Duration> {
        self.health_check_interval.filter(|interval| !interval.is_zero())
    }

    /// Checks every field and returns the parsed namespace.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidNamespace`] for an unparsable namespace.
    /// - [`Error::CapacityTooLarge`] for a capacity the buffer cannot track.
    /// - [`Error::TooManyWorkers`] for more than [`Self::MAX_WORKERS`] workers.
    /// - [`Error::InvalidConfig`] for a zero stop timeout or inconsistent
    ///   backoff bounds.
    pub fn validate(&self) -> Result<Namespace> {
        let namespace = self.namespace()?;

        if self.buffer_capacity > PoolBuffer::MAX_CAPACITY {
            return Err(Error::CapacityTooLarge {
                requested: self.buffer_capacity,
                max: PoolBuffer::MAX_CAPACITY,
            });
        }

        if self.workers > Self::MAX_WORKERS {
            return Err(Error::TooManyWorkers {
                requested: self.workers,
                max: Self::MAX_WORKERS,
            });
        }

        if self.stop_timeout.is_zero() {
            return Err(Error::InvalidConfig {
                reason: "stop timeout must be greater than zero".to_string(),
            });
        }

        if self.retry_backoff_min.is_zero() {
            return Err(Error::InvalidConfig {
                reason: "retry backoff minimum must be greater than zero".to_string(),
            });
        }

        if self.retry_backoff_min > self.retry_backoff_max {
            return Err(Error::InvalidConfig {
                reason: format!(
                    "retry backoff minimum ({:?}) exceeds maximum ({:?})",
                    self.retry_backoff_min, self.retry_backoff_max
                ),
            });
        }

        Ok(namespace)
    }
}
