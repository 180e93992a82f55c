//! Error types for the pooled UUID generator.
//!
//! Only control-plane failures are represented here. Failures inside the
//! producer loop (see [`crate::EntropyError`]) are absorbed by the workers and
//! never reach a caller.
//!
//! ## Error Cases
//! - `InvalidNamespace`: the namespace string could not be parsed.
//! - `InvalidInterval`: a zero health-check interval was supplied.
//! - `MonitorAlreadyStarted` / `MonitorAlreadyStopped`: the health monitor was
//!   driven from the wrong state.
//! - `CapacityTooLarge`: a buffer capacity exceeds what the buffer can track.
//! - `TooManyWorkers`: a worker count exceeds the pool's limit.
//! - `InvalidConfig`: a configuration value is out of range.
//! - `RuntimeUnavailable`: construction happened outside a Tokio runtime.
//! - `Timeout` / `Cancelled`: a bounded dequeue gave up.
//! - `Shutdown`: the generator has been shut down.

use core::time::Duration;

pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Unified error type for the pooled UUID generator.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The namespace string failed to parse at construction.
    #[error("Invalid namespace `{namespace}`: {reason}")]
    InvalidNamespace { namespace: String, reason: String },

    /// A health-check interval of zero was supplied.
    #[error("Invalid health check interval: must be greater than zero")]
    InvalidInterval,

    /// The health monitor is already running.
    #[error("Health monitor already started")]
    MonitorAlreadyStarted,

    /// The health monitor is not running.
    #[error("Health monitor already stopped")]
    MonitorAlreadyStopped,

    /// The requested buffer capacity cannot be represented.
    #[error("Buffer capacity {requested} exceeds maximum ({max})")]
    CapacityTooLarge { requested: usize, max: usize },

    /// The requested worker count exceeds the pool's limit.
    #[error("Worker count {requested} exceeds maximum ({max})")]
    TooManyWorkers { requested: usize, max: usize },

    /// A configuration value is out of range.
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// The generator was constructed outside of a Tokio runtime.
    #[error("No Tokio runtime available to spawn workers on")]
    RuntimeUnavailable,

    /// A bounded dequeue did not receive an identifier in time.
    #[error("Timed out after {0:?} waiting for a buffered identifier")]
    Timeout(Duration),

    /// A cancellable dequeue was cancelled by the caller.
    #[error("Request cancelled by caller")]
    Cancelled,

    /// The generator has been shut down.
    #[error("Generator is shut down")]
    Shutdown,
}
