//! Producer side of the generator: the bounded buffer, the workers that fill
//! it, and the coordinator that rescales both at runtime.
//!
//! ## Structure
//!
//! - [`buffer`] - bounded, retirable identifier queue.
//! - [`worker`] - producer task loop and its handle.
//! - [`manager`] - spawning and stopping groups of workers.
//! - [`coordinator`] - serialized scaling and buffer hand-off.

pub(crate) mod buffer;
pub(crate) mod coordinator;
pub(crate) mod manager;
pub(crate) mod worker;

pub(crate) use buffer::PoolBuffer;
pub(crate) use coordinator::ScalingCoordinator;
