//! # uuid-pool
//!
//! A pooled UUID generator for services that need identifiers at a steady
//! rate without paying for entropy reads on the request path.
//!
//! - **Random (v4)**: a pool of background Tokio workers keeps a bounded
//!   buffer filled; [`Generator::generate_random`] dequeues one identifier.
//! - **Deterministic (v5)**: [`Generator::generate_deterministic`] hashes a
//!   name within the namespace fixed at construction.
//! - **Scaling**: worker count and buffer capacity can be changed at runtime.
//!   Scaling down never waits on workers blocked on a full buffer.
//! - **Health monitoring**: an optional periodic probe of the entropy source,
//!   reported as a [`HealthStatus`].
//!
//! Entropy failures inside the producer loop are retried with backoff and
//! counted in [`Stats`]; they never fail a caller.
//!
//! ## Example
//! ```
//! use core::time::Duration;
//! use uuid_pool::{Error, Generator, GeneratorConfig};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> uuid_pool::Result<()> {
//! let generator = Generator::new(GeneratorConfig::default().with_buffer_capacity(16))?;
//!
//! let id = generator.generate_random_timeout(Duration::from_secs(1)).await?;
//! assert_eq!(id.get_version_num(), 4);
//!
//! generator.set_worker_count(4).await?;
//! generator.set_buffer_size(128).await?;
//! assert_eq!(generator.buffer_capacity(), 128);
//!
//! generator.shutdown().await?;
//! assert_eq!(generator.generate_random().await, Err(Error::Shutdown));
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - `tracing`: emit worker, scaling and health events through the `tracing`
//!   crate.

mod config;
mod entropy;
mod error;
mod generator;
mod health;
mod id;
mod pool;
mod telemetry;

pub use crate::config::*;
pub use crate::entropy::*;
pub use crate::error::*;
pub use crate::generator::*;
pub use crate::health::HealthStatus;
pub use crate::id::*;
pub use crate::telemetry::Stats;
pub use tokio_util::sync::CancellationToken;
pub use uuid;
