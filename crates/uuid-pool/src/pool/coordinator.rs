//! Runtime scaling of the worker pool and the buffer.
//!
//! Every scaling request runs under one async mutex guarding the
//! [`WorkerPool`], so requests never interleave. The recorded worker count and
//! buffer capacity are atomics that are only written while that mutex is held
//! and are read through accessors.
//!
//! The current buffer lives behind a separate `RwLock` so consumers never
//! contend with a scaling request that is waiting on workers to stop. A buffer
//! replacement swaps the new buffer in and retires the old one under the write
//! lock: a consumer either reads the new buffer, or is woken from the old one
//! with `Retired` and re-reads the new one.

use crate::{
    Error, Result,
    pool::{buffer::PoolBuffer, manager::WorkerPool},
};
use parking_lot::RwLock;
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

pub(crate) struct ScalingCoordinator {
    pool: Mutex<WorkerPool>,
    buffer: RwLock<Arc<PoolBuffer>>,
    worker_count: AtomicUsize,
    capacity: AtomicUsize,
    shutdown_token: CancellationToken,
}

impl ScalingCoordinator {
    /// Allocates the initial buffer and starts `workers` producers.
    ///
    /// # Errors
    ///
    /// - [`Error::CapacityTooLarge`] if `capacity` exceeds
    ///   [`PoolBuffer::MAX_CAPACITY`].
    /// - [`Error::TooManyWorkers`] if `workers` exceeds
    ///   [`WorkerPool::MAX_WORKERS`].
    pub(crate) fn start(
        mut pool: WorkerPool,
        capacity: usize,
        workers: usize,
        shutdown_token: CancellationToken,
    ) -> Result<Self> {
        check_capacity(capacity)?;
        check_workers(workers)?;
        let buffer = Arc::new(PoolBuffer::new(capacity));
        pool.increase_by(workers, &buffer);

        #[cfg(feature = "tracing")]
        tracing::debug!("Started {workers} workers filling a buffer of {capacity}");

        Ok(Self {
            pool: Mutex::new(pool),
            buffer: RwLock::new(buffer),
            worker_count: AtomicUsize::new(workers),
            capacity: AtomicUsize::new(capacity),
            shutdown_token,
        })
    }

    /// The buffer consumers should currently dequeue from.
    pub(crate) fn current_buffer(&self) -> Arc<PoolBuffer> {
        Arc::clone(&self.buffer.read())
    }

    pub(crate) fn worker_count(&self) -> usize {
        self.worker_count.load(Ordering::Acquire)
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity.load(Ordering::Acquire)
    }

    /// Identifiers currently buffered.
    pub(crate) fn buffered(&self) -> usize {
        self.buffer.read().len()
    }

    pub(crate) fn is_shutdown(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }

    /// Spawns `count` more workers against the current buffer.
    ///
    /// Fails with [`Error::TooManyWorkers`], spawning nothing, if the total
    /// would exceed [`WorkerPool::MAX_WORKERS`].
    pub(crate) async fn increase_workers_by(&self, count: usize) -> Result<()> {
        let mut pool = self.lock_pool().await?;
        let target = pool.len().checked_add(count).ok_or(Error::TooManyWorkers {
            requested: usize::MAX,
            max: WorkerPool::MAX_WORKERS,
        })?;
        check_workers(target)?;
        let buffer = self.current_buffer();
        pool.increase_by(count, &buffer);
        self.worker_count.store(pool.len(), Ordering::Release);

        #[cfg(feature = "tracing")]
        tracing::debug!("Workers increased by {count} to {}", pool.len());
        Ok(())
    }

    /// Stops up to `count` workers; requests beyond the live count stop all
    /// of them.
    pub(crate) async fn decrease_workers_by(&self, count: usize) -> Result<()> {
        let mut pool = self.lock_pool().await?;
        let _stopped = pool.decrease_by(count).await;
        self.worker_count.store(pool.len(), Ordering::Release);

        #[cfg(feature = "tracing")]
        tracing::debug!("Workers decreased by {_stopped} to {}", pool.len());
        Ok(())
    }

    /// Moves the worker count to `target`. Equal counts are a no-op.
    pub(crate) async fn set_worker_count(&self, target: usize) -> Result<()> {
        check_workers(target)?;
        let mut pool = self.lock_pool().await?;
        let current = pool.len();

        match target.cmp(&current) {
            core::cmp::Ordering::Greater => {
                let buffer = self.current_buffer();
                pool.increase_by(target - current, &buffer);
            }
            core::cmp::Ordering::Less => {
                pool.decrease_by(current - target).await;
            }
            core::cmp::Ordering::Equal => return Ok(()),
        }
        self.worker_count.store(pool.len(), Ordering::Release);

        #[cfg(feature = "tracing")]
        tracing::debug!("Worker count set from {current} to {target}");
        Ok(())
    }

    /// Replaces the buffer with an empty one of `new_capacity`.
    ///
    /// Stops every worker, swaps in the new buffer while retiring the old one
    /// (its queued identifiers are discarded), then restarts the same number
    /// of workers against the new buffer. Consumers waiting on the old buffer
    /// move over to the new one and simply wait longer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapacityTooLarge`] if `new_capacity` exceeds
    /// [`PoolBuffer::MAX_CAPACITY`], leaving the pool untouched.
    pub(crate) async fn resize(&self, new_capacity: usize) -> Result<()> {
        check_capacity(new_capacity)?;
        let mut pool = self.lock_pool().await?;
        self.resize_locked(&mut pool, new_capacity).await;
        Ok(())
    }

    pub(crate) async fn increase_capacity_by(&self, count: usize) -> Result<()> {
        let mut pool = self.lock_pool().await?;
        let target = self.capacity().saturating_add(count);
        check_capacity(target)?;
        self.resize_locked(&mut pool, target).await;
        Ok(())
    }

    pub(crate) async fn decrease_capacity_by(&self, count: usize) -> Result<()> {
        let mut pool = self.lock_pool().await?;
        let target = self.capacity().saturating_sub(count);
        self.resize_locked(&mut pool, target).await;
        Ok(())
    }

    /// Stops every worker and retires the buffer. Later scaling requests fail
    /// with [`Error::Shutdown`] and consumers are woken.
    pub(crate) async fn shutdown(&self) -> Result<()> {
        let mut pool = self.lock_pool().await?;
        self.shutdown_token.cancel();
        pool.stop_all().await;
        self.worker_count.store(0, Ordering::Release);
        self.buffer.read().retire();

        #[cfg(feature = "tracing")]
        tracing::info!("Worker pool shutdown complete");
        Ok(())
    }

    async fn resize_locked(&self, pool: &mut WorkerPool, new_capacity: usize) {
        let workers = pool.len();
        pool.stop_all().await;

        let buffer = Arc::new(PoolBuffer::new(new_capacity));
        {
            let mut current = self.buffer.write();
            let retired = core::mem::replace(&mut *current, Arc::clone(&buffer));
            retired.retire();
        }
        self.capacity.store(new_capacity, Ordering::Release);
        debug_assert_eq!(buffer.capacity(), new_capacity);

        pool.increase_by(workers, &buffer);

        #[cfg(feature = "tracing")]
        tracing::debug!("Buffer resized to {new_capacity}, restarted {workers} workers");
    }

    async fn lock_pool(&self) -> Result<tokio::sync::MutexGuard<'_, WorkerPool>> {
        let pool = self.pool.lock().await;
        if self.shutdown_token.is_cancelled() {
            return Err(Error::Shutdown);
        }
        Ok(pool)
    }
}

fn check_capacity(capacity: usize) -> Result<()> {
    if capacity > PoolBuffer::MAX_CAPACITY {
        return Err(Error::CapacityTooLarge {
            requested: capacity,
            max: PoolBuffer::MAX_CAPACITY,
        });
    }
    Ok(())
}

fn check_workers(workers: usize) -> Result<()> {
    if workers > WorkerPool::MAX_WORKERS {
        return Err(Error::TooManyWorkers {
            requested: workers,
            max: WorkerPool::MAX_WORKERS,
        });
    }
    Ok(())
}
