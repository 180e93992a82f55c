//! Worker pool bookkeeping.
//!
//! [`WorkerPool`] owns the [`WorkerHandle`]s of every running producer. It
//! spawns workers against a given buffer and stops them through their
//! individual cancellation tokens, so stopping a worker never waits on that
//! worker being ready to receive a message.
//!
//! The pool itself is not synchronized; [`super::ScalingCoordinator`] keeps it
//! behind an async mutex so that scaling requests are applied one at a time.

use crate::pool::{
    buffer::PoolBuffer,
    worker::{WorkerContext, WorkerHandle},
};
use core::time::Duration;
use futures::future::join_all;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

pub(crate) struct WorkerPool {
    workers: Vec<WorkerHandle>,
    next_worker_id: usize,
    context: Arc<WorkerContext>,
    runtime: Handle,
    shutdown_token: CancellationToken,
    stop_timeout: Duration,
}

impl WorkerPool {
    /// Largest number of workers a pool runs at once.
    pub(crate) const MAX_WORKERS: usize = 1 << 16;

    /// Creates an empty pool. Workers are spawned on `runtime` with tokens
    /// derived from `shutdown_token`.
    pub(crate) const fn new(
        context: Arc<WorkerContext>,
        runtime: Handle,
        shutdown_token: CancellationToken,
        stop_timeout: Duration,
    ) -> Self {
        Self {
            workers: Vec::new(),
            next_worker_id: 0,
            context,
            runtime,
            shutdown_token,
            stop_timeout,
        }
    }

    /// Number of live worker handles.
    pub(crate) fn len(&self) -> usize {
        self.workers.len()
    }

    /// Spawns `count` additional workers filling `buffer`. Existing workers
    /// are left untouched.
    ///
    /// Callers must keep `len() + count <= MAX_WORKERS`.
    pub(crate) fn increase_by(&mut self, count: usize, buffer: &Arc<PoolBuffer>) {
        debug_assert!(self.workers.len().saturating_add(count) <= Self::MAX_WORKERS);
        self.workers.reserve(count);
        for _ in 0..count {
            let id = self.next_worker_id;
            self.next_worker_id = self.next_worker_id.wrapping_add(1);
            self.workers.push(WorkerHandle::spawn(
                &self.runtime,
                id,
                Arc::clone(buffer),
                Arc::clone(&self.context),
                self.shutdown_token.child_token(),
            ));
        }
    }

    /// Stops `min(count, len)` workers and waits for them to exit.
    ///
    /// All selected workers are cancelled before any join is awaited, so the
    /// total wait is bounded by one `stop_timeout`, not one per worker.
    /// Returns the number of workers removed.
    pub(crate) async fn decrease_by(&mut self, count: usize) -> usize {
        let count = count.min(self.workers.len());
        if count == 0 {
            return 0;
        }

        let stopping = self.workers.split_off(self.workers.len() - count);
        for worker in &stopping {
            #[cfg(feature = "tracing")]
            tracing::trace!("Cancelling worker {}", worker.id());
            worker.cancel();
        }

        let stop_timeout = self.stop_timeout;
        let joined = join_all(stopping.into_iter().map(|w| w.join(stop_timeout))).await;
        let _forced = joined.iter().filter(|clean| !**clean).count();

        #[cfg(feature = "tracing")]
        {
            if _forced > 0 {
                tracing::warn!("{_forced} of {count} workers had to be aborted");
            }
        }

        count
    }

    /// Stops every worker. Returns the number of workers removed.
    pub(crate) async fn stop_all(&mut self) -> usize {
        let len = self.workers.len();
        self.decrease_by(len).await
    }

    #[cfg(test)]
    pub(crate) fn context(&self) -> &Arc<WorkerContext> {
        &self.context
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ThreadRandom, pool::worker::RetryBackoff, telemetry::Counters};

    fn pool() -> WorkerPool {
        let context = Arc::new(WorkerContext {
            source: Arc::new(ThreadRandom),
            counters: Arc::new(Counters::default()),
            backoff: RetryBackoff {
                min: Duration::from_millis(1),
                max: Duration::from_millis(8),
            },
        });
        WorkerPool::new(
            context,
            Handle::current(),
            CancellationToken::new(),
            Duration::from_secs(1),
        )
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn increase_then_decrease_leaves_no_tasks() {
        let buffer = Arc::new(PoolBuffer::new(4));
        let mut pool = pool();

        pool.increase_by(3, &buffer);
        assert_eq!(pool.len(), 3);
        // One reference held by the pool, one per running worker task.
        assert_eq!(Arc::strong_count(pool.context()), 4);

        pool.increase_by(5, &buffer);
        assert_eq!(pool.len(), 8);

        assert_eq!(pool.decrease_by(5).await, 5);
        assert_eq!(pool.len(), 3);
        assert_eq!(Arc::strong_count(pool.context()), 4);

        assert_eq!(pool.stop_all().await, 3);
        assert_eq!(pool.len(), 0);
        assert_eq!(Arc::strong_count(pool.context()), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn decrease_saturates_at_live_workers() {
        let buffer = Arc::new(PoolBuffer::new(1));
        let mut pool = pool();
        pool.increase_by(2, &buffer);

        assert_eq!(pool.decrease_by(10).await, 2);
        assert_eq!(pool.len(), 0);
        assert_eq!(pool.decrease_by(1).await, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn decrease_does_not_stall_on_full_buffer() {
        let buffer = Arc::new(PoolBuffer::new(2));
        let mut pool = pool();
        pool.increase_by(6, &buffer);

        // Every worker ends up blocked on the full buffer.
        tokio::time::timeout(Duration::from_secs(5), async {
            while buffer.len() < 2 {
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await
        .unwrap();

        let stopped = tokio::time::timeout(Duration::from_millis(500), pool.decrease_by(6))
            .await
            .expect("stopping workers blocked on a full buffer must not stall");
        assert_eq!(stopped, 6);
        assert_eq!(buffer.len(), 2);
    }
}
