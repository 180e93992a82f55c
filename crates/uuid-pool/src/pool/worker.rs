use crate::{
    EntropySource,
    id::random_uuid,
    pool::buffer::{PoolBuffer, Retired},
    telemetry::Counters,
};
use core::time::Duration;
use std::sync::Arc;
use tokio::{runtime::Handle, task::JoinHandle, time::sleep};
use tokio_util::sync::CancellationToken;

/// State shared by every worker of a pool, independent of the buffer they
/// currently fill.
pub(crate) struct WorkerContext {
    pub(crate) source: Arc<dyn EntropySource>,
    pub(crate) counters: Arc<Counters>,
    pub(crate) backoff: RetryBackoff,
}

/// Exponential backoff applied after consecutive entropy failures.
///
/// The first failure waits `min`; each further consecutive failure doubles the
/// delay, capped at `max`. A successful production cycle resets the streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RetryBackoff {
    pub(crate) min: Duration,
    pub(crate) max: Duration,
}

impl RetryBackoff {
    pub(crate) fn delay(&self, consecutive_failures: u32) -> Duration {
        let shift = consecutive_failures.saturating_sub(1).min(31);
        self.min.saturating_mul(1_u32 << shift).min(self.max)
    }
}

/// Outcome of one production cycle.
enum Cycle {
    Deposited,
    EntropyFailure(crate::EntropyError),
    Retired,
}

/// Worker task that keeps `buffer` topped up with random identifiers.
///
/// Each iteration races the worker's cancellation token against one
/// production cycle: generate an identifier from the shared entropy source,
/// then deposit it, waiting while the buffer is full. Cancellation is observed
/// even while the deposit is pending; the in-flight identifier is discarded.
///
/// Entropy failures are absorbed here. They are counted, logged and followed
/// by a [`RetryBackoff`] sleep before the next attempt.
///
/// The loop ends when the token is cancelled or the buffer is retired.
pub(crate) async fn worker_loop(
    worker_id: usize,
    buffer: Arc<PoolBuffer>,
    context: Arc<WorkerContext>,
    token: CancellationToken,
) {
    #[cfg(feature = "tracing")]
    tracing::trace!("Worker {worker_id} started");
    #[cfg(not(feature = "tracing"))]
    let _ = worker_id;

    let mut consecutive_failures: u32 = 0;

    loop {
        let cycle = tokio::select! {
            biased;
            () = token.cancelled() => break,
            cycle = produce_one(&buffer, &context) => cycle,
        };

        match cycle {
            Cycle::Deposited => {
                if consecutive_failures > 0 {
                    #[cfg(feature = "tracing")]
                    tracing::info!(
                        "Worker {worker_id} recovered after {consecutive_failures} entropy failures"
                    );
                    consecutive_failures = 0;
                }
            }
            Cycle::EntropyFailure(_e) => {
                consecutive_failures = consecutive_failures.saturating_add(1);
                context.counters.increment_entropy_failures();
                let delay = context.backoff.delay(consecutive_failures);

                #[cfg(feature = "tracing")]
                {
                    if consecutive_failures == 1 {
                        tracing::warn!("Worker {worker_id} skipped a cycle: {_e}");
                    } else {
                        tracing::debug!(
                            "Worker {worker_id} entropy failure #{consecutive_failures}, backing off {delay:?}: {_e}"
                        );
                    }
                }

                tokio::select! {
                    biased;
                    () = token.cancelled() => break,
                    () = sleep(delay) => {}
                }
            }
            Cycle::Retired => {
                #[cfg(feature = "tracing")]
                tracing::debug!("Worker {worker_id} observed a retired buffer");
                break;
            }
        }
    }

    #[cfg(feature = "tracing")]
    tracing::trace!("Worker {worker_id} stopped");
}

async fn produce_one(buffer: &PoolBuffer, context: &WorkerContext) -> Cycle {
    let id = match random_uuid(context.source.as_ref()) {
        Ok(id) => id,
        Err(e) => return Cycle::EntropyFailure(e),
    };

    match buffer.push(id).await {
        Ok(()) => {
            context.counters.increment_ids_produced();
            Cycle::Deposited
        }
        Err(Retired) => Cycle::Retired,
    }
}

/// A running producer: its cancellation token and join handle.
pub(crate) struct WorkerHandle {
    #[cfg_attr(not(feature = "tracing"), allow(dead_code))]
    id: usize,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl WorkerHandle {
    /// Spawns [`worker_loop`] on `runtime`. `token` should be a child of the
    /// pool's shutdown token so that dropping the generator stops the worker.
    pub(crate) fn spawn(
        runtime: &Handle,
        id: usize,
        buffer: Arc<PoolBuffer>,
        context: Arc<WorkerContext>,
        token: CancellationToken,
    ) -> Self {
        let handle = runtime.spawn(worker_loop(id, buffer, context, token.clone()));
        Self { id, token, handle }
    }

    #[cfg_attr(not(feature = "tracing"), allow(dead_code))]
    pub(crate) const fn id(&self) -> usize {
        self.id
    }

    /// Requests a cooperative stop. Never blocks.
    pub(crate) fn cancel(&self) {
        self.token.cancel();
    }

    /// Waits up to `timeout` for the worker to exit after [`Self::cancel`].
    ///
    /// A worker that does not exit in time is aborted. Returns `true` if it
    /// exited on its own.
    pub(crate) async fn join(self, timeout: Duration) -> bool {
        let abort = self.handle.abort_handle();
        match tokio::time::timeout(timeout, self.handle).await {
            Ok(Ok(())) => true,
            Ok(Err(_e)) => {
                #[cfg(feature = "tracing")]
                tracing::error!("Worker {} terminated abnormally: {_e}", self.id);
                true
            }
            Err(_) => {
                #[cfg(feature = "tracing")]
                tracing::warn!("Worker {} did not stop within {timeout:?}, aborting", self.id);
                abort.abort();
                false
            }
        }
    }
}
