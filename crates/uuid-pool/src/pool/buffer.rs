//! Bounded, retirable buffer of pre-generated identifiers.
//!
//! The buffer pairs a `VecDeque` with two semaphores: `slots` counts free
//! capacity and gates producers, `items` counts deposited identifiers and
//! gates consumers. A producer waits on `slots` when the buffer is full and a
//! consumer waits on `items` when it is empty. Both waits are cancel-safe, so
//! a worker blocked on a full buffer can be stopped at any time.
//!
//! Retiring a buffer closes both semaphores: every pending and future wait
//! resolves to [`Retired`], queued identifiers are dropped, and nothing can be
//! read from it again.

use parking_lot::Mutex;
use std::collections::VecDeque;
use tokio::sync::{Semaphore, TryAcquireError};
use uuid::Uuid;

/// The buffer was retired while (or before) waiting on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Retired;

pub(crate) struct PoolBuffer {
    queue: Mutex<VecDeque<Uuid>>,
    slots: Semaphore,
    items: Semaphore,
    capacity: usize,
}

impl PoolBuffer {
    /// Largest capacity a buffer can track.
    pub(crate) const MAX_CAPACITY: usize = Semaphore::MAX_PERMITS;

    /// Creates an empty buffer. A capacity of zero is allowed; producers then
    /// wait until the buffer is retired.
    ///
    /// Callers must validate `capacity <= MAX_CAPACITY`.
    pub(crate) fn new(capacity: usize) -> Self {
        debug_assert!(capacity <= Self::MAX_CAPACITY);
        Self {
            // Pre-allocation is capped so huge capacities stay lazy.
            queue: Mutex::new(VecDeque::with_capacity(capacity.min(4096))),
            slots: Semaphore::new(capacity),
            items: Semaphore::new(0),
            capacity,
        }
    }

    pub(crate) const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of identifiers currently queued. Never exceeds `capacity`.
    pub(crate) fn len(&self) -> usize {
        self.queue.lock().len()
    }

    #[cfg(test)]
    pub(crate) fn is_retired(&self) -> bool {
        self.items.is_closed()
    }

    /// Deposits `id`, waiting for a free slot if the buffer is full.
    ///
    /// Cancel-safe: dropping the future before it resolves deposits nothing.
    pub(crate) async fn push(&self, id: Uuid) -> Result<(), Retired> {
        let permit = self.slots.acquire().await.map_err(|_| Retired)?;
        permit.forget();
        self.queue.lock().push_back(id);
        self.items.add_permits(1);
        Ok(())
    }

    /// Removes one identifier, waiting for a producer if the buffer is empty.
    ///
    /// Cancel-safe: dropping the future before it resolves removes nothing.
    pub(crate) async fn pop(&self) -> Result<Uuid, Retired> {
        let permit = self.items.acquire().await.map_err(|_| Retired)?;
        permit.forget();
        self.take_one()
    }

    /// Removes one identifier if any is queued, without waiting.
    pub(crate) fn try_pop(&self) -> Result<Option<Uuid>, Retired> {
        match self.items.try_acquire() {
            Ok(permit) => {
                permit.forget();
                self.take_one().map(Some)
            }
            Err(TryAcquireError::NoPermits) => Ok(None),
            Err(TryAcquireError::Closed) => Err(Retired),
        }
    }

    /// Wakes every waiter with [`Retired`] and discards queued identifiers.
    /// Idempotent.
    pub(crate) fn retire(&self) {
        self.slots.close();
        self.items.close();
        self.queue.lock().clear();
    }

    // An `items` permit is only added after the matching push, so holding one
    // guarantees a queued identifier unless `retire` cleared the queue in
    // between.
    fn take_one(&self) -> Result<Uuid, Retired> {
        let id = self.queue.lock().pop_front().ok_or(Retired)?;
        self.slots.add_permits(1);
        Ok(id)
    }
}
