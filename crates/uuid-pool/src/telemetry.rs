//! Production and health counters.
//!
//! Workers and the health monitor record into a shared [`Counters`] instance.
//! Callers read a point-in-time [`Stats`] snapshot through
//! [`crate::Generator::stats`]. Counters are monotonic and use relaxed
//! ordering; a snapshot is not atomic across fields.

use portable_atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub(crate) struct Counters {
    ids_produced: AtomicU64,
    entropy_failures: AtomicU64,
    health_probes: AtomicU64,
    health_probe_failures: AtomicU64,
}

impl Counters {
    pub(crate) fn increment_ids_produced(&self) {
        self.ids_produced.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn increment_entropy_failures(&self) {
        self.entropy_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_health_probe(&self, healthy: bool) {
        self.health_probes.fetch_add(1, Ordering::Relaxed);
        if !healthy {
            self.health_probe_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn snapshot(&self) -> Stats {
        Stats {
            ids_produced: self.ids_produced.load(Ordering::Relaxed),
            entropy_failures: self.entropy_failures.load(Ordering::Relaxed),
            health_probes: self.health_probes.load(Ordering::Relaxed),
            health_probe_failures: self.health_probe_failures.load(Ordering::Relaxed),
        }
    }
}

/// A snapshot of the generator's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    /// Random identifiers deposited into a buffer.
    pub ids_produced: u64,
    /// Production cycles skipped because the entropy source failed.
    pub entropy_failures: u64,
    /// Health probes performed.
    pub health_probes: u64,
    /// Health probes that found the entropy source failing.
    pub health_probe_failures: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_increments() {
        let counters = Counters::default();
        counters.increment_ids_produced();
        counters.increment_ids_produced();
        counters.increment_entropy_failures();
        counters.record_health_probe(true);
        counters.record_health_probe(false);

        assert_eq!(
            counters.snapshot(),
            Stats {
                ids_produced: 2,
                entropy_failures: 1,
                health_probes: 2,
                health_probe_failures: 1,
            }
        );
    }
}
