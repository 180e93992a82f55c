use rand::{RngCore, TryRngCore, rng, rngs::OsRng};
use std::borrow::Cow;

/// A failed read from an [`EntropySource`].
///
/// Workers treat this as transient: the production cycle is skipped and
/// retried after a backoff. It is never returned from the public generator
/// API.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("Entropy source failure: {reason}")]
pub struct EntropyError {
    reason: Cow<'static, str>,
}

impl EntropyError {
    pub fn new(reason: impl Into<Cow<'static, str>>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// A supplier of cryptographically secure random bytes.
///
/// This abstraction lets the worker pool and the health monitor run against
/// the operating system RNG in production and against a mocked, possibly
/// failing, source in tests.
///
/// # Example
/// ```
/// use uuid_pool::{EntropyError, EntropySource};
///
/// struct Zeroes;
/// impl EntropySource for Zeroes {
///     fn try_fill(&self, dest: &mut [u8]) -> Result<(), EntropyError> {
///         dest.fill(0);
///         Ok(())
///     }
/// }
///
/// let mut buf = [1_u8; 4];
/// Zeroes.try_fill(&mut buf).unwrap();
/// assert_eq!(buf, [0; 4]);
/// ```
pub trait EntropySource: Send + Sync + 'static {
    /// Fills `dest` entirely with random bytes.
    ///
    /// # Errors
    ///
    /// Returns an [`EntropyError`] if the source could not supply the bytes.
    fn try_fill(&self, dest: &mut [u8]) -> Result<(), EntropyError>;
}

/// An [`EntropySource`] that reads directly from the operating system
/// (`getrandom` / `/dev/urandom` / `BCryptGenRandom`).
///
/// This is the default source. Reads can fail, for instance when the OS
/// entropy pool is unavailable early during boot, which makes it the only
/// built-in source the health monitor can observe degrading.
#[derive(Default, Clone, Copy, Debug)]
pub struct OsRandom;

impl EntropySource for OsRandom {
    fn try_fill(&self, dest: &mut [u8]) -> Result<(), EntropyError> {
        OsRng
            .try_fill_bytes(dest)
            .map_err(|e| EntropyError::new(e.to_string()))
    }
}

/// An [`EntropySource`] that uses the thread-local RNG (`rand::rng()`).
///
/// This RNG is fast, cryptographically secure (ChaCha-based), and periodically
/// reseeded from the OS. It never fails once seeded, so a health monitor
/// running against it always reports healthy.
///
/// The type does not store the RNG itself; each call accesses the calling
/// thread's generator, so it is safe to share across worker tasks.
#[derive(Default, Clone, Copy, Debug)]
pub struct ThreadRandom;

impl EntropySource for ThreadRandom {
    fn try_fill(&self, dest: &mut [u8]) -> Result<(), EntropyError> {
        rng().fill_bytes(dest);
        Ok(())
    }
}
