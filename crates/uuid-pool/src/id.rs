//! Identifier construction.
//!
//! The byte-level layout of both identifier kinds is delegated to the `uuid`
//! crate: random identifiers are tagged with [`uuid::Builder::from_random_bytes`]
//! and deterministic ones are computed with [`Uuid::new_v5`]. This module only
//! wires those capabilities to an [`EntropySource`] and a parsed namespace.

use crate::{EntropyError, EntropySource, Error, Result};
use uuid::{Builder, Uuid};

/// Number of random bytes consumed per identifier.
pub const UUID_SIZE: usize = 16;

/// Produces one version 4 UUID from `source`.
///
/// # Errors
///
/// Returns the source's [`EntropyError`] if it could not supply
/// [`UUID_SIZE`] bytes.
pub fn random_uuid<S: EntropySource + ?Sized>(source: &S) -> Result<Uuid, EntropyError> {
    let mut bytes = [0_u8; UUID_SIZE];
    source.try_fill(&mut bytes)?;
    Ok(Builder::from_random_bytes(bytes).into_uuid())
}

/// The seed scoping deterministic (version 5) generation.
///
/// A namespace is parsed once and never changes afterwards. The nil UUID is
/// used when no namespace is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Namespace(Uuid);

impl Namespace {
    /// Parses a namespace string.
    ///
    /// Accepts any textual UUID form understood by [`Uuid::parse_str`]
    /// (hyphenated, simple, braced or `urn:uuid:`), or one of the RFC 4122
    /// well-known names `dns`, `url`, `oid`, `x500` (case-insensitive). An
    /// empty string yields the nil namespace.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidNamespace`] if the string is neither.
    ///
    /// # Example
    /// ```
    /// use uuid_pool::Namespace;
    ///
    /// let dns = Namespace::parse("6ba7b810-9dad-11d1-80b4-00c04fd430c8").unwrap();
    /// assert_eq!(dns, Namespace::parse("dns").unwrap());
    /// assert!(Namespace::parse("").unwrap().is_nil());
    /// assert!(Namespace::parse("not-a-uuid").is_err());
    /// ```
    pub fn parse(namespace: &str) -> Result<Self> {
        let trimmed = namespace.trim();
        if trimmed.is_empty() {
            return Ok(Self(Uuid::nil()));
        }

        let well_known = match trimmed.to_ascii_lowercase().as_str() {
            "dns" => Some(Uuid::NAMESPACE_DNS),
            "url" => Some(Uuid::NAMESPACE_URL),
            "oid" => Some(Uuid::NAMESPACE_OID),
            "x500" => Some(Uuid::NAMESPACE_X500),
            _ => None,
        };
        if let Some(uuid) = well_known {
            return Ok(Self(uuid));
        }

        Uuid::parse_str(trimmed)
            .map(Self)
            .map_err(|e| Error::InvalidNamespace {
                namespace: namespace.to_string(),
                reason: e.to_string(),
            })
    }

    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    pub const fn is_nil(&self) -> bool {
        self.0.is_nil()
    }

    /// Computes the version 5 UUID for `name` within this namespace.
    ///
    /// Identical `(namespace, name)` pairs always produce identical output.
    /// Distinct names are not guaranteed to produce distinct identifiers;
    /// keeping names unique is up to the caller.
    pub fn derive(&self, name: impl AsRef<[u8]>) -> Uuid {
        Uuid::new_v5(&self.0, name.as_ref())
    }
}

impl From<Uuid> for Namespace {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl core::str::FromStr for Namespace {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl core::fmt::Display for Namespace {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}
