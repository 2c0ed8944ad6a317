use std::future::Future;
use std::pin::Pin;

use super::identity::split_identity;
use crate::error::Result;

/// Trait for a single migration unit.
///
/// A unit belongs to a subject and carries a version ordering it within that
/// subject. Versions are compared as opaque strings under lexicographic
/// byte-wise ordering, both for batch ordering and for deciding whether a
/// unit is pending; use order-preserving representations such as zero-padded
/// dates or fixed-width counters (`"10"` sorts before `"2"`).
///
/// The accessors return `Result` because identities may be derived (see
/// [`NamedMigration`]) and the derivation can fail; explicit implementations
/// simply return `Ok`.
pub trait Migration: Send + Sync {
    /// Logical grouping key; migrations sharing a subject form one ordered
    /// sequence tracked independently of other subjects.
    fn subject(&self) -> Result<String>;

    /// Position within the subject's sequence.
    fn version(&self) -> Result<String>;

    /// Perform the schema or data change against the unit's target
    /// connection.
    fn apply(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Migrations that derive subject and version from a declared identity such
/// as `"billing_20240101"`.
///
/// Implementors provide `identity()` (conventionally the implementing type's
/// name) and `apply()`; `subject()` and `version()` come from splitting the
/// identity at its last `_`.
pub trait NamedMigration: Send + Sync {
    /// The declared identity.
    fn identity(&self) -> &str;

    /// Perform the schema or data change.
    fn apply(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

impl<T: NamedMigration> Migration for T {
    fn subject(&self) -> Result<String> {
        Ok(split_identity(self.identity())?.subject)
    }

    fn version(&self) -> Result<String> {
        Ok(split_identity(self.identity())?.version)
    }

    fn apply(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        NamedMigration::apply(self)
    }
}
