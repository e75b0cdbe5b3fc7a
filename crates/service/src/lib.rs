//! Service layer managing the lifecycle of the ratings snap.
//! - Separates lifecycle logic from the package manager behind `PackageBackend`.
//! - Ships a snap CLI backend and an in-memory backend for tests.
//! - Provides clear error types and documented interfaces.

pub mod ratings;
#[cfg(test)]
pub mod test_support;

pub use ratings::{LifecycleError, Ratings, RatingsSettings};
