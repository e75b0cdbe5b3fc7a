//! Ratings module: lifecycle management of the `ratings` snap.
//!
//! Layers mirror the rest of the crate: domain types, the backend
//! abstraction over the package manager, and the service that drives it.

pub mod backend;
pub mod domain;
pub mod errors;
pub mod service;

pub use backend::{BackendError, PackageBackend};
pub use domain::{LifecycleState, Parameter, RatingsConfiguration, RatingsSettings};
pub use errors::LifecycleError;
pub use service::Ratings;
