//! Shared plumbing for the ratings operator binaries: tracing setup and
//! host environment checks.

use thiserror::Error;

pub mod env;
pub mod utils;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("command not found: {0}")]
    CommandNotFound(String),
}
