use thiserror::Error;

use super::backend::BackendError;

/// Failures of lifecycle operations; the backend cause is kept as `source`.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("install failed: {0}")]
    Install(#[source] BackendError),
    #[error("removal failed: {0}")]
    Removal(#[source] BackendError),
    #[error("start failed: {0}")]
    Start(#[source] BackendError),
    #[error("stop failed: {0}")]
    Stop(#[source] BackendError),
    #[error("writing configuration key {key} failed: {source}")]
    ConfigurationWrite {
        key: String,
        #[source]
        source: BackendError,
    },
    #[error("restart after configure failed: {0}")]
    Restart(#[source] BackendError),
    #[error("state query failed: {0}")]
    Query(#[source] BackendError),
}

impl LifecycleError {
    /// Stable numeric code for external mapping/logging
    pub fn code(&self) -> u16 {
        match self {
            LifecycleError::Install(_) => 2001,
            LifecycleError::Removal(_) => 2002,
            LifecycleError::Start(_) => 2003,
            LifecycleError::Stop(_) => 2004,
            LifecycleError::ConfigurationWrite { .. } => 2101,
            LifecycleError::Restart(_) => 2102,
            LifecycleError::Query(_) => 2200,
        }
    }
}
