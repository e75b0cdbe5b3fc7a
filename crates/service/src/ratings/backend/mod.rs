use async_trait::async_trait;
use thiserror::Error;

pub mod memory;
pub mod snap;

pub use memory::InMemoryBackend;
pub use snap::SnapBackend;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("`{command}` exited with {status}: {stderr}")]
    CommandFailed { command: String, status: String, stderr: String },
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("snap {0} is not installed")]
    Unavailable(String),
    #[error("unknown configuration key: {0}")]
    UnknownKey(String),
    #[error("rejected: {0}")]
    Rejected(String),
    #[error("install marker {path}: {source}")]
    Marker {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Package manager primitives the lifecycle service is built on.
///
/// Implementations own the persistence of the configuration store; callers
/// never see a missing key for a setting the package ships a default for.
#[async_trait]
pub trait PackageBackend: Send + Sync {
    /// Name of the package being managed.
    fn name(&self) -> &str;

    async fn install(&self) -> Result<(), BackendError>;
    async fn remove(&self) -> Result<(), BackendError>;
    async fn start(&self) -> Result<(), BackendError>;
    async fn stop(&self) -> Result<(), BackendError>;
    async fn restart(&self) -> Result<(), BackendError>;

    async fn is_installed(&self) -> Result<bool, BackendError>;
    async fn is_running(&self) -> Result<bool, BackendError>;

    async fn get(&self, key: &str) -> Result<String, BackendError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), BackendError>;
}
