//! In-memory package backend reproducing the snap's observable behavior:
//! default configuration on install, explicit state transitions, and an
//! optional executable marker on disk. Call counts and injected failures
//! make it usable as a test double.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{BackendError, PackageBackend};
use crate::ratings::domain::Parameter;

/// Number of times each mutating primitive was invoked.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CallCounts {
    pub install: usize,
    pub remove: usize,
    pub start: usize,
    pub stop: usize,
    pub restart: usize,
    pub set: usize,
}

#[derive(Default)]
struct Failures {
    install: bool,
    remove: bool,
    restart: bool,
    set_keys: HashSet<String>,
}

#[derive(Default)]
struct State {
    installed: bool,
    running: bool,
    config: HashMap<String, String>,
    calls: CallCounts,
    failures: Failures,
}

pub struct InMemoryBackend {
    name: String,
    install_root: Option<PathBuf>,
    state: Mutex<State>,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new("ratings")
    }
}

impl InMemoryBackend {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            install_root: None,
            state: Mutex::new(State::default()),
        }
    }

    /// Materialize `<root>/<name>/current/bin/<name>` on install.
    pub fn with_install_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.install_root = Some(root.into());
        self
    }

    pub fn install_path(&self) -> Option<PathBuf> {
        self.install_root
            .as_ref()
            .map(|root| root.join(&self.name).join("current").join("bin").join(&self.name))
    }

    pub fn calls(&self) -> CallCounts {
        self.lock().calls
    }

    pub fn fail_install(&self, fail: bool) {
        self.lock().failures.install = fail;
    }

    pub fn fail_remove(&self, fail: bool) {
        self.lock().failures.remove = fail;
    }

    pub fn fail_restart(&self, fail: bool) {
        self.lock().failures.restart = fail;
    }

    /// Reject every subsequent write of `key`.
    pub fn fail_set_for(&self, key: impl Into<String>) {
        self.lock().failures.set_keys.insert(key.into());
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn require_installed(&self, state: &State) -> Result<(), BackendError> {
        if state.installed {
            Ok(())
        } else {
            Err(BackendError::Unavailable(self.name.clone()))
        }
    }

    async fn write_marker(&self) -> Result<(), BackendError> {
        let Some(path) = self.install_path() else {
            return Ok(());
        };
        let io_err = |source: std::io::Error| BackendError::Marker {
            path: path.display().to_string(),
            source,
        };
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        tokio::fs::write(&path, b"#!/bin/sh\n").await.map_err(io_err)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
                .await
                .map_err(io_err)?;
        }
        Ok(())
    }

    async fn delete_marker(&self) -> Result<(), BackendError> {
        let Some(root) = &self.install_root else {
            return Ok(());
        };
        let dir = root.join(&self.name);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => {
                warn!(
                    snap = %self.name,
                    path = %dir.display(),
                    error = %source,
                    "cannot delete install marker"
                );
                Err(BackendError::Marker { path: dir.display().to_string(), source })
            }
        }
    }
}

#[async_trait]
impl PackageBackend for InMemoryBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn install(&self) -> Result<(), BackendError> {
        {
            let mut state = self.lock();
            state.calls.install += 1;
            if state.failures.install {
                return Err(BackendError::Rejected(format!("snap \"{}\" not found", self.name)));
            }
            if state.installed {
                return Ok(());
            }
            state.installed = true;
            state.running = false;
            state.config = Parameter::ALL
                .into_iter()
                .map(|p| (p.key().to_string(), p.default_value().to_string()))
                .collect();
        }
        self.write_marker().await?;
        debug!(snap = %self.name, "installed");
        Ok(())
    }

    async fn remove(&self) -> Result<(), BackendError> {
        {
            let mut state = self.lock();
            state.calls.remove += 1;
            if state.failures.remove {
                return Err(BackendError::Rejected(format!("cannot remove \"{}\"", self.name)));
            }
        }
        // a marker that cannot be deleted leaves the package installed
        self.delete_marker().await?;
        {
            let mut state = self.lock();
            state.installed = false;
            state.running = false;
            state.config.clear();
        }
        debug!(snap = %self.name, "removed");
        Ok(())
    }

    async fn start(&self) -> Result<(), BackendError> {
        let mut state = self.lock();
        state.calls.start += 1;
        self.require_installed(&state)?;
        state.running = true;
        Ok(())
    }

    async fn stop(&self) -> Result<(), BackendError> {
        let mut state = self.lock();
        state.calls.stop += 1;
        self.require_installed(&state)?;
        state.running = false;
        Ok(())
    }

    async fn restart(&self) -> Result<(), BackendError> {
        let mut state = self.lock();
        state.calls.restart += 1;
        self.require_installed(&state)?;
        if state.failures.restart {
            return Err(BackendError::Rejected(format!("cannot restart \"{}\"", self.name)));
        }
        state.running = true;
        Ok(())
    }

    async fn is_installed(&self) -> Result<bool, BackendError> {
        Ok(self.lock().installed)
    }

    async fn is_running(&self) -> Result<bool, BackendError> {
        let state = self.lock();
        Ok(state.installed && state.running)
    }

    async fn get(&self, key: &str) -> Result<String, BackendError> {
        let state = self.lock();
        self.require_installed(&state)?;
        state
            .config
            .get(key)
            .cloned()
            .ok_or_else(|| BackendError::UnknownKey(key.to_string()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), BackendError> {
        let mut state = self.lock();
        state.calls.set += 1;
        self.require_installed(&state)?;
        if state.failures.set_keys.contains(key) {
            return Err(BackendError::Rejected(format!("cannot set \"{key}\"")));
        }
        state.config.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
