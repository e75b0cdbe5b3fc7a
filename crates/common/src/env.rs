//! Environment/runtime helpers
//!
//! Sanity checks run before the operator talks to the package manager.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::CoreError;

/// Resolve the package manager executable, searching `PATH` for bare names.
///
/// Paths containing a separator are checked as-is.
pub async fn ensure_env(command: &str) -> Result<PathBuf, CoreError> {
    if command.trim().is_empty() {
        return Err(CoreError::CommandNotFound(command.to_string()));
    }

    if command.contains(std::path::MAIN_SEPARATOR) {
        let path = PathBuf::from(command);
        return if is_file(&path).await {
            Ok(path)
        } else {
            Err(CoreError::CommandNotFound(command.to_string()))
        };
    }

    let search = std::env::var_os("PATH").unwrap_or_default();
    for dir in std::env::split_paths(&search) {
        let candidate = dir.join(command);
        if is_file(&candidate).await {
            debug!(command, path = %candidate.display(), "resolved command");
            return Ok(candidate);
        }
    }

    warn!(command, "command not found on PATH");
    Err(CoreError::CommandNotFound(command.to_string()))
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path).await.map(|m| m.is_file()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_explicit_path() -> Result<(), anyhow::Error> {
        let tmp = std::env::temp_dir().join(format!("ensure_env_{}", uuid::Uuid::new_v4()));
        tokio::fs::write(&tmp, b"#!/bin/sh\n").await?;

        let resolved = ensure_env(tmp.to_str().unwrap()).await?;
        assert_eq!(resolved, tmp);

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn missing_command_is_reported() {
        let name = format!("definitely-not-installed-{}", uuid::Uuid::new_v4());
        let err = ensure_env(&name).await.unwrap_err();
        assert!(matches!(err, CoreError::CommandNotFound(n) if n == name));
    }

    #[tokio::test]
    async fn empty_command_is_rejected() {
        assert!(ensure_env("  ").await.is_err());
    }
}
