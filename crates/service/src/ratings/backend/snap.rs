use std::path::PathBuf;
use std::process::Output;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, instrument};

use super::{BackendError, PackageBackend};

/// Backend driving snapd through the `snap` command line.
#[derive(Debug, Clone)]
pub struct SnapBackend {
    name: String,
    channel: String,
    classic: bool,
    purge_on_remove: bool,
    snap_bin: PathBuf,
}

impl SnapBackend {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            channel: "latest/stable".to_string(),
            classic: false,
            purge_on_remove: false,
            snap_bin: PathBuf::from("snap"),
        }
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }

    pub fn classic(mut self, classic: bool) -> Self {
        self.classic = classic;
        self
    }

    pub fn purge_on_remove(mut self, purge: bool) -> Self {
        self.purge_on_remove = purge;
        self
    }

    pub fn with_snap_bin(mut self, snap_bin: impl Into<PathBuf>) -> Self {
        self.snap_bin = snap_bin.into();
        self
    }

    /// Executable snapd exposes once the package is mounted.
    pub fn install_path(&self) -> PathBuf {
        PathBuf::from("/snap").join(&self.name).join("current").join("bin").join(&self.name)
    }

    fn install_args(&self) -> Vec<String> {
        let mut args = vec![
            "install".to_string(),
            self.name.clone(),
            "--channel".to_string(),
            self.channel.clone(),
        ];
        if self.classic {
            args.push("--classic".to_string());
        }
        args
    }

    fn remove_args(&self) -> Vec<String> {
        let mut args = vec!["remove".to_string(), self.name.clone()];
        if self.purge_on_remove {
            args.push("--purge".to_string());
        }
        args
    }

    fn display(&self, args: &[String]) -> String {
        format!("{} {}", self.snap_bin.display(), args.join(" "))
    }

    /// Spawn `snap`; errors only ever describe the command as `shown`.
    async fn output(&self, args: &[String], shown: &[String]) -> Result<Output, BackendError> {
        Command::new(&self.snap_bin)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| BackendError::Spawn {
                command: self.display(shown),
                source,
            })
    }

    /// Run a command that must succeed; returns trimmed stdout.
    async fn run(&self, args: &[String], shown: &[String]) -> Result<String, BackendError> {
        debug!(command = %self.display(shown), "running snap command");
        let out = self.output(args, shown).await?;
        if !out.status.success() {
            return Err(BackendError::CommandFailed {
                command: self.display(shown),
                status: out.status.to_string(),
                stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&out.stdout).trim_end().to_string())
    }

    async fn simple(&self, verb: &str) -> Result<(), BackendError> {
        let args = [verb.to_string(), self.name.clone()];
        self.run(&args, &args).await.map(|_| ())
    }
}

/// True when any service row of `snap services` reports `active`.
pub(crate) fn services_active(output: &str) -> bool {
    let mut lines = output.lines().filter(|l| !l.trim().is_empty());
    let Some(header) = lines.next() else {
        return false;
    };
    let Some(current) = header.split_whitespace().position(|c| c == "Current") else {
        return false;
    };
    lines.any(|row| row.split_whitespace().nth(current) == Some("active"))
}

#[async_trait]
impl PackageBackend for SnapBackend {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self), fields(snap = %self.name, channel = %self.channel))]
    async fn install(&self) -> Result<(), BackendError> {
        let args = self.install_args();
        self.run(&args, &args).await.map(|_| ())
    }

    #[instrument(skip(self), fields(snap = %self.name))]
    async fn remove(&self) -> Result<(), BackendError> {
        let args = self.remove_args();
        self.run(&args, &args).await.map(|_| ())
    }

    async fn start(&self) -> Result<(), BackendError> {
        self.simple("start").await
    }

    async fn stop(&self) -> Result<(), BackendError> {
        self.simple("stop").await
    }

    async fn restart(&self) -> Result<(), BackendError> {
        self.simple("restart").await
    }

    async fn is_installed(&self) -> Result<bool, BackendError> {
        // `snap list <name>` exits non-zero when nothing matches
        let args = ["list".to_string(), self.name.clone()];
        let out = self.output(&args, &args).await?;
        Ok(out.status.success())
    }

    async fn is_running(&self) -> Result<bool, BackendError> {
        let args = ["services".to_string(), self.name.clone()];
        let out = self.output(&args, &args).await?;
        if !out.status.success() {
            return Ok(false);
        }
        Ok(services_active(&String::from_utf8_lossy(&out.stdout)))
    }

    async fn get(&self, key: &str) -> Result<String, BackendError> {
        let args = ["get".to_string(), self.name.clone(), key.to_string()];
        self.run(&args, &args).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), BackendError> {
        let args = ["set".to_string(), self.name.clone(), format!("{key}={value}")];
        // values may be secrets; only the key is ever shown
        let shown = ["set".to_string(), self.name.clone(), format!("{key}=<redacted>")];
        self.run(&args, &shown).await.map(|_| ())
    }
}
