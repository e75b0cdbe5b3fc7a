use std::sync::Arc;

use tracing::{debug, info, instrument};

use super::backend::PackageBackend;
use super::domain::{LifecycleState, Parameter, RatingsConfiguration, RatingsSettings};
use super::errors::LifecycleError;

/// Lifecycle wrapper around the ratings snap.
///
/// Every operation is a sequence of awaited backend calls; the service keeps
/// no state of its own beyond the backend handle, so the backend stays the
/// source of truth for `installed`/`running`.
pub struct Ratings<B: PackageBackend> {
    backend: Arc<B>,
}

impl<B: PackageBackend> Ratings<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    pub async fn installed(&self) -> Result<bool, LifecycleError> {
        self.backend.is_installed().await.map_err(LifecycleError::Query)
    }

    pub async fn running(&self) -> Result<bool, LifecycleError> {
        self.backend.is_running().await.map_err(LifecycleError::Query)
    }

    pub async fn state(&self) -> Result<LifecycleState, LifecycleError> {
        let installed = self.installed().await?;
        let running = installed && self.running().await?;
        Ok(LifecycleState::from_flags(installed, running))
    }

    #[instrument(skip(self), fields(snap = %self.backend.name()))]
    pub async fn install(&self) -> Result<(), LifecycleError> {
        self.backend.install().await.map_err(LifecycleError::Install)?;
        info!(event = "installed", "snap installed");
        Ok(())
    }

    /// Start the service; a no-op when it is already running.
    #[instrument(skip(self), fields(snap = %self.backend.name()))]
    pub async fn start(&self) -> Result<(), LifecycleError> {
        if self.running().await? {
            debug!("already running");
            return Ok(());
        }
        self.backend.start().await.map_err(LifecycleError::Start)?;
        info!(event = "started", "service started");
        Ok(())
    }

    /// Stop the service; a no-op when it is not running.
    #[instrument(skip(self), fields(snap = %self.backend.name()))]
    pub async fn stop(&self) -> Result<(), LifecycleError> {
        if !self.running().await? {
            debug!("already stopped");
            return Ok(());
        }
        self.backend.stop().await.map_err(LifecycleError::Stop)?;
        info!(event = "stopped", "service stopped");
        Ok(())
    }

    #[instrument(skip(self), fields(snap = %self.backend.name()))]
    pub async fn remove(&self) -> Result<(), LifecycleError> {
        if !self.installed().await? {
            debug!("not installed; nothing to remove");
            return Ok(());
        }
        self.backend.remove().await.map_err(LifecycleError::Removal)?;
        info!(event = "removed", "snap removed");
        Ok(())
    }

    /// Write every supplied setting, then restart the service once.
    ///
    /// Settings left as `None` keep their stored value. When nothing is
    /// supplied no write and no restart happen. A failed write aborts before
    /// the restart.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    /// use service::ratings::{Ratings, RatingsSettings};
    /// use service::ratings::backend::InMemoryBackend;
    ///
    /// let backend = Arc::new(InMemoryBackend::default());
    /// let ratings = Ratings::new(backend.clone());
    /// tokio_test::block_on(ratings.install()).unwrap();
    ///
    /// let settings = RatingsSettings { log_level: Some("debug".into()), ..Default::default() };
    /// tokio_test::block_on(ratings.configure(&settings)).unwrap();
    ///
    /// assert_eq!(tokio_test::block_on(ratings.get("app-log-level")).unwrap(), "debug");
    /// assert_eq!(backend.calls().restart, 1);
    /// ```
    #[instrument(skip(self, settings), fields(snap = %self.backend.name()))]
    pub async fn configure(&self, settings: &RatingsSettings) -> Result<(), LifecycleError> {
        let changes = settings.changes();
        if changes.is_empty() {
            debug!("no settings supplied; skipping restart");
            return Ok(());
        }

        for (parameter, value) in &changes {
            let key = parameter.key();
            self.backend
                .set(key, value)
                .await
                .map_err(|source| LifecycleError::ConfigurationWrite {
                    key: key.to_string(),
                    source,
                })?;
            if parameter.is_sensitive() {
                debug!(key, "configuration key written");
            } else {
                debug!(key, value = %value, "configuration key written");
            }
        }

        self.backend.restart().await.map_err(LifecycleError::Restart)?;
        info!(
            event = "configured",
            keys = changes.len(),
            "configuration applied; service restarted"
        );
        Ok(())
    }

    /// Read a raw configuration key from the snap.
    pub async fn get(&self, key: &str) -> Result<String, LifecycleError> {
        self.backend.get(key).await.map_err(LifecycleError::Query)
    }

    /// Snapshot of every ratings setting.
    pub async fn configuration(&self) -> Result<RatingsConfiguration, LifecycleError> {
        let mut cfg = RatingsConfiguration::defaults();
        for parameter in Parameter::ALL {
            *cfg.slot(parameter) = self.get(parameter.key()).await?;
        }
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratings::backend::{BackendError, InMemoryBackend};
    use crate::ratings::domain::DEFAULT_POSTGRES_URI;
    use crate::test_support::installed_ratings;

    fn all_four() -> RatingsSettings {
        RatingsSettings {
            jwt_secret: Some("foo".into()),
            log_level: Some("bar".into()),
            postgres_uri: Some("foobar".into()),
            migration_postgres_uri: Some("barfoo".into()),
        }
    }

    #[tokio::test]
    async fn configure_writes_all_keys_and_restarts_once() -> Result<(), anyhow::Error> {
        let (ratings, backend) = installed_ratings().await?;
        assert_eq!(ratings.configuration().await?, RatingsConfiguration::defaults());

        ratings.configure(&all_four()).await?;

        assert_eq!(ratings.get("app-jwt-secret").await?, "foo");
        assert_eq!(ratings.get("app-log-level").await?, "bar");
        assert_eq!(ratings.get("app-migration-postgres-uri").await?, "barfoo");
        assert_eq!(ratings.get("app-postgres-uri").await?, "foobar");
        assert_eq!(backend.calls().set, 4);
        assert_eq!(backend.calls().restart, 1);
        Ok(())
    }

    #[tokio::test]
    async fn configure_without_settings_does_nothing() -> Result<(), anyhow::Error> {
        let (ratings, backend) = installed_ratings().await?;
        ratings.configure(&RatingsSettings::default()).await?;
        assert_eq!(backend.calls().set, 0);
        assert_eq!(backend.calls().restart, 0);
        assert_eq!(ratings.configuration().await?, RatingsConfiguration::defaults());
        Ok(())
    }

    #[tokio::test]
    async fn partial_configure_leaves_other_keys() -> Result<(), anyhow::Error> {
        let (ratings, backend) = installed_ratings().await?;
        let settings = RatingsSettings {
            postgres_uri: Some("postgresql://x@db/ratings".into()),
            ..Default::default()
        };
        ratings.configure(&settings).await?;

        let cfg = ratings.configuration().await?;
        assert_eq!(cfg.postgres_uri, "postgresql://x@db/ratings");
        assert_eq!(cfg.jwt_secret, "deadbeef");
        assert_eq!(cfg.log_level, "info");
        assert_eq!(backend.calls().restart, 1);
        Ok(())
    }

    #[tokio::test]
    async fn failed_write_skips_restart() -> Result<(), anyhow::Error> {
        let (ratings, backend) = installed_ratings().await?;
        backend.fail_set_for("app-log-level");

        let err = ratings.configure(&all_four()).await.unwrap_err();
        match &err {
            LifecycleError::ConfigurationWrite { key, source } => {
                assert_eq!(key, "app-log-level");
                assert!(matches!(source, BackendError::Rejected(_)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // written before the failure, in table order
        assert_eq!(ratings.get("app-jwt-secret").await?, "foo");
        assert_eq!(ratings.get("app-postgres-uri").await?, DEFAULT_POSTGRES_URI);
        assert_eq!(backend.calls().restart, 0);
        Ok(())
    }

    #[tokio::test]
    async fn restart_failure_is_surfaced() -> Result<(), anyhow::Error> {
        let (ratings, backend) = installed_ratings().await?;
        backend.fail_restart(true);
        let err = ratings.configure(&all_four()).await.unwrap_err();
        assert!(matches!(err, LifecycleError::Restart(_)));
        assert_eq!(err.code(), 2102);
        Ok(())
    }

    #[tokio::test]
    async fn start_and_stop_are_idempotent() -> Result<(), anyhow::Error> {
        let (ratings, backend) = installed_ratings().await?;
        ratings.start().await?;
        ratings.start().await?;
        assert!(ratings.running().await?);
        assert_eq!(backend.calls().start, 1);

        ratings.stop().await?;
        ratings.stop().await?;
        assert!(!ratings.running().await?);
        assert_eq!(backend.calls().stop, 1);
        Ok(())
    }

    #[tokio::test]
    async fn state_tracks_transitions() -> Result<(), anyhow::Error> {
        let ratings = Ratings::new(Arc::new(InMemoryBackend::default()));
        assert_eq!(ratings.state().await?, LifecycleState::NotInstalled);
        ratings.install().await?;
        assert_eq!(ratings.state().await?, LifecycleState::InstalledStopped);
        ratings.start().await?;
        assert_eq!(ratings.state().await?, LifecycleState::InstalledRunning);
        ratings.remove().await?;
        assert_eq!(ratings.state().await?, LifecycleState::NotInstalled);
        Ok(())
    }

    #[tokio::test]
    async fn install_and_remove_failures_map_to_variants() -> Result<(), anyhow::Error> {
        let backend = Arc::new(InMemoryBackend::default());
        let ratings = Ratings::new(backend.clone());

        backend.fail_install(true);
        assert!(matches!(ratings.install().await, Err(LifecycleError::Install(_))));
        assert!(!ratings.installed().await?);

        backend.fail_install(false);
        ratings.install().await?;
        backend.fail_remove(true);
        assert!(matches!(ratings.remove().await, Err(LifecycleError::Removal(_))));
        assert!(ratings.installed().await?);
        Ok(())
    }

    #[tokio::test]
    async fn remove_when_absent_is_a_no_op() -> Result<(), anyhow::Error> {
        let backend = Arc::new(InMemoryBackend::default());
        let ratings = Ratings::new(backend.clone());
        ratings.remove().await?;
        assert_eq!(backend.calls().remove, 0);
        Ok(())
    }
}
