//! Runs against a real snapd. Opt in with `RATINGS_FUNCTIONAL_TESTS=1`;
//! needs root and network access to the store.

use std::sync::Arc;

use service::ratings::backend::SnapBackend;
use service::ratings::{Ratings, RatingsSettings};

fn enabled() -> bool {
    std::env::var("RATINGS_FUNCTIONAL_TESTS").is_ok()
}

#[tokio::test]
async fn snap_lifecycle_and_configure() -> anyhow::Result<()> {
    if !enabled() {
        return Ok(());
    }

    let backend = Arc::new(SnapBackend::new("ratings"));
    let ratings = Ratings::new(backend.clone());
    if !ratings.installed().await? {
        ratings.install().await?;
    }
    assert!(backend.install_path().exists());
    assert!(ratings.installed().await?);

    ratings.start().await?;
    assert!(ratings.running().await?);

    ratings
        .configure(&RatingsSettings { log_level: Some("debug".into()), ..Default::default() })
        .await?;
    assert_eq!(ratings.get("app-log-level").await?, "debug");

    ratings.stop().await?;
    assert!(!ratings.running().await?);

    ratings.remove().await?;
    assert!(!ratings.installed().await?);
    Ok(())
}
