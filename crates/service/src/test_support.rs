#![cfg(test)]
use std::sync::Arc;

use crate::ratings::backend::InMemoryBackend;
use crate::ratings::Ratings;

/// A freshly installed ratings snap backed by memory.
pub async fn installed_ratings(
) -> Result<(Ratings<InMemoryBackend>, Arc<InMemoryBackend>), anyhow::Error> {
    let backend = Arc::new(InMemoryBackend::default());
    let ratings = Ratings::new(backend.clone());
    ratings.install().await?;
    Ok((ratings, backend))
}
