//! Stock-photo search.

use anyhow::Result;

/// Abstraction over a photo provider (e.g., Pexels).
#[async_trait::async_trait]
pub trait PhotoSearch: Send + Sync {
    /// Returns image URLs for `query` in provider order. Implementations
    /// fail when fewer than [`MIN_PHOTOS`] are available.
    async fn search_photos(&self, query: &str) -> Result<Vec<String>>;
}

/// A destination needs two photos for its card.
pub const MIN_PHOTOS: usize = 2;
