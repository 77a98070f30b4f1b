//! Free-text place search.

use anyhow::Result;

/// One ranked match returned by a place search.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaceCandidate {
    pub place_id: String,
    pub name: String,
    pub formatted_address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub types: Vec<String>,
}

/// Abstraction over a place-search provider (e.g., Google Places).
#[async_trait::async_trait]
pub trait PlaceSearch: Send + Sync {
    /// Returns candidates for `input`, best match first. No match is an
    /// empty list, not an error.
    async fn find_place(&self, input: &str) -> Result<Vec<PlaceCandidate>>;
}
