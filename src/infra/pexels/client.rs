use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;

use crate::fetch::auth::ApiKey;
use crate::fetch::{BasicClient, HttpClient, fetch_json, get_request};
use crate::services::photos::{MIN_PHOTOS, PhotoSearch};

const SEARCH_URL: &str = "https://api.pexels.com/v1/search";
const PER_PAGE: &str = "15";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    photos: Vec<Photo>,
}

#[derive(Debug, Deserialize)]
struct Photo {
    src: PhotoSources,
}

#[derive(Debug, Deserialize)]
struct PhotoSources {
    medium: String,
}

pub struct PexelsClient<C> {
    http: C,
}

impl PexelsClient<ApiKey<BasicClient>> {
    /// Pexels takes the raw key in the `Authorization` header.
    pub fn with_api_key(api_key: &str) -> Result<Self> {
        Ok(Self::new(ApiKey::new(BasicClient::new()?, "Authorization", api_key)?))
    }
}

impl<C: HttpClient> PexelsClient<C> {
    pub fn new(http: C) -> Self {
        Self { http }
    }
}

#[async_trait]
impl<C: HttpClient> PhotoSearch for PexelsClient<C> {
    #[tracing::instrument(skip(self))]
    async fn search_photos(&self, query: &str) -> Result<Vec<String>> {
        let req = get_request(SEARCH_URL, &[("query", query), ("per_page", PER_PAGE)])?;
        let response: SearchResponse = fetch_json(&self.http, req).await?;
        medium_urls(response)
    }
}

fn medium_urls(response: SearchResponse) -> Result<Vec<String>> {
    let urls: Vec<String> = response
        .photos
        .into_iter()
        .map(|p| p.src.medium)
        .filter(|url| !url.is_empty())
        .collect();

    if urls.len() < MIN_PHOTOS {
        return Err(anyhow!("not enough photos returned ({})", urls.len()));
    }
    Ok(urls)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_medium_urls_in_order() {
        let response: SearchResponse = serde_json::from_value(json!({
            "photos": [
                { "src": { "medium": "https://images.pexels.com/1.jpeg", "large": "x" } },
                { "src": { "medium": "https://images.pexels.com/2.jpeg" } },
                { "src": { "medium": "https://images.pexels.com/3.jpeg" } }
            ]
        }))
        .unwrap();

        let urls = medium_urls(response).unwrap();
        assert_eq!(urls.len(), 3);
        assert_eq!(urls[0], "https://images.pexels.com/1.jpeg");
    }

    #[test]
    fn test_single_photo_is_not_enough() {
        let response: SearchResponse = serde_json::from_value(json!({
            "photos": [{ "src": { "medium": "https://images.pexels.com/1.jpeg" } }]
        }))
        .unwrap();
        assert!(medium_urls(response).is_err());
    }
}
