use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::fetch::auth::UrlParam;
use crate::fetch::{BasicClient, HttpClient, fetch_json, get_request};
use crate::services::places::{PlaceCandidate, PlaceSearch};

const FIND_PLACE_URL: &str = "https://maps.googleapis.com/maps/api/place/findplacefromtext/json";
const FIELDS: &str = "place_id,name,formatted_address,geometry,types";

#[derive(Debug, Deserialize)]
struct FindPlaceResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    status: String,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    place_id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    formatted_address: String,
    geometry: Option<Geometry>,
    #[serde(default)]
    types: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

/// Google Places "Find Place From Text" client.
pub struct GooglePlacesClient<C> {
    http: C,
    base_url: String,
}

impl GooglePlacesClient<UrlParam<BasicClient>> {
    /// Client that sends `api_key` as the `key` query parameter.
    pub fn with_api_key(api_key: &str) -> Result<Self> {
        Ok(Self::new(UrlParam::new(BasicClient::new()?, "key", api_key)))
    }
}

impl<C: HttpClient> GooglePlacesClient<C> {
    pub fn new(http: C) -> Self {
        Self {
            http,
            base_url: FIND_PLACE_URL.to_string(),
        }
    }
}

#[async_trait]
impl<C: HttpClient> PlaceSearch for GooglePlacesClient<C> {
    #[tracing::instrument(skip(self))]
    async fn find_place(&self, input: &str) -> Result<Vec<PlaceCandidate>> {
        let req = get_request(
            &self.base_url,
            &[("input", input), ("inputtype", "textquery"), ("fields", FIELDS)],
        )?;
        let response: FindPlaceResponse = fetch_json(&self.http, req).await?;
        let candidates = into_candidates(response)?;
        debug!(candidates = candidates.len(), "Place search finished");
        Ok(candidates)
    }
}

fn into_candidates(response: FindPlaceResponse) -> Result<Vec<PlaceCandidate>> {
    match response.status.as_str() {
        "OK" => {}
        "ZERO_RESULTS" => return Ok(Vec::new()),
        status => {
            return Err(anyhow!(
                "place search returned {}: {}",
                status,
                response.error_message.unwrap_or_default()
            ));
        }
    }

    Ok(response
        .candidates
        .into_iter()
        .map(|c| {
            let (latitude, longitude) = c
                .geometry
                .map(|g| (g.location.lat, g.location.lng))
                .unwrap_or_default();
            PlaceCandidate {
                place_id: c.place_id,
                name: c.name,
                formatted_address: c.formatted_address,
                latitude,
                longitude,
                types: c.types,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> Result<Vec<PlaceCandidate>> {
        into_candidates(serde_json::from_value(value).unwrap())
    }

    #[test]
    fn test_maps_candidates() {
        let candidates = parse(json!({
            "status": "OK",
            "candidates": [{
                "place_id": "ChIJ",
                "name": "Kraków",
                "formatted_address": "Kraków, Lesser Poland Voivodeship, Poland",
                "geometry": { "location": { "lat": 50.06, "lng": 19.94 } },
                "types": ["locality", "political"]
            }]
        }))
        .unwrap();

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].place_id, "ChIJ");
        assert_eq!(candidates[0].latitude, 50.06);
        assert_eq!(candidates[0].types, vec!["locality", "political"]);
    }

    #[test]
    fn test_zero_results_is_empty() {
        let candidates = parse(json!({ "status": "ZERO_RESULTS", "candidates": [] })).unwrap();
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_denied_request_is_error() {
        let err = parse(json!({
            "status": "REQUEST_DENIED",
            "error_message": "The provided API key is invalid."
        }))
        .unwrap_err();
        assert!(err.to_string().contains("REQUEST_DENIED"));
    }
}
