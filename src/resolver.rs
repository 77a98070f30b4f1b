//! Free-text place name to canonical [`LocationMapping`].
//!
//! Lookup order: direct id, then `(city, country)` equality over stored
//! mappings, then the external place search. Every successful resolution
//! re-queries the place search and rewrites the mapping, so incomplete
//! records fill in over time.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::models::{LocationMapping, unique_non_empty};
use crate::services::{PlaceCandidate, PlaceSearch};
use crate::slug::{canonical_id, city_country_id};
use crate::store::{self, DocumentPath, DocumentStore, LOCATION_MAPPINGS, Query, Write};

/// Type tag the place search puts on first-level administrative areas.
const ADMINISTRATIVE_AREA: &str = "administrative_area_level_1";

pub struct LocationResolver {
    store: Arc<dyn DocumentStore>,
    places: Arc<dyn PlaceSearch>,
}

impl LocationResolver {
    pub fn new(store: Arc<dyn DocumentStore>, places: Arc<dyn PlaceSearch>) -> Self {
        Self { store, places }
    }

    /// Finds or creates the mapping for `(city, country)`.
    ///
    /// Fails with [`Error::Resolution`] when no mapping exists and the place
    /// search fails or finds nothing, or when the stored mapping is
    /// unreadable. Store failures surface as [`Error::Persistence`].
    #[tracing::instrument(skip(self))]
    pub async fn resolve(&self, city: &str, country: &str) -> Result<LocationMapping> {
        let direct = DocumentPath::new(LOCATION_MAPPINGS, &city_country_id(city, country));
        if let Some(data) = self.store.get(&direct).await? {
            let mapping = store::decode(&direct, data)
                .map_err(|e| Error::resolution(city, country, e))?;
            debug!(id = %direct.id, "Mapping found by id");
            return self.refresh(city, country, direct.id, mapping).await;
        }

        let query = Query::new()
            .where_eq("city", city)
            .where_eq("country", country);
        let documents = self.store.query(LOCATION_MAPPINGS, &query).await?;

        let mut best: Option<(String, LocationMapping)> = None;
        for doc in documents {
            match doc.decode::<LocationMapping>(LOCATION_MAPPINGS) {
                Ok(mapping) => {
                    let replace = match &best {
                        None => true,
                        Some((_, current)) => {
                            !current.has_state_or_province() && mapping.has_state_or_province()
                        }
                    };
                    if replace {
                        best = Some((doc.id, mapping));
                    }
                }
                Err(e) => warn!(id = %doc.id, error = %e, "Skipping malformed location mapping"),
            }
        }

        match best {
            Some((stored_id, mapping)) => {
                debug!(id = %stored_id, "Mapping found by city and country");
                self.refresh(city, country, stored_id, mapping).await
            }
            None => self.create(city, country).await,
        }
    }

    async fn create(&self, city: &str, country: &str) -> Result<LocationMapping> {
        let candidate = self
            .places
            .find_place(&search_input(city, country))
            .await
            .map_err(|e| Error::resolution(city, country, format!("place search failed: {e:#}")))?
            .into_iter()
            .next()
            .ok_or_else(|| Error::resolution(city, country, "no places found"))?;

        let state_or_province = state_from_candidate(&candidate);
        let id = canonical_id(
            "",
            city,
            state_or_province.as_deref().unwrap_or_default(),
            country,
        );

        let mut mapping = LocationMapping {
            id: id.clone(),
            standard_name: id.clone(),
            place_id: candidate.place_id,
            aliases: unique_non_empty([&candidate.name, &candidate.formatted_address]),
            display_name: candidate.name,
            formatted_address: candidate.formatted_address,
            city: city.to_string(),
            country: country.to_string(),
            state_or_province,
            latitude: candidate.latitude,
            longitude: candidate.longitude,
            types: candidate.types,
            count: 1,
            last_requested: Utc::now(),
            ..Default::default()
        };
        mapping.attach_references();

        let path = DocumentPath::new(LOCATION_MAPPINGS, &id);
        self.store.set(&path, store::encode(&path, &mapping)?).await?;
        info!(id = %id, "Created location mapping");
        Ok(mapping)
    }

    // A failed or empty search leaves the stored mapping as it was. Blank
    // stored names are filled from the requested place before searching.
    async fn refresh(
        &self,
        city: &str,
        country: &str,
        stored_id: String,
        mut mapping: LocationMapping,
    ) -> Result<LocationMapping> {
        if mapping.city.trim().is_empty() {
            mapping.city = city.to_string();
        }
        if mapping.country.trim().is_empty() {
            mapping.country = country.to_string();
        }

        let input = search_input(&mapping.city, &mapping.country);
        let candidate = match self.places.find_place(&input).await {
            Ok(candidates) => match candidates.into_iter().next() {
                Some(candidate) => candidate,
                None => {
                    debug!(id = %stored_id, "No candidates on refresh, keeping stored mapping");
                    return Ok(mapping);
                }
            },
            Err(e) => {
                warn!(id = %stored_id, error = %e, "Place search failed on refresh, keeping stored mapping");
                return Ok(mapping);
            }
        };

        let canonical = mapping.canonical_id();
        mapping.id = if canonical != stored_id && self.held_by_other(&canonical, &mapping).await? {
            warn!(
                from = %stored_id,
                to = %canonical,
                "Canonical id belongs to another mapping, keeping stored id"
            );
            stored_id.clone()
        } else {
            canonical
        };
        mapping.standard_name = mapping.id.clone();
        mapping.place_id = candidate.place_id;
        mapping.latitude = candidate.latitude;
        mapping.longitude = candidate.longitude;
        mapping.types = candidate.types;
        mapping.aliases =
            unique_non_empty([candidate.name, candidate.formatted_address, input]);
        mapping.count += 1;
        mapping.last_requested = Utc::now();
        mapping.attach_references();

        let target = DocumentPath::new(LOCATION_MAPPINGS, &mapping.id);
        let data = store::encode(&target, &mapping)?;
        let mut writes = Vec::with_capacity(2);
        if stored_id != mapping.id {
            info!(from = %stored_id, to = %mapping.id, "Renaming location mapping to canonical id");
            writes.push(Write::Delete {
                path: DocumentPath::new(LOCATION_MAPPINGS, &stored_id),
            });
        }
        writes.push(Write::Set { path: target, data });
        self.store.commit(&writes).await?;

        Ok(mapping)
    }

    /// Whether `id` already holds a mapping for a different `(city, country)`.
    /// An unreadable document there counts as different.
    async fn held_by_other(&self, id: &str, mapping: &LocationMapping) -> Result<bool> {
        let path = DocumentPath::new(LOCATION_MAPPINGS, id);
        let Some(data) = self.store.get(&path).await? else {
            return Ok(false);
        };
        let same = store::decode::<LocationMapping>(&path, data).is_ok_and(|other| {
            city_country_id(&other.city, &other.country)
                == city_country_id(&mapping.city, &mapping.country)
        });
        Ok(!same)
    }
}

fn search_input(city: &str, country: &str) -> String {
    format!("{city}, {country}")
}

fn state_from_candidate(candidate: &PlaceCandidate) -> Option<String> {
    if contains_administrative_area(&candidate.types) {
        extract_state_or_province(&candidate.formatted_address)
    } else {
        None
    }
}

pub fn contains_administrative_area(types: &[String]) -> bool {
    types.iter().any(|t| t == ADMINISTRATIVE_AREA)
}

/// Second-to-last comma-separated segment of an address with at least three
/// segments (`"Austin, Texas, USA"` gives `"Texas"`).
pub fn extract_state_or_province(formatted_address: &str) -> Option<String> {
    let parts: Vec<&str> = formatted_address.split(',').collect();
    if parts.len() < 3 {
        return None;
    }
    let state = parts[parts.len() - 2].trim();
    (!state.is_empty()).then(|| state.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::test_support::{FakePlaces, candidate};
    use serde_json::json;

    fn resolver(store: Arc<MemoryStore>, places: FakePlaces) -> (LocationResolver, Arc<FakePlaces>) {
        let places = Arc::new(places);
        (LocationResolver::new(store, places.clone()), places)
    }

    async fn stored(store: &MemoryStore, id: &str) -> Option<LocationMapping> {
        let path = DocumentPath::new(LOCATION_MAPPINGS, id);
        store
            .get(&path)
            .await
            .unwrap()
            .map(|data| store::decode(&path, data).unwrap())
    }

    #[test]
    fn test_extract_state_or_province() {
        assert_eq!(
            extract_state_or_province("Austin, Texas, USA").as_deref(),
            Some("Texas")
        );
        assert_eq!(extract_state_or_province("Lima, Peru"), None);
        assert_eq!(extract_state_or_province("a, , c"), None);
    }

    #[test]
    fn test_contains_administrative_area() {
        let types = vec!["political".to_string(), ADMINISTRATIVE_AREA.to_string()];
        assert!(contains_administrative_area(&types));
        assert!(!contains_administrative_area(&["locality".to_string()]));
    }

    #[tokio::test]
    async fn test_creates_mapping_on_miss() {
        let store = Arc::new(MemoryStore::new());
        let places = FakePlaces::new().with(
            "Kraków, Poland",
            vec![candidate("Kraków", "Kraków, Poland", &["locality", "political"])],
        );
        let (resolver, _) = resolver(store.clone(), places);

        let mapping = resolver.resolve("Kraków", "Poland").await.unwrap();

        assert_eq!(mapping.id, "krakow-poland");
        assert_eq!(mapping.place_id, "place-kraków");
        assert_eq!(mapping.count, 1);
        assert_eq!(mapping.aliases, vec!["Kraków", "Kraków, Poland"]);
        assert_eq!(
            mapping.cost_of_living_analytics_ref.as_ref().unwrap().to_string(),
            "cost-of-living-analytics/krakow-poland"
        );
        assert_eq!(stored(&store, "krakow-poland").await, Some(mapping));
    }

    #[tokio::test]
    async fn test_administrative_area_adds_state() {
        let store = Arc::new(MemoryStore::new());
        let places = FakePlaces::new().with(
            "Springfield, United States",
            vec![candidate(
                "Springfield",
                "Springfield, Illinois, United States",
                &["locality", ADMINISTRATIVE_AREA],
            )],
        );
        let (resolver, _) = resolver(store.clone(), places);

        let mapping = resolver
            .resolve("Springfield", "United States")
            .await
            .unwrap();

        assert_eq!(mapping.state_or_province.as_deref(), Some("Illinois"));
        assert_eq!(mapping.id, "springfield-illinois-unitedstates");
        assert_eq!(
            mapping.internet_speed_ref.unwrap().id,
            "springfield-illinois-unitedstates"
        );
        assert_eq!(
            mapping.city_safety_ref.unwrap().id,
            "springfield-unitedstates"
        );
    }

    #[tokio::test]
    async fn test_resolution_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let places = FakePlaces::new().with(
            "Lima, Peru",
            vec![candidate("Lima", "Lima, Peru", &["locality"])],
        );
        let (resolver, places) = resolver(store.clone(), places);

        let first = resolver.resolve("Lima", "Peru").await.unwrap();
        let second = resolver.resolve("Lima", "Peru").await.unwrap();

        assert_eq!(store.len(LOCATION_MAPPINGS), 1);
        assert_eq!(first.id, second.id);
        assert_eq!(second.count, 2);
        assert_eq!(second.aliases, vec!["Lima", "Lima, Peru"]);
        assert_eq!(places.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_prefers_candidate_with_state() {
        let store = Arc::new(MemoryStore::new());
        store
            .set(
                &DocumentPath::new(LOCATION_MAPPINGS, "a-portland"),
                json!({"id": "a-portland", "city": "Portland", "country": "United States", "placeId": "first"}),
            )
            .await
            .unwrap();
        store
            .set(
                &DocumentPath::new(LOCATION_MAPPINGS, "portland-oregon-unitedstates"),
                json!({
                    "id": "portland-oregon-unitedstates",
                    "city": "Portland",
                    "country": "United States",
                    "stateOrProvince": "Oregon",
                    "placeId": "with-state"
                }),
            )
            .await
            .unwrap();
        store
            .set(
                &DocumentPath::new(LOCATION_MAPPINGS, "portland-unitedstates-x"),
                json!({"id": "x", "city": "Portland", "country": "United States", "stateOrProvince": "Maine"}),
            )
            .await
            .unwrap();
        let (resolver, _) = resolver(store.clone(), FakePlaces::failing());

        let mapping = resolver.resolve("Portland", "United States").await.unwrap();

        assert_eq!(mapping.place_id, "with-state");
        assert_eq!(mapping.state_or_province.as_deref(), Some("Oregon"));
    }

    #[tokio::test]
    async fn test_first_candidate_wins_without_state() {
        let store = Arc::new(MemoryStore::new());
        for (id, place_id) in [("b", "second"), ("a", "first")] {
            store
                .set(
                    &DocumentPath::new(LOCATION_MAPPINGS, id),
                    json!({"id": id, "city": "Cusco", "country": "Peru", "placeId": place_id}),
                )
                .await
                .unwrap();
        }
        let (resolver, _) = resolver(store, FakePlaces::failing());

        let mapping = resolver.resolve("Cusco", "Peru").await.unwrap();
        assert_eq!(mapping.place_id, "first");
    }

    #[tokio::test]
    async fn test_refresh_renames_to_canonical_id() {
        let store = Arc::new(MemoryStore::new());
        store
            .set(
                &DocumentPath::new(LOCATION_MAPPINGS, "austin-unitedstates"),
                json!({"city": "Austin", "country": "United States", "stateOrProvince": "Texas", "count": 4}),
            )
            .await
            .unwrap();
        let places = FakePlaces::new().with(
            "Austin, United States",
            vec![candidate("Austin", "Austin, TX, USA", &["locality"])],
        );
        let (resolver, _) = resolver(store.clone(), places);

        let mapping = resolver.resolve("Austin", "United States").await.unwrap();

        assert_eq!(mapping.id, "austin-texas-unitedstates");
        assert_eq!(mapping.count, 5);
        assert!(stored(&store, "austin-unitedstates").await.is_none());
        assert!(stored(&store, "austin-texas-unitedstates").await.is_some());
        assert_eq!(store.len(LOCATION_MAPPINGS), 1);
    }

    #[tokio::test]
    async fn test_refresh_fills_blank_city_from_request() {
        let store = Arc::new(MemoryStore::new());
        store
            .set(
                &DocumentPath::new(LOCATION_MAPPINGS, "lima-peru"),
                json!({"country": "Peru", "placeId": "old"}),
            )
            .await
            .unwrap();
        store
            .set(
                &DocumentPath::new(LOCATION_MAPPINGS, "peru"),
                json!({"id": "peru", "country": "Peru", "displayName": "Peru country mapping"}),
            )
            .await
            .unwrap();
        let places = FakePlaces::new().with(
            "Lima, Peru",
            vec![candidate("Lima", "Lima, Peru", &["locality"])],
        );
        let (resolver, places) = resolver(store.clone(), places);

        let mapping = resolver.resolve("Lima", "Peru").await.unwrap();

        assert_eq!(places.calls(), vec!["Lima, Peru"]);
        assert_eq!(mapping.id, "lima-peru");
        assert_eq!(mapping.city, "Lima");
        assert_eq!(stored(&store, "lima-peru").await.unwrap().place_id, "place-lima");
        assert_eq!(
            stored(&store, "peru").await.unwrap().display_name,
            "Peru country mapping"
        );
    }

    #[tokio::test]
    async fn test_refresh_keeps_id_when_canonical_id_is_taken() {
        let store = Arc::new(MemoryStore::new());
        store
            .set(
                &DocumentPath::new(LOCATION_MAPPINGS, "georgetown-guyana"),
                json!({"city": "Georgetown", "country": "Guyana", "stateOrProvince": "Texas"}),
            )
            .await
            .unwrap();
        store
            .set(
                &DocumentPath::new(LOCATION_MAPPINGS, "georgetown-texas-guyana"),
                json!({"city": "Other", "country": "Place", "placeId": "unrelated"}),
            )
            .await
            .unwrap();
        let places = FakePlaces::new().with(
            "Georgetown, Guyana",
            vec![candidate("Georgetown", "Georgetown, Guyana", &["locality"])],
        );
        let (resolver, _) = resolver(store.clone(), places);

        let mapping = resolver.resolve("Georgetown", "Guyana").await.unwrap();

        assert_eq!(mapping.id, "georgetown-guyana");
        assert_eq!(
            stored(&store, "georgetown-guyana").await.unwrap().place_id,
            "place-georgetown"
        );
        assert_eq!(
            stored(&store, "georgetown-texas-guyana").await.unwrap().place_id,
            "unrelated"
        );
        assert_eq!(store.len(LOCATION_MAPPINGS), 2);
    }

    #[tokio::test]
    async fn test_failed_refresh_returns_stored_mapping() {
        let store = Arc::new(MemoryStore::new());
        let path = DocumentPath::new(LOCATION_MAPPINGS, "lima-peru");
        store
            .set(&path, json!({"id": "lima-peru", "city": "Lima", "country": "Peru", "placeId": "old", "count": 3}))
            .await
            .unwrap();
        let (resolver, _) = resolver(store.clone(), FakePlaces::failing());

        let mapping = resolver.resolve("Lima", "Peru").await.unwrap();

        assert_eq!(mapping.place_id, "old");
        assert_eq!(mapping.count, 3);
        assert_eq!(store.get(&path).await.unwrap().unwrap()["count"], json!(3));
    }

    #[tokio::test]
    async fn test_search_failure_is_resolution_error() {
        let store = Arc::new(MemoryStore::new());
        let (resolver, _) = resolver(store.clone(), FakePlaces::failing());

        let err = resolver.resolve("Atlantis", "Nowhere").await.unwrap_err();

        assert!(matches!(err, Error::Resolution { .. }));
        assert!(!err.is_fatal());
        assert_eq!(store.len(LOCATION_MAPPINGS), 0);
    }

    #[tokio::test]
    async fn test_no_candidates_is_resolution_error() {
        let store = Arc::new(MemoryStore::new());
        let (resolver, _) = resolver(store, FakePlaces::new());

        let err = resolver.resolve("Atlantis", "Nowhere").await.unwrap_err();
        assert!(err.to_string().contains("no places found"));
    }

    #[tokio::test]
    async fn test_malformed_mapping_is_resolution_error() {
        let store = Arc::new(MemoryStore::new());
        store
            .set(
                &DocumentPath::new(LOCATION_MAPPINGS, "lima-peru"),
                json!({"city": "Lima", "country": "Peru", "latitude": "south"}),
            )
            .await
            .unwrap();
        let (resolver, _) = resolver(store, FakePlaces::new());

        let err = resolver.resolve("Lima", "Peru").await.unwrap_err();
        assert!(matches!(err, Error::Resolution { .. }));
    }
}
