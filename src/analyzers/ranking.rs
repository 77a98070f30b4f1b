//! Destination ranking from safety and cost-of-living scores.
//!
//! Cheap and safe wins: the cost percentile is inverted so a low price
//! contributes a high score, then averaged with the safety score.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::RankingConfig;
use crate::error::Result;
use crate::models::{CostOfLivingAnalytics, SafetyScore};
use crate::store::{CITY_SAFETY, COST_OF_LIVING_ANALYTICS, Direction, DocumentStore, Query};

/// One ranked destination. Only ever rendered, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinedRecord {
    pub id: String,
    pub country: String,
    pub safety_score: f64,
    pub inverted_cost_score: f64,
    pub average_score: f64,
}

/// Country slug of a `city-country` document id.
pub fn country_of(id: &str) -> &str {
    id.rsplit('-').next().unwrap_or(id)
}

/// Joins safety and cost scores by document id and orders the result by
/// average score, best first.
///
/// Country caps are filled in `analytics` order, so with cheapest-first
/// input the cheapest destinations of a country take its slots. A record
/// only uses up a slot when it has a matching safety score.
pub fn combine(
    safety: &[(String, SafetyScore)],
    analytics: &[(String, CostOfLivingAnalytics)],
    config: &RankingConfig,
) -> Vec<CombinedRecord> {
    let safety_by_id: HashMap<&str, i64> = safety
        .iter()
        .map(|(id, record)| (id.as_str(), record.score))
        .collect();

    let mut per_country: HashMap<&str, usize> = HashMap::new();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut combined = Vec::new();

    for (id, record) in analytics {
        let country = country_of(id);
        if config.is_excluded(country) {
            debug!(%id, country, "Skipping excluded country");
            continue;
        }
        let taken = per_country.entry(country).or_default();
        if *taken >= config.cap_for(country) {
            continue;
        }
        let (Some(&safety_score), Some(overall)) = (safety_by_id.get(id.as_str()), record.overall())
        else {
            continue;
        };
        if !seen.insert(id.as_str()) {
            continue;
        }

        *taken += 1;
        let safety_score = safety_score as f64;
        let inverted_cost_score = 100.0 - overall;
        combined.push(CombinedRecord {
            id: id.clone(),
            country: country.to_string(),
            safety_score,
            inverted_cost_score,
            average_score: (safety_score + inverted_cost_score) / 2.0,
        });
    }

    // Stable, so equal averages keep their input order.
    combined.sort_by(|a, b| b.average_score.total_cmp(&a.average_score));
    combined
}

/// Reads the top safety scores and the cheapest analytics and ranks them.
pub struct DestinationRanker {
    store: Arc<dyn DocumentStore>,
    config: RankingConfig,
}

impl DestinationRanker {
    pub fn new(store: Arc<dyn DocumentStore>, config: RankingConfig) -> Self {
        Self { store, config }
    }

    /// Ranks from the `limit` safest cities and the `limit` cheapest
    /// analytics records.
    #[tracing::instrument(skip(self))]
    pub async fn rank(&self, limit: usize) -> Result<Vec<CombinedRecord>> {
        let safety = self
            .store
            .query(
                CITY_SAFETY,
                &Query::new()
                    .order_by("score", Direction::Descending)
                    .limit(limit),
            )
            .await?
            .into_iter()
            .map(|doc| -> Result<(String, SafetyScore)> {
                Ok((doc.id.clone(), doc.decode(CITY_SAFETY)?))
            })
            .collect::<Result<Vec<_>>>()?;

        let analytics = self
            .store
            .query(
                COST_OF_LIVING_ANALYTICS,
                &Query::new()
                    .order_by("scores.overall", Direction::Ascending)
                    .limit(limit),
            )
            .await?
            .into_iter()
            .map(|doc| -> Result<(String, CostOfLivingAnalytics)> {
                Ok((doc.id.clone(), doc.decode(COST_OF_LIVING_ANALYTICS)?))
            })
            .collect::<Result<Vec<_>>>()?;

        info!(
            safety = safety.len(),
            analytics = analytics.len(),
            "Loaded ranking inputs"
        );

        let ranked = combine(&safety, &analytics, &self.config);
        info!(ranked = ranked.len(), "Ranked destinations");
        Ok(ranked)
    }
}
