use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::slug::city_country_id;
use crate::stats::MetricStats;

/// Key of the combined score inside [`CostOfLivingAnalytics::scores`].
pub const OVERALL: &str = "overall";

/// Percentile scores and distribution stats for one location.
///
/// Both maps are sparse: a metric the location has no price for is absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostOfLivingAnalytics {
    pub city: String,
    pub country: String,
    pub scores: BTreeMap<String, f64>,
    pub stats: BTreeMap<String, MetricStats>,
}

impl CostOfLivingAnalytics {
    pub fn document_id(&self) -> String {
        city_country_id(&self.city, &self.country)
    }

    pub fn overall(&self) -> Option<f64> {
        self.scores.get(OVERALL).copied()
    }
}
