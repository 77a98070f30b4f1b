use serde::{Deserialize, Serialize};

/// A ranked destination shown by the downstream application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TopDestination {
    pub id: String,
    pub city: String,
    pub country: String,
    pub rank: i64,
    pub place_id: String,
    pub photo_uri1: String,
    pub photo_uri2: String,
    pub photos: Vec<String>,
    pub download_avg: f64,
    pub safety_score: i64,
    pub cost_of_living_score: f64,
}
