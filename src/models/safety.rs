use serde::{Deserialize, Serialize};

/// Safety score for a city (`city-safety`) or a country (`country-safety`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyScore {
    pub city: String,
    pub country: String,
    pub score: i64,
}
