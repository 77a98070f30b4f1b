//! Runtime configuration.
//!
//! Credentials and paths come from the environment (a `.env` file is loaded
//! first by the binary). Ranking rules are an immutable [`RankingConfig`]
//! value, built in or loaded from JSON, and injected into the ranker.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;

use crate::slug::country_id;

/// Environment-derived settings shared by every command.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub store_dir: PathBuf,
    pub google_maps_api_key: Option<String>,
    pub pexels_api_key: Option<String>,
    pub bigquery_project_id: Option<String>,
    pub bigquery_access_token: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Self {
            store_dir: non_empty("STORE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data/store")),
            google_maps_api_key: non_empty("GOOGLE_MAPS_API_KEY"),
            pexels_api_key: non_empty("PEXELS_API_KEY"),
            bigquery_project_id: non_empty("BIGQUERY_PROJECT_ID"),
            bigquery_access_token: non_empty("BIGQUERY_ACCESS_TOKEN"),
        }
    }
}

/// Returns a credential or names the variable that should hold it.
pub fn require<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str> {
    value
        .as_deref()
        .ok_or_else(|| anyhow!("{name} must be set"))
}

/// Country exclusions and per-country caps for the destination ranking.
///
/// Country keys are canonical slugs (`unitedstates`). On disk:
/// ```json
/// {
///   "excluded": ["russia"],
///   "defaultCap": 5,
///   "caps": { "india": 10, "china": 10, "unitedstates": 10 }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RankingConfig {
    pub excluded: BTreeSet<String>,
    pub default_cap: usize,
    pub caps: BTreeMap<String, usize>,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            excluded: BTreeSet::from(["russia".to_string()]),
            default_cap: 5,
            caps: BTreeMap::from([
                ("india".to_string(), 10),
                ("china".to_string(), 10),
                ("unitedstates".to_string(), 10),
            ]),
        }
    }
}

impl RankingConfig {
    /// Loads the config from a JSON file at `path`. Missing keys take their
    /// defaults; country names are normalized to slugs.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read ranking config {path}"))?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let raw: RankingConfig = serde_json::from_str(content)?;
        Ok(Self {
            excluded: raw.excluded.iter().map(|c| country_id(c)).collect(),
            default_cap: raw.default_cap,
            caps: raw
                .caps
                .into_iter()
                .map(|(country, cap)| (country_id(&country), cap))
                .collect(),
        })
    }

    pub fn is_excluded(&self, country: &str) -> bool {
        self.excluded.contains(country)
    }

    pub fn cap_for(&self, country: &str) -> usize {
        self.caps.get(country).copied().unwrap_or(self.default_cap)
    }
}

/// Which destinations an enrichment run visits and where it reports.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichmentSettings {
    /// Destinations skipped, counted in ascending rank order.
    pub offset: usize,
    pub limit: usize,
    /// Upper bound on the joint download/upload throughput lookup.
    pub speed_timeout: Duration,
    pub report_path: PathBuf,
}

impl Default for EnrichmentSettings {
    fn default() -> Self {
        Self {
            offset: 60,
            limit: 100,
            speed_timeout: Duration::from_secs(60),
            report_path: PathBuf::from("missing_values_report.csv"),
        }
    }
}
