use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::slug::{canonical_id, city_country_id, country_id};
use crate::store::{
    CITY_SAFETY, COST_OF_LIVING, COST_OF_LIVING_ANALYTICS, COUNTRY_SAFETY, DocumentPath,
    INTERNET_SPEED_CACHE,
};

/// Canonical identity of a place and the hub for every signal about it.
///
/// Signals are never embedded, only referenced by [`DocumentPath`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LocationMapping {
    pub id: String,
    pub standard_name: String,
    pub place_id: String,
    pub display_name: String,
    pub formatted_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sublocality: Option<String>,
    pub city: String,
    pub country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_or_province: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub aliases: Vec<String>,
    pub types: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub city_safety_ref: Option<DocumentPath>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_safety_ref: Option<DocumentPath>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internet_speed_ref: Option<DocumentPath>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_of_living_ref: Option<DocumentPath>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_of_living_analytics_ref: Option<DocumentPath>,

    pub count: i64,
    pub last_requested: DateTime<Utc>,
}

impl LocationMapping {
    /// The id this mapping should live under, derived from its components.
    pub fn canonical_id(&self) -> String {
        canonical_id(
            self.sublocality.as_deref().unwrap_or_default(),
            &self.city,
            self.state_or_province.as_deref().unwrap_or_default(),
            &self.country,
        )
    }

    pub fn has_state_or_province(&self) -> bool {
        self.state_or_province
            .as_deref()
            .is_some_and(|s| !s.trim().is_empty())
    }

    /// Points every signal reference at the document it is keyed by.
    ///
    /// The internet-speed cache is keyed by this mapping's own id; the
    /// other signals by `city-country` or `country`.
    pub fn attach_references(&mut self) {
        let city_country = city_country_id(&self.city, &self.country);

        self.city_safety_ref = if self.city.is_empty() {
            None
        } else {
            Some(DocumentPath::new(CITY_SAFETY, &city_country))
        };
        self.country_safety_ref = Some(DocumentPath::new(COUNTRY_SAFETY, &country_id(&self.country)));
        self.internet_speed_ref = Some(DocumentPath::new(INTERNET_SPEED_CACHE, &self.id));
        self.cost_of_living_ref = Some(DocumentPath::new(COST_OF_LIVING, &city_country));
        self.cost_of_living_analytics_ref =
            Some(DocumentPath::new(COST_OF_LIVING_ANALYTICS, &city_country));
    }
}

/// Keeps the first occurrence of every non-empty string, in order.
pub fn unique_non_empty<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut unique: Vec<String> = Vec::new();
    for value in values {
        let value = value.as_ref().trim();
        if !value.is_empty() && !unique.iter().any(|v| v == value) {
            unique.push(value.to_string());
        }
    }
    unique
}
