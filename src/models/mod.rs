//! Persisted document shapes.
//!
//! Field names follow the stored camelCase layout so documents written by
//! other tools decode unchanged.

mod analytics;
mod cost_of_living;
mod internet_speed;
mod location_mapping;
mod safety;
mod top_destination;

pub use analytics::{CostOfLivingAnalytics, OVERALL};
pub use cost_of_living::{CostOfLivingRecord, METRICS, Metric};
pub use internet_speed::InternetSpeed;
pub use location_mapping::{LocationMapping, unique_non_empty};
pub use safety::SafetyScore;
pub use top_destination::TopDestination;
