//! Read-only external data sources the pipeline consumes.
//!
//! Each trait is the boundary of one provider; concrete HTTP clients live in
//! [`crate::infra`] and tests substitute fakes.

pub mod photos;
pub mod places;
pub mod throughput;

pub use photos::PhotoSearch;
pub use places::{PlaceCandidate, PlaceSearch};
pub use throughput::{Area, BoundingBox, ThroughputDirection, ThroughputMetrics, ThroughputQuery};
