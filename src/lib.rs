//! Enrichment and ranking of travel destinations.
//!
//! Places are resolved to canonical [`models::LocationMapping`] records,
//! cost-of-living prices are turned into percentile scores, and safety,
//! cost, connectivity and imagery signals are combined into a ranking.

pub mod analyzers;
pub mod bulk;
pub mod config;
pub mod enrichment;
pub mod error;
pub mod fetch;
pub mod infra;
pub mod migration;
pub mod models;
pub mod output;
pub mod publish;
pub mod resolver;
pub mod services;
pub mod slug;
pub mod stats;
pub mod store;

#[cfg(test)]
mod test_support;
