//! Batch scoring jobs.
//!
//! [`cost_of_living`] turns raw price snapshots into percentile scores;
//! [`ranking`] combines those scores with safety scores into a ranked list.

pub mod cost_of_living;
pub mod ranking;
