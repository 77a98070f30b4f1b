//! Error taxonomy for the enrichment and scoring pipeline.
//!
//! Provider clients speak `anyhow`; everything the pipeline itself decides
//! on (skip a destination, degrade a field, stop the run) is one of the
//! variants below.

use std::fmt;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures raised by a [`DocumentStore`](crate::store::DocumentStore).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed document {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("document {path} could not be serialized: {source}")]
    Encode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid document path '{0}'")]
    InvalidPath(String),

    #[error("document store rejected the request: {0}")]
    Backend(String),
}

/// The independently sourced per-location signals tracked by enrichment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    PlaceId,
    InternetSpeed,
    Safety,
    CostOfLiving,
    Photos,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Signal::PlaceId => "place id",
            Signal::InternetSpeed => "internet speed",
            Signal::Safety => "safety score",
            Signal::CostOfLiving => "cost of living",
            Signal::Photos => "photos",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum Error {
    /// No canonical mapping could be obtained for a place.
    #[error("could not resolve {city}, {country}: {reason}")]
    Resolution {
        city: String,
        country: String,
        reason: String,
    },

    /// A single signal fetch failed or returned malformed data.
    #[error("{signal} lookup failed: {reason}")]
    SignalLookup { signal: Signal, reason: String },

    #[error(transparent)]
    Persistence(#[from] StoreError),

    /// A bulk commit group kept failing after every retry.
    #[error(
        "bulk commit gave up after {attempts} attempts ({committed} committed, {failed} not written): {source}"
    )]
    RetryExhausted {
        attempts: u32,
        committed: usize,
        failed: usize,
        #[source]
        source: StoreError,
    },

    /// A migration step was refused (missing source, occupied target).
    #[error("migration refused: {0}")]
    Migration(String),

    #[error("report could not be written: {0}")]
    Report(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn resolution(city: &str, country: &str, reason: impl fmt::Display) -> Self {
        Error::Resolution {
            city: city.to_string(),
            country: country.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn signal(signal: Signal, reason: impl fmt::Display) -> Self {
        Error::SignalLookup {
            signal,
            reason: reason.to_string(),
        }
    }

    /// Errors that should end the whole run rather than one destination.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::Resolution { .. } | Error::SignalLookup { .. })
    }
}
