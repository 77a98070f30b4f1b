//! Top-destination enrichment.
//!
//! Destinations are visited one at a time, in rank order:
//!
//! ```text
//! Fetched -> Resolving -> SignalLookup -> Enriched | PartiallyEnriched -> Saved
//! ```
//!
//! A destination that cannot be resolved is skipped. A signal that cannot be
//! looked up is flagged in the missing-values report and its field keeps
//! its previous value. Store and commit failures end the run.

mod report;
mod speed;

pub use report::{MISSING_VALUES_HEADER, MissingValueReport, report_bytes, write_report};
pub use speed::SpeedLookup;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{debug, error, info, warn};

use crate::bulk::{BulkWriter, Mutation};
use crate::config::EnrichmentSettings;
use crate::error::{Error, Result, Signal};
use crate::models::{CostOfLivingAnalytics, LocationMapping, SafetyScore, TopDestination};
use crate::resolver::LocationResolver;
use crate::services::photos::MIN_PHOTOS;
use crate::services::{PhotoSearch, PlaceSearch, ThroughputMetrics};
use crate::store::{self, Direction, DocumentPath, DocumentStore, Query, TOP_DESTINATIONS};

/// Where a destination is in its enrichment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetched,
    Resolving,
    SignalLookup,
    Enriched,
    PartiallyEnriched,
    Saved,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrichmentSummary {
    /// Destinations read from the store.
    pub visited: usize,
    pub saved: usize,
    /// Destinations skipped because they could not be resolved.
    pub unresolved: usize,
    pub reports: Vec<MissingValueReport>,
}

pub struct DestinationEnricher {
    store: Arc<dyn DocumentStore>,
    resolver: LocationResolver,
    speeds: SpeedLookup,
    photos: Arc<dyn PhotoSearch>,
    writer: BulkWriter,
    settings: EnrichmentSettings,
}

impl DestinationEnricher {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        places: Arc<dyn PlaceSearch>,
        throughput: Arc<dyn ThroughputMetrics>,
        photos: Arc<dyn PhotoSearch>,
        writer: BulkWriter,
        settings: EnrichmentSettings,
    ) -> Self {
        Self {
            resolver: LocationResolver::new(store.clone(), places),
            speeds: SpeedLookup::new(store.clone(), throughput, settings.speed_timeout),
            store,
            photos,
            writer,
            settings,
        }
    }

    /// Enriches the configured window of destinations and writes the
    /// missing-values report.
    #[tracing::instrument(skip(self), fields(offset = self.settings.offset, limit = self.settings.limit))]
    pub async fn run(&self) -> Result<EnrichmentSummary> {
        let destinations = self.fetch_destinations().await?;
        let mut summary = EnrichmentSummary {
            visited: destinations.len(),
            ..Default::default()
        };
        info!(destinations = destinations.len(), "Fetched top destinations");

        for mut destination in destinations {
            let report = match self.enrich(&mut destination).await {
                Ok(report) => report,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    error!(
                        city = %destination.city,
                        country = %destination.country,
                        error = %e,
                        "Failed to enrich destination"
                    );
                    summary.unresolved += 1;
                    continue;
                }
            };

            self.save(&destination).await?;
            debug!(id = %destination.id, stage = ?Stage::Saved, "Destination saved");
            summary.saved += 1;
            summary.reports.push(report);
        }

        write_report(&self.settings.report_path, &summary.reports)?;
        info!(
            visited = summary.visited,
            saved = summary.saved,
            unresolved = summary.unresolved,
            report = %self.settings.report_path.display(),
            "Enrichment finished"
        );
        Ok(summary)
    }

    async fn fetch_destinations(&self) -> Result<Vec<TopDestination>> {
        let query = Query::new()
            .order_by("rank", Direction::Ascending)
            .offset(self.settings.offset)
            .limit(self.settings.limit);

        let mut destinations = Vec::new();
        for doc in self.store.query(TOP_DESTINATIONS, &query).await? {
            match doc.decode::<TopDestination>(TOP_DESTINATIONS) {
                Ok(mut destination) => {
                    destination.id = doc.id;
                    debug!(id = %destination.id, stage = ?Stage::Fetched, "Destination fetched");
                    destinations.push(destination);
                }
                Err(e) => warn!(id = %doc.id, error = %e, "Skipping malformed destination"),
            }
        }
        Ok(destinations)
    }

    /// Fills in every signal it can find for `destination`.
    ///
    /// Fails only when the destination cannot be resolved or the store
    /// fails; missing signals are reported instead.
    pub async fn enrich(&self, destination: &mut TopDestination) -> Result<MissingValueReport> {
        let mut report = MissingValueReport::new(&destination.city, &destination.country);

        debug!(id = %destination.id, stage = ?Stage::Resolving, "Resolving destination");
        let mapping = self
            .resolver
            .resolve(&destination.city, &destination.country)
            .await?;

        debug!(id = %destination.id, mapping = %mapping.id, stage = ?Stage::SignalLookup, "Looking up signals");
        if mapping.place_id.is_empty() {
            report.mark_missing(Signal::PlaceId);
        }
        destination.place_id = mapping.place_id.clone();

        let speed = self.speeds.internet_speed(&mapping).await;
        if let Some(speed) = degrade(speed, Signal::InternetSpeed, destination, &mut report)? {
            destination.download_avg = speed.download_speed_mbps;
        }

        let safety = self.safety_score(&mapping).await;
        if let Some(safety) = degrade(safety, Signal::Safety, destination, &mut report)? {
            destination.safety_score = safety.score;
        }

        let cost = self.cost_of_living_score(&mapping).await;
        if let Some(score) = degrade(cost, Signal::CostOfLiving, destination, &mut report)? {
            destination.cost_of_living_score = score;
        }

        if destination.photos.is_empty() {
            let photos = self.fetch_photos(destination).await;
            if let Some(photos) = degrade(photos, Signal::Photos, destination, &mut report)? {
                if destination.photo_uri1.is_empty() {
                    destination.photo_uri1 = photos[0].clone();
                }
                if destination.photo_uri2.is_empty() {
                    destination.photo_uri2 = photos[1].clone();
                }
                destination.photos = photos;
            }
        }

        let stage = if report.is_complete() {
            Stage::Enriched
        } else {
            Stage::PartiallyEnriched
        };
        debug!(id = %destination.id, ?stage, "Signals gathered");

        Ok(report)
    }

    async fn safety_score(&self, mapping: &LocationMapping) -> Result<SafetyScore> {
        self.read_signal(Signal::Safety, mapping.city_safety_ref.as_ref())
            .await
    }

    async fn cost_of_living_score(&self, mapping: &LocationMapping) -> Result<f64> {
        let analytics: CostOfLivingAnalytics = self
            .read_signal(
                Signal::CostOfLiving,
                mapping.cost_of_living_analytics_ref.as_ref(),
            )
            .await?;
        analytics
            .overall()
            .ok_or_else(|| Error::signal(Signal::CostOfLiving, "analytics have no overall score"))
    }

    async fn fetch_photos(&self, destination: &TopDestination) -> Result<Vec<String>> {
        let query = format!("{} {}", destination.city, destination.country);
        let photos = self
            .photos
            .search_photos(&query)
            .await
            .map_err(|e| Error::signal(Signal::Photos, e))?;
        if photos.len() < MIN_PHOTOS {
            return Err(Error::signal(Signal::Photos, "not enough photos returned"));
        }
        Ok(photos)
    }

    // A missing reference, document or field is a signal error; a failing
    // store is not.
    async fn read_signal<T: DeserializeOwned>(
        &self,
        signal: Signal,
        path: Option<&DocumentPath>,
    ) -> Result<T> {
        let path = path.ok_or_else(|| Error::signal(signal, "mapping has no reference"))?;
        let data = self
            .store
            .get(path)
            .await?
            .ok_or_else(|| Error::signal(signal, format!("{path} does not exist")))?;
        store::decode(path, data).map_err(|e| Error::signal(signal, e))
    }

    async fn save(&self, destination: &TopDestination) -> Result<()> {
        let path = DocumentPath::new(TOP_DESTINATIONS, &destination.id);
        let data = store::encode(&path, destination)?;
        self.writer
            .commit_all(vec![Mutation::Upsert { path, data }])
            .await?;
        Ok(())
    }
}

// Turns a non-fatal lookup failure into a report flag.
fn degrade<T>(
    result: Result<T>,
    signal: Signal,
    destination: &TopDestination,
    report: &mut MissingValueReport,
) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            warn!(
                city = %destination.city,
                country = %destination.country,
                %signal,
                error = %e,
                "Signal missing"
            );
            report.mark_missing(signal);
            Ok(None)
        }
    }
}
