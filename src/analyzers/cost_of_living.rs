//! Percentile scoring of cost-of-living metrics.
//!
//! Every tracked metric gets one sample built from all locations' positive
//! values. A location's score for a metric is its percentile rank in that
//! sample; values `<= 0` mean "unknown" and are left out of both the
//! location's scores and everyone's statistics.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{info, warn};

use crate::bulk::{BulkWriter, Mutation};
use crate::error::Result;
use crate::models::{CostOfLivingAnalytics, CostOfLivingRecord, METRICS, OVERALL};
use crate::stats::{MetricStats, Sample, mean};
use crate::store::{self, COST_OF_LIVING, COST_OF_LIVING_ANALYTICS, DocumentPath, DocumentStore, Query};

/// Metrics scored but left out of `overall`; salary is income, not a cost.
static OVERALL_EXCLUDED: &[&str] = &["avgNetSalary"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisSummary {
    pub records: usize,
    pub written: usize,
}

/// Scores every record against the whole dataset.
///
/// The output has one entry per input record, in input order.
pub fn analyze(records: &[CostOfLivingRecord]) -> Vec<CostOfLivingAnalytics> {
    let metrics: Vec<(&str, fn(&CostOfLivingRecord) -> f64, Sample, Option<MetricStats>)> = METRICS
        .iter()
        .map(|&(name, value_of)| {
            let sample = Sample::new(
                records
                    .iter()
                    .map(value_of)
                    .filter(|v| *v > 0.0)
                    .collect(),
            );
            let stats = sample.describe();
            (name, value_of, sample, stats)
        })
        .collect();

    records
        .iter()
        .map(|record| {
            let mut scores = BTreeMap::new();
            let mut stats = BTreeMap::new();

            for (name, value_of, sample, metric_stats) in &metrics {
                let value = value_of(record);
                let Some(metric_stats) = metric_stats else {
                    continue;
                };
                if value > 0.0 {
                    scores.insert(name.to_string(), sample.percentile_rank(value));
                    stats.insert(name.to_string(), *metric_stats);
                }
            }

            let costs: Vec<f64> = scores
                .iter()
                .filter(|(name, _)| !OVERALL_EXCLUDED.contains(&name.as_str()))
                .map(|(_, score)| *score)
                .collect();
            if !costs.is_empty() {
                scores.insert(OVERALL.to_string(), mean(&costs));
            }

            CostOfLivingAnalytics {
                city: record.city.clone(),
                country: record.country.clone(),
                scores,
                stats,
            }
        })
        .collect()
}

/// Recomputes the `cost-of-living-analytics` collection from scratch.
pub struct CostOfLivingAnalyzer {
    store: Arc<dyn DocumentStore>,
    writer: BulkWriter,
}

impl CostOfLivingAnalyzer {
    pub fn new(store: Arc<dyn DocumentStore>, writer: BulkWriter) -> Self {
        Self { store, writer }
    }

    /// Reads every record, scores them and upserts the analytics.
    ///
    /// Any unreadable record or failed write ends the run with an error.
    #[tracing::instrument(skip(self))]
    pub async fn analyze_and_store(&self) -> Result<AnalysisSummary> {
        let documents = self.store.query(COST_OF_LIVING, &Query::new()).await?;
        let records = documents
            .iter()
            .map(|doc| doc.decode::<CostOfLivingRecord>(COST_OF_LIVING))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        info!(records = records.len(), "Loaded cost-of-living records");

        let analytics = analyze(&records);
        let mut mutations = Vec::with_capacity(analytics.len());
        for entry in &analytics {
            let id = entry.document_id();
            if id.is_empty() {
                warn!(city = %entry.city, country = %entry.country, "Skipping record without a usable id");
                continue;
            }
            let path = DocumentPath::new(COST_OF_LIVING_ANALYTICS, &id);
            mutations.push(Mutation::Upsert {
                data: store::encode(&path, entry)?,
                path,
            });
        }

        let summary = self.writer.commit_all(mutations).await?;
        info!(written = summary.committed, "Stored cost-of-living analytics");

        Ok(AnalysisSummary {
            records: records.len(),
            written: summary.committed,
        })
    }
}
