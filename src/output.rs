//! CSV artifacts: the ranking report and the missing-data report.
//!
//! Headers are written explicitly so an empty report still carries them.

use std::fs::File;
use std::path::Path;

use csv::WriterBuilder;
use serde::Serialize;
use tracing::{debug, info};

use crate::analyzers::ranking::CombinedRecord;
use crate::error::Result;

pub const RANKING_HEADER: &[&str] = &[
    "rank",
    "id",
    "country",
    "safetyScore",
    "invertedCostScore",
    "averageScore",
];

/// One row of the ranking report; `rank` starts at 1.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RankingRow<'a> {
    rank: usize,
    id: &'a str,
    country: &'a str,
    safety_score: f64,
    inverted_cost_score: f64,
    average_score: f64,
}

/// Serializes `rows` under `header` into an in-memory CSV document.
pub fn csv_bytes<T: Serialize>(header: &[&str], rows: &[T]) -> Result<Vec<u8>> {
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(Vec::new());
    writer.write_record(header)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    writer
        .into_inner()
        .map_err(|e| crate::error::Error::Io(e.into_error()))
}

/// Writes `rows` under `header` to `path`, replacing any previous file.
pub fn write_csv<T: Serialize>(path: &Path, header: &[&str], rows: &[T]) -> Result<()> {
    debug!(path = %path.display(), rows = rows.len(), "Writing CSV");
    let file = File::create(path)?;

    let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
    writer.write_record(header)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    Ok(())
}

fn ranking_rows(ranked: &[CombinedRecord]) -> Vec<RankingRow<'_>> {
    ranked
        .iter()
        .enumerate()
        .map(|(index, record)| RankingRow {
            rank: index + 1,
            id: &record.id,
            country: &record.country,
            safety_score: record.safety_score,
            inverted_cost_score: record.inverted_cost_score,
            average_score: record.average_score,
        })
        .collect()
}

/// Writes the ranking report, best destination first.
pub fn write_ranking(path: &Path, ranked: &[CombinedRecord]) -> Result<()> {
    write_csv(path, RANKING_HEADER, &ranking_rows(ranked))?;
    info!(path = %path.display(), destinations = ranked.len(), "Wrote ranking report");
    Ok(())
}
