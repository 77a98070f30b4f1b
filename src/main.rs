//! CLI entry point for the destination rater.
//!
//! Provides subcommands for scoring cost-of-living data, ranking and
//! enriching top destinations, and maintaining document collections.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use bytes::Bytes;
use chrono::Utc;
use clap::{Parser, Subcommand};
use destination_rater::analyzers::cost_of_living::CostOfLivingAnalyzer;
use destination_rater::analyzers::ranking::DestinationRanker;
use destination_rater::bulk::BulkWriter;
use destination_rater::config::{AppConfig, EnrichmentSettings, RankingConfig, require};
use destination_rater::enrichment::{DestinationEnricher, report_bytes};
use destination_rater::infra::google::{BigQueryClient, GooglePlacesClient};
use destination_rater::infra::pexels::PexelsClient;
use destination_rater::migration::Migrator;
use destination_rater::output::write_ranking;
use destination_rater::publish;
use destination_rater::store::{DocumentStore, FileStore};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    filter::LevelFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "destination_rater")]
#[command(about = "Enrich and rank travel destinations", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recompute percentile scores for every cost-of-living record
    AnalyzeCostOfLiving,
    /// Rank destinations by safety and cost of living
    RankDestinations {
        /// How many safety and cost-of-living records to read
        #[arg(short, long, default_value_t = 100)]
        limit: usize,

        /// JSON file with country exclusions and caps (built-in defaults otherwise)
        #[arg(short, long)]
        config: Option<String>,

        /// CSV file to write the ranking to
        #[arg(short, long, default_value = "ranking.csv")]
        output: PathBuf,

        /// Optional: S3 bucket to upload the ranking JSON to
        #[arg(long)]
        s3_bucket: Option<String>,
    },
    /// Fill in place ids, speeds, scores and photos for top destinations
    EnrichDestinations {
        /// Destinations to skip, in rank order
        #[arg(long, default_value_t = 60)]
        offset: usize,

        /// Destinations to enrich
        #[arg(short, long, default_value_t = 100)]
        limit: usize,

        /// CSV file for the missing-values report
        #[arg(short, long, default_value = "missing_values_report.csv")]
        report: PathBuf,

        /// Optional: S3 bucket to upload the report to
        #[arg(long)]
        s3_bucket: Option<String>,

        /// Optional: Gzip compress the report before uploading to S3
        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
    /// Move documents whose ids are not in clean form to their cleaned ids
    NormalizeIds {
        #[arg(short, long)]
        collection: String,
    },
    /// Copy every document of one collection into another
    CopyCollection {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
    },
    /// Copy one document to a new id; fails if the new id exists
    CopyDocument {
        #[arg(short, long)]
        collection: String,
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/destination_rater.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("destination_rater.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(env_filter("RUST_LOG", LevelFilter::INFO));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(env_filter("RUST_LOG_JSON", LevelFilter::DEBUG));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env();
    let store: Arc<dyn DocumentStore> = Arc::new(FileStore::new(&config.store_dir));
    info!(store = %config.store_dir.display(), "Using file-backed document store");

    match cli.command {
        Commands::AnalyzeCostOfLiving => {
            let analyzer = CostOfLivingAnalyzer::new(store.clone(), BulkWriter::new(store));
            let summary = analyzer.analyze_and_store().await?;
            info!(
                records = summary.records,
                written = summary.written,
                "Cost-of-living analysis complete"
            );
        }
        Commands::RankDestinations {
            limit,
            config: ranking_config,
            output,
            s3_bucket,
        } => {
            let ranking_config = match ranking_config {
                Some(path) => RankingConfig::load(&path)?,
                None => RankingConfig::default(),
            };
            let ranked = DestinationRanker::new(store, ranking_config)
                .rank(limit)
                .await?;
            write_ranking(&output, &ranked)?;

            if let Some(bucket) = s3_bucket {
                let client = publish::s3_client().await;
                let key = publish::dated_key("ranking", Utc::now().date_naive(), "json");
                publish::write_json_to_s3(&client, &bucket, &key, &ranked).await?;
            }
        }
        Commands::EnrichDestinations {
            offset,
            limit,
            report,
            s3_bucket,
            gzip,
        } => {
            enrich_destinations(&config, store, offset, limit, report, s3_bucket, gzip).await?;
        }
        Commands::NormalizeIds { collection } => {
            let summary = Migrator::new(store.clone(), BulkWriter::new(store))
                .normalize_document_ids(&collection)
                .await?;
            info!(%collection, renamed = summary.committed, "Ids normalized");
        }
        Commands::CopyCollection { from, to } => {
            let summary = Migrator::new(store.clone(), BulkWriter::new(store))
                .copy_collection(&from, &to)
                .await?;
            info!(%from, %to, copied = summary.committed, "Collection copied");
        }
        Commands::CopyDocument {
            collection,
            from,
            to,
        } => {
            Migrator::new(store.clone(), BulkWriter::new(store))
                .copy_document(&collection, &from, &to)
                .await?;
        }
    }

    Ok(())
}

// `RUST_LOG`-style filter with a floor level when the variable is unset.
fn env_filter(var: &str, default: LevelFilter) -> EnvFilter {
    EnvFilter::builder()
        .with_env_var(var)
        .with_default_directive(default.into())
        .from_env_lossy()
}

/// Builds the live providers and runs one enrichment pass, then optionally
/// uploads the missing-values report.
#[tracing::instrument(skip(config, store, s3_bucket, gzip))]
async fn enrich_destinations(
    config: &AppConfig,
    store: Arc<dyn DocumentStore>,
    offset: usize,
    limit: usize,
    report: PathBuf,
    s3_bucket: Option<String>,
    gzip: bool,
) -> Result<()> {
    let places = GooglePlacesClient::with_api_key(require(
        &config.google_maps_api_key,
        "GOOGLE_MAPS_API_KEY",
    )?)?;
    let throughput = BigQueryClient::with_access_token(
        require(&config.bigquery_project_id, "BIGQUERY_PROJECT_ID")?,
        require(&config.bigquery_access_token, "BIGQUERY_ACCESS_TOKEN")?,
    )?;
    let photos = PexelsClient::with_api_key(require(&config.pexels_api_key, "PEXELS_API_KEY")?)?;

    let settings = EnrichmentSettings {
        offset,
        limit,
        report_path: report,
        ..Default::default()
    };
    let enricher = DestinationEnricher::new(
        store.clone(),
        Arc::new(places),
        Arc::new(throughput),
        Arc::new(photos),
        BulkWriter::new(store),
        settings,
    );
    let summary = enricher.run().await?;

    if let Some(bucket) = s3_bucket {
        info!(bucket = %bucket, gzip, "Uploading missing-values report");
        let client = publish::s3_client().await;
        let key = publish::dated_key("missing-values", Utc::now().date_naive(), "csv");
        let body = Bytes::from(report_bytes(&summary.reports)?);
        publish::upload_csv(&client, &bucket, &key, body, gzip).await?;
    }

    Ok(())
}
