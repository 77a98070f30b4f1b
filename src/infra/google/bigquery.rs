use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::fetch::auth::ApiKey;
use crate::fetch::{BasicClient, HttpClient, fetch_json, post_json};
use crate::services::throughput::{Area, ThroughputDirection, ThroughputMetrics, ThroughputQuery};

const BASE_URL: &str = "https://bigquery.googleapis.com/bigquery/v2";
const QUERY_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest {
    query: String,
    use_legacy_sql: bool,
    parameter_mode: &'static str,
    query_parameters: Vec<QueryParameter>,
    timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryParameter {
    name: &'static str,
    parameter_type: ParameterType,
    parameter_value: ParameterValue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct ParameterType {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct ParameterValue {
    value: String,
}

impl QueryParameter {
    fn float(name: &'static str, value: f64) -> Self {
        Self::typed(name, "FLOAT64", value.to_string())
    }

    fn int(name: &'static str, value: u32) -> Self {
        Self::typed(name, "INT64", value.to_string())
    }

    fn string(name: &'static str, value: &str) -> Self {
        Self::typed(name, "STRING", value.to_string())
    }

    fn typed(name: &'static str, kind: &'static str, value: String) -> Self {
        Self {
            name,
            parameter_type: ParameterType { kind },
            parameter_value: ParameterValue { value },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    #[serde(default)]
    job_complete: bool,
    #[serde(default)]
    rows: Vec<Row>,
}

#[derive(Debug, Deserialize)]
struct Row {
    f: Vec<Cell>,
}

#[derive(Debug, Deserialize)]
struct Cell {
    v: Option<String>,
}

/// Runs throughput averages over the M-Lab NDT tables through the
/// BigQuery `jobs.query` REST endpoint.
pub struct BigQueryClient<C> {
    http: C,
    project_id: String,
}

impl BigQueryClient<ApiKey<BasicClient>> {
    /// Client authenticated with an OAuth access token.
    pub fn with_access_token(project_id: &str, token: &str) -> Result<Self> {
        let http = BasicClient::with_timeout(QUERY_TIMEOUT + Duration::from_secs(10))?;
        Ok(Self::new(ApiKey::bearer(http, token)?, project_id))
    }
}

impl<C: HttpClient> BigQueryClient<C> {
    pub fn new(http: C, project_id: &str) -> Self {
        Self {
            http,
            project_id: project_id.to_string(),
        }
    }
}

#[async_trait]
impl<C: HttpClient> ThroughputMetrics for BigQueryClient<C> {
    #[tracing::instrument(skip(self), fields(direction = ?query.direction))]
    async fn average_throughput(&self, query: &ThroughputQuery) -> Result<f64> {
        let (sql, query_parameters) = build_query(query);
        let body = QueryRequest {
            query: sql,
            use_legacy_sql: false,
            parameter_mode: "NAMED",
            query_parameters,
            timeout_ms: QUERY_TIMEOUT.as_millis() as u64,
        };

        let url = format!("{}/projects/{}/queries", BASE_URL, self.project_id);
        let response: QueryResponse = fetch_json(&self.http, post_json(&url, &body)?).await?;
        let average = read_average(response)?;
        debug!(average, "Throughput query finished");
        Ok(average)
    }
}

fn table(direction: ThroughputDirection) -> &'static str {
    match direction {
        ThroughputDirection::Download => "measurement-lab.ndt.unified_downloads",
        ThroughputDirection::Upload => "measurement-lab.ndt.unified_uploads",
    }
}

// Only the table name is spliced into the SQL; every user-derived value is
// a named parameter.
fn build_query(query: &ThroughputQuery) -> (String, Vec<QueryParameter>) {
    let days = QueryParameter::int("days", query.recency_days);
    let recency = "date > DATE_SUB(CURRENT_DATE(), INTERVAL @days DAY)";

    match &query.area {
        Area::Country(name) => (
            format!(
                "SELECT AVG(a.MeanThroughputMbps) AS avg FROM `{}` \
                 WHERE LOWER(client.Geo.CountryName) = @country AND {} LIMIT 3000",
                table(query.direction),
                recency
            ),
            vec![QueryParameter::string("country", name), days],
        ),
        Area::BoundingBox(bbox) => (
            format!(
                "SELECT AVG(a.MeanThroughputMbps) AS avg FROM `{}` \
                 WHERE client.Geo.Latitude BETWEEN @min_lat AND @max_lat \
                 AND client.Geo.Longitude BETWEEN @min_lng AND @max_lng \
                 AND {} LIMIT 3000",
                table(query.direction),
                recency
            ),
            vec![
                QueryParameter::float("min_lat", bbox.min_lat),
                QueryParameter::float("max_lat", bbox.max_lat),
                QueryParameter::float("min_lng", bbox.min_lng),
                QueryParameter::float("max_lng", bbox.max_lng),
                days,
            ],
        ),
    }
}

fn read_average(response: QueryResponse) -> Result<f64> {
    if !response.job_complete {
        return Err(anyhow!("query did not complete in time"));
    }

    let value = response
        .rows
        .into_iter()
        .next()
        .and_then(|row| row.f.into_iter().next())
        .and_then(|cell| cell.v)
        .ok_or_else(|| anyhow!("no results found"))?;

    value
        .parse()
        .map_err(|e| anyhow!("unexpected average '{}': {}", value, e))
}
