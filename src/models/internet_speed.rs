use serde::{Deserialize, Serialize};

/// Cached average throughput for a location.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InternetSpeed {
    pub location_name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(rename = "downloadSpeed_mbps")]
    pub download_speed_mbps: f64,
    #[serde(rename = "uploadSpeed_mbps")]
    pub upload_speed_mbps: f64,
    pub types: Vec<String>,
}
