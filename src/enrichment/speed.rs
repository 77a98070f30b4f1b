//! Cached internet-speed lookup.
//!
//! A location's speed is read from its `internet-speed-cache` document when
//! one exists. Otherwise the download and upload averages are measured
//! concurrently, joined, and cached under the mapping's reference.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, info};

use crate::error::{Error, Result, Signal};
use crate::models::{InternetSpeed, LocationMapping};
use crate::services::{ThroughputDirection, ThroughputMetrics, ThroughputQuery};
use crate::store::{self, DocumentStore};

pub struct SpeedLookup {
    store: Arc<dyn DocumentStore>,
    metrics: Arc<dyn ThroughputMetrics>,
    timeout: Duration,
}

impl SpeedLookup {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        metrics: Arc<dyn ThroughputMetrics>,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            metrics,
            timeout,
        }
    }

    /// Cached or freshly measured speed for `mapping`.
    ///
    /// Measurement failures and timeouts are signal errors; failing to read
    /// or write the cache is a persistence error.
    pub async fn internet_speed(&self, mapping: &LocationMapping) -> Result<InternetSpeed> {
        let path = mapping
            .internet_speed_ref
            .as_ref()
            .ok_or_else(|| Error::signal(Signal::InternetSpeed, "mapping has no speed reference"))?;

        if let Some(data) = self.store.get(path).await? {
            debug!(%path, "Using cached internet speed");
            return store::decode(path, data).map_err(|e| Error::signal(Signal::InternetSpeed, e));
        }

        let (download, upload) = self.measure(mapping).await?;
        let speed = InternetSpeed {
            location_name: mapping.formatted_address.clone(),
            latitude: mapping.latitude,
            longitude: mapping.longitude,
            download_speed_mbps: download,
            upload_speed_mbps: upload,
            types: mapping.types.clone(),
        };

        self.store.set(path, store::encode(path, &speed)?).await?;
        info!(%path, download, upload, "Cached internet speed");
        Ok(speed)
    }

    async fn measure(&self, mapping: &LocationMapping) -> Result<(f64, f64)> {
        let query = |direction| {
            ThroughputQuery::for_place(
                &mapping.formatted_address,
                mapping.latitude,
                mapping.longitude,
                &mapping.types,
                direction,
            )
        };
        let download = query(ThroughputDirection::Download);
        let upload = query(ThroughputDirection::Upload);

        // Either side failing drops the other.
        let joined = timeout(self.timeout, async {
            tokio::try_join!(
                self.metrics.average_throughput(&download),
                self.metrics.average_throughput(&upload),
            )
        })
        .await;

        match joined {
            Ok(Ok(speeds)) => Ok(speeds),
            Ok(Err(e)) => Err(Error::signal(Signal::InternetSpeed, e)),
            Err(_) => Err(Error::signal(
                Signal::InternetSpeed,
                format!("no answer within {}s", self.timeout.as_secs()),
            )),
        }
    }
}
