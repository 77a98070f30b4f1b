//! Publishing reports to S3.
//!
//! Keys are partitioned by run date: `<prefix>/date=YYYY-MM-DD.<ext>`, with
//! `.gz` appended when the body is compressed.

use std::io::Write;

use anyhow::Result;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use chrono::NaiveDate;
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;
use tracing::info;

/// Builds a client from the default AWS environment (env vars, profile, ...).
pub async fn s3_client() -> aws_sdk_s3::Client {
    let config = aws_config::load_from_env().await;
    aws_sdk_s3::Client::new(&config)
}

pub fn dated_key(prefix: &str, date: NaiveDate, extension: &str) -> String {
    format!("{}/date={}.{}", prefix, date.format("%Y-%m-%d"), extension)
}

pub fn gzip(body: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(body)?;
    Ok(encoder.finish()?)
}

/// Serializes a value to JSON and uploads it to an S3 bucket with `application/json` content type.
pub async fn write_json_to_s3(
    client: &aws_sdk_s3::Client,
    bucket: &str,
    key: &str,
    value: &impl Serialize,
) -> Result<()> {
    let body = serde_json::to_vec(value)?;

    client
        .put_object()
        .bucket(bucket)
        .key(key)
        .body(ByteStream::from(body))
        .content_type("application/json")
        .send()
        .await?;

    info!(bucket, key, "Uploaded JSON to S3");
    Ok(())
}

/// Uploads a CSV report, gzip-compressed when asked. Returns the key used.
pub async fn upload_csv(
    client: &aws_sdk_s3::Client,
    bucket: &str,
    key: &str,
    body: Bytes,
    compress: bool,
) -> Result<String> {
    let (body, key) = if compress {
        (Bytes::from(gzip(&body)?), format!("{key}.gz"))
    } else {
        (body, key.to_string())
    };

    let request = client
        .put_object()
        .bucket(bucket)
        .key(&key)
        .body(ByteStream::from(body))
        .content_type("text/csv");
    let request = if compress {
        request.content_encoding("gzip")
    } else {
        request
    };
    request.send().await?;

    info!(bucket, key = %key, compress, "Uploaded CSV to S3");
    Ok(key)
}
