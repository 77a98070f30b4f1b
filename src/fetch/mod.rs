//! Minimal HTTP plumbing shared by the provider clients.
//!
//! Clients are composed: a [`BasicClient`] does the I/O and the wrappers in
//! [`auth`] inject credentials on the way through.

mod basic;
mod client;
pub mod auth;

pub use basic::BasicClient;
pub use client::HttpClient;

use anyhow::{Result, anyhow};
use reqwest::{Method, Request, Url};
use serde::de::DeserializeOwned;

/// Executes `req` and decodes a JSON body, failing on any non-2xx status.
pub async fn fetch_json<C, T>(client: &C, req: Request) -> Result<T>
where
    C: HttpClient + ?Sized,
    T: DeserializeOwned,
{
    let url = req.url().clone();
    let response = client
        .execute(req)
        .await
        .map_err(|e| anyhow!("Failed to send request to {}: {}", url.path(), e))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(anyhow!("{} returned status {}: {}", url.path(), status, body));
    }

    response
        .json()
        .await
        .map_err(|e| anyhow!("Failed to parse response from {}: {}", url.path(), e))
}

/// Builds a GET request for `base` with the given query parameters.
pub fn get_request(base: &str, params: &[(&str, &str)]) -> Result<Request> {
    let url = Url::parse_with_params(base, params)?;
    Ok(Request::new(Method::GET, url))
}

/// Builds a POST request for `url` carrying `body` as JSON.
pub fn post_json<B: serde::Serialize>(url: &str, body: &B) -> Result<Request> {
    let mut req = Request::new(Method::POST, url.parse()?);
    *req.body_mut() = Some(serde_json::to_vec(body)?.into());
    req.headers_mut().insert(
        reqwest::header::CONTENT_TYPE,
        reqwest::header::HeaderValue::from_static("application/json"),
    );
    Ok(req)
}
