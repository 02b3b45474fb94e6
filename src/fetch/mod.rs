//! HTTP plumbing for pulling raw feed bytes.

mod api_key;
mod basic;
mod client;

pub use api_key::ApiKey;
pub use basic::BasicClient;
pub use client::HttpClient;

use anyhow::{Context, Result};
use reqwest::header::{ACCEPT, HeaderValue};

/// GETs `url` through `client` and returns the response body.
///
/// Non-success statuses are returned as errors.
pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Vec<u8>> {
    let mut req = reqwest::Request::new(
        reqwest::Method::GET,
        url.parse().with_context(|| format!("invalid feed URL '{url}'"))?,
    );
    req.headers_mut()
        .insert(ACCEPT, HeaderValue::from_static("application/x-google-protobuf"));

    let resp = client.execute(req).await?.error_for_status()?;
    Ok(resp.bytes().await?.to_vec())
}
