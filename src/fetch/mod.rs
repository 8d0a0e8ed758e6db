mod basic;
mod client;
pub mod auth;
pub mod source;

pub use basic::BasicClient;
pub use client::HttpClient;
pub use source::{DatasetSource, FileSource, HttpSource};

use tracing::debug;

use crate::error::SourceError;

/// GETs `url` and returns the body, treating any non-2xx status as a failure.
pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Vec<u8>, SourceError> {
    let req = reqwest::Request::new(
        reqwest::Method::GET,
        url.parse().map_err(|e| SourceError::Url(format!("{url}: {e}")))?,
    );

    let resp = client.execute(req).await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(SourceError::Status(status));
    }

    let bytes = resp.bytes().await?;
    debug!(url, bytes = bytes.len(), "Response body received");
    Ok(bytes.to_vec())
}
