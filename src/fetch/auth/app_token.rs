use crate::fetch::client::HttpClient;
use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue, InvalidHeaderValue};

/// Header Socrata portals (data.ny.gov) read an application token from.
pub const APP_TOKEN_HEADER: &str = "x-app-token";

/// An [`HttpClient`] wrapper that sends a Socrata application token with
/// every request. Anonymous requests work too, but are throttled harder.
pub struct AppToken<C> {
    inner: C,
    value: HeaderValue,
}

impl<C> AppToken<C> {
    /// Fails if `token` contains characters not allowed in a header value.
    pub fn new(inner: C, token: &str) -> Result<Self, InvalidHeaderValue> {
        let mut value = HeaderValue::from_str(token)?;
        value.set_sensitive(true);
        Ok(Self { inner, value })
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for AppToken<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        req.headers_mut().insert(
            HeaderName::from_static(APP_TOKEN_HEADER),
            self.value.clone(),
        );
        self.inner.execute(req).await
    }
}
