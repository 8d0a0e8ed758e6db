use async_trait::async_trait;
use reqwest::{Request, Response};

/// Seam for executing HTTP requests, so auth wrappers can decorate a client.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
