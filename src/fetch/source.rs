//! Dataset sources: where the raw table for a [`DatasetId`] comes from.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::info;

use crate::catalog::DatasetId;
use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::fetch::{HttpClient, fetch_bytes};
use crate::parser::parse_dataset;

/// Default portal hosting the MTA datasets.
pub const DEFAULT_BASE_URL: &str = "https://data.ny.gov";

/// Supplies a full snapshot of a named dataset.
///
/// Any failure to retrieve or decode the data is reported as
/// [`Error::SourceUnavailable`].
#[async_trait]
pub trait DatasetSource: Send + Sync {
    async fn fetch(&self, id: DatasetId) -> Result<Dataset>;
}

/// Downloads the CSV snapshot over HTTP.
pub struct HttpSource<C> {
    client: C,
    base_url: String,
    url_override: Option<String>,
}

impl<C: HttpClient> HttpSource<C> {
    pub fn new(client: C, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            url_override: None,
        }
    }

    /// Fetches from `url` instead of the catalog URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url_override = Some(url.into());
        self
    }

    fn url_for(&self, id: DatasetId) -> String {
        self.url_override
            .clone()
            .unwrap_or_else(|| id.download_url(&self.base_url))
    }
}

#[async_trait]
impl<C: HttpClient> DatasetSource for HttpSource<C> {
    #[tracing::instrument(skip(self), fields(dataset = %id))]
    async fn fetch(&self, id: DatasetId) -> Result<Dataset> {
        let url = self.url_for(id);
        let bytes = fetch_bytes(&self.client, &url)
            .await
            .map_err(|e| Error::unavailable(id.slug(), e))?;
        let dataset = parse_dataset(&bytes, &id.schema_hints())
            .map_err(|e| Error::unavailable(id.slug(), e))?;

        info!(url, rows = dataset.len(), "Dataset fetched");
        Ok(dataset)
    }
}

/// Reads a CSV snapshot from a local file, for offline use.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DatasetSource for FileSource {
    #[tracing::instrument(skip(self), fields(dataset = %id, path = %self.path.display()))]
    async fn fetch(&self, id: DatasetId) -> Result<Dataset> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| Error::unavailable(id.slug(), e))?;
        let dataset = parse_dataset(&bytes, &id.schema_hints())
            .map_err(|e| Error::unavailable(id.slug(), e))?;

        info!(rows = dataset.len(), "Dataset loaded from file");
        Ok(dataset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceError;
    use crate::fetch::BasicClient;
    use std::env;
    use std::fs;
    use std::sync::{Arc, Mutex};

    /// Answers every request with a fixed status and body and remembers the
    /// requested URLs.
    #[derive(Clone)]
    struct StubClient {
        status: u16,
        body: &'static str,
        urls: Arc<Mutex<Vec<String>>>,
    }

    impl StubClient {
        fn new(status: u16, body: &'static str) -> Self {
            Self {
                status,
                body,
                urls: Arc::default(),
            }
        }
    }

    #[async_trait]
    impl HttpClient for StubClient {
        async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
            self.urls.lock().unwrap().push(req.url().to_string());
            let resp = http::Response::builder()
                .status(self.status)
                .body(self.body)
                .unwrap();
            Ok(resp.into())
        }
    }

    fn temp_path(name: &str) -> PathBuf {
        env::temp_dir().join(name)
    }

    #[tokio::test]
    async fn test_file_source_loads_csv() {
        let path = temp_path("bus_dashboards_source_ok.csv");
        let csv = "month,borough,total_mileage\n2021-01,Bronx,10\n";
        fs::write(&path, csv).unwrap();

        let ds = FileSource::new(&path)
            .fetch(DatasetId::BusSpeeds)
            .await
            .unwrap();
        assert_eq!(ds.len(), 1);

        fs::remove_file(&path).unwrap();
    }

    #[tokio::test]
    async fn test_missing_file_is_source_unavailable() {
        let err = FileSource::new(temp_path("bus_dashboards_does_not_exist.csv"))
            .fetch(DatasetId::BusSpeeds)
            .await
            .unwrap_err();

        let Error::SourceUnavailable { dataset, source } = err;
        assert_eq!(dataset, "bus-speeds");
        assert!(matches!(source, SourceError::Io(_)));
    }

    #[tokio::test]
    async fn test_bad_schema_is_source_unavailable() {
        let path = temp_path("bus_dashboards_source_bad.csv");
        let csv = "borough,total_mileage\nBronx,10\n";
        fs::write(&path, csv).unwrap();

        let err = FileSource::new(&path)
            .fetch(DatasetId::CustomerJourney)
            .await
            .unwrap_err();
        let Error::SourceUnavailable { source, .. } = err;
        assert!(matches!(source, SourceError::Parse(_)));

        fs::remove_file(&path).unwrap();
    }

    #[tokio::test]
    async fn test_invalid_url_is_source_unavailable() {
        let source = HttpSource::new(BasicClient::new(), DEFAULT_BASE_URL)
            .with_url("not a url");
        let err = source.fetch(DatasetId::BusSpeeds).await.unwrap_err();

        let Error::SourceUnavailable { source, .. } = err;
        assert!(matches!(source, SourceError::Url(_)));
    }

    #[tokio::test]
    async fn test_http_source_parses_body() {
        let client = StubClient::new(200, "month,borough,total_mileage\n2021-01,Bronx,10\n");
        let source = HttpSource::new(client.clone(), DEFAULT_BASE_URL);

        let ds = source.fetch(DatasetId::BusSpeeds).await.unwrap();

        assert_eq!(ds.len(), 1);
        assert_eq!(
            client.urls.lock().unwrap().as_slice(),
            [DatasetId::BusSpeeds.download_url(DEFAULT_BASE_URL)]
        );
    }

    #[tokio::test]
    async fn test_error_status_is_source_unavailable() {
        let source = HttpSource::new(StubClient::new(503, "busy"), DEFAULT_BASE_URL);
        let err = source.fetch(DatasetId::CustomerJourney).await.unwrap_err();

        let Error::SourceUnavailable { dataset, source } = err;
        assert_eq!(dataset, "customer-journey");
        assert!(matches!(
            source,
            SourceError::Status(status) if status == reqwest::StatusCode::SERVICE_UNAVAILABLE
        ));
    }

    #[tokio::test]
    async fn test_unparseable_body_is_source_unavailable() {
        let client = StubClient::new(200, "<html>maintenance</html>");
        let source = HttpSource::new(client, DEFAULT_BASE_URL);
        let err = source.fetch(DatasetId::BusSpeeds).await.unwrap_err();

        let Error::SourceUnavailable { source, .. } = err;
        assert!(matches!(source, SourceError::Parse(_)));
    }

    #[test]
    fn test_catalog_url_used_without_override() {
        let source = HttpSource::new(BasicClient::new(), DEFAULT_BASE_URL);
        let url = source.url_for(DatasetId::CustomerJourney);
        assert!(url.contains("wrt8-4b59"));
    }
}
