//! Error types for dataset retrieval and parsing.
//!
//! Only [`Error::SourceUnavailable`] ever reaches the caller of a dashboard
//! run. Everything the pipeline can recover from is reported as a
//! [`Notice`](crate::pipeline::types::Notice) instead.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The dataset could not be fetched or did not have a usable shape.
    #[error("dataset '{dataset}' unavailable: {source}")]
    SourceUnavailable {
        dataset: String,
        #[source]
        source: SourceError,
    },
}

impl Error {
    pub fn unavailable(dataset: impl Into<String>, source: impl Into<SourceError>) -> Self {
        Error::SourceUnavailable {
            dataset: dataset.into(),
            source: source.into(),
        }
    }
}

/// Underlying cause of a [`Error::SourceUnavailable`].
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {0}")]
    Status(reqwest::StatusCode),

    #[error("invalid URL: {0}")]
    Url(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
}

/// Failures turning CSV bytes into a [`Dataset`](crate::dataset::Dataset).
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing date column '{0}'")]
    MissingDateColumn(String),

    #[error("row {row}: invalid month '{value}'")]
    InvalidMonth { row: usize, value: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
