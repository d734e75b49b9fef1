use reqwest::StatusCode;
use thiserror::Error;

/// Transport-level failures while fetching a profile page. All are fatal.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status} for {url}")]
    HttpStatus { status: StatusCode, url: String },

    #[error("could not connect to {url}: {reason}")]
    Connection { url: String, reason: String },

    #[error("timed out waiting for {url}")]
    Timeout { url: String },

    #[error("request to {url} failed: {reason}")]
    Request { url: String, reason: String },
}

/// Structural failures while extracting a record from page HTML. All are fatal.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("no __NEXT_DATA__ script found; not a profile page or the markup changed")]
    MissingDataIsland,

    #[error("embedded page data is not valid JSON")]
    MalformedJson(#[from] serde_json::Error),

    #[error("unexpected page data schema: missing `{segment}` under `{parent}`")]
    UnexpectedSchema {
        segment: &'static str,
        parent: String,
    },
}

/// Non-fatal anomalies. The record is still produced, with degraded content.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExtractWarning {
    #[error("links container is {found}, expected an array; emitting no links")]
    MalformedLinksContainer { found: &'static str },

    #[error("skipping malformed link entry #{index}: {raw}")]
    MalformedLinkEntry {
        index: usize,
        raw: serde_json::Value,
    },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("I/O error on {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Process exit status for this failure; distinct per failure kind.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Io { .. } => 1,
            Error::Fetch(FetchError::HttpStatus { .. }) => 3,
            Error::Fetch(FetchError::Connection { .. }) => 4,
            Error::Fetch(FetchError::Timeout { .. }) => 5,
            Error::Fetch(FetchError::Request { .. }) => 6,
            Error::Extract(ExtractError::MissingDataIsland) => 7,
            Error::Extract(ExtractError::MalformedJson(_)) => 8,
            Error::Extract(ExtractError::UnexpectedSchema { .. }) => 9,
        }
    }
}
