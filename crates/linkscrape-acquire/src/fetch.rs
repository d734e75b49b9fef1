use crate::error::FetchError;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::collections::BTreeMap;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://linktr.ee/";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings for the page fetcher.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Prefix the identifier is appended to, verbatim.
    pub base_url: String,
    /// Whole-request deadline.
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: concat!("linkscrape/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Retrieves raw profile pages. One GET per call: no retries, no caching.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    base_url: String,
}

impl Fetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout)
            .build()
            .map_err(|e| FetchError::Request {
                url: config.base_url.clone(),
                reason: describe(&e),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    /// The address fetched for `identifier`. The identifier is not escaped.
    pub fn page_url(&self, identifier: &str) -> String {
        format!("{}{identifier}", self.base_url)
    }

    /// Fetch the page for `identifier` and return its body as text.
    ///
    /// Any non-2xx status is an error. Transport failures are split into
    /// connection, timeout and generic request failures.
    pub async fn fetch(
        &self,
        identifier: &str,
        headers: Option<&BTreeMap<String, String>>,
    ) -> Result<String, FetchError> {
        let url = self.page_url(identifier);

        let mut request = self.client.get(&url);
        if let Some(headers) = headers {
            request = request.headers(header_map(&url, headers)?);
        }

        tracing::info!(
            url = %url,
            headers = headers.map_or(0, |h| h.len()),
            "Fetching profile page"
        );
        let response = request.send().await.map_err(|e| classify(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus { status, url });
        }

        let html = response.text().await.map_err(|e| classify(&url, e))?;
        tracing::info!(bytes = html.len(), "Received HTML");
        Ok(html)
    }
}

fn header_map(url: &str, headers: &BTreeMap<String, String>) -> Result<HeaderMap, FetchError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let invalid = |what: &str| FetchError::Request {
            url: url.to_string(),
            reason: format!("invalid header {what} for `{name}`"),
        };
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid("name"))?;
        let header_value = HeaderValue::from_str(value).map_err(|_| invalid("value"))?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}

fn classify(url: &str, err: reqwest::Error) -> FetchError {
    let url = url.to_string();
    if err.is_timeout() {
        FetchError::Timeout { url }
    } else if err.is_connect() {
        FetchError::Connection {
            url,
            reason: describe(&err),
        }
    } else {
        FetchError::Request {
            url,
            reason: describe(&err),
        }
    }
}

/// Flatten an error and its sources into one line.
fn describe(err: &dyn std::error::Error) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}
