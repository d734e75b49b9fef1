pub mod error;
pub mod extract;
pub mod fetch;
pub mod normalize;
pub mod output;

pub use error::{Error, ExtractError, ExtractWarning, FetchError};
pub use extract::{extract, Extraction};
pub use fetch::{FetchConfig, Fetcher};

use std::collections::BTreeMap;
use std::path::Path;

/// Fetch the profile page for `identifier` and extract its record.
///
/// When `cache_path` is given the raw page is written there before
/// extraction, so it survives an extraction failure. Fatal failures from
/// either stage abort with no partial record. Non-fatal anomalies come back
/// as warnings alongside the record.
pub async fn acquire(
    identifier: &str,
    headers: Option<&BTreeMap<String, String>>,
    config: &FetchConfig,
    cache_path: Option<&Path>,
) -> Result<Extraction, Error> {
    let fetcher = Fetcher::new(config)?;
    let html = fetcher.fetch(identifier, headers).await?;

    if let Some(path) = cache_path {
        output::cache_html(path, &html).map_err(|source| Error::Io {
            path: path.display().to_string(),
            source,
        })?;
    }

    let extraction = extract(&html)?;
    tracing::info!(
        links = extraction.record.links.len(),
        warnings = extraction.warnings.len(),
        "Extracted profile record"
    );
    Ok(extraction)
}

/// Run the extractor over a previously saved HTML page.
pub fn extract_file(path: impl AsRef<Path>) -> Result<Extraction, Error> {
    let path = path.as_ref();
    let html = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.display().to_string(),
        source,
    })?;
    tracing::info!(path = %path.display(), bytes = html.len(), "Read saved HTML");
    Ok(extract(&html)?)
}
