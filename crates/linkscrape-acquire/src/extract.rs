use crate::error::{ExtractError, ExtractWarning};
use crate::normalize::capitalize;
use linkscrape_model::{LinkEntry, ProfileRecord};
use scraper::{Html, Selector};
use serde_json::{Map, Value};

/// The Next.js data island carrying the page's props.
const DATA_ISLAND_SELECTOR: &str = r#"script[id="__NEXT_DATA__"][crossorigin="anonymous"]"#;

/// Required keys from the envelope root down to the account object.
const ACCOUNT_PATH: [&str; 3] = ["props", "pageProps", "account"];

/// A record plus the non-fatal anomalies met while building it.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub record: ProfileRecord,
    pub warnings: Vec<ExtractWarning>,
}

/// Upstream link value, sorted into usable and unusable before normalization.
#[derive(Debug, Clone, PartialEq)]
enum RawLink {
    WellFormed { title: String, url: String },
    Malformed(Value),
}

impl RawLink {
    fn classify(value: &Value) -> Self {
        let pair = value.as_object().and_then(|obj| {
            let title = non_empty_str(obj, "title")?;
            let url = non_empty_str(obj, "url")?;
            Some((title, url))
        });

        match pair {
            Some((title, url)) => RawLink::WellFormed {
                title: title.to_string(),
                url: url.to_string(),
            },
            None => RawLink::Malformed(value.clone()),
        }
    }
}

/// Extract a profile record from the raw HTML of a profile page.
///
/// Fails if the data island is missing, is not JSON, or lacks the
/// `props.pageProps.account` path. Bad link data only produces warnings.
pub fn extract(raw_html: &str) -> Result<Extraction, ExtractError> {
    let island = locate_data_island(raw_html)?;
    let envelope: Value = serde_json::from_str(&island)?;
    let account = navigate(&envelope)?;

    let mut warnings = Vec::new();
    let record = ProfileRecord {
        username: string_field(account, "username"),
        description: string_field(account, "description"),
        profile_picture_url: string_field(account, "profilePictureUrl"),
        links: normalize_links(account.get("links"), &mut warnings),
    };

    for warning in &warnings {
        tracing::debug!("{warning}");
    }

    Ok(Extraction { record, warnings })
}

/// Text of the first `__NEXT_DATA__` script element.
fn locate_data_island(raw_html: &str) -> Result<String, ExtractError> {
    let document = Html::parse_document(raw_html);
    let selector = Selector::parse(DATA_ISLAND_SELECTOR).expect("valid selector");

    let script = document
        .select(&selector)
        .next()
        .ok_or(ExtractError::MissingDataIsland)?;

    let text: String = script.text().collect();
    tracing::debug!(bytes = text.len(), "Located data island");
    Ok(text)
}

/// Walk `ACCOUNT_PATH`, failing on the first segment that is not an object.
fn navigate(envelope: &Value) -> Result<&Map<String, Value>, ExtractError> {
    let missing = |segment: &'static str, parent: &str| {
        tracing::debug!(segment, parent, "Schema path segment missing");
        ExtractError::UnexpectedSchema {
            segment,
            parent: parent.to_string(),
        }
    };

    let root = envelope
        .as_object()
        .ok_or_else(|| missing(ACCOUNT_PATH[0], "$"))?;

    let (account, _) = ACCOUNT_PATH.iter().try_fold(
        (root, String::from("$")),
        |(node, parent), &segment| {
            let child = node
                .get(segment)
                .and_then(Value::as_object)
                .ok_or_else(|| missing(segment, &parent))?;
            Ok::<_, ExtractError>((child, format!("{parent}.{segment}")))
        },
    )?;

    Ok(account)
}

fn string_field(account: &Map<String, Value>, key: &str) -> Option<String> {
    match account.get(key) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Null) | None => None,
        Some(other) => {
            tracing::debug!(key, kind = json_kind(Some(other)), "Ignoring non-string field");
            None
        }
    }
}

fn normalize_links(links: Option<&Value>, warnings: &mut Vec<ExtractWarning>) -> Vec<LinkEntry> {
    let Some(entries) = links.and_then(Value::as_array) else {
        warnings.push(ExtractWarning::MalformedLinksContainer {
            found: json_kind(links),
        });
        return Vec::new();
    };

    entries
        .iter()
        .enumerate()
        .filter_map(|(index, value)| match RawLink::classify(value) {
            RawLink::WellFormed { title, url } => Some(LinkEntry::new(capitalize(&title), url)),
            RawLink::Malformed(raw) => {
                warnings.push(ExtractWarning::MalformedLinkEntry { index, raw });
                None
            }
        })
        .collect()
}

fn non_empty_str<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    obj.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

fn json_kind(value: Option<&Value>) -> &'static str {
    match value {
        None => "absent",
        Some(Value::Null) => "null",
        Some(Value::Bool(_)) => "a boolean",
        Some(Value::Number(_)) => "a number",
        Some(Value::String(_)) => "a string",
        Some(Value::Array(_)) => "an array",
        Some(Value::Object(_)) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn page_with_next_data(next_data: &str) -> String {
        format!(
            r#"
            <html>
                <body>
                    <script id="__NEXT_DATA__" crossorigin="anonymous" type="application/json">
                    {next_data}
                    </script>
                </body>
            </html>
            "#
        )
    }

    fn page_with_account(account: Value) -> String {
        let envelope = json!({ "props": { "pageProps": { "account": account } } });
        page_with_next_data(&envelope.to_string())
    }

    fn schema_failure(envelope: Value) -> (&'static str, String) {
        match extract(&page_with_next_data(&envelope.to_string())) {
            Err(ExtractError::UnexpectedSchema { segment, parent }) => (segment, parent),
            other => panic!("expected UnexpectedSchema, got {other:?}"),
        }
    }

    #[test]
    fn test_extracts_profile_scenario() {
        let html = page_with_next_data(
            r#"{"props":{"pageProps":{"account":{"username":"testuser","description":"bio","profilePictureUrl":"http://x/p.jpg","links":[{"title":"Link1","url":"http://x/1"},{"title":"Link2","url":"http://x/2"}]}}}}"#,
        );

        let extraction = extract(&html).unwrap();
        assert!(extraction.warnings.is_empty());
        assert_eq!(
            serde_json::to_string(&extraction.record).unwrap(),
            r#"{"username":"testuser","description":"bio","profilePictureUrl":"http://x/p.jpg","links":[{"Link1":"http://x/1"},{"Link2":"http://x/2"}]}"#
        );
    }

    #[test]
    fn test_links_keep_order_and_capitalize() {
        let html = page_with_account(json!({
            "username": "testuser",
            "description": "Test description",
            "profilePictureUrl": "http://example.com/pic.jpg",
            "links": [
                { "title": "zeta SITE", "url": "http://example.com/z" },
                { "title": "Alpha", "url": "http://example.com/a" },
                { "title": "my Shop", "url": "http://example.com/s", "id": 7 },
            ]
        }));

        let record = extract(&html).unwrap().record;
        assert_eq!(record.username.as_deref(), Some("testuser"));
        assert_eq!(record.description.as_deref(), Some("Test description"));
        assert_eq!(record.profile_picture_url.as_deref(), Some("http://example.com/pic.jpg"));
        assert_eq!(
            record.links,
            vec![
                LinkEntry::new("Zeta site", "http://example.com/z"),
                LinkEntry::new("Alpha", "http://example.com/a"),
                LinkEntry::new("My shop", "http://example.com/s"),
            ]
        );
    }

    #[test]
    fn test_malformed_links_are_skipped_with_warnings() {
        let html = page_with_account(json!({
            "username": "testuser",
            "links": [
                { "title": "Good Link", "url": "http://good.com" },
                "not a dict",
                { "title": "Missing URL" },
                { "url": "http://missingtitle.com" },
                { "title": "", "url": "http://emptytitle.com" },
                { "title": 42, "url": "http://numbertitle.com" },
                { "title": "Second Good", "url": "http://second.com" },
            ]
        }));

        let extraction = extract(&html).unwrap();
        assert_eq!(
            extraction.record.links,
            vec![
                LinkEntry::new("Good link", "http://good.com"),
                LinkEntry::new("Second good", "http://second.com"),
            ]
        );

        let skipped: Vec<usize> = extraction
            .warnings
            .iter()
            .map(|w| match w {
                ExtractWarning::MalformedLinkEntry { index, .. } => *index,
                other => panic!("unexpected warning {other:?}"),
            })
            .collect();
        assert_eq!(skipped, vec![1, 2, 3, 4, 5]);
        assert_eq!(
            extraction.warnings[0],
            ExtractWarning::MalformedLinkEntry {
                index: 1,
                raw: json!("not a dict")
            }
        );
    }

    #[test]
    fn test_missing_links_container_degrades_to_empty() {
        let extraction = extract(&page_with_account(json!({ "username": "u" }))).unwrap();
        assert!(extraction.record.links.is_empty());
        assert_eq!(
            extraction.warnings,
            vec![ExtractWarning::MalformedLinksContainer { found: "absent" }]
        );

        let extraction =
            extract(&page_with_account(json!({ "links": { "title": "x" } }))).unwrap();
        assert!(extraction.record.links.is_empty());
        assert_eq!(
            extraction.warnings,
            vec![ExtractWarning::MalformedLinksContainer { found: "an object" }]
        );
    }

    #[test]
    fn test_missing_scalars_are_none() {
        let extraction = extract(&page_with_account(json!({
            "username": null,
            "profilePictureUrl": 12,
            "links": []
        })))
        .unwrap();

        assert_eq!(extraction.record.username, None);
        assert_eq!(extraction.record.description, None);
        assert_eq!(extraction.record.profile_picture_url, None);
        assert!(extraction.warnings.is_empty());
    }

    #[test]
    fn test_missing_data_island() {
        let err = extract("<html><body><p>No script tag</p></body></html>").unwrap_err();
        assert!(matches!(err, ExtractError::MissingDataIsland));
    }

    #[test]
    fn test_data_island_requires_crossorigin_anonymous() {
        let html = r#"<html><body>
            <script id="__NEXT_DATA__" type="application/json">{"props":{}}</script>
            <script id="other" crossorigin="anonymous">{"props":{}}</script>
        </body></html>"#;
        assert!(matches!(extract(html), Err(ExtractError::MissingDataIsland)));
    }

    #[test]
    fn test_malformed_json() {
        let err = extract(&page_with_next_data("This is not valid JSON")).unwrap_err();
        assert!(matches!(err, ExtractError::MalformedJson(_)));
    }

    #[test]
    fn test_schema_failure_names_missing_segment() {
        assert_eq!(
            schema_failure(json!({ "wrong_props_key": {} })),
            ("props", "$".to_string())
        );
        assert_eq!(
            schema_failure(json!({ "props": { "wrong_page_props_key": {} } })),
            ("pageProps", "$.props".to_string())
        );
        assert_eq!(
            schema_failure(json!({ "props": { "pageProps": { "wrong_account_key": {} } } })),
            ("account", "$.props.pageProps".to_string())
        );
    }

    #[test]
    fn test_schema_failure_on_non_object_nodes() {
        assert_eq!(schema_failure(json!([1, 2, 3])), ("props", "$".to_string()));
        assert_eq!(
            schema_failure(json!({ "props": { "pageProps": { "account": "testuser" } } })),
            ("account", "$.props.pageProps".to_string())
        );
    }

    #[test]
    fn test_classify_raw_links() {
        assert_eq!(
            RawLink::classify(&json!({ "title": "T", "url": "u" })),
            RawLink::WellFormed {
                title: "T".into(),
                url: "u".into()
            }
        );
        assert_eq!(RawLink::classify(&json!(3)), RawLink::Malformed(json!(3)));
        assert_eq!(
            RawLink::classify(&json!({ "title": "T", "url": "" })),
            RawLink::Malformed(json!({ "title": "T", "url": "" }))
        );
    }
}
