use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// A normalized profile extracted from a link-aggregation page.
///
/// Every field is always serialized; absent scalars become `null` so
/// consumers see a stable shape regardless of what the upstream page held.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRecord {
    /// The profile's declared handle.
    pub username: Option<String>,
    /// Bio text.
    pub description: Option<String>,
    /// Avatar URL.
    #[serde(rename = "profilePictureUrl")]
    pub profile_picture_url: Option<String>,
    /// Outbound links in upstream declaration order.
    #[serde(default)]
    pub links: Vec<LinkEntry>,
}

/// One outbound link, serialized as a single-entry object `{ "<Title>": "<url>" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, String>",
    into = "BTreeMap<String, String>"
)]
pub struct LinkEntry {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LinkEntryError {
    #[error("link entry must have exactly one title/url pair, found {0}")]
    WrongArity(usize),
}

impl LinkEntry {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
        }
    }
}

impl TryFrom<BTreeMap<String, String>> for LinkEntry {
    type Error = LinkEntryError;

    fn try_from(map: BTreeMap<String, String>) -> Result<Self, Self::Error> {
        if map.len() != 1 {
            return Err(LinkEntryError::WrongArity(map.len()));
        }
        let (title, url) = map
            .into_iter()
            .next()
            .ok_or(LinkEntryError::WrongArity(0))?;
        Ok(Self { title, url })
    }
}

impl From<LinkEntry> for BTreeMap<String, String> {
    fn from(link: LinkEntry) -> Self {
        BTreeMap::from([(link.title, link.url)])
    }
}

impl ProfileRecord {
    /// Titles of all links, in order.
    pub fn link_titles(&self) -> Vec<&str> {
        self.links.iter().map(|l| l.title.as_str()).collect()
    }
}
