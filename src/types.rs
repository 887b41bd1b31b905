use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Number of content characters used as a title when a page has none.
const TITLE_FALLBACK_CHARS: usize = 50;

/// Identifier of a site, normalized to trimmed lowercase.
///
/// Any string is a valid `SiteId`; whether a driver exists for it is decided by the
/// [`Registry`](crate::sources::Registry).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SiteId(String);

impl SiteId {
    /// Creates a normalized site identifier.
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_lowercase())
    }

    /// Parses a comma-separated list of sites.
    ///
    /// Entries are normalized, empty entries are skipped and duplicates keep only their first
    /// occurrence, so the result has one element per distinct requested site.
    pub fn parse_list(sites: &str) -> Vec<SiteId> {
        let mut ids: Vec<SiteId> = Vec::new();
        for id in sites.split(',').map(SiteId::new) {
            if !id.0.is_empty() && !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SiteId {
    fn from(raw: &str) -> Self {
        SiteId::new(raw)
    }
}

/// A single visited content location, as reported to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceItem {
    pub url: String,
    pub title: String,
    /// The site the item was found on.
    pub website: String,
}

impl SourceItem {
    /// Builds the reported source for an extracted item.
    ///
    /// Returns `None` when the item has no url, since such items cannot be cited.
    pub fn from_extracted(item: &ExtractedItem, site: &SiteId) -> Option<Self> {
        if item.url.trim().is_empty() {
            return None;
        }

        let title = match item.title.as_deref().map(str::trim) {
            Some(title) if !title.is_empty() => title.to_string(),
            _ => format!(
                "{}...",
                item.text.chars().take(TITLE_FALLBACK_CHARS).collect::<String>()
            ),
        };

        Some(Self {
            url: item.url.clone(),
            title,
            website: site.to_string(),
        })
    }
}

/// Content extracted from one visited location by a source driver.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedItem {
    pub url: String,
    pub title: Option<String>,
    pub text: String,
}

/// Raw outcome of acquiring content from one site.
///
/// `error` set means the site failed. An empty `text` with no `error` means nothing was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquisitionResult {
    pub site: SiteId,
    pub text: String,
    pub sources: Vec<SourceItem>,
    pub error: Option<String>,
}

impl AcquisitionResult {
    /// A successful (possibly empty) acquisition.
    pub fn success(site: SiteId, text: String, sources: Vec<SourceItem>) -> Self {
        Self {
            site,
            text,
            sources,
            error: None,
        }
    }

    /// A failed acquisition; failures never carry sources.
    pub fn failure(site: SiteId, error: impl Into<String>) -> Self {
        Self {
            site,
            text: String::new(),
            sources: Vec::new(),
            error: Some(error.into()),
        }
    }

    pub fn has_content(&self) -> bool {
        self.error.is_none() && !self.text.trim().is_empty()
    }
}

/// A bounded slice of a longer text, tagged with its position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub index: usize,
    pub text: String,
}

/// Final per-site record returned to the caller.
///
/// Exactly one of `summary` and `error` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteSummary {
    #[serde(skip)]
    pub site: Option<SiteId>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
    pub sources: Vec<SourceItem>,
}

impl SiteSummary {
    pub fn summarized(site: SiteId, summary: String, sources: Vec<SourceItem>) -> Self {
        Self {
            site: Some(site),
            summary: Some(summary),
            error: None,
            sources,
        }
    }

    pub fn failed(site: SiteId, error: impl Into<String>) -> Self {
        Self {
            site: Some(site),
            summary: None,
            error: Some(error.into()),
            sources: Vec::new(),
        }
    }
}

/// Everything produced for one keyword request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub keyword: String,
    pub results: BTreeMap<SiteId, SiteSummary>,
}
