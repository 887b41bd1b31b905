use crate::{DigestError, Result};
use ::scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use tracing::instrument;

/// The `PageDocument` struct holds the markup of a loaded page and answers CSS queries against it.
///
/// The raw markup is kept instead of a parsed tree so that documents can be held across await
/// points; every query parses the page again.
#[derive(Debug, Clone)]
pub struct PageDocument {
    /// The URL the page was loaded from.
    url: String,
    /// The raw HTML of the page.
    html: String,
}

/// An element matched by a CSS selector, detached from its document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// The whitespace-normalized text content of the element.
    pub text: String,
    /// The attributes of the element.
    attributes: HashMap<String, String>,
    /// The outer HTML of the element, used for nested queries.
    html: String,
}

impl PageDocument {
    /// Creates a new `PageDocument` from a URL and the markup served for it.
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Finds all elements matching the selector, in document order.
    ///
    /// # Arguments
    ///
    /// * `selector` - A CSS selector.
    ///
    /// # Returns
    ///
    /// A `Result` containing the matched elements, or an error if the selector is invalid.
    /// No match is an empty vector, not an error.
    #[instrument(skip(self), fields(url = %self.url, html_length = self.html.len()))]
    pub fn select(&self, selector: &str) -> Result<Vec<Element>> {
        let selector = parse_selector(selector)?;
        let document = Html::parse_document(&self.html);
        Ok(document.select(&selector).map(Element::from_ref).collect())
    }
}

impl Element {
    fn from_ref(element: ElementRef<'_>) -> Self {
        let attributes = element
            .value()
            .attrs()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();

        Self {
            text: clean_text(&element.text().collect::<String>()),
            attributes,
            html: element.html(),
        }
    }

    /// Returns the value of an attribute, if present.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Finds all descendants of this element matching the selector, in document order.
    pub fn select(&self, selector: &str) -> Result<Vec<Element>> {
        let selector = parse_selector(selector)?;
        let fragment = Html::parse_fragment(&self.html);
        Ok(fragment
            .select(&selector)
            .map(Element::from_ref)
            .filter(|element| element.html != self.html)
            .collect())
    }
}

/// Parses a CSS selector, mapping parse failures to an extraction error.
fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| DigestError::ExtractionError(format!("invalid selector '{}': {}", selector, e)))
}

/// Cleans the given text by collapsing runs of whitespace into single spaces.
///
/// # Arguments
///
/// * `text` - The text to be cleaned.
///
/// # Returns
///
/// The cleaned text.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
