//! Data models passed between the pipeline stages.
//!
//! - [`Candidate`]: a forecast link found on a listing page
//! - [`Extraction`]: which strategy produced the candidates, if any
//! - [`Selection`]: the one forecast chosen for this run
//! - [`Download`]: a fetched binary payload with its declared content type

use url::Url;

/// Marker in the URL of the canonical storm forecast document.
pub const STORM_FORECAST_MARKER: &str = "stormforecast.xml";

/// A link believed to reference a forecast document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// The href exactly as it appeared in the markup.
    pub raw_href: String,
    /// The href resolved against the listing page URL.
    pub url: Url,
    /// Whether the URL names the storm forecast document.
    pub preferred: bool,
}

impl Candidate {
    pub fn new(raw_href: impl Into<String>, url: Url) -> Self {
        let preferred = url
            .as_str()
            .to_ascii_lowercase()
            .contains(STORM_FORECAST_MARKER);
        Self {
            raw_href: raw_href.into(),
            url,
            preferred,
        }
    }

    /// Build a candidate from an absolute URL string.
    #[cfg(test)]
    pub fn parse(absolute: &str) -> Result<Self, url::ParseError> {
        Ok(Self::new(absolute, Url::parse(absolute)?))
    }
}

/// Outcome of link extraction over one listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// Found by walking `<a href>` elements.
    Structured(Vec<Candidate>),
    /// Found by the permissive text pattern after the structured pass came up empty.
    Fallback(Vec<Candidate>),
    Empty,
}

impl Extraction {
    pub fn strategy(&self) -> &'static str {
        match self {
            Extraction::Structured(_) => "structured",
            Extraction::Fallback(_) => "fallback",
            Extraction::Empty => "none",
        }
    }

    pub fn candidates(&self) -> &[Candidate] {
        match self {
            Extraction::Structured(c) | Extraction::Fallback(c) => c,
            Extraction::Empty => &[],
        }
    }
}

/// The forecast chosen for this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Listing page the forecast was found on.
    pub source: String,
    pub forecast: Candidate,
    /// How many distinct candidates that page offered.
    pub candidate_count: usize,
}

/// A fetched binary body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub bytes: Vec<u8>,
    /// Lowercased `Content-Type` header, when the server sent one.
    pub content_type: Option<String>,
}
