//! Forecast link extraction from listing markup.
//!
//! The ESTOFEX listing links each forecast as
//! `/cgi-bin/polygon/showforecast.cgi?text=yes&fcstfile=...`. Links are
//! collected in two passes:
//!
//! 1. **Structured**: every `<a href>` whose href matches the forecast pattern
//! 2. **Fallback**: a permissive regex over the raw text, only when pass 1 found
//!    nothing (minimal or broken markup, plain-text responses)
//!
//! Either way the result is resolved against the listing URL and deduplicated
//! keeping the first occurrence, so page order (newest first) survives.

use crate::models::{Candidate, Extraction};
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::{debug, instrument};
use url::Url;

static ANCHOR_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("static selector is valid"));

static FORECAST_HREF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)showforecast\.cgi.*fcstfile=").expect("static regex is valid"));

static FALLBACK_HREF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)(?:href=["']?)?(/?cgi-bin/\S*showforecast\.cgi\?[^"'\s>]*fcstfile=[^"'\s>]+)"#,
    )
    .expect("static regex is valid")
});

/// Extract forecast links from `markup`, resolving them against `base`.
///
/// Never fails: unparseable markup falls through to the text pattern, and
/// hrefs that cannot be resolved are dropped.
#[instrument(level = "debug", skip_all, fields(base = %base, bytes = markup.len()))]
pub fn extract_forecast_links(markup: &str, base: &Url) -> Extraction {
    let structured = dedup(structured_hrefs(markup, base));
    if !structured.is_empty() {
        debug!(count = structured.len(), "Structured extraction found links");
        return Extraction::Structured(structured);
    }

    let fallback = dedup(fallback_hrefs(markup, base));
    if !fallback.is_empty() {
        debug!(count = fallback.len(), "Fallback extraction found links");
        return Extraction::Fallback(fallback);
    }

    Extraction::Empty
}

fn structured_hrefs(markup: &str, base: &Url) -> Vec<Candidate> {
    let document = Html::parse_document(markup);
    document
        .select(&ANCHOR_SELECTOR)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| FORECAST_HREF.is_match(href))
        .filter_map(|href| resolve(href, base))
        .collect()
}

fn fallback_hrefs(markup: &str, base: &Url) -> Vec<Candidate> {
    FALLBACK_HREF
        .captures_iter(markup)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().replace("&amp;", "&"))
        .filter_map(|href| resolve(&href, base))
        .collect()
}

fn resolve(href: &str, base: &Url) -> Option<Candidate> {
    match base.join(href.trim()) {
        Ok(url) => Some(Candidate::new(href, url)),
        Err(e) => {
            debug!(%href, error = %e, "Skipping unresolvable href");
            None
        }
    }
}

fn dedup(candidates: Vec<Candidate>) -> Vec<Candidate> {
    candidates
        .into_iter()
        .unique_by(|c| c.url.as_str().to_string())
        .collect()
}
