//! ESTOFEX forecast discovery.
//!
//! Walks the configured listing pages in order, extracts forecast links from
//! the first page that has any, and picks the storm forecast among them.
//!
//! # Source policy
//!
//! One attempt per source. An HTTP error, a timeout, or a page without forecast
//! links moves on to the next source; only running out of sources is fatal.

use crate::error::RunError;
use crate::models::{Candidate, Selection};
use crate::scrapers::http::HttpGet;
use crate::scrapers::links::extract_forecast_links;
use crate::utils::truncate_for_log;
use tracing::{info, instrument, warn};
use url::Url;

/// Find the latest forecast across `sources`, tried in order.
///
/// # Arguments
///
/// * `http` - Client used for the listing pages
/// * `sources` - Listing page URLs, most preferred first
///
/// # Returns
///
/// The [`Selection`] from the first source with at least one forecast link, or
/// [`RunError::Discovery`] once every source has failed or come back empty.
#[instrument(level = "info", skip_all, fields(sources = sources.len()))]
pub async fn find_latest_forecast<H: HttpGet>(
    http: &H,
    sources: &[String],
) -> Result<Selection, RunError> {
    let total = sources.len();

    for (attempt, source) in sources.iter().enumerate() {
        info!(attempt = attempt + 1, total, %source, "Opening forecast listing");

        let base = match Url::parse(source) {
            Ok(base) => base,
            Err(e) => {
                warn!(%source, error = %e, "Listing URL is not valid; skipping source");
                continue;
            }
        };

        let markup = match http.get_text(source).await {
            Ok(markup) => markup,
            Err(e) => {
                warn!(%source, error = %e, "Listing fetch failed; trying next source");
                continue;
            }
        };

        let extraction = extract_forecast_links(&markup, &base);
        let strategy = extraction.strategy();
        let candidates = extraction.candidates();

        let Some(best) = select_forecast(candidates) else {
            warn!(
                %source,
                preview = %truncate_for_log(&markup, 300),
                "No forecast links on this listing (minimal markup?); trying next source"
            );
            continue;
        };

        info!(
            %source,
            strategy,
            candidates = candidates.len(),
            forecast = %best.url,
            preferred = best.preferred,
            "Selected latest forecast"
        );
        return Ok(Selection {
            source: source.clone(),
            forecast: best.clone(),
            candidate_count: candidates.len(),
        });
    }

    Err(RunError::Discovery { tried: total })
}

/// Pick the forecast to publish.
///
/// The first storm forecast wins; otherwise the first candidate, since the
/// listing is ordered newest first. `None` only for an empty slice.
pub fn select_forecast(candidates: &[Candidate]) -> Option<&Candidate> {
    candidates
        .iter()
        .find(|c| c.preferred)
        .or_else(|| candidates.first())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::models::Download;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// Canned listing pages keyed by URL; anything else is a 404.
    #[derive(Default)]
    struct FakeListings {
        pages: HashMap<String, String>,
        requested: RefCell<Vec<String>>,
    }

    impl FakeListings {
        fn with(mut self, url: &str, body: &str) -> Self {
            self.pages.insert(url.to_string(), body.to_string());
            self
        }
    }

    impl HttpGet for FakeListings {
        async fn get_text(&self, url: &str) -> Result<String, FetchError> {
            self.requested.borrow_mut().push(url.to_string());
            self.pages.get(url).cloned().ok_or(FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
        }

        async fn get_bytes(&self, url: &str) -> Result<Download, FetchError> {
            Err(FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
        }
    }

    fn candidates(urls: &[&str]) -> Vec<Candidate> {
        urls.iter().map(|u| Candidate::parse(u).unwrap()).collect()
    }

    #[test]
    fn test_select_prefers_storm_forecast() {
        let list = candidates(&[
            "https://x/showforecast.cgi?fcstfile=A",
            "https://x/showforecast.cgi?fcstfile=B&text=yes#stormforecast.xml",
        ]);
        let chosen = select_forecast(&list).unwrap();
        assert_eq!(chosen, &list[1]);
    }

    #[test]
    fn test_select_falls_back_to_first() {
        let list = candidates(&[
            "https://x/showforecast.cgi?fcstfile=A",
            "https://x/showforecast.cgi?fcstfile=B",
        ]);
        assert_eq!(select_forecast(&list).unwrap(), &list[0]);
        assert_eq!(select_forecast(&list), select_forecast(&list.clone()));
        assert!(select_forecast(&[]).is_none());
    }

    #[test]
    fn test_select_takes_first_of_several_storm_forecasts() {
        let list = candidates(&[
            "https://x/showforecast.cgi?fcstfile=mesoscale.xml",
            "https://x/showforecast.cgi?fcstfile=2_stormforecast.xml",
            "https://x/showforecast.cgi?fcstfile=1_stormforecast.xml",
        ]);
        assert_eq!(select_forecast(&list).unwrap(), &list[1]);
    }

    #[tokio::test]
    async fn test_failed_and_weak_sources_are_skipped() {
        let http = FakeListings::default()
            .with("https://x/weak", "<html><body>No forecasts today</body></html>")
            .with(
                "https://x/good",
                r#"<a href="/cgi-bin/polygon/showforecast.cgi?text=yes&fcstfile=2_stormforecast.xml">S</a>"#,
            );
        let sources = vec![
            "https://x/missing".to_string(),
            "https://x/weak".to_string(),
            "https://x/good".to_string(),
        ];

        let selection = find_latest_forecast(&http, &sources).await.unwrap();

        assert_eq!(selection.source, "https://x/good");
        assert_eq!(selection.candidate_count, 1);
        assert_eq!(
            selection.forecast.url.as_str(),
            "https://x/cgi-bin/polygon/showforecast.cgi?text=yes&fcstfile=2_stormforecast.xml"
        );
        assert_eq!(http.requested.borrow().len(), 3);
    }

    #[tokio::test]
    async fn test_stops_at_first_source_with_links() {
        let link = r#"<a href="/cgi-bin/polygon/showforecast.cgi?fcstfile=A">A</a>"#;
        let http = FakeListings::default()
            .with("https://x/one", link)
            .with("https://x/two", link);
        let sources = vec!["https://x/one".to_string(), "https://x/two".to_string()];

        let selection = find_latest_forecast(&http, &sources).await.unwrap();

        assert_eq!(selection.source, "https://x/one");
        assert_eq!(*http.requested.borrow(), vec!["https://x/one".to_string()]);
    }

    #[tokio::test]
    async fn test_exhausted_sources_is_discovery_failure() {
        let http = FakeListings::default().with("https://x/empty", "");
        let sources = vec!["https://x/empty".to_string(), "not a url".to_string()];

        let err = find_latest_forecast(&http, &sources).await.unwrap_err();

        assert!(matches!(err, RunError::Discovery { tried: 2 }));
        assert_eq!(http.requested.borrow().len(), 1);
    }
}
