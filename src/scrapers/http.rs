//! HTTP access for listing pages and map images.
//!
//! The pipeline talks to the network only through [`HttpGet`], so tests can
//! substitute canned responses. [`WebClient`] is the real implementation on top
//! of `reqwest`, sending a browser-like identity with every request.

use crate::error::FetchError;
use crate::models::Download;
use reqwest::header::{ACCEPT_LANGUAGE, CONTENT_TYPE, HeaderMap, HeaderValue};
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

pub const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
                              (KHTML, like Gecko) Chrome/124.0 Safari/537.36";
pub const LISTING_TIMEOUT: Duration = Duration::from_secs(30);
pub const IMAGE_TIMEOUT: Duration = Duration::from_secs(60);

/// GET operations the pipeline needs.
pub trait HttpGet {
    /// Fetch a page as text. Non-2xx statuses are errors.
    async fn get_text(&self, url: &str) -> Result<String, FetchError>;

    /// Fetch a binary body with its declared content type. Non-2xx statuses are errors.
    async fn get_bytes(&self, url: &str) -> Result<Download, FetchError>;
}

#[derive(Debug, Clone)]
pub struct WebClient {
    client: reqwest::Client,
}

impl WebClient {
    pub fn new() -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.9,it;q=0.8"),
        );
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        Ok(Self { client })
    }

    async fn get(&self, url: &str, timeout: Duration) -> Result<reqwest::Response, FetchError> {
        let t0 = Instant::now();
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|source| FetchError::Http {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        debug!(%url, status = status.as_u16(), elapsed_ms = t0.elapsed().as_millis() as u64, "GET");
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}

impl HttpGet for WebClient {
    #[instrument(level = "info", skip(self))]
    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        self.get(url, LISTING_TIMEOUT)
            .await?
            .text()
            .await
            .map_err(|source| FetchError::Http {
                url: url.to_string(),
                source,
            })
    }

    #[instrument(level = "info", skip(self))]
    async fn get_bytes(&self, url: &str) -> Result<Download, FetchError> {
        let response = self.get(url, IMAGE_TIMEOUT).await?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_ascii_lowercase());
        let bytes = response
            .bytes()
            .await
            .map_err(|source| FetchError::Http {
                url: url.to_string(),
                source,
            })?;
        Ok(Download {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builds_with_identity_headers() {
        assert!(WebClient::new().is_ok());
        assert!(USER_AGENT.starts_with("Mozilla/5.0"));
    }
}
