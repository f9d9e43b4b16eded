//! Error types for the forecast pipeline.
//!
//! Errors are split by how far they propagate:
//! - [`FetchError`]: one HTTP GET failed (recoverable per listing source)
//! - [`StorageError`]: an artifact write failed (fatal)
//! - [`NotifyError`]: the email could not be sent (degrades to a warning)
//! - [`RunError`]: anything that aborts the run with a non-zero exit

use std::path::PathBuf;
use thiserror::Error;

/// A single HTTP GET that did not produce a usable body.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("failed to write artifact '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The dated copy landed but the canonical copy did not.
    #[error("partial artifact write: '{written}' was written but '{failed}' failed: {source}")]
    Partial {
        written: PathBuf,
        failed: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum NotifyError {
    /// Required SMTP settings are absent; no connection was attempted.
    #[error("missing SMTP configuration: {}", .0.join(", "))]
    MissingSettings(Vec<&'static str>),

    #[error("invalid email address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("failed to read attachment '{path}': {source}")]
    Attachment {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to build message: {0}")]
    Message(String),

    #[error("SMTP delivery failed: {0}")]
    Transport(String),
}

/// Failures that abort the whole run.
#[derive(Error, Debug)]
pub enum RunError {
    #[error("no forecast link found in any of {tried} listing source(s)")]
    Discovery { tried: usize },

    #[error("map image download failed: {0}")]
    ImageDownload(#[source] FetchError),

    #[error("artifact storage failed: {0}")]
    Storage(#[from] StorageError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_settings_lists_every_field() {
        let e = NotifyError::MissingSettings(vec!["SMTP_HOST", "FROM_EMAIL"]);
        assert_eq!(e.to_string(), "missing SMTP configuration: SMTP_HOST, FROM_EMAIL");
    }

    #[test]
    fn test_partial_write_names_both_paths() {
        let e = StorageError::Partial {
            written: PathBuf::from("a_20240501.png"),
            failed: PathBuf::from("a.png"),
            source: std::io::Error::other("disk full"),
        };
        let msg = e.to_string();
        assert!(msg.contains("a_20240501.png"));
        assert!(msg.contains("'a.png' failed"));
    }

    #[test]
    fn test_discovery_is_distinct_from_storage() {
        let discovery = RunError::Discovery { tried: 2 };
        assert!(matches!(discovery, RunError::Discovery { tried: 2 }));
        let storage: RunError = StorageError::Write {
            path: PathBuf::from("x.png"),
            source: std::io::Error::other("denied"),
        }
        .into();
        assert!(matches!(storage, RunError::Storage(_)));
    }
}
