//! Map image persistence.
//!
//! Every run writes the image twice:
//! ```text
//! output_dir/
//! ├── estofex_latest_20240501.png   # dated copy
//! └── estofex_latest.png            # canonical copy, always the latest
//! ```
//! Both are full overwrites. Nothing else is kept between runs.

use crate::config::ArtifactSettings;
use crate::error::StorageError;
use chrono::DateTime;
use chrono_tz::Tz;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument, warn};

/// The two files written for one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtifact {
    pub dated: PathBuf,
    pub canonical: PathBuf,
    pub extension: &'static str,
    pub bytes: usize,
}

/// Choose a file extension from the declared content type, falling back to the URL.
///
/// Checked in order PNG, GIF, JPEG; anything else is saved as PNG.
pub fn pick_extension(content_type: Option<&str>, source_url: &str) -> &'static str {
    let ctype = content_type.unwrap_or("").to_ascii_lowercase();
    let url = source_url.to_ascii_lowercase();

    if ctype.contains("png") || url.ends_with(".png") {
        "png"
    } else if ctype.contains("gif") || url.ends_with(".gif") {
        "gif"
    } else if ctype.contains("jpeg")
        || ctype.contains("jpg")
        || url.ends_with(".jpg")
        || url.ends_with(".jpeg")
    {
        "jpg"
    } else {
        "png"
    }
}

/// Writes downloaded images under a dated and a canonical name.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    output_dir: PathBuf,
    filename_base: String,
}

impl ArtifactStore {
    pub fn new(settings: &ArtifactSettings) -> Self {
        Self {
            output_dir: settings.output_dir.clone(),
            filename_base: settings.filename_base.clone(),
        }
    }

    pub fn dated_path(&self, now: &DateTime<Tz>, extension: &str) -> PathBuf {
        self.output_dir.join(format!(
            "{}_{}.{}",
            self.filename_base,
            crate::utils::date_stamp(now),
            extension
        ))
    }

    pub fn canonical_path(&self, extension: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", self.filename_base, extension))
    }

    /// Persist `payload` under both names.
    ///
    /// The dated copy is written first. A failure there is [`StorageError::Write`];
    /// a failure on the canonical copy afterwards is [`StorageError::Partial`].
    ///
    /// # Arguments
    ///
    /// * `payload` - Image bytes as downloaded
    /// * `content_type` - Declared `Content-Type`, if any
    /// * `source_url` - Image URL, used for the extension when the type says nothing
    /// * `now` - Reference-zone time that dates the first copy
    ///
    /// # Returns
    ///
    /// Both paths, the chosen extension and the byte count.
    #[instrument(level = "info", skip(self, payload, now), fields(bytes = payload.len()))]
    pub async fn store(
        &self,
        payload: &[u8],
        content_type: Option<&str>,
        source_url: &str,
        now: &DateTime<Tz>,
    ) -> Result<StoredArtifact, StorageError> {
        if !content_type.is_some_and(|c| c.contains("image/")) {
            warn!(?content_type, "Unexpected content type; inferring extension from URL");
        }
        let extension = pick_extension(content_type, source_url);

        let dated = self.dated_path(now, extension);
        let canonical = self.canonical_path(extension);

        write_file(&dated, payload)
            .await
            .map_err(|source| StorageError::Write {
                path: dated.clone(),
                source,
            })?;

        if let Err(source) = write_file(&canonical, payload).await {
            return Err(StorageError::Partial {
                written: dated,
                failed: canonical,
                source,
            });
        }

        info!(dated = %dated.display(), canonical = %canonical.display(), "Map saved");
        Ok(StoredArtifact {
            dated,
            canonical,
            extension,
            bytes: payload.len(),
        })
    }
}

async fn write_file(path: &Path, payload: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, payload).await
}
