//! One run of the forecast mailer, end to end.
//!
//! 1. **Discovery**: find the latest forecast link across the listing sources
//! 2. **Rewrite**: turn the forecast link into the map image link
//! 3. **Download + store**: fetch the image, write dated and canonical copies
//! 4. **Dispatch**: consult the hour gate, then email the dated copy
//!
//! Steps 1-3 are fatal on failure. Step 4 only downgrades the notification
//! outcome; the run still succeeds once the map is on disk.

use crate::config::Settings;
use crate::dispatch::{self, Decision};
use crate::error::{NotifyError, RunError};
use crate::models::Selection;
use crate::notify::{self, Delivery, MailTransport};
use crate::outputs::artifact::{ArtifactStore, StoredArtifact};
use crate::scrapers::estofex::find_latest_forecast;
use crate::scrapers::http::HttpGet;
use crate::scrapers::map_url::to_map_image_url;
use chrono::DateTime;
use chrono_tz::Tz;
use tracing::{info, instrument, warn};
use url::Url;

/// How the email step ended.
#[derive(Debug)]
pub enum Notification {
    /// The hour gate said no.
    Skipped(Decision),
    Sent(Delivery),
    NotSent(NotifyError),
}

/// Everything a successful run produced.
#[derive(Debug)]
pub struct RunReport {
    pub selection: Selection,
    pub image_url: Url,
    pub artifact: StoredArtifact,
    pub notification: Notification,
}

/// Execute one run at wall-clock time `now` (reference timezone).
///
/// # Arguments
///
/// * `settings` - Full run configuration
/// * `http` - Client for listings and the image
/// * `mailer` - Transport for the notification email
/// * `now` - Dates the artifact and drives the hour gate
///
/// # Returns
///
/// A [`RunReport`] once the map is on disk, whatever happened to the email.
/// Discovery, download and storage failures are returned as [`RunError`].
#[instrument(level = "info", skip_all, fields(now = %now.format("%Y-%m-%d %H:%M:%S %Z")))]
pub async fn run<H: HttpGet, M: MailTransport>(
    settings: &Settings,
    http: &H,
    mailer: &M,
    now: DateTime<Tz>,
) -> Result<RunReport, RunError> {
    let selection = find_latest_forecast(http, &settings.sources).await?;

    let image_url = to_map_image_url(&selection.forecast.url);
    info!(%image_url, "Map image URL");

    let download = http
        .get_bytes(image_url.as_str())
        .await
        .map_err(RunError::ImageDownload)?;

    let store = ArtifactStore::new(&settings.artifact);
    let artifact = store
        .store(
            &download.bytes,
            download.content_type.as_deref(),
            image_url.as_str(),
            &now,
        )
        .await?;

    let decision = dispatch::evaluate(&settings.dispatch, &now);
    let notification = if !decision.proceed() {
        info!(%decision, "Outside the mail window; map downloaded, email not sent");
        Notification::Skipped(decision)
    } else {
        match notify::send_forecast_email(mailer, &settings.smtp, &settings.mail, &artifact.dated)
            .await
        {
            Ok(delivery) => {
                info!(
                    to = %settings.mail.recipients.to,
                    attachment = %artifact.dated.display(),
                    "Email sent"
                );
                Notification::Sent(delivery)
            }
            Err(e) => {
                warn!(error = %e, "Email not sent");
                Notification::NotSent(e)
            }
        }
    };

    Ok(RunReport {
        selection,
        image_url,
        artifact,
        notification,
    })
}
