//! # ESTOFEX Mailer
//!
//! Finds the latest storm forecast published by the European Storm Forecast
//! Experiment (ESTOFEX), downloads its map, and emails it to a distribution list.
//!
//! ## Usage
//!
//! ```sh
//! ROME_HOUR_GATE=17 TO_EMAIL=ops@example.org SMTP_HOST=smtp.example.org \
//!   SMTP_USER=bot SMTP_PASS=... FROM_EMAIL=bot@example.org estofex_mailer
//! ```
//!
//! ## Architecture
//!
//! One sequential pass per invocation; scheduling is left to cron or CI:
//! 1. **Discovery**: scan the listing pages for forecast links, pick the storm forecast
//! 2. **Download**: fetch the map image and save a dated and a canonical copy
//! 3. **Dispatch**: if the hour gate allows it, email the map
//!
//! The process exits non-zero only when no map could be produced. A skipped or
//! failed email is logged as a warning.

use clap::Parser;
use std::error::Error;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod cli;
mod config;
mod dispatch;
mod error;
mod models;
mod notify;
mod outputs;
mod pipeline;
mod scrapers;
mod utils;

use cli::Cli;
use config::Settings;
use notify::SmtpRelay;
use pipeline::Notification;
use scrapers::http::WebClient;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Cli::parse();

    // --- Tracing init ---
    let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if args.debug_smtp {
        filter = filter.add_directive("lettre=debug".parse()?);
    }
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("estofex_mailer starting up");

    let settings = Settings::from(args);
    info!(
        sources = ?settings.sources,
        output_dir = %settings.artifact.output_dir.display(),
        filename_base = %settings.artifact.filename_base,
        hour_gate = ?settings.dispatch.hour_gate,
        force_send = settings.dispatch.force_send,
        tz = %settings.reference_tz,
        "Configuration loaded"
    );

    let http = WebClient::new()?;
    let now = utils::now_in(settings.reference_tz);

    let report = match pipeline::run(&settings, &http, &SmtpRelay, now).await {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, "Run failed");
            return Err(e.into());
        }
    };

    match &report.notification {
        Notification::Sent(delivery) if delivery.is_partial() => {
            warn!(refused = ?delivery.refused, "Email sent, but some recipients were refused")
        }
        Notification::Sent(_) => info!("Email sent"),
        Notification::Skipped(decision) => info!(%decision, "Email skipped by hour gate"),
        Notification::NotSent(e) => warn!(error = %e, "Email not sent (see log)"),
    }

    let elapsed = start_time.elapsed();
    info!(
        source = %report.selection.source,
        forecast = %report.selection.forecast.url,
        candidates = report.selection.candidate_count,
        image = %report.image_url,
        artifact = %report.artifact.dated.display(),
        latest = %report.artifact.canonical.display(),
        bytes = report.artifact.bytes,
        extension = report.artifact.extension,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
