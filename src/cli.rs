//! Command-line interface definitions for the ESTOFEX mailer.
//!
//! Every option can be supplied as a flag or through the environment variable
//! named next to it, which is how scheduled jobs usually configure the run.

use chrono_tz::Tz;
use clap::{ArgAction, Parser};

/// Listing of the current forecasts, newest first.
pub const DEFAULT_LIST_URL: &str = "https://www.estofex.org/cgi-bin/polygon/showforecast.cgi?list=yes";
/// Listing of every archived forecast; used when the short list has no links.
pub const DEFAULT_ALT_LIST_URL: &str =
    "https://www.estofex.org/cgi-bin/polygon/showforecast.cgi?all=yes&list=yes";

/// Command-line arguments for the ESTOFEX mailer.
///
/// # Examples
///
/// ```sh
/// # Download only (no SMTP settings: the email step is skipped with a warning)
/// estofex_mailer --to-email ops@example.org
///
/// # Mail only during the 17:00 hour in Rome
/// ROME_HOUR_GATE=17 SMTP_HOST=smtp.example.org SMTP_USER=u SMTP_PASS=p \
///   FROM_EMAIL=bot@example.org estofex_mailer --to-email ops@example.org
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Primary listing page to search for forecast links
    #[arg(long, env = "LIST_URL", default_value = DEFAULT_LIST_URL)]
    pub list_url: String,

    /// Listing page tried when the primary one yields nothing
    #[arg(long, env = "ALT_LIST_URL", default_value = DEFAULT_ALT_LIST_URL)]
    pub alt_list_url: String,

    /// Base name of the downloaded map files
    #[arg(short, long, env = "FILENAME_BASE", default_value = "estofex_latest")]
    pub filename_base: String,

    /// Directory the map files are written to
    #[arg(short, long, env = "OUTPUT_DIR", default_value = ".")]
    pub output_dir: String,

    /// Primary recipient
    #[arg(short, long, env = "TO_EMAIL", default_value = "")]
    pub to_email: String,

    /// Comma-separated CC recipients
    #[arg(long, env = "CC_EMAILS", default_value = "")]
    pub cc_emails: String,

    /// Comma-separated BCC recipients
    #[arg(long, env = "BCC_EMAILS", default_value = "")]
    pub bcc_emails: String,

    #[arg(long, env = "EMAIL_SUBJECT", default_value = "ESTOFEX — latest map")]
    pub email_subject: String,

    #[arg(
        long,
        env = "EMAIL_BODY",
        default_value = "Attached is the latest ESTOFEX (https://www.estofex.org) map (storm forecast)."
    )]
    pub email_body: String,

    #[arg(long, env = "SMTP_HOST")]
    pub smtp_host: Option<String>,

    #[arg(long, env = "SMTP_PORT", default_value_t = 465)]
    pub smtp_port: u16,

    #[arg(long, env = "SMTP_USER")]
    pub smtp_user: Option<String>,

    #[arg(long, env = "SMTP_PASS", hide_env_values = true)]
    pub smtp_pass: Option<String>,

    /// Sender address
    #[arg(long, env = "FROM_EMAIL")]
    pub from_email: Option<String>,

    /// Log the SMTP dialogue
    #[arg(long, env = "DEBUG_SMTP", action = ArgAction::Set, default_value = "0", value_parser = parse_flag)]
    pub debug_smtp: bool,

    /// Only send mail during this hour of the day (empty disables the gate)
    #[arg(long, env = "ROME_HOUR_GATE", default_value = "")]
    pub hour_gate: String,

    /// Send mail regardless of the hour gate
    #[arg(long, env = "FORCE_SEND", action = ArgAction::Set, default_value = "false", value_parser = parse_flag)]
    pub force_send: bool,

    /// Timezone used for the hour gate and dated file names
    #[arg(long, env = "REFERENCE_TZ", default_value = "Europe/Rome", value_parser = parse_tz)]
    pub reference_tz: Tz,
}

/// Parse a boolean-ish flag value as found in CI environments.
///
/// `1`, `true`, `yes` and `on` (any case) are true; `0`, `false`, `no`, `off`
/// and the empty string are false.
pub fn parse_flag(raw: &str) -> Result<bool, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        other => Err(format!("expected a boolean flag, got '{other}'")),
    }
}

fn parse_tz(raw: &str) -> Result<Tz, String> {
    raw.trim()
        .parse::<Tz>()
        .map_err(|e| format!("unknown timezone '{raw}': {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["estofex_mailer"]);

        assert_eq!(cli.list_url, DEFAULT_LIST_URL);
        assert_eq!(cli.alt_list_url, DEFAULT_ALT_LIST_URL);
        assert_eq!(cli.filename_base, "estofex_latest");
        assert_eq!(cli.smtp_port, 465);
        assert!(!cli.force_send);
        assert!(!cli.debug_smtp);
        assert_eq!(cli.reference_tz, chrono_tz::Europe::Rome);
    }

    #[test]
    fn test_cli_explicit_values() {
        let cli = Cli::parse_from([
            "estofex_mailer",
            "-t",
            "ops@example.org",
            "--cc-emails",
            "a@example.org, b@example.org",
            "--smtp-port",
            "587",
            "--force-send",
            "TRUE",
            "--hour-gate",
            "17",
        ]);

        assert_eq!(cli.to_email, "ops@example.org");
        assert_eq!(cli.cc_emails, "a@example.org, b@example.org");
        assert_eq!(cli.smtp_port, 587);
        assert!(cli.force_send);
        assert_eq!(cli.hour_gate, "17");
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("1"), Ok(true));
        assert_eq!(parse_flag(" Yes "), Ok(true));
        assert_eq!(parse_flag(""), Ok(false));
        assert_eq!(parse_flag("false"), Ok(false));
        assert!(parse_flag("maybe").is_err());
    }

    #[test]
    fn test_parse_tz_rejects_unknown_zone() {
        assert!(parse_tz("Europe/Rome").is_ok());
        assert!(parse_tz("Mars/Olympus").is_err());
    }
}
