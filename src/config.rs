//! Run configuration assembled once from the parsed CLI.
//!
//! Nothing downstream reads the environment; every component receives the
//! slice of [`Settings`] it needs.

use crate::cli::Cli;
use chrono_tz::Tz;
use itertools::Itertools;
use std::path::PathBuf;

/// Everything one run needs, built once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Listing pages in the order they are tried.
    pub sources: Vec<String>,
    pub artifact: ArtifactSettings,
    pub dispatch: DispatchSettings,
    pub mail: MailContent,
    pub smtp: SmtpSettings,
    pub reference_tz: Tz,
}

#[derive(Debug, Clone)]
pub struct ArtifactSettings {
    pub output_dir: PathBuf,
    pub filename_base: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchSettings {
    /// `None` means mail is sent at any hour.
    pub hour_gate: Option<String>,
    pub force_send: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Recipients {
    pub to: String,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
}

impl Recipients {
    /// Every envelope recipient: primary first, then CC, then BCC.
    pub fn all(&self) -> Vec<&str> {
        std::iter::once(self.to.as_str())
            .chain(self.cc.iter().map(String::as_str))
            .chain(self.bcc.iter().map(String::as_str))
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct MailContent {
    pub recipients: Recipients,
    pub subject: String,
    pub body: String,
}

/// SMTP settings as configured; any field may still be missing.
#[derive(Clone, Default)]
pub struct SmtpSettings {
    pub host: Option<String>,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
    pub from: Option<String>,
    pub debug: bool,
}

impl std::fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("from", &self.from)
            .field("debug", &self.debug)
            .finish()
    }
}

/// Split a comma-separated address list, dropping blanks.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl From<Cli> for Settings {
    fn from(cli: Cli) -> Self {
        let sources = [cli.list_url, cli.alt_list_url]
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unique()
            .collect();

        Settings {
            sources,
            artifact: ArtifactSettings {
                output_dir: PathBuf::from(cli.output_dir),
                filename_base: cli.filename_base,
            },
            dispatch: DispatchSettings {
                hour_gate: non_blank(Some(cli.hour_gate)),
                force_send: cli.force_send,
            },
            mail: MailContent {
                recipients: Recipients {
                    to: cli.to_email.trim().to_string(),
                    cc: split_list(&cli.cc_emails),
                    bcc: split_list(&cli.bcc_emails),
                },
                subject: cli.email_subject,
                body: cli.email_body,
            },
            smtp: SmtpSettings {
                host: non_blank(cli.smtp_host),
                port: cli.smtp_port,
                user: non_blank(cli.smtp_user),
                password: cli.smtp_pass.filter(|p| !p.is_empty()),
                from: non_blank(cli.from_email),
                debug: cli.debug_smtp,
            },
            reference_tz: cli.reference_tz,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_split_list_drops_blanks() {
        assert_eq!(
            split_list(" a@x.org, ,b@x.org,"),
            vec!["a@x.org".to_string(), "b@x.org".to_string()]
        );
        assert!(split_list("").is_empty());
    }

    #[test]
    fn test_recipients_all_keeps_order() {
        let r = Recipients {
            to: "to@x.org".into(),
            cc: vec!["cc@x.org".into()],
            bcc: vec!["bcc@x.org".into()],
        };
        assert_eq!(r.all(), vec!["to@x.org", "cc@x.org", "bcc@x.org"]);
    }

    #[test]
    fn test_settings_from_cli() {
        let cli = Cli::parse_from([
            "estofex_mailer",
            "--to-email",
            "to@x.org",
            "--bcc-emails",
            "b1@x.org,b2@x.org",
            "--hour-gate",
            "  ",
            "--smtp-host",
            "",
        ]);
        let settings = Settings::from(cli);

        assert_eq!(settings.sources.len(), 2);
        assert_eq!(settings.dispatch.hour_gate, None);
        assert_eq!(settings.mail.recipients.bcc.len(), 2);
        assert_eq!(settings.smtp.host, None);
        assert_eq!(settings.artifact.filename_base, "estofex_latest");
    }

    #[test]
    fn test_identical_sources_are_tried_once() {
        let cli = Cli::parse_from([
            "estofex_mailer",
            "--list-url",
            "https://x/list",
            "--alt-list-url",
            "https://x/list",
        ]);
        let settings = Settings::from(cli);
        assert_eq!(settings.sources, vec!["https://x/list".to_string()]);
    }

    #[test]
    fn test_debug_hides_password() {
        let smtp = SmtpSettings {
            password: Some("hunter2".into()),
            ..Default::default()
        };
        assert!(!format!("{smtp:?}").contains("hunter2"));
    }
}
