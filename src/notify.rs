//! Email delivery of the stored map.
//!
//! This module builds one message with the map attached and hands it to a
//! [`MailTransport`]. The production transport is [`SmtpRelay`] (lettre over
//! tokio + rustls); tests swap in an in-memory transport.
//!
//! # Transport Selection
//!
//! - Port 465: implicit TLS from the first byte
//! - Any other port: plaintext connect, mandatory STARTTLS, then AUTH
//!
//! Credentials are always presented before the envelope is sent.
//!
//! # Refused Recipients
//!
//! The session is driven one command at a time so that a recipient refused at
//! `RCPT TO` does not sink the whole envelope. The message is still sent to
//! everyone the server accepted and the refusals come back in
//! [`Delivery::refused`]. Only an envelope with no accepted recipient fails.

use crate::config::{MailContent, Recipients, SmtpSettings};
use crate::error::NotifyError;
use lettre::address::Envelope;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::{Credentials, DEFAULT_MECHANISMS};
use lettre::transport::smtp::client::{AsyncSmtpConnection, TlsParameters};
use lettre::transport::smtp::commands::{Data, Mail, Rcpt};
use lettre::transport::smtp::extension::{ClientId, Extension, MailBodyParameter, MailParameter};
use lettre::Message;
use std::fmt;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

pub const IMPLICIT_TLS_PORT: u16 = 465;
pub const SMTP_TIMEOUT: Duration = Duration::from_secs(60);

/// SMTP settings with every required field present.
#[derive(Clone)]
pub struct Relay {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub from: String,
    pub debug: bool,
}

impl fmt::Debug for Relay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Relay")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("from", &self.from)
            .field("debug", &self.debug)
            .finish_non_exhaustive()
    }
}

impl Relay {
    pub fn implicit_tls(&self) -> bool {
        self.port == IMPLICIT_TLS_PORT
    }
}

impl SmtpSettings {
    /// Check that host, user, password, sender and primary recipient are all
    /// configured.
    ///
    /// Every missing field is reported at once, by its environment name.
    pub fn validate(&self, recipients: &Recipients) -> Result<Relay, NotifyError> {
        let required = [
            ("SMTP_HOST", self.host.is_some()),
            ("SMTP_USER", self.user.is_some()),
            ("SMTP_PASS", self.password.is_some()),
            ("FROM_EMAIL", self.from.is_some()),
            ("TO_EMAIL", !recipients.to.trim().is_empty()),
        ];
        let missing: Vec<&'static str> = required
            .iter()
            .filter(|(_, present)| !present)
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(NotifyError::MissingSettings(missing));
        }

        // All four were checked above.
        let take = |v: &Option<String>| v.clone().unwrap_or_default();
        Ok(Relay {
            host: take(&self.host),
            port: self.port,
            user: take(&self.user),
            password: take(&self.password),
            from: take(&self.from),
            debug: self.debug,
        })
    }
}

/// What the server accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delivery {
    /// Envelope recipients the server refused while accepting the message.
    pub refused: Vec<String>,
}

impl Delivery {
    pub fn is_partial(&self) -> bool {
        !self.refused.is_empty()
    }
}

/// Something that can hand a finished message to a mail server.
pub trait MailTransport {
    async fn deliver(&self, relay: &Relay, message: Message) -> Result<Delivery, NotifyError>;
}

/// Real SMTP delivery through lettre; one connection per call.
#[derive(Debug, Clone, Copy, Default)]
pub struct SmtpRelay;

impl MailTransport for SmtpRelay {
    #[instrument(level = "info", skip_all, fields(host = %relay.host, port = relay.port))]
    async fn deliver(&self, relay: &Relay, message: Message) -> Result<Delivery, NotifyError> {
        let t0 = Instant::now();
        let hello = ClientId::default();
        let mut conn = connect(relay, &hello).await.map_err(transport_error)?;

        let credentials = Credentials::new(relay.user.clone(), relay.password.clone());
        let result = submit(
            &mut conn,
            &credentials,
            message.envelope(),
            &message.formatted(),
            relay.debug,
        )
        .await;

        match &result {
            Ok(_) => {
                if let Err(e) = conn.quit().await {
                    debug!(error = %e, "QUIT after delivery failed");
                }
            }
            Err(_) => conn.abort().await,
        }
        debug!(elapsed_ms = t0.elapsed().as_millis() as u64, "SMTP session finished");
        result
    }
}

/// Open a session: implicit TLS on 465, otherwise plaintext upgraded with STARTTLS.
async fn connect(
    relay: &Relay,
    hello: &ClientId,
) -> Result<AsyncSmtpConnection, lettre::transport::smtp::Error> {
    let server = (relay.host.as_str(), relay.port);
    let tls = TlsParameters::new(relay.host.clone())?;
    if relay.implicit_tls() {
        return AsyncSmtpConnection::connect_tokio1(server, Some(SMTP_TIMEOUT), hello, Some(tls), None)
            .await;
    }

    let mut conn =
        AsyncSmtpConnection::connect_tokio1(server, Some(SMTP_TIMEOUT), hello, None, None).await?;
    conn.starttls(tls, hello).await?;
    Ok(conn)
}

fn transport_error(e: lettre::transport::smtp::Error) -> NotifyError {
    NotifyError::Transport(e.to_string())
}

/// Authenticate and transfer one envelope over an open session.
///
/// Each `RCPT TO` is sent separately. A 4xx or 5xx reply refuses that address
/// only; any other failure aborts the transaction.
///
/// # Arguments
///
/// * `conn` - Session that has completed EHLO (and STARTTLS where used)
/// * `credentials` - Login presented before `MAIL FROM`
/// * `envelope` - Sender and every recipient, BCC included
/// * `email` - The formatted message
/// * `verbose` - Log the server's final reply at info level
///
/// # Returns
///
/// * `Ok(Delivery)` - The server queued the message; `refused` lists rejected recipients
/// * `Err(NotifyError::Transport)` - Login, `MAIL FROM` or `DATA` failed, or every recipient was refused
pub async fn submit(
    conn: &mut AsyncSmtpConnection,
    credentials: &Credentials,
    envelope: &Envelope,
    email: &[u8],
    verbose: bool,
) -> Result<Delivery, NotifyError> {
    conn.auth(DEFAULT_MECHANISMS, credentials)
        .await
        .map_err(transport_error)?;

    let mut parameters = Vec::new();
    let server = conn.server_info();
    if envelope.to().iter().any(|a| !a.to_string().is_ascii())
        && server.supports_feature(Extension::SmtpUtfEight)
    {
        parameters.push(MailParameter::SmtpUtfEight);
    }
    if !email.is_ascii() && server.supports_feature(Extension::EightBitMime) {
        parameters.push(MailParameter::Body(MailBodyParameter::EightBitMime));
    }
    conn.command(Mail::new(envelope.from().cloned(), parameters))
        .await
        .map_err(transport_error)?;

    let mut refused = Vec::new();
    for recipient in envelope.to() {
        match conn.command(Rcpt::new(recipient.clone(), vec![])).await {
            Ok(_) => {}
            Err(e) if e.is_permanent() || e.is_transient() => {
                warn!(%recipient, error = %e, "Recipient refused by server");
                refused.push(recipient.to_string());
            }
            Err(e) => return Err(transport_error(e)),
        }
    }
    if refused.len() == envelope.to().len() {
        return Err(NotifyError::Transport(format!(
            "every recipient was refused: {}",
            refused.join(", ")
        )));
    }

    conn.command(Data).await.map_err(transport_error)?;
    let response = conn.message(email).await.map_err(transport_error)?;
    if verbose {
        info!(?response, "SMTP response");
    }
    Ok(Delivery { refused })
}

/// MIME type for an attachment, from its file extension.
pub fn attachment_content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}

fn mailbox(address: &str) -> Result<Mailbox, NotifyError> {
    address
        .parse::<Mailbox>()
        .map_err(|e| NotifyError::InvalidAddress {
            address: address.to_string(),
            reason: e.to_string(),
        })
}

/// Compose the message: plain-text body plus the map as the only attachment.
pub async fn build_message(
    from: &str,
    mail: &MailContent,
    attachment: &Path,
) -> Result<Message, NotifyError> {
    let data = tokio::fs::read(attachment)
        .await
        .map_err(|source| NotifyError::Attachment {
            path: attachment.to_path_buf(),
            source,
        })?;
    let filename = attachment
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "map".to_string());
    let content_type = ContentType::parse(attachment_content_type(attachment))
        .map_err(|e| NotifyError::Message(e.to_string()))?;

    let mut builder = Message::builder()
        .from(mailbox(from)?)
        .to(mailbox(&mail.recipients.to)?)
        .subject(mail.subject.clone())
        .date_now();
    for cc in &mail.recipients.cc {
        builder = builder.cc(mailbox(cc)?);
    }
    for bcc in &mail.recipients.bcc {
        builder = builder.bcc(mailbox(bcc)?);
    }

    builder
        .multipart(
            MultiPart::mixed()
                .singlepart(SinglePart::plain(mail.body.clone()))
                .singlepart(Attachment::new(filename).body(data, content_type)),
        )
        .map_err(|e| NotifyError::Message(e.to_string()))
}

/// Send the stored map to every recipient.
///
/// # Arguments
///
/// * `transport` - Where the finished message goes ([`SmtpRelay`] in production)
/// * `smtp` - Relay settings; validated before anything else happens
/// * `mail` - Recipients, subject and body
/// * `attachment` - The stored map file
///
/// # Returns
///
/// * `Ok(Delivery)` - The server took the message. Refused recipients, if any,
///   are in [`Delivery::refused`] and the caller should warn about them
/// * `Err(NotifyError)` - Nothing was sent. Incomplete settings fail before any
///   connection is attempted
#[instrument(level = "info", skip_all, fields(attachment = %attachment.display()))]
pub async fn send_forecast_email<T: MailTransport>(
    transport: &T,
    smtp: &SmtpSettings,
    mail: &MailContent,
    attachment: &Path,
) -> Result<Delivery, NotifyError> {
    let relay = smtp.validate(&mail.recipients)?;
    let message = build_message(&relay.from, mail, attachment).await?;

    info!(
        from = %relay.from,
        to = ?mail.recipients.all(),
        host = %relay.host,
        port = relay.port,
        implicit_tls = relay.implicit_tls(),
        "Sending email"
    );
    let delivery = transport.deliver(&relay, message).await?;

    if delivery.is_partial() {
        warn!(refused = ?delivery.refused, "Some recipients were refused");
    } else {
        info!("SMTP server accepted all recipients");
    }
    Ok(delivery)
}
