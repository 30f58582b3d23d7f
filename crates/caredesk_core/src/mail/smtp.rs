//! SMTP mailer backed by `lettre`.

use super::{Mailer, OutboundEmail, SendError, SendReceipt};
use crate::config::{MailConfig, SmtpSecurity};
use crate::model::submission::now_epoch_ms;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{Message, SmtpTransport, Transport};
use log::{error, info};
use std::time::{Duration, Instant};

/// Blocking SMTP mailer.
pub struct SmtpMailer {
    transport: SmtpTransport,
    from: Mailbox,
}

impl SmtpMailer {
    /// Builds a transport from mail settings.
    ///
    /// # Errors
    /// - `SendError::Configuration` when no host is configured, the sender is
    ///   not a mailbox, or TLS parameters cannot be built.
    pub fn from_config(config: &MailConfig) -> Result<Self, SendError> {
        let host = config
            .smtp_host
            .as_deref()
            .map(str::trim)
            .filter(|host| !host.is_empty())
            .ok_or_else(|| SendError::Configuration("mail.smtp_host is not set".to_string()))?;
        let from = config
            .sender()
            .map_err(|err| SendError::Configuration(err.to_string()))?;

        let tls = match config.security {
            SmtpSecurity::None => Tls::None,
            SmtpSecurity::Starttls => Tls::Required(tls_parameters(host)?),
            SmtpSecurity::Tls => Tls::Wrapper(tls_parameters(host)?),
        };

        let mut builder = SmtpTransport::builder_dangerous(host)
            .port(config.smtp_port)
            .timeout(Some(Duration::from_secs(config.timeout_secs)))
            .tls(tls);
        if let Some(username) = &config.username {
            builder = builder.credentials(Credentials::new(
                username.clone(),
                config.password.clone().unwrap_or_default(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    fn build_message(&self, email: &OutboundEmail) -> Result<Message, SendError> {
        let to = email
            .to
            .parse::<Mailbox>()
            .map_err(|err| SendError::InvalidRecipient(err.to_string()))?;

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject.as_str())
            .header(ContentType::TEXT_HTML)
            .body(email.html_body.clone())
            .map_err(|err| SendError::Configuration(err.to_string()))
    }
}

impl Mailer for SmtpMailer {
    fn send(&self, email: &OutboundEmail) -> Result<SendReceipt, SendError> {
        let started_at = Instant::now();
        let message = self.build_message(email)?;

        match self.transport.send(&message) {
            Ok(response) => {
                info!(
                    "event=mail_send module=mail status=ok duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                Ok(SendReceipt {
                    response: response.message().collect::<Vec<_>>().join(" "),
                    accepted_at: now_epoch_ms(),
                })
            }
            Err(err) => {
                let code = err
                    .status()
                    .and_then(|code| code.to_string().parse::<u16>().ok());
                let classified = classify_smtp_failure(code, &err.to_string());
                error!(
                    "event=mail_send module=mail status=error duration_ms={} smtp_code={} error_code={}",
                    started_at.elapsed().as_millis(),
                    code.map_or_else(|| "none".to_string(), |code| code.to_string()),
                    classified.code()
                );
                Err(classified)
            }
        }
    }
}

fn tls_parameters(host: &str) -> Result<TlsParameters, SendError> {
    TlsParameters::new(host.to_string())
        .map_err(|err| SendError::Configuration(format!("TLS configuration failed: {err}")))
}

/// Maps an SMTP reply code (if any) and error text to a send category.
///
/// Failures without a reply code are connection-level and therefore
/// `ServiceUnavailable`.
pub fn classify_smtp_failure(code: Option<u16>, detail: &str) -> SendError {
    let lowered = detail.to_lowercase();
    let detail = detail.to_string();
    if lowered.contains("rate limit") || lowered.contains("too many") {
        return SendError::RateLimited(detail);
    }

    match code {
        Some(501 | 550 | 551 | 553) => SendError::InvalidRecipient(detail),
        Some(530 | 534 | 535) => SendError::Configuration(detail),
        Some(421 | 450 | 451 | 452) => SendError::ServiceUnavailable(detail),
        Some(code) if code >= 500 => SendError::ServiceUnavailable(detail),
        _ => SendError::ServiceUnavailable(detail),
    }
}
