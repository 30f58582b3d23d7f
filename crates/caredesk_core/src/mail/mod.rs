//! Outbound email collaborator.
//!
//! # Responsibility
//! - Define the send contract used by the reply flow.
//! - Classify delivery failures into recipient, rate-limit, service and
//!   configuration problems.

use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod smtp;

pub use smtp::{classify_smtp_failure, SmtpMailer};

/// One outbound HTML email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

/// Provider metadata for an accepted message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendReceipt {
    /// Provider response text, if any.
    pub response: String,
    /// Unix epoch milliseconds.
    pub accepted_at: i64,
}

/// Email delivery contract.
pub trait Mailer {
    fn send(&self, email: &OutboundEmail) -> Result<SendReceipt, SendError>;
}

/// Categorized delivery failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    InvalidRecipient(String),
    RateLimited(String),
    ServiceUnavailable(String),
    /// Credentials, sender or transport settings are wrong.
    Configuration(String),
}

impl SendError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRecipient(_) => "invalid_recipient",
            Self::RateLimited(_) => "rate_limited",
            Self::ServiceUnavailable(_) => "service_unavailable",
            Self::Configuration(_) => "configuration",
        }
    }

    /// Message shown to staff.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::InvalidRecipient(_) => "Invalid email address format",
            Self::RateLimited(_) => "Rate limit exceeded. Please try again later.",
            Self::ServiceUnavailable(_) => "Email service unavailable",
            Self::Configuration(_) => "Email service configuration error",
        }
    }
}

impl Display for SendError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRecipient(detail) => write!(f, "invalid recipient: {detail}"),
            Self::RateLimited(detail) => write!(f, "rate limited: {detail}"),
            Self::ServiceUnavailable(detail) => write!(f, "email service unavailable: {detail}"),
            Self::Configuration(detail) => write!(f, "email configuration error: {detail}"),
        }
    }
}

impl Error for SendError {}
