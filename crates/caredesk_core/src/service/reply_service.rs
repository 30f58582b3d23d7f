//! Reply-by-email use-case.
//!
//! # Responsibility
//! - Validate a reply draft and render its HTML body.
//! - Send through the injected mailer, then advance the submission to its
//!   kind's replied status.
//!
//! # Invariants
//! - No send and no transition happen for an invalid draft.
//! - A failed send keeps the draft and issues no transition.
//! - A successful send clears the draft; a failing transition after it is
//!   reported without undoing the send.

use crate::mail::{Mailer, OutboundEmail, SendError, SendReceipt};
use crate::model::status::LifecycleStatus;
use crate::model::submission::SubmissionPayload;
use crate::service::transition_service::{DetailView, TransitionController, TransitionError};
use crate::store::DocumentStore;
use log::{error, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

/// Staff-entered reply text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplyDraft {
    pub subject: String,
    pub message: String,
}

impl ReplyDraft {
    pub fn new(subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            message: message.into(),
        }
    }

    pub fn clear(&mut self) {
        self.subject.clear();
        self.message.clear();
    }

    /// Builds the outbound email for recipient `to`.
    ///
    /// # Errors
    /// - Missing subject or message after trimming.
    /// - Missing or malformed recipient.
    pub fn validate(&self, to: &str) -> Result<OutboundEmail, DraftError> {
        let subject = self.subject.trim();
        if subject.is_empty() {
            return Err(DraftError::MissingSubject);
        }
        let message = self.message.trim();
        if message.is_empty() {
            return Err(DraftError::MissingMessage);
        }
        let to = to.trim();
        if to.is_empty() {
            return Err(DraftError::MissingRecipient);
        }
        if !EMAIL_RE.is_match(to) {
            return Err(DraftError::InvalidRecipient(to.to_string()));
        }

        Ok(OutboundEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            html_body: render_html_body(message),
        })
    }
}

/// Escapes `message` and converts newlines to `<br>` inside one `div`.
pub fn render_html_body(message: &str) -> String {
    let mut body = String::with_capacity(message.len() + 64);
    body.push_str("<div style=\"font-family: Arial, sans-serif; line-height: 1.6;\">");
    for ch in message.chars() {
        match ch {
            '&' => body.push_str("&amp;"),
            '<' => body.push_str("&lt;"),
            '>' => body.push_str("&gt;"),
            '"' => body.push_str("&quot;"),
            '\'' => body.push_str("&#39;"),
            '\r' => {}
            '\n' => body.push_str("<br>"),
            other => body.push(other),
        }
    }
    body.push_str("</div>");
    body
}

/// Draft validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftError {
    MissingSubject,
    MissingMessage,
    MissingRecipient,
    InvalidRecipient(String),
}

impl DraftError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingSubject => "missing_subject",
            Self::MissingMessage => "missing_message",
            Self::MissingRecipient => "missing_recipient",
            Self::InvalidRecipient(_) => "invalid_recipient",
        }
    }
}

impl Display for DraftError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingSubject => write!(f, "Subject is required"),
            Self::MissingMessage => write!(f, "Message is required"),
            Self::MissingRecipient => write!(f, "Recipient email is required"),
            Self::InvalidRecipient(_) => write!(f, "Invalid email address format"),
        }
    }
}

impl Error for DraftError {}

/// Reply failure before anything was delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyError {
    Draft(DraftError),
    Send(SendError),
}

impl ReplyError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Draft(err) => err.code(),
            Self::Send(err) => err.code(),
        }
    }
}

impl Display for ReplyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Draft(err) => write!(f, "{err}"),
            Self::Send(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ReplyError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Draft(err) => Some(err),
            Self::Send(err) => Some(err),
        }
    }
}

impl From<DraftError> for ReplyError {
    fn from(value: DraftError) -> Self {
        Self::Draft(value)
    }
}

impl From<SendError> for ReplyError {
    fn from(value: SendError) -> Self {
        Self::Send(value)
    }
}

/// Delivered reply.
#[derive(Debug)]
pub struct ReplyOutcome {
    pub receipt: SendReceipt,
    /// Failure of the follow-up replied transition, if any.
    pub transition_error: Option<TransitionError>,
}

/// Sends replies through one mailer.
pub struct ReplyService<'m, M: Mailer + ?Sized> {
    mailer: &'m M,
}

impl<'m, M: Mailer + ?Sized> ReplyService<'m, M> {
    pub fn new(mailer: &'m M) -> Self {
        Self { mailer }
    }

    /// Sends `draft` to the submission's contact email.
    ///
    /// # Errors
    /// - `ReplyError::Draft` when validation fails; nothing is sent.
    /// - `ReplyError::Send` when the mailer fails; the draft is kept.
    pub fn send_reply<S, P>(
        &self,
        controller: &TransitionController<'_, S>,
        view: &mut DetailView<P>,
        draft: &mut ReplyDraft,
    ) -> Result<ReplyOutcome, ReplyError>
    where
        S: DocumentStore + ?Sized,
        P: SubmissionPayload,
    {
        let kind = P::KIND;
        let email = draft
            .validate(view.record().contact_email())
            .inspect_err(|err| {
                warn!(
                    "event=reply_send module=service status=rejected kind={} id={} error_code={}",
                    kind.as_str(),
                    view.id(),
                    err.code()
                );
            })?;

        let receipt = self.mailer.send(&email).inspect_err(|err| {
            error!(
                "event=reply_send module=service status=error kind={} id={} error_code={}",
                kind.as_str(),
                view.id(),
                err.code()
            );
        })?;

        draft.clear();
        info!(
            "event=reply_send module=service status=ok kind={} id={}",
            kind.as_str(),
            view.id()
        );

        let transition_error = controller
            .change_status(view, <P::Status as LifecycleStatus>::REPLIED)
            .err();
        Ok(ReplyOutcome {
            receipt,
            transition_error,
        })
    }
}
