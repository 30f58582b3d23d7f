//! User-facing notices.
//!
//! # Responsibility
//! - Turn operation outcomes into short staff-visible messages.
//!
//! # Invariants
//! - Notice text never contains raw store or transport error detail.

use crate::model::submission::SubmissionKind;
use crate::service::export_service::ExportError;
use crate::service::reply_service::ReplyError;
use crate::service::transition_service::TransitionError;
use crate::store::FeedError;
use serde::Serialize;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// One toast-style message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }

    pub fn feed_failed(kind: SubmissionKind, _err: &FeedError) -> Self {
        Self::error(format!("Failed to fetch {}.", kind.plural()))
    }

    /// Manual retry brought a failed feed back.
    pub fn feed_restored(kind: SubmissionKind) -> Self {
        Self::info(format!("Reconnected to {}.", kind.plural()))
    }

    pub fn transition_failed(err: &TransitionError) -> Self {
        match err {
            TransitionError::UnknownStatus { value, .. } => {
                Self::error(format!("Unknown status `{value}`"))
            }
            TransitionError::Remote { kind, .. } => {
                Self::error(format!("Failed to update {} status", kind.as_str()))
            }
        }
    }

    pub fn reply_failed(err: &ReplyError) -> Self {
        match err {
            ReplyError::Draft(draft) => Self::error(draft.to_string()),
            ReplyError::Send(send) => Self::error(send.user_message()),
        }
    }

    pub fn reply_sent() -> Self {
        Self::success("Reply sent successfully!")
    }

    pub fn status_updated(label: &str) -> Self {
        Self::success(format!("Status updated to {label}"))
    }

    pub fn export_failed(err: &ExportError) -> Self {
        match err {
            ExportError::MissingName => Self::error("Missing application data"),
            ExportError::Render(_) => Self::error("Failed to generate PDF"),
        }
    }
}

impl Display for Notice {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let tag = match self.level {
            NoticeLevel::Info => "info",
            NoticeLevel::Success => "ok",
            NoticeLevel::Error => "error",
        };
        write!(f, "[{tag}] {}", self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::Notice;
    use crate::mail::SendError;
    use crate::model::submission::SubmissionKind;
    use crate::service::reply_service::{DraftError, ReplyError};
    use crate::store::FeedError;

    #[test]
    fn feed_notice_names_the_kind() {
        let err = FeedError::PermissionDenied("rules".to_string());
        assert_eq!(
            Notice::feed_failed(SubmissionKind::Inquiry, &err).message,
            "Failed to fetch inquiries."
        );
        assert_eq!(
            Notice::feed_failed(SubmissionKind::Application, &err).message,
            "Failed to fetch applications."
        );
    }

    #[test]
    fn reply_notices_hide_transport_detail() {
        let notice = Notice::reply_failed(&ReplyError::Send(SendError::RateLimited(
            "421 4.7.0 try later".to_string(),
        )));
        assert!(notice.is_error());
        assert_eq!(notice.message, "Rate limit exceeded. Please try again later.");

        let notice = Notice::reply_failed(&ReplyError::Draft(DraftError::MissingSubject));
        assert_eq!(notice.message, "Subject is required");
        assert_eq!(notice.to_string(), "[error] Subject is required");
    }
}
