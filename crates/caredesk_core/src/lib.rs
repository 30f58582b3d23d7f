//! Core domain logic for the Golden Serenity staff dashboard.
//! This crate is the single source of truth for submission status and
//! notification invariants.

pub mod config;
pub mod counter;
pub mod dashboard;
pub mod db;
pub mod document;
pub mod logging;
pub mod mail;
pub mod model;
pub mod notice;
pub mod projection;
pub mod service;
pub mod store;
pub mod summary;

pub use config::{load_config, ConfigError, DashboardConfig, MailConfig, SmtpSecurity};
pub use counter::{count_submissions, Counts};
pub use dashboard::Dashboard;
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{
    default_log_level, init_from_config, init_logging, logging_status, LoggingError,
};
pub use mail::{Mailer, OutboundEmail, SendError, SendReceipt, SmtpMailer};
pub use model::status::{
    effective_status, is_unread, ApplicationStatus, InquiryStatus, LifecycleStatus,
};
pub use model::submission::{
    Application, ApplicationRecord, DecodeError, Inquiry, InquiryRecord, Submission, SubmissionId,
    SubmissionKind, SubmissionPayload,
};
pub use notice::{Notice, NoticeLevel};
pub use projection::{FeedState, ListFilter, Projection, ProjectionSnapshot};
pub use service::export_service::{
    export_application, ApplicationRenderer, ExportError, ExportedFile, PdfRenderer,
};
pub use service::reply_service::{DraftError, ReplyDraft, ReplyError, ReplyOutcome, ReplyService};
pub use service::transition_service::{
    Confirmation, DetailView, OpenedSubmission, TransitionController, TransitionError,
};
pub use store::{
    Document, DocumentId, DocumentStore, FeedError, Fields, SqliteDocumentStore, StoreError,
    StoreResult, Subscription,
};
pub use summary::{DashboardSummary, SummaryBoard};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
