//! Submission domain model.
//!
//! # Responsibility
//! - Define the Application and Inquiry payloads stored by the public forms.
//! - Decode feed documents into typed submissions.
//!
//! # Invariants
//! - `id` and `created_at` are assigned outside the core and never mutated.
//! - `status` is a member of the payload kind's status enum, or absent.
//! - `contact_email` is non-empty for every decoded submission.
//! - Payload fields are opaque to the status/counter logic.

use crate::model::status::{
    effective_status, is_unread, ApplicationStatus, InquiryStatus, LifecycleStatus,
};
use crate::store::{Document, DocumentId, Fields};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};

/// Stable submission identifier assigned by the document store.
pub type SubmissionId = DocumentId;

pub const STATUS_FIELD: &str = "status";
pub const LAST_VIEWED_FIELD: &str = "lastViewed";
/// Shown in list rows and detail headers for a submission without a name.
pub const ANONYMOUS_NAME: &str = "Anonymous";

/// Submission category; each kind lives in its own collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionKind {
    Application,
    Inquiry,
}

impl SubmissionKind {
    /// Collection name in the document store.
    pub fn collection(self) -> &'static str {
        match self {
            Self::Application => "applications",
            Self::Inquiry => "contacts",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Application => "application",
            Self::Inquiry => "inquiry",
        }
    }

    /// Plural noun used in notices.
    pub fn plural(self) -> &'static str {
        match self {
            Self::Application => "applications",
            Self::Inquiry => "inquiries",
        }
    }
}

/// Kind-specific payload contract.
pub trait SubmissionPayload:
    Serialize + DeserializeOwned + Clone + PartialEq + Debug + 'static
{
    type Status: LifecycleStatus;
    const KIND: SubmissionKind;

    /// Stored name; may be empty.
    fn full_name(&self) -> &str;

    /// Name for list rows and detail headers.
    fn display_name(&self) -> &str {
        match self.full_name().trim() {
            "" => ANONYMOUS_NAME,
            name => name,
        }
    }

    /// Reply target address.
    fn contact_email(&self) -> &str;

    /// Case-insensitive match used by the list search box.
    ///
    /// `needle` is already lowercased and non-empty.
    fn matches_search(&self, needle: &str) -> bool;

    fn availability(&self) -> Option<&str> {
        None
    }
}

/// Job application form payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    #[serde(default)]
    pub full_name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_information: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<String>,
    /// Stored as `education` by the public form.
    #[serde(
        default,
        rename = "education",
        alias = "educationBackground",
        skip_serializing_if = "Option::is_none"
    )]
    pub education_background: Option<String>,
    /// Stored as `resume` by the public form.
    #[serde(
        default,
        rename = "resume",
        alias = "resumeUrl",
        skip_serializing_if = "Option::is_none"
    )]
    pub resume_url: Option<String>,
}

/// Contact inquiry form payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inquiry {
    #[serde(default, alias = "name")]
    pub full_name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default)]
    pub message: String,
}

impl SubmissionPayload for Application {
    type Status = ApplicationStatus;
    const KIND: SubmissionKind = SubmissionKind::Application;

    fn full_name(&self) -> &str {
        &self.full_name
    }

    fn contact_email(&self) -> &str {
        &self.email
    }

    fn matches_search(&self, needle: &str) -> bool {
        self.full_name.to_lowercase().contains(needle) || self.email.to_lowercase().contains(needle)
    }

    fn availability(&self) -> Option<&str> {
        self.availability.as_deref()
    }
}

impl SubmissionPayload for Inquiry {
    type Status = InquiryStatus;
    const KIND: SubmissionKind = SubmissionKind::Inquiry;

    fn full_name(&self) -> &str {
        &self.full_name
    }

    fn contact_email(&self) -> &str {
        &self.email
    }

    fn matches_search(&self, needle: &str) -> bool {
        self.full_name.to_lowercase().contains(needle)
            || self.email.to_lowercase().contains(needle)
            || self
                .phone
                .as_deref()
                .is_some_and(|phone| phone.to_lowercase().contains(needle))
    }
}

/// One decoded submission of payload kind `P`.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission<P: SubmissionPayload> {
    pub id: SubmissionId,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// `None` when the document carries no status.
    pub status: Option<P::Status>,
    /// Unix epoch milliseconds of the last staff transition.
    pub last_viewed: Option<i64>,
    pub payload: P,
}

pub type ApplicationRecord = Submission<Application>;
pub type InquiryRecord = Submission<Inquiry>;

impl<P: SubmissionPayload> Submission<P> {
    /// Decodes one store document.
    ///
    /// A missing `createdAt` resolves to `now_ms`; the document is kept.
    ///
    /// # Errors
    /// - `DecodeError::InvalidStatus` when `status` is not a member of the kind.
    /// - `DecodeError::InvalidPayload` when a field has the wrong JSON type or
    ///   `email` is absent.
    /// - `DecodeError::MissingContactEmail` when `email` is blank.
    pub fn from_document(document: &Document, now_ms: i64) -> Result<Self, DecodeError> {
        let status = decode_status::<P::Status>(document)?;
        let last_viewed = document
            .fields
            .get(LAST_VIEWED_FIELD)
            .and_then(Value::as_i64);

        let payload: P =
            serde_json::from_value(Value::Object(document.fields.clone())).map_err(|err| {
                DecodeError::InvalidPayload {
                    id: document.id,
                    message: err.to_string(),
                }
            })?;
        if payload.contact_email().trim().is_empty() {
            return Err(DecodeError::MissingContactEmail(document.id));
        }

        Ok(Self {
            id: document.id,
            created_at: document.created_at.unwrap_or(now_ms),
            status,
            last_viewed,
            payload,
        })
    }

    pub fn kind(&self) -> SubmissionKind {
        P::KIND
    }

    pub fn effective_status(&self) -> P::Status {
        effective_status(self.status)
    }

    pub fn is_unread(&self) -> bool {
        is_unread(self.status)
    }

    pub fn contact_email(&self) -> &str {
        self.payload.contact_email()
    }
}

/// Serializes a payload into store fields, optionally with an initial status.
pub fn payload_fields<P: SubmissionPayload>(
    payload: &P,
    status: Option<P::Status>,
) -> Result<Fields, serde_json::Error> {
    let mut fields = match serde_json::to_value(payload)? {
        Value::Object(map) => map,
        _ => Fields::new(),
    };
    if let Some(status) = status {
        fields.insert(
            STATUS_FIELD.to_string(),
            Value::String(status.as_str().to_string()),
        );
    }
    Ok(fields)
}

/// Current wall clock as Unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn decode_status<S: LifecycleStatus>(document: &Document) -> Result<Option<S>, DecodeError> {
    match document.fields.get(STATUS_FIELD) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) if value.is_empty() => Ok(None),
        Some(Value::String(value)) => {
            S::parse(value)
                .map(Some)
                .ok_or_else(|| DecodeError::InvalidStatus {
                    id: document.id,
                    value: value.clone(),
                })
        }
        Some(other) => Err(DecodeError::InvalidStatus {
            id: document.id,
            value: other.to_string(),
        }),
    }
}

/// Document-to-submission decoding failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    InvalidStatus { id: SubmissionId, value: String },
    InvalidPayload { id: SubmissionId, message: String },
    MissingContactEmail(SubmissionId),
}

impl DecodeError {
    pub fn submission_id(&self) -> SubmissionId {
        match self {
            Self::InvalidStatus { id, .. } | Self::InvalidPayload { id, .. } => *id,
            Self::MissingContactEmail(id) => *id,
        }
    }

    /// Stable metadata-only code for logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidStatus { .. } => "invalid_status",
            Self::InvalidPayload { .. } => "invalid_payload",
            Self::MissingContactEmail(_) => "missing_contact_email",
        }
    }
}

impl Display for DecodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidStatus { id, value } => {
                write!(f, "submission {id} has unknown status `{value}`")
            }
            Self::InvalidPayload { id, message } => {
                write!(f, "submission {id} has invalid fields: {message}")
            }
            Self::MissingContactEmail(id) => write!(f, "submission {id} has no contact email"),
        }
    }
}

impl Error for DecodeError {}

#[cfg(test)]
mod tests {
    use super::{
        payload_fields, Application, ApplicationRecord, DecodeError, Inquiry, InquiryRecord,
        SubmissionPayload,
    };
    use crate::model::status::{ApplicationStatus, InquiryStatus};
    use crate::store::{Document, Fields};
    use serde_json::{json, Value};
    use uuid::Uuid;

    fn document(created_at: Option<i64>, fields: Value) -> Document {
        let fields: Fields = match fields {
            Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        };
        Document {
            id: Uuid::new_v4(),
            created_at,
            fields,
        }
    }

    #[test]
    fn decodes_application_with_form_field_names() {
        let doc = document(
            Some(1_700_000_000_000),
            json!({
                "fullName": "Sarah Johnson",
                "email": "sarah.johnson@email.com",
                "availability": "Full Time",
                "education": "BSN, State University",
                "resume": "https://example.com/resume-sarah.pdf",
                "status": "reviewed",
                "lastViewed": 1_700_000_100_000_i64
            }),
        );

        let record = ApplicationRecord::from_document(&doc, 0).unwrap();
        assert_eq!(record.created_at, 1_700_000_000_000);
        assert_eq!(record.status, Some(ApplicationStatus::Reviewed));
        assert_eq!(record.last_viewed, Some(1_700_000_100_000));
        assert_eq!(
            record.payload.education_background.as_deref(),
            Some("BSN, State University")
        );
        assert_eq!(record.payload.availability(), Some("Full Time"));
        assert!(!record.is_unread());
    }

    #[test]
    fn missing_created_at_and_status_fall_back_to_defaults() {
        let doc = document(
            None,
            json!({ "name": "Robert Thompson", "email": "robert@email.com", "message": "hi" }),
        );

        let record = InquiryRecord::from_document(&doc, 42).unwrap();
        assert_eq!(record.created_at, 42);
        assert_eq!(record.status, None);
        assert_eq!(record.effective_status(), InquiryStatus::New);
        assert!(record.is_unread());
        assert_eq!(record.payload.full_name, "Robert Thompson");
    }

    #[test]
    fn empty_status_string_counts_as_absent() {
        let doc = document(
            Some(1),
            json!({ "fullName": "A", "email": "a@b.co", "status": "" }),
        );
        let record = InquiryRecord::from_document(&doc, 0).unwrap();
        assert_eq!(record.status, None);
    }

    #[test]
    fn status_from_the_other_kind_is_rejected() {
        let doc = document(
            Some(1),
            json!({ "fullName": "A", "email": "a@b.co", "status": "responded" }),
        );
        let err = ApplicationRecord::from_document(&doc, 0).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidStatus { ref value, .. } if value == "responded"));
    }

    #[test]
    fn blank_contact_email_is_rejected() {
        let doc = document(Some(1), json!({ "fullName": "A", "email": "  " }));
        let err = InquiryRecord::from_document(&doc, 0).unwrap_err();
        assert_eq!(err, DecodeError::MissingContactEmail(doc.id));
    }

    #[test]
    fn nameless_documents_decode_with_anonymous_display_name() {
        let doc = document(Some(1), json!({ "email": "anon@email.com", "message": "hello" }));
        let inquiry = InquiryRecord::from_document(&doc, 0).unwrap();
        assert_eq!(inquiry.payload.full_name, "");
        assert_eq!(inquiry.payload.display_name(), "Anonymous");

        let doc = document(Some(1), json!({ "fullName": "  ", "email": "x@email.com" }));
        let application = ApplicationRecord::from_document(&doc, 0).unwrap();
        assert_eq!(application.payload.display_name(), "Anonymous");
    }

    #[test]
    fn inquiry_search_includes_phone() {
        let inquiry = Inquiry {
            full_name: "Lisa Anderson".to_string(),
            email: "lisa@email.com".to_string(),
            phone: Some("(555) 678-9012".to_string()),
            message: String::new(),
        };
        assert!(inquiry.matches_search("678"));
        assert!(inquiry.matches_search("lisa"));
        assert!(!inquiry.matches_search("robert"));
    }

    #[test]
    fn payload_fields_use_stored_names_and_status() {
        let application = Application {
            full_name: "Michael Chen".to_string(),
            email: "michael.chen@email.com".to_string(),
            phone: None,
            availability: Some("Part Time".to_string()),
            contact_information: None,
            references: None,
            education_background: Some("AS Health Sciences".to_string()),
            resume_url: None,
        };
        let fields = payload_fields(&application, Some(ApplicationStatus::Reviewed)).unwrap();
        assert_eq!(fields.get("fullName"), Some(&json!("Michael Chen")));
        assert_eq!(fields.get("education"), Some(&json!("AS Health Sciences")));
        assert_eq!(fields.get("status"), Some(&json!("reviewed")));
        assert!(!fields.contains_key("phone"));
    }
}
