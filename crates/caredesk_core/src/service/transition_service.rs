//! Status transition use-cases.
//!
//! # Responsibility
//! - Persist one status change (`status`, `lastViewed`) per call.
//! - Reflect the change optimistically in an open detail view.
//! - Derive the `reviewed` transition from opening an unread submission.
//!
//! # Invariants
//! - The projection is never mutated here; it catches up through the feed.
//! - Concurrent calls for the same id are neither rejected nor queued;
//!   last write wins at the store.
//! - The in-flight marker is cleared on every exit path.
//! - A failed remote update leaves the detail view advanced but marked
//!   `Unconfirmed` until the next feed snapshot.

use crate::model::status::{ApplicationStatus, InquiryStatus, LifecycleStatus};
use crate::model::submission::{
    now_epoch_ms, Submission, SubmissionId, SubmissionKind, SubmissionPayload, LAST_VIEWED_FIELD,
    STATUS_FIELD,
};
use crate::store::{DocumentStore, Fields, StoreError};
use log::{error, info};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type TransitionResult<T> = Result<T, TransitionError>;

/// Status transition failure.
#[derive(Debug)]
pub enum TransitionError {
    /// Status text is not a member of the kind's enum.
    UnknownStatus {
        kind: SubmissionKind,
        value: String,
    },
    /// The store rejected or failed the update.
    Remote {
        kind: SubmissionKind,
        id: SubmissionId,
        status: &'static str,
        source: StoreError,
    },
}

impl TransitionError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownStatus { .. } => "unknown_status",
            Self::Remote { source, .. } => source.code(),
        }
    }
}

impl Display for TransitionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownStatus { kind, value } => {
                write!(f, "`{value}` is not a valid {} status", kind.as_str())
            }
            Self::Remote {
                kind,
                id,
                status,
                source,
            } => write!(
                f,
                "failed to mark {} {id} as `{status}`: {source}",
                kind.as_str()
            ),
        }
    }
}

impl Error for TransitionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Remote { source, .. } => Some(source),
            Self::UnknownStatus { .. } => None,
        }
    }
}

/// Confirmation state of a detail view's displayed status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation<S> {
    /// Displayed record equals the last feed-delivered record.
    Confirmed,
    /// Remote update accepted; waiting for the feed to deliver it.
    Pending(S),
    /// Remote update failed; displayed status may disagree with the store.
    Unconfirmed(S),
}

/// The open detail view of one submission.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailView<P: SubmissionPayload> {
    record: Submission<P>,
    confirmation: Confirmation<P::Status>,
}

impl<P: SubmissionPayload> DetailView<P> {
    pub fn new(record: Submission<P>) -> Self {
        Self {
            record,
            confirmation: Confirmation::Confirmed,
        }
    }

    pub fn id(&self) -> SubmissionId {
        self.record.id
    }

    pub fn record(&self) -> &Submission<P> {
        &self.record
    }

    pub fn status(&self) -> P::Status {
        self.record.effective_status()
    }

    /// Badge predicate; same as list rows and counters.
    pub fn is_unread(&self) -> bool {
        self.record.is_unread()
    }

    pub fn confirmation(&self) -> Confirmation<P::Status> {
        self.confirmation
    }

    /// Applies a feed-delivered version of this record.
    ///
    /// A pending optimistic status survives until the feed shows it.
    pub fn reconcile(&mut self, fresh: &Submission<P>) {
        if fresh.id != self.record.id {
            return;
        }
        match self.confirmation {
            Confirmation::Pending(expected) if fresh.effective_status() != expected => {}
            _ => {
                self.record = fresh.clone();
                self.confirmation = Confirmation::Confirmed;
            }
        }
    }

    fn advance(&mut self, status: P::Status, at_ms: i64) {
        self.record.status = Some(status);
        self.record.last_viewed = Some(at_ms);
    }
}

/// Result of opening a submission.
#[derive(Debug)]
pub struct OpenedSubmission<P: SubmissionPayload> {
    pub view: DetailView<P>,
    /// Failure of the derived `reviewed` transition, if one was attempted.
    pub error: Option<TransitionError>,
}

/// Applies status transitions through the document store.
pub struct TransitionController<'s, S: DocumentStore + ?Sized> {
    store: &'s S,
    in_flight: RefCell<BTreeMap<SubmissionId, usize>>,
}

impl<'s, S: DocumentStore + ?Sized> TransitionController<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self {
            store,
            in_flight: RefCell::new(BTreeMap::new()),
        }
    }

    /// Whether a transition for `id` is currently in flight.
    pub fn is_updating(&self, id: SubmissionId) -> bool {
        self.in_flight.borrow().contains_key(&id)
    }

    /// Persists `status` and `lastViewed = now` for one submission.
    ///
    /// # Errors
    /// - `TransitionError::Remote` when the store update fails. Local state is
    ///   left unchanged.
    pub fn transition<T: LifecycleStatus>(
        &self,
        id: SubmissionId,
        status: T,
    ) -> TransitionResult<()> {
        self.persist(id, status, now_epoch_ms())
    }

    /// Text-status entry point for callers that cannot name the enum.
    pub fn transition_named(
        &self,
        kind: SubmissionKind,
        id: SubmissionId,
        status: &str,
    ) -> TransitionResult<()> {
        let unknown = || TransitionError::UnknownStatus {
            kind,
            value: status.to_string(),
        };
        match kind {
            SubmissionKind::Application => {
                let parsed = ApplicationStatus::parse(status).ok_or_else(unknown)?;
                self.transition(id, parsed)
            }
            SubmissionKind::Inquiry => {
                let parsed = InquiryStatus::parse(status).ok_or_else(unknown)?;
                self.transition(id, parsed)
            }
        }
    }

    /// Changes the status shown in an open detail view and persists it.
    ///
    /// The view is advanced before the remote call returns.
    pub fn change_status<P: SubmissionPayload>(
        &self,
        view: &mut DetailView<P>,
        status: P::Status,
    ) -> TransitionResult<()> {
        let at_ms = now_epoch_ms();
        view.advance(status, at_ms);

        match self.persist(view.id(), status, at_ms) {
            Ok(()) => {
                view.confirmation = Confirmation::Pending(status);
                Ok(())
            }
            Err(err) => {
                view.confirmation = Confirmation::Unconfirmed(status);
                Err(err)
            }
        }
    }

    /// Opens a submission; an unread one is transitioned to `reviewed`.
    ///
    /// Exactly one transition is issued for an unread record and none for a
    /// record that is already past `new`.
    pub fn open<P: SubmissionPayload>(&self, record: Submission<P>) -> OpenedSubmission<P> {
        let unread = record.is_unread();
        let mut view = DetailView::new(record);
        let error = if unread {
            self.change_status(&mut view, <P::Status as LifecycleStatus>::REVIEWED)
                .err()
        } else {
            None
        };
        OpenedSubmission { view, error }
    }

    fn persist<T: LifecycleStatus>(
        &self,
        id: SubmissionId,
        status: T,
        at_ms: i64,
    ) -> TransitionResult<()> {
        let _marker = InFlight::enter(&self.in_flight, id);
        let collection = T::KIND.collection();

        let mut fields = Fields::new();
        fields.insert(
            STATUS_FIELD.to_string(),
            Value::String(status.as_str().to_string()),
        );
        fields.insert(LAST_VIEWED_FIELD.to_string(), Value::from(at_ms));

        match self.store.update_fields(collection, id, fields) {
            Ok(()) => {
                info!(
                    "event=transition module=service status=ok collection={} id={} to={}",
                    collection,
                    id,
                    status.as_str()
                );
                Ok(())
            }
            Err(source) => {
                error!(
                    "event=transition module=service status=error collection={} id={} to={} error_code={}",
                    collection,
                    id,
                    status.as_str(),
                    source.code()
                );
                Err(TransitionError::Remote {
                    kind: T::KIND,
                    id,
                    status: status.as_str(),
                    source,
                })
            }
        }
    }
}

struct InFlight<'a> {
    registry: &'a RefCell<BTreeMap<SubmissionId, usize>>,
    id: SubmissionId,
}

impl<'a> InFlight<'a> {
    fn enter(registry: &'a RefCell<BTreeMap<SubmissionId, usize>>, id: SubmissionId) -> Self {
        *registry.borrow_mut().entry(id).or_insert(0) += 1;
        Self { registry, id }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut registry = self.registry.borrow_mut();
        if let Some(count) = registry.get_mut(&self.id) {
            *count -= 1;
            if *count == 0 {
                registry.remove(&self.id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Confirmation, DetailView};
    use crate::model::status::InquiryStatus;
    use crate::model::submission::{Inquiry, InquiryRecord};
    use uuid::Uuid;

    fn inquiry(status: Option<InquiryStatus>) -> InquiryRecord {
        InquiryRecord {
            id: Uuid::new_v4(),
            created_at: 10,
            status,
            last_viewed: None,
            payload: Inquiry {
                full_name: "Patricia Martinez".to_string(),
                email: "patricia@email.com".to_string(),
                phone: None,
                message: "Do you offer respite care?".to_string(),
            },
        }
    }

    #[test]
    fn pending_status_survives_stale_feed_record() {
        let stale = inquiry(None);
        let mut view = DetailView::new(stale.clone());
        view.advance(InquiryStatus::Reviewed, 20);
        view.confirmation = Confirmation::Pending(InquiryStatus::Reviewed);

        view.reconcile(&stale);
        assert_eq!(view.status(), InquiryStatus::Reviewed);

        let mut confirmed = stale.clone();
        confirmed.status = Some(InquiryStatus::Reviewed);
        view.reconcile(&confirmed);
        assert_eq!(view.confirmation(), Confirmation::Confirmed);
    }

    #[test]
    fn unconfirmed_status_yields_to_feed_truth() {
        let stored = inquiry(Some(InquiryStatus::Reviewed));
        let mut view = DetailView::new(stored.clone());
        view.advance(InquiryStatus::Responded, 20);
        view.confirmation = Confirmation::Unconfirmed(InquiryStatus::Responded);

        view.reconcile(&stored);
        assert_eq!(view.status(), InquiryStatus::Reviewed);
        assert_eq!(view.confirmation(), Confirmation::Confirmed);
    }

    #[test]
    fn reconcile_ignores_other_records() {
        let mut view = DetailView::new(inquiry(None));
        let other = inquiry(Some(InquiryStatus::Responded));
        view.reconcile(&other);
        assert!(view.is_unread());
    }
}
