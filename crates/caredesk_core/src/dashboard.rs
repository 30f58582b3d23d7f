//! Dashboard session.
//!
//! # Responsibility
//! - Own the per-session collaborator handles, both projections, the
//!   summary board and the open detail views.
//! - Convert every operation failure into a `Notice` instead of an error.
//!
//! # Invariants
//! - Exactly one live subscription per kind while mounted; both are
//!   released on unmount or drop.
//! - Projection listeners only touch the summary board and the notice
//!   queue. Detail views are reconciled after each operation, never from
//!   inside a feed callback.

use crate::mail::{Mailer, SendError};
use crate::model::status::{ApplicationStatus, InquiryStatus, LifecycleStatus};
use crate::model::submission::{
    Application, Inquiry, Submission, SubmissionId, SubmissionKind, SubmissionPayload,
};
use crate::notice::Notice;
use crate::projection::{FeedState, Projection, ProjectionSnapshot};
use crate::service::export_service::{export_application, ApplicationRenderer, ExportedFile};
use crate::service::reply_service::{ReplyDraft, ReplyError, ReplyService};
use crate::service::transition_service::{DetailView, TransitionController};
use crate::store::DocumentStore;
use crate::summary::{DashboardSummary, SummaryBoard};
use log::info;
use std::cell::RefCell;
use std::rc::Rc;

type NoticeQueue = Rc<RefCell<Vec<Notice>>>;

/// One mounted dashboard over an injected document store.
pub struct Dashboard<'s, S: DocumentStore + ?Sized> {
    store: &'s S,
    mailer: Option<&'s dyn Mailer>,
    controller: TransitionController<'s, S>,
    applications: Projection<Application>,
    inquiries: Projection<Inquiry>,
    board: Rc<RefCell<SummaryBoard>>,
    notices: NoticeQueue,
    application_detail: Option<DetailView<Application>>,
    inquiry_detail: Option<DetailView<Inquiry>>,
}

impl<'s, S: DocumentStore + ?Sized> Dashboard<'s, S> {
    /// Creates an unmounted dashboard. Reply sending is disabled until a
    /// mailer is attached.
    pub fn new(store: &'s S) -> Self {
        let board = Rc::new(RefCell::new(SummaryBoard::new()));
        let notices: NoticeQueue = Rc::new(RefCell::new(Vec::new()));

        let applications = Projection::new();
        applications.on_change(summary_listener(&board, &notices));
        let inquiries = Projection::new();
        inquiries.on_change(summary_listener(&board, &notices));

        Self {
            store,
            mailer: None,
            controller: TransitionController::new(store),
            applications,
            inquiries,
            board,
            notices,
            application_detail: None,
            inquiry_detail: None,
        }
    }

    pub fn with_mailer(mut self, mailer: &'s dyn Mailer) -> Self {
        self.mailer = Some(mailer);
        self
    }

    /// Subscribes both projections. Returns whether both feeds are live.
    pub fn mount(&mut self) -> bool {
        // Attach failures are already published as `Unavailable` snapshots.
        let _ = self.applications.attach(self.store);
        let _ = self.inquiries.attach(self.store);
        info!(
            "event=dashboard_mount module=dashboard status=ok applications_live={} inquiries_live={}",
            self.applications.is_attached(),
            self.inquiries.is_attached()
        );
        self.is_live()
    }

    /// Releases both subscriptions and closes any open detail view.
    pub fn unmount(&mut self) {
        self.applications.detach();
        self.inquiries.detach();
        self.application_detail = None;
        self.inquiry_detail = None;
        info!("event=dashboard_unmount module=dashboard status=ok");
    }

    pub fn is_live(&self) -> bool {
        self.applications.snapshot().state == FeedState::Live
            && self.inquiries.snapshot().state == FeedState::Live
    }

    /// Re-subscribes one kind after a feed error.
    pub fn retry(&mut self, kind: SubmissionKind) -> bool {
        let result = match kind {
            SubmissionKind::Application => self.applications.retry(self.store),
            SubmissionKind::Inquiry => self.inquiries.retry(self.store),
        };
        self.sync_details();
        let restored = result.is_ok() && self.feed_state(kind) == FeedState::Live;
        if restored {
            self.push(Notice::feed_restored(kind));
        }
        restored
    }

    pub fn feed_state(&self, kind: SubmissionKind) -> FeedState {
        match kind {
            SubmissionKind::Application => self.applications.snapshot().state.clone(),
            SubmissionKind::Inquiry => self.inquiries.snapshot().state.clone(),
        }
    }

    pub fn summary(&self) -> DashboardSummary {
        self.board.borrow().summary()
    }

    pub fn applications(&self) -> Rc<ProjectionSnapshot<Application>> {
        self.applications.snapshot()
    }

    pub fn inquiries(&self) -> Rc<ProjectionSnapshot<Inquiry>> {
        self.inquiries.snapshot()
    }

    /// Whether a transition for `id` is in flight.
    pub fn is_updating(&self, id: SubmissionId) -> bool {
        self.controller.is_updating(id)
    }

    /// Drains pending notices, oldest first.
    pub fn take_notices(&self) -> Vec<Notice> {
        std::mem::take(&mut *self.notices.borrow_mut())
    }

    /// Opens an application from the current list; an unread one becomes
    /// `reviewed`.
    pub fn open_application(&mut self, id: SubmissionId) -> Option<&DetailView<Application>> {
        let record = self.applications.snapshot().get(id).cloned();
        self.application_detail = open_record(&self.controller, &self.notices, record);
        self.sync_details();
        self.application_detail.as_ref()
    }

    pub fn open_inquiry(&mut self, id: SubmissionId) -> Option<&DetailView<Inquiry>> {
        let record = self.inquiries.snapshot().get(id).cloned();
        self.inquiry_detail = open_record(&self.controller, &self.notices, record);
        self.sync_details();
        self.inquiry_detail.as_ref()
    }

    pub fn application_detail(&mut self) -> Option<&DetailView<Application>> {
        self.sync_details();
        self.application_detail.as_ref()
    }

    pub fn inquiry_detail(&mut self) -> Option<&DetailView<Inquiry>> {
        self.sync_details();
        self.inquiry_detail.as_ref()
    }

    pub fn close_detail(&mut self, kind: SubmissionKind) {
        match kind {
            SubmissionKind::Application => self.application_detail = None,
            SubmissionKind::Inquiry => self.inquiry_detail = None,
        }
    }

    /// Sets the open application's status. Returns whether the store
    /// accepted the update.
    pub fn set_application_status(&mut self, status: ApplicationStatus) -> bool {
        let changed = change_detail(
            &self.controller,
            &self.notices,
            self.application_detail.as_mut(),
            status,
        );
        self.sync_details();
        changed
    }

    pub fn set_inquiry_status(&mut self, status: InquiryStatus) -> bool {
        let changed = change_detail(
            &self.controller,
            &self.notices,
            self.inquiry_detail.as_mut(),
            status,
        );
        self.sync_details();
        changed
    }

    /// Sets a status by wire value, without opening the submission.
    ///
    /// An open detail view of the same submission is advanced as well.
    pub fn set_status(&mut self, kind: SubmissionKind, id: SubmissionId, status: &str) -> bool {
        let open_matches = match kind {
            SubmissionKind::Application => self
                .application_detail
                .as_ref()
                .is_some_and(|view| view.id() == id),
            SubmissionKind::Inquiry => self
                .inquiry_detail
                .as_ref()
                .is_some_and(|view| view.id() == id),
        };

        let changed = if open_matches {
            match kind {
                SubmissionKind::Application => match ApplicationStatus::parse(status) {
                    Some(parsed) => self.set_application_status(parsed),
                    None => self.reject_status(kind, id, status),
                },
                SubmissionKind::Inquiry => match InquiryStatus::parse(status) {
                    Some(parsed) => self.set_inquiry_status(parsed),
                    None => self.reject_status(kind, id, status),
                },
            }
        } else {
            match self.controller.transition_named(kind, id, status) {
                Ok(()) => {
                    self.push(Notice::status_updated(status));
                    true
                }
                Err(err) => {
                    self.push(Notice::transition_failed(&err));
                    false
                }
            }
        };
        self.sync_details();
        changed
    }

    /// Replies to the open application. The draft is cleared on success.
    pub fn reply_application(&mut self, draft: &mut ReplyDraft) -> bool {
        let sent = send_reply(
            self.mailer,
            &self.controller,
            &self.notices,
            self.application_detail.as_mut(),
            draft,
        );
        self.sync_details();
        sent
    }

    pub fn reply_inquiry(&mut self, draft: &mut ReplyDraft) -> bool {
        let sent = send_reply(
            self.mailer,
            &self.controller,
            &self.notices,
            self.inquiry_detail.as_mut(),
            draft,
        );
        self.sync_details();
        sent
    }

    /// Exports the open application.
    pub fn export_application<R: ApplicationRenderer + ?Sized>(
        &mut self,
        renderer: &R,
    ) -> Option<ExportedFile> {
        self.sync_details();
        let Some(view) = self.application_detail.as_ref() else {
            self.push(Notice::error("No application is open"));
            return None;
        };
        match export_application(renderer, view.record()) {
            Ok(file) => Some(file),
            Err(err) => {
                self.push(Notice::export_failed(&err));
                None
            }
        }
    }

    fn reject_status(&self, kind: SubmissionKind, id: SubmissionId, status: &str) -> bool {
        // Delegates to the controller for its error and log line.
        if let Err(err) = self.controller.transition_named(kind, id, status) {
            self.push(Notice::transition_failed(&err));
        }
        false
    }

    fn push(&self, notice: Notice) {
        self.notices.borrow_mut().push(notice);
    }

    fn sync_details(&mut self) {
        if let Some(view) = self.application_detail.as_mut() {
            if let Some(fresh) = self.applications.snapshot().get(view.id()) {
                view.reconcile(fresh);
            }
        }
        if let Some(view) = self.inquiry_detail.as_mut() {
            if let Some(fresh) = self.inquiries.snapshot().get(view.id()) {
                view.reconcile(fresh);
            }
        }
    }
}

fn summary_listener<P: SubmissionPayload>(
    board: &Rc<RefCell<SummaryBoard>>,
    notices: &NoticeQueue,
) -> Box<dyn FnMut(&ProjectionSnapshot<P>)> {
    let board = Rc::clone(board);
    let notices = Rc::clone(notices);
    Box::new(move |snapshot: &ProjectionSnapshot<P>| {
        board.borrow_mut().record(P::KIND, snapshot.counts);
        if let FeedState::Unavailable(err) = &snapshot.state {
            notices.borrow_mut().push(Notice::feed_failed(P::KIND, err));
        }
    })
}

fn open_record<S, P>(
    controller: &TransitionController<'_, S>,
    notices: &NoticeQueue,
    record: Option<Submission<P>>,
) -> Option<DetailView<P>>
where
    S: DocumentStore + ?Sized,
    P: SubmissionPayload,
{
    let Some(record) = record else {
        notices
            .borrow_mut()
            .push(Notice::error(format!("{} not found", capitalized(P::KIND))));
        return None;
    };
    let opened = controller.open(record);
    if let Some(err) = &opened.error {
        notices.borrow_mut().push(Notice::transition_failed(err));
    }
    Some(opened.view)
}

fn change_detail<S, P>(
    controller: &TransitionController<'_, S>,
    notices: &NoticeQueue,
    view: Option<&mut DetailView<P>>,
    status: P::Status,
) -> bool
where
    S: DocumentStore + ?Sized,
    P: SubmissionPayload,
{
    let Some(view) = view else {
        notices
            .borrow_mut()
            .push(Notice::error(format!("No {} is open", P::KIND.as_str())));
        return false;
    };
    match controller.change_status(view, status) {
        Ok(()) => {
            notices
                .borrow_mut()
                .push(Notice::status_updated(status.label()));
            true
        }
        Err(err) => {
            notices.borrow_mut().push(Notice::transition_failed(&err));
            false
        }
    }
}

fn send_reply<S, P>(
    mailer: Option<&dyn Mailer>,
    controller: &TransitionController<'_, S>,
    notices: &NoticeQueue,
    view: Option<&mut DetailView<P>>,
    draft: &mut ReplyDraft,
) -> bool
where
    S: DocumentStore + ?Sized,
    P: SubmissionPayload,
{
    let Some(view) = view else {
        notices
            .borrow_mut()
            .push(Notice::error(format!("No {} is open", P::KIND.as_str())));
        return false;
    };
    let Some(mailer) = mailer else {
        notices.borrow_mut().push(Notice::reply_failed(&ReplyError::Send(
            SendError::Configuration("no mailer configured".to_string()),
        )));
        return false;
    };

    match ReplyService::new(mailer).send_reply(controller, view, draft) {
        Ok(outcome) => {
            notices.borrow_mut().push(Notice::reply_sent());
            if let Some(err) = &outcome.transition_error {
                notices.borrow_mut().push(Notice::transition_failed(err));
            }
            true
        }
        Err(err) => {
            notices.borrow_mut().push(Notice::reply_failed(&err));
            false
        }
    }
}

fn capitalized(kind: SubmissionKind) -> &'static str {
    match kind {
        SubmissionKind::Application => "Application",
        SubmissionKind::Inquiry => "Inquiry",
    }
}
