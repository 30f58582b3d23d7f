//! Feed-derived ordered view of one submission collection.
//!
//! # Responsibility
//! - Subscribe to the change feed of one submission kind.
//! - Rebuild the whole ordered view on every snapshot and re-derive counts.
//! - Publish each rebuilt view to listeners as an immutable snapshot.
//!
//! # Invariants
//! - Items are ordered by `created_at` descending; a missing `created_at`
//!   becomes the rebuild time, the document is not dropped.
//! - A feed error clears the view and reports `0/0` counts in the explicit
//!   `FeedState::Unavailable` state; stale data is never retained.
//! - At most one live subscription per projection; it is released when the
//!   projection is detached or dropped.

use crate::counter::{count_submissions, Counts};
use crate::model::submission::{now_epoch_ms, Submission, SubmissionId, SubmissionPayload};
use crate::store::{Document, DocumentStore, FeedError, StoreResult, Subscription};
use log::{info, warn};
use std::cell::RefCell;
use std::rc::Rc;

/// Feed health as seen by list views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedState {
    /// Not attached yet, or waiting for the first snapshot.
    Connecting,
    Live,
    /// The feed reported an error; distinct from an empty collection.
    Unavailable(FeedError),
}

/// One immutable projection state, published per feed notification.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionSnapshot<P: SubmissionPayload> {
    pub state: FeedState,
    pub items: Vec<Submission<P>>,
    pub counts: Counts,
    /// Documents left out because they failed to decode.
    pub skipped: usize,
    /// Incremented on every rebuild.
    pub revision: u64,
}

impl<P: SubmissionPayload> ProjectionSnapshot<P> {
    fn connecting() -> Self {
        Self {
            state: FeedState::Connecting,
            items: Vec::new(),
            counts: Counts::default(),
            skipped: 0,
            revision: 0,
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self.state, FeedState::Unavailable(_))
    }

    pub fn get(&self, id: SubmissionId) -> Option<&Submission<P>> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Items matching `filter`, in projection order. Counts are unaffected.
    pub fn filtered<'a>(&'a self, filter: &ListFilter) -> Vec<&'a Submission<P>> {
        self.items
            .iter()
            .filter(|item| filter.matches(item))
            .collect()
    }
}

/// List-view search and availability filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    /// Case-insensitive substring over name/email (and phone for inquiries).
    pub search: Option<String>,
    /// Case-insensitive availability substring; `None` or `all` keeps everything.
    pub availability: Option<String>,
}

impl ListFilter {
    pub fn matches<P: SubmissionPayload>(&self, submission: &Submission<P>) -> bool {
        if let Some(needle) = normalized(self.search.as_deref()) {
            if !submission.payload.matches_search(&needle) {
                return false;
            }
        }

        match normalized(self.availability.as_deref()) {
            Some(wanted) if wanted != "all" => submission
                .payload
                .availability()
                .is_some_and(|value| value.to_lowercase().contains(&wanted)),
            _ => true,
        }
    }
}

fn normalized(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_lowercase)
}

pub type ProjectionListener<P> = Box<dyn FnMut(&ProjectionSnapshot<P>)>;

struct Shared<P: SubmissionPayload> {
    current: Rc<ProjectionSnapshot<P>>,
    listeners: Vec<ProjectionListener<P>>,
}

/// Realtime projection of one submission kind.
pub struct Projection<P: SubmissionPayload> {
    shared: Rc<RefCell<Shared<P>>>,
    subscription: Option<Subscription>,
}

impl<P: SubmissionPayload> Default for Projection<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: SubmissionPayload> Projection<P> {
    /// Creates a detached projection in the `Connecting` state.
    pub fn new() -> Self {
        Self {
            shared: Rc::new(RefCell::new(Shared {
                current: Rc::new(ProjectionSnapshot::connecting()),
                listeners: Vec::new(),
            })),
            subscription: None,
        }
    }

    /// Registers a listener invoked after every rebuild.
    pub fn on_change(&self, listener: ProjectionListener<P>) {
        self.shared.borrow_mut().listeners.push(listener);
    }

    /// Current immutable snapshot.
    pub fn snapshot(&self) -> Rc<ProjectionSnapshot<P>> {
        Rc::clone(&self.shared.borrow().current)
    }

    pub fn is_attached(&self) -> bool {
        self.subscription
            .as_ref()
            .is_some_and(Subscription::is_active)
    }

    /// Subscribes to the kind's collection, replacing any previous subscription.
    ///
    /// The initial snapshot is published before this returns.
    ///
    /// # Errors
    /// - Returns the store error when the subscription cannot be set up; the
    ///   projection is then `Unavailable` with empty items.
    pub fn attach<S: DocumentStore + ?Sized>(&mut self, store: &S) -> StoreResult<()> {
        self.detach();
        let collection = P::KIND.collection();

        let on_snapshot = {
            let shared = Rc::clone(&self.shared);
            Box::new(move |documents: &[Document]| {
                let rebuilt = rebuild::<P>(&shared.borrow().current, documents);
                publish(&shared, rebuilt);
            })
        };
        let on_error = {
            let shared = Rc::clone(&self.shared);
            Box::new(move |err: &FeedError| {
                warn!(
                    "event=projection_rebuild module=projection status=error collection={} error_code={}",
                    P::KIND.collection(),
                    err.code()
                );
                let failed = unavailable::<P>(&shared.borrow().current, err.clone());
                publish(&shared, failed);
            })
        };

        match store.subscribe(collection, on_snapshot, on_error) {
            Ok(subscription) => {
                self.subscription = Some(subscription);
                Ok(())
            }
            Err(err) => {
                warn!(
                    "event=feed_subscribe module=projection status=error collection={} error_code={}",
                    collection,
                    err.code()
                );
                let failed = unavailable::<P>(
                    &self.shared.borrow().current,
                    FeedError::Transport(err.to_string()),
                );
                publish(&self.shared, failed);
                Err(err)
            }
        }
    }

    /// Drops the live subscription, if any. The last snapshot stays readable.
    pub fn detach(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }

    /// Manual retry after a feed error.
    pub fn retry<S: DocumentStore + ?Sized>(&mut self, store: &S) -> StoreResult<()> {
        info!(
            "event=projection_retry module=projection status=start collection={}",
            P::KIND.collection()
        );
        self.attach(store)
    }
}

fn rebuild<P: SubmissionPayload>(
    previous: &ProjectionSnapshot<P>,
    documents: &[Document],
) -> ProjectionSnapshot<P> {
    let now_ms = now_epoch_ms();
    let mut items = Vec::with_capacity(documents.len());
    let mut skipped = 0;

    for document in documents {
        match Submission::<P>::from_document(document, now_ms) {
            Ok(item) => items.push(item),
            Err(err) => {
                skipped += 1;
                warn!(
                    "event=projection_decode module=projection status=skipped collection={} id={} error_code={}",
                    P::KIND.collection(),
                    err.submission_id(),
                    err.code()
                );
            }
        }
    }

    // Stable sort keeps feed order for equal timestamps.
    items.sort_by(|left, right| right.created_at.cmp(&left.created_at));
    let counts = count_submissions(&items);

    info!(
        "event=projection_rebuild module=projection status=ok collection={} total={} unread={} skipped={}",
        P::KIND.collection(),
        counts.total,
        counts.unread,
        skipped
    );

    ProjectionSnapshot {
        state: FeedState::Live,
        items,
        counts,
        skipped,
        revision: previous.revision + 1,
    }
}

fn unavailable<P: SubmissionPayload>(
    previous: &ProjectionSnapshot<P>,
    err: FeedError,
) -> ProjectionSnapshot<P> {
    ProjectionSnapshot {
        state: FeedState::Unavailable(err),
        items: Vec::new(),
        counts: Counts::default(),
        skipped: 0,
        revision: previous.revision + 1,
    }
}

fn publish<P: SubmissionPayload>(shared: &Rc<RefCell<Shared<P>>>, snapshot: ProjectionSnapshot<P>) {
    let snapshot = Rc::new(snapshot);
    let mut listeners = {
        let mut state = shared.borrow_mut();
        state.current = Rc::clone(&snapshot);
        std::mem::take(&mut state.listeners)
    };

    for listener in listeners.iter_mut() {
        listener(&snapshot);
    }

    // Keep listeners registered from inside a callback.
    let mut state = shared.borrow_mut();
    listeners.append(&mut state.listeners);
    state.listeners = listeners;
}
