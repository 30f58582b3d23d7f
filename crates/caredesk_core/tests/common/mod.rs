//! Collaborator doubles shared by the integration tests.
#![allow(dead_code)]

use caredesk_core::db::Connection;
use caredesk_core::mail::{Mailer, OutboundEmail, SendError, SendReceipt};
use caredesk_core::model::submission::payload_fields;
use caredesk_core::store::{ErrorCallback, FeedHub, SnapshotCallback};
use caredesk_core::{
    Application, Document, DocumentId, DocumentStore, FeedError, Fields, Inquiry,
    SqliteDocumentStore, StoreError, StoreResult, Subscription, SubmissionPayload,
};
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// SQLite-backed store whose feed and writes can be broken on demand.
pub struct ScriptedStore<'conn> {
    inner: SqliteDocumentStore<'conn>,
    hub: Rc<FeedHub>,
    feed_error: RefCell<Option<FeedError>>,
    feed_paused: Cell<bool>,
    fail_subscribe: Cell<bool>,
    fail_updates: Cell<bool>,
    updates: RefCell<Vec<(String, DocumentId, Fields)>>,
}

impl<'conn> ScriptedStore<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            inner: SqliteDocumentStore::new(conn),
            hub: FeedHub::new(),
            feed_error: RefCell::new(None),
            feed_paused: Cell::new(false),
            fail_subscribe: Cell::new(false),
            fail_updates: Cell::new(false),
            updates: RefCell::new(Vec::new()),
        }
    }

    /// Inserts a payload with an optional status and broadcasts it.
    pub fn seed<P: SubmissionPayload>(
        &self,
        payload: &P,
        status: Option<P::Status>,
        created_at: Option<i64>,
    ) -> DocumentId {
        let fields = payload_fields(payload, status).unwrap();
        self.insert(P::KIND.collection(), fields, created_at).unwrap()
    }

    /// Inserts raw fields without going through a typed payload.
    pub fn seed_raw(&self, collection: &str, fields: Value, created_at: Option<i64>) -> DocumentId {
        let Value::Object(fields) = fields else {
            panic!("fixture must be a JSON object");
        };
        self.insert(collection, fields, created_at).unwrap()
    }

    /// Delivers `err` to every listener of `collection` until healed.
    pub fn break_feed(&self, collection: &str, err: FeedError) {
        *self.feed_error.borrow_mut() = Some(err);
        self.broadcast(collection);
    }

    pub fn heal_feed(&self) {
        *self.feed_error.borrow_mut() = None;
    }

    /// Holds back snapshots after writes until `resume_feed`.
    pub fn pause_feed(&self) {
        self.feed_paused.set(true);
    }

    pub fn resume_feed(&self, collection: &str) {
        self.feed_paused.set(false);
        self.broadcast(collection);
    }

    pub fn fail_subscribe(&self, fail: bool) {
        self.fail_subscribe.set(fail);
    }

    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.set(fail);
    }

    /// Status values written for `id`, in call order (failed calls included).
    pub fn status_writes(&self, id: DocumentId) -> Vec<String> {
        self.updates
            .borrow()
            .iter()
            .filter(|(_, target, _)| *target == id)
            .filter_map(|(_, _, fields)| fields.get("status").and_then(Value::as_str))
            .map(str::to_string)
            .collect()
    }

    pub fn update_count(&self) -> usize {
        self.updates.borrow().len()
    }

    pub fn listener_count(&self, collection: &str) -> usize {
        self.hub.listener_count(collection)
    }

    pub fn stored_status(&self, collection: &str, id: DocumentId) -> Option<String> {
        self.inner
            .get(collection, id)
            .unwrap()
            .and_then(|document| document.fields.get("status").cloned())
            .and_then(|value| value.as_str().map(str::to_string))
    }

    fn load(&self, collection: &str) -> Result<Vec<Document>, FeedError> {
        if let Some(err) = self.feed_error.borrow().clone() {
            return Err(err);
        }
        self.inner.snapshot(collection)
    }

    fn broadcast(&self, collection: &str) {
        self.hub
            .notify_collection(collection, &|name: &str| self.load(name));
    }
}

impl DocumentStore for ScriptedStore<'_> {
    fn subscribe(
        &self,
        collection: &str,
        on_snapshot: SnapshotCallback,
        on_error: ErrorCallback,
    ) -> StoreResult<Subscription> {
        if self.fail_subscribe.get() {
            return Err(StoreError::Unavailable("subscription refused".to_string()));
        }
        let subscription = self.hub.register(collection, on_snapshot, on_error);
        self.hub
            .deliver_initial(&subscription, &|name: &str| self.load(name));
        Ok(subscription)
    }

    fn update_fields(&self, collection: &str, id: DocumentId, fields: Fields) -> StoreResult<()> {
        self.updates
            .borrow_mut()
            .push((collection.to_string(), id, fields.clone()));
        if self.fail_updates.get() {
            return Err(StoreError::Unavailable("write rejected".to_string()));
        }
        self.inner.update_fields(collection, id, fields)?;
        if !self.feed_paused.get() {
            self.broadcast(collection);
        }
        Ok(())
    }

    fn insert(
        &self,
        collection: &str,
        fields: Fields,
        created_at: Option<i64>,
    ) -> StoreResult<DocumentId> {
        let id = self.inner.insert(collection, fields, created_at)?;
        if !self.feed_paused.get() {
            self.broadcast(collection);
        }
        Ok(id)
    }

    fn get(&self, collection: &str, id: DocumentId) -> StoreResult<Option<Document>> {
        self.inner.get(collection, id)
    }
}

/// Mailer that records messages and can fail the next sends.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: RefCell<Vec<OutboundEmail>>,
    failure: RefCell<Option<SendError>>,
}

impl RecordingMailer {
    pub fn failing_with(err: SendError) -> Self {
        Self {
            sent: RefCell::new(Vec::new()),
            failure: RefCell::new(Some(err)),
        }
    }

    pub fn sent_count(&self) -> usize {
        self.sent.borrow().len()
    }
}

impl Mailer for RecordingMailer {
    fn send(&self, email: &OutboundEmail) -> Result<SendReceipt, SendError> {
        if let Some(err) = self.failure.borrow().clone() {
            return Err(err);
        }
        self.sent.borrow_mut().push(email.clone());
        Ok(SendReceipt {
            response: "250 OK queued".to_string(),
            accepted_at: 1_700_000_000_000,
        })
    }
}

pub fn application(full_name: &str, email: &str) -> Application {
    Application {
        full_name: full_name.to_string(),
        email: email.to_string(),
        phone: None,
        availability: Some("Full Time".to_string()),
        contact_information: None,
        references: None,
        education_background: None,
        resume_url: None,
    }
}

pub fn inquiry(full_name: &str, email: &str, message: &str) -> Inquiry {
    Inquiry {
        full_name: full_name.to_string(),
        email: email.to_string(),
        phone: Some("(555) 456-7890".to_string()),
        message: message.to_string(),
    }
}
