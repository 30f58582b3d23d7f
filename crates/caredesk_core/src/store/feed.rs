//! In-process change-feed listener registry.
//!
//! # Responsibility
//! - Track snapshot listeners per collection.
//! - Deliver full snapshots (never diffs) to listeners in write order.
//!
//! # Invariants
//! - A released listener is never invoked again.
//! - Deliveries requested from inside a callback are queued and run after
//!   the current delivery, so every listener sees snapshots in write order.
//! - No `RefCell` borrow is held while a callback runs.

use super::{Document, ErrorCallback, FeedError, SnapshotCallback};
use log::debug;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};
use std::rc::{Rc, Weak};

/// Loads the current snapshot of one collection.
pub type SnapshotLoader<'a> = &'a dyn Fn(&str) -> Result<Vec<Document>, FeedError>;

struct Listener {
    collection: String,
    callbacks: Option<(SnapshotCallback, ErrorCallback)>,
}

enum Delivery {
    Collection(String),
    Listener(u64),
}

/// Listener registry shared by a store and its live subscriptions.
#[derive(Default)]
pub struct FeedHub {
    listeners: RefCell<BTreeMap<u64, Listener>>,
    next_id: Cell<u64>,
    pending: RefCell<VecDeque<Delivery>>,
    dispatching: Cell<bool>,
}

impl FeedHub {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Registers one listener and returns its disposer.
    ///
    /// No snapshot is delivered here; callers follow up with
    /// `deliver_initial`.
    pub fn register(
        self: &Rc<Self>,
        collection: &str,
        on_snapshot: SnapshotCallback,
        on_error: ErrorCallback,
    ) -> Subscription {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        self.listeners.borrow_mut().insert(
            id,
            Listener {
                collection: collection.to_string(),
                callbacks: Some((on_snapshot, on_error)),
            },
        );

        Subscription {
            hub: Rc::downgrade(self),
            id,
            collection: collection.to_string(),
            released: false,
        }
    }

    /// Delivers the current snapshot to one freshly registered listener.
    pub fn deliver_initial(&self, subscription: &Subscription, load: SnapshotLoader<'_>) {
        self.pending
            .borrow_mut()
            .push_back(Delivery::Listener(subscription.id));
        self.drain(load);
    }

    /// Delivers the current snapshot of `collection` to all its listeners.
    pub fn notify_collection(&self, collection: &str, load: SnapshotLoader<'_>) {
        self.pending
            .borrow_mut()
            .push_back(Delivery::Collection(collection.to_string()));
        self.drain(load);
    }

    /// Number of live listeners on `collection`.
    pub fn listener_count(&self, collection: &str) -> usize {
        self.listeners
            .borrow()
            .values()
            .filter(|listener| listener.collection == collection)
            .count()
    }

    fn release(&self, id: u64) -> bool {
        self.listeners.borrow_mut().remove(&id).is_some()
    }

    fn drain(&self, load: SnapshotLoader<'_>) {
        if self.dispatching.get() {
            return;
        }
        let _guard = DispatchGuard::enter(&self.dispatching);

        loop {
            let Some(delivery) = self.pending.borrow_mut().pop_front() else {
                break;
            };
            let (collection, targets) = self.resolve(delivery);
            if targets.is_empty() {
                continue;
            }

            let snapshot = load(collection.as_str());
            debug!(
                "event=feed_dispatch module=store status={} collection={} listeners={}",
                if snapshot.is_ok() { "ok" } else { "error" },
                collection,
                targets.len()
            );
            for id in targets {
                self.invoke(id, &snapshot);
            }
        }
    }

    fn resolve(&self, delivery: Delivery) -> (String, Vec<u64>) {
        let listeners = self.listeners.borrow();
        match delivery {
            Delivery::Collection(collection) => {
                let targets = listeners
                    .iter()
                    .filter(|(_, listener)| listener.collection == collection)
                    .map(|(id, _)| *id)
                    .collect();
                (collection, targets)
            }
            Delivery::Listener(id) => match listeners.get(&id) {
                Some(listener) => (listener.collection.clone(), vec![id]),
                None => (String::new(), Vec::new()),
            },
        }
    }

    fn invoke(&self, id: u64, snapshot: &Result<Vec<Document>, FeedError>) {
        let taken = self
            .listeners
            .borrow_mut()
            .get_mut(&id)
            .and_then(|listener| listener.callbacks.take());
        let Some((mut on_snapshot, mut on_error)) = taken else {
            return;
        };

        match snapshot {
            Ok(documents) => on_snapshot(documents),
            Err(err) => on_error(err),
        }

        // The listener may have been released from inside its own callback.
        if let Some(listener) = self.listeners.borrow_mut().get_mut(&id) {
            listener.callbacks = Some((on_snapshot, on_error));
        }
    }
}

struct DispatchGuard<'a>(&'a Cell<bool>);

impl<'a> DispatchGuard<'a> {
    fn enter(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        Self(flag)
    }
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Disposer for one change-feed listener.
///
/// Dropping the subscription releases the listener, so release happens on
/// every exit path of the owning scope.
pub struct Subscription {
    hub: Weak<FeedHub>,
    id: u64,
    collection: String,
    released: bool,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Whether the listener is still registered.
    pub fn is_active(&self) -> bool {
        !self.released && self.hub.upgrade().is_some()
    }

    /// Releases the listener explicitly.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Some(hub) = self.hub.upgrade() {
            if hub.release(self.id) {
                debug!(
                    "event=feed_release module=store status=ok collection={} listener={}",
                    self.collection, self.id
                );
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("collection", &self.collection)
            .field("released", &self.released)
            .finish()
    }
}
