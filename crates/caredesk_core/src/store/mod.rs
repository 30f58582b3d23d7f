//! Document store collaborator contracts.
//!
//! # Responsibility
//! - Define the change-feed subscription and partial-update contracts the
//!   dashboard core consumes.
//! - Provide a SQLite-backed local implementation.
//!
//! # Invariants
//! - Subscribing delivers an initial snapshot, then a full snapshot after
//!   every write to the collection.
//! - `update_fields` leaves fields it does not name untouched.
//! - Feed failures are delivered through the error callback, never as a
//!   silently empty snapshot.

use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

mod feed;
mod sqlite;

pub use feed::{FeedHub, SnapshotLoader, Subscription};
pub use sqlite::SqliteDocumentStore;

/// Store-assigned document identifier.
pub type DocumentId = Uuid;

/// Untyped document body.
pub type Fields = Map<String, Value>;

pub type SnapshotCallback = Box<dyn FnMut(&[Document])>;
pub type ErrorCallback = Box<dyn FnMut(&FeedError)>;

pub type StoreResult<T> = Result<T, StoreError>;

/// One stored document as delivered by the change feed.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: DocumentId,
    /// Unix epoch milliseconds; absent for documents written without one.
    pub created_at: Option<i64>,
    pub fields: Fields,
}

/// Document store used by the dashboard core.
///
/// Implementations are single-threaded; callbacks run on the caller's thread.
pub trait DocumentStore {
    /// Subscribes to full snapshots of `collection`.
    ///
    /// The initial snapshot (or error) is delivered before this returns.
    fn subscribe(
        &self,
        collection: &str,
        on_snapshot: SnapshotCallback,
        on_error: ErrorCallback,
    ) -> StoreResult<Subscription>;

    /// Merges `fields` into one existing document.
    fn update_fields(&self, collection: &str, id: DocumentId, fields: Fields) -> StoreResult<()>;

    /// Inserts a new document and returns its assigned id.
    fn insert(
        &self,
        collection: &str,
        fields: Fields,
        created_at: Option<i64>,
    ) -> StoreResult<DocumentId>;

    fn get(&self, collection: &str, id: DocumentId) -> StoreResult<Option<Document>>;
}

/// Store operation failure.
#[derive(Debug)]
pub enum StoreError {
    Sqlite(rusqlite::Error),
    InvalidCollection(String),
    NotFound { collection: String, id: DocumentId },
    InvalidData(String),
    /// The remote side refused or could not complete the operation.
    Unavailable(String),
}

impl StoreError {
    /// Stable metadata-only code for logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Sqlite(_) => "db_error",
            Self::InvalidCollection(_) => "invalid_collection",
            Self::NotFound { .. } => "not_found",
            Self::InvalidData(_) => "invalid_data",
            Self::Unavailable(_) => "unavailable",
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "document query failed: {err}"),
            Self::InvalidCollection(name) => write!(f, "invalid collection name: `{name}`"),
            Self::NotFound { collection, id } => {
                write!(f, "document not found: {collection}/{id}")
            }
            Self::InvalidData(message) => write!(f, "invalid stored document: {message}"),
            Self::Unavailable(message) => write!(f, "document store unavailable: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// Change-feed delivery failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    PermissionDenied(String),
    Transport(String),
    Query(String),
}

impl FeedError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::PermissionDenied(_) => "permission_denied",
            Self::Transport(_) => "transport",
            Self::Query(_) => "query_failed",
        }
    }
}

impl Display for FeedError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PermissionDenied(message) => write!(f, "permission denied: {message}"),
            Self::Transport(message) => write!(f, "feed transport failed: {message}"),
            Self::Query(message) => write!(f, "snapshot query failed: {message}"),
        }
    }
}

impl Error for FeedError {}

/// Collection names are lowercase ascii words.
pub fn validate_collection(name: &str) -> StoreResult<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidCollection(name.to_string()))
    }
}
