//! SQLite-backed local document store.
//!
//! # Responsibility
//! - Persist JSON documents per collection.
//! - Re-deliver collection snapshots to feed listeners after each write.
//!
//! # Invariants
//! - Snapshot order is `created_at DESC`, documents without `created_at`
//!   first, ties broken by `id ASC`.
//! - Listeners are notified only after the write has committed.

use super::{
    validate_collection, Document, DocumentId, DocumentStore, ErrorCallback, FeedError, FeedHub,
    Fields, SnapshotCallback, StoreError, StoreResult, Subscription,
};
use log::{error, info};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::Value;
use std::rc::Rc;
use std::time::Instant;
use uuid::Uuid;

const DOCUMENT_SELECT_SQL: &str = "SELECT
    id,
    created_at,
    fields
FROM documents";

/// Document store over a migrated SQLite connection.
pub struct SqliteDocumentStore<'conn> {
    conn: &'conn Connection,
    hub: Rc<FeedHub>,
}

impl<'conn> SqliteDocumentStore<'conn> {
    /// Wraps a connection returned by `open_db` / `open_db_in_memory`.
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
            hub: FeedHub::new(),
        }
    }

    /// Number of live feed listeners on `collection`.
    pub fn listener_count(&self, collection: &str) -> usize {
        self.hub.listener_count(collection)
    }

    /// Loads the full ordered snapshot of one collection.
    pub fn snapshot(&self, collection: &str) -> Result<Vec<Document>, FeedError> {
        self.query_snapshot(collection)
            .map_err(|err| FeedError::Query(err.to_string()))
    }

    fn query_snapshot(&self, collection: &str) -> StoreResult<Vec<Document>> {
        let mut stmt = self.conn.prepare(&format!(
            "{DOCUMENT_SELECT_SQL}
             WHERE collection = ?1
             ORDER BY created_at IS NOT NULL, created_at DESC, id ASC;"
        ))?;
        let mut rows = stmt.query([collection])?;
        let mut documents = Vec::new();
        while let Some(row) = rows.next()? {
            documents.push(parse_document_row(row)?);
        }
        Ok(documents)
    }

    fn notify(&self, collection: &str) {
        self.hub
            .notify_collection(collection, &|name: &str| self.snapshot(name));
    }
}

impl DocumentStore for SqliteDocumentStore<'_> {
    fn subscribe(
        &self,
        collection: &str,
        on_snapshot: SnapshotCallback,
        on_error: ErrorCallback,
    ) -> StoreResult<Subscription> {
        validate_collection(collection)?;

        let subscription = self.hub.register(collection, on_snapshot, on_error);
        info!(
            "event=feed_subscribe module=store status=ok collection={} listener={}",
            collection,
            subscription.id()
        );
        self.hub
            .deliver_initial(&subscription, &|name: &str| self.snapshot(name));
        Ok(subscription)
    }

    fn update_fields(&self, collection: &str, id: DocumentId, fields: Fields) -> StoreResult<()> {
        validate_collection(collection)?;
        let started_at = Instant::now();

        let result = self.merge_fields(collection, id, fields);
        match &result {
            Ok(()) => info!(
                "event=doc_update module=store status=ok collection={} id={} duration_ms={}",
                collection,
                id,
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=doc_update module=store status=error collection={} id={} error_code={} error={}",
                collection,
                id,
                err.code(),
                err
            ),
        }
        result?;

        self.notify(collection);
        Ok(())
    }

    fn insert(
        &self,
        collection: &str,
        fields: Fields,
        created_at: Option<i64>,
    ) -> StoreResult<DocumentId> {
        validate_collection(collection)?;
        let id = Uuid::new_v4();
        let body = Value::Object(fields).to_string();

        self.conn.execute(
            "INSERT INTO documents (collection, id, created_at, fields)
             VALUES (?1, ?2, ?3, ?4);",
            params![collection, id.to_string(), created_at, body],
        )?;
        info!(
            "event=doc_insert module=store status=ok collection={} id={}",
            collection, id
        );

        self.notify(collection);
        Ok(id)
    }

    fn get(&self, collection: &str, id: DocumentId) -> StoreResult<Option<Document>> {
        validate_collection(collection)?;
        let mut stmt = self.conn.prepare(&format!(
            "{DOCUMENT_SELECT_SQL}
             WHERE collection = ?1 AND id = ?2;"
        ))?;
        let mut rows = stmt.query(params![collection, id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_document_row(row)?));
        }
        Ok(None)
    }
}

impl SqliteDocumentStore<'_> {
    fn merge_fields(&self, collection: &str, id: DocumentId, fields: Fields) -> StoreResult<()> {
        let tx = self.conn.unchecked_transaction()?;

        let stored: Option<String> = tx
            .query_row(
                "SELECT fields FROM documents WHERE collection = ?1 AND id = ?2;",
                params![collection, id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        let Some(stored) = stored else {
            return Err(StoreError::NotFound {
                collection: collection.to_string(),
                id,
            });
        };

        let mut merged = parse_fields(&stored)?;
        for (key, value) in fields {
            merged.insert(key, value);
        }

        tx.execute(
            "UPDATE documents
             SET
                fields = ?1,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE collection = ?2 AND id = ?3;",
            params![Value::Object(merged).to_string(), collection, id.to_string()],
        )?;
        tx.commit()?;
        Ok(())
    }
}

fn parse_document_row(row: &Row<'_>) -> StoreResult<Document> {
    let id_text: String = row.get("id")?;
    let id = Uuid::parse_str(&id_text).map_err(|_| {
        StoreError::InvalidData(format!("invalid uuid value `{id_text}` in documents.id"))
    })?;
    let body: String = row.get("fields")?;

    Ok(Document {
        id,
        created_at: row.get("created_at")?,
        fields: parse_fields(&body)?,
    })
}

fn parse_fields(body: &str) -> StoreResult<Fields> {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(_) => Err(StoreError::InvalidData(
            "documents.fields is not a JSON object".to_string(),
        )),
        Err(err) => Err(StoreError::InvalidData(format!(
            "documents.fields is not valid JSON: {err}"
        ))),
    }
}
