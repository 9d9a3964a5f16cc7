//! SQLite-backed note store with live snapshot subscriptions.
//!
//! # Responsibility
//! - Persist note documents and assign `id`, `createdAt` and `seq`.
//! - Push a full, ordered snapshot to every live subscriber after each write.
//!
//! # Invariants
//! - Assigned `createdAt` never decreases across successive appends.
//! - `seq` strictly increases and is never reused.
//! - Subscribers whose receiver was dropped are pruned on the next publish.
//!
//! Single-threaded by construction: subscriber bookkeeping uses `RefCell`.

use super::{
    Clock, DocumentFilter, DocumentOrder, NoteDocument, NoteStore, StoreError, StoreEvent,
    StoreResult, StoreSubscription, SubscriptionId, SystemClock, FIELD_CREATED_AT,
    FIELD_OWNER_ID, FIELD_SEQ, FIELD_TEXT,
};
use crate::db::migrations::{current_user_version, latest_version};
use log::{debug, error, info};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde_json::{Map, Value};
use std::cell::{Cell, RefCell};
use std::sync::mpsc::{self, Sender};
use uuid::Uuid;

const NOTE_SELECT_SQL: &str = "SELECT id, seq, text, created_at, owner_id FROM notes";

struct Subscriber {
    id: SubscriptionId,
    filter: DocumentFilter,
    order: DocumentOrder,
    sender: Sender<StoreEvent>,
}

/// Note store over a migrated SQLite connection.
pub struct SqliteNoteStore<'conn> {
    conn: &'conn Connection,
    clock: Box<dyn Clock>,
    subscribers: RefCell<Vec<Subscriber>>,
    next_subscription_id: Cell<SubscriptionId>,
}

impl<'conn> SqliteNoteStore<'conn> {
    /// Constructs a store using the wall clock.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        Self::with_clock(conn, Box::new(SystemClock))
    }

    /// Constructs a store with a caller-provided timestamp source.
    pub fn with_clock(conn: &'conn Connection, clock: Box<dyn Clock>) -> StoreResult<Self> {
        ensure_store_connection_ready(conn)?;
        Ok(Self {
            conn,
            clock,
            subscribers: RefCell::new(Vec::new()),
            next_subscription_id: Cell::new(1),
        })
    }

    /// Number of live subscriptions still registered.
    pub fn active_subscriptions(&self) -> usize {
        self.subscribers.borrow().len()
    }

    fn publish(&self) {
        let mut subscribers = self.subscribers.borrow_mut();
        let before = subscribers.len();
        subscribers.retain(|subscriber| {
            let event = self.query(&subscriber.filter, subscriber.order);
            if let Err(err) = event.as_ref() {
                error!(
                    "event=store_publish module=store status=error subscription_id={} error={err}",
                    subscriber.id
                );
            }
            subscriber.sender.send(event).is_ok()
        });
        let pruned = before - subscribers.len();
        if pruned > 0 {
            debug!("event=store_publish module=store status=ok pruned_subscriptions={pruned}");
        }
    }
}

impl NoteStore for SqliteNoteStore<'_> {
    fn append(&self, fields: Map<String, Value>) -> StoreResult<String> {
        let text = match fields.get(FIELD_TEXT) {
            Some(Value::String(text)) => text.clone(),
            _ => {
                return Err(StoreError::Backend(format!(
                    "document field `{FIELD_TEXT}` must be a string"
                )))
            }
        };
        let owner_id = match fields.get(FIELD_OWNER_ID) {
            None | Some(Value::Null) => None,
            Some(Value::String(owner)) => Some(owner.clone()),
            Some(_) => {
                return Err(StoreError::Backend(format!(
                    "document field `{FIELD_OWNER_ID}` must be a string"
                )))
            }
        };

        let id = Uuid::new_v4().to_string();
        let tx = self.conn.unchecked_transaction()?;
        let last: Option<i64> = tx
            .query_row(
                "SELECT last_created_at FROM store_clock WHERE id = 1;",
                [],
                |row| row.get(0),
            )
            .optional()?;
        let now = self.clock.now_ms();
        let created_at = last.map_or(now, |last| now.max(last));
        tx.execute(
            "INSERT INTO store_clock (id, last_created_at) VALUES (1, ?1)
             ON CONFLICT(id) DO UPDATE SET last_created_at = excluded.last_created_at;",
            [created_at],
        )?;
        tx.execute(
            "INSERT INTO notes (id, text, created_at, owner_id) VALUES (?1, ?2, ?3, ?4);",
            params![id.as_str(), text.as_str(), created_at, owner_id.as_deref()],
        )?;
        tx.commit()?;

        info!("event=store_append module=store status=ok created_at={created_at}");
        self.publish();
        Ok(id)
    }

    fn get(&self, id: &str) -> StoreResult<Option<NoteDocument>> {
        let document = self
            .conn
            .query_row(
                &format!("{NOTE_SELECT_SQL} WHERE id = ?1;"),
                [id],
                document_from_row,
            )
            .optional()?;
        Ok(document)
    }

    fn query(
        &self,
        filter: &DocumentFilter,
        order: DocumentOrder,
    ) -> StoreResult<Vec<NoteDocument>> {
        let mut sql = String::from(NOTE_SELECT_SQL);
        let mut bind_values: Vec<SqlValue> = Vec::new();

        if let Some(owner_id) = filter.owner_id.as_ref() {
            sql.push_str(" WHERE owner_id = ?");
            bind_values.push(SqlValue::Text(owner_id.clone()));
        }

        match order {
            DocumentOrder::CreatedAtDesc => {
                sql.push_str(" ORDER BY created_at IS NULL ASC, created_at DESC, seq DESC")
            }
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let documents = stmt
            .query_map(params_from_iter(bind_values), document_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(documents)
    }

    fn subscribe(
        &self,
        filter: DocumentFilter,
        order: DocumentOrder,
    ) -> StoreResult<StoreSubscription> {
        let id = self.next_subscription_id.get();
        self.next_subscription_id.set(id + 1);

        let (sender, events) = mpsc::channel();
        // Receiver is still in hand, so the initial send cannot fail.
        let _ = sender.send(self.query(&filter, order));
        self.subscribers.borrow_mut().push(Subscriber {
            id,
            filter,
            order,
            sender,
        });

        info!("event=store_subscribe module=store status=ok subscription_id={id}");
        Ok(StoreSubscription { id, events })
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        let mut subscribers = self.subscribers.borrow_mut();
        let before = subscribers.len();
        subscribers.retain(|subscriber| subscriber.id != id);
        if subscribers.len() < before {
            info!("event=store_unsubscribe module=store status=ok subscription_id={id}");
        }
    }

    fn delete(&self, id: &str) -> StoreResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM notes WHERE id = ?1;", [id])?;
        if changed == 0 {
            debug!("event=store_delete module=store status=ok found=false");
            return Ok(false);
        }

        info!("event=store_delete module=store status=ok found=true");
        self.publish();
        Ok(true)
    }
}

fn document_from_row(row: &Row<'_>) -> rusqlite::Result<NoteDocument> {
    let id: String = row.get("id")?;
    let seq: i64 = row.get("seq")?;
    let text: String = row.get("text")?;
    let created_at: Option<i64> = row.get("created_at")?;
    let owner_id: Option<String> = row.get("owner_id")?;

    let mut fields = Map::new();
    fields.insert(FIELD_TEXT.to_string(), Value::String(text));
    fields.insert(
        FIELD_CREATED_AT.to_string(),
        created_at.map_or(Value::Null, Value::from),
    );
    fields.insert(
        FIELD_OWNER_ID.to_string(),
        owner_id.map_or(Value::Null, Value::String),
    );
    fields.insert(FIELD_SEQ.to_string(), Value::from(seq));
    Ok(NoteDocument::new(id, fields))
}

fn ensure_store_connection_ready(conn: &Connection) -> StoreResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(StoreError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in ["notes", "store_clock"] {
        if !table_exists(conn, table)? {
            return Err(StoreError::MissingRequiredTable(table));
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> StoreResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

#[cfg(test)]
mod tests {
    use super::SqliteNoteStore;
    use crate::db::open_db_in_memory;
    use crate::store::{
        Clock, DocumentFilter, DocumentOrder, NoteStore, StoreError, FIELD_CREATED_AT,
        FIELD_OWNER_ID, FIELD_TEXT,
    };
    use rusqlite::Connection;
    use serde_json::{json, Map, Value};
    use std::cell::Cell;
    use std::rc::Rc;

    struct StepClock(Rc<Cell<i64>>);

    impl Clock for StepClock {
        fn now_ms(&self) -> i64 {
            self.0.get()
        }
    }

    fn fields(text: &str) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert(FIELD_TEXT.to_string(), json!(text));
        map
    }

    #[test]
    fn created_at_never_goes_backwards() {
        let conn = open_db_in_memory().unwrap();
        let now = Rc::new(Cell::new(5_000));
        let store = SqliteNoteStore::with_clock(&conn, Box::new(StepClock(now.clone()))).unwrap();

        let first = store.append(fields("first")).unwrap();
        now.set(1_000);
        let second = store.append(fields("second")).unwrap();

        let first_doc = store.get(&first).unwrap().unwrap();
        let second_doc = store.get(&second).unwrap().unwrap();
        assert_eq!(first_doc.get(FIELD_CREATED_AT), Some(&json!(5_000)));
        assert_eq!(second_doc.get(FIELD_CREATED_AT), Some(&json!(5_000)));
    }

    #[test]
    fn clock_floor_survives_deleting_newest_note() {
        let conn = open_db_in_memory().unwrap();
        let now = Rc::new(Cell::new(9_000));
        let store = SqliteNoteStore::with_clock(&conn, Box::new(StepClock(now.clone()))).unwrap();

        let newest = store.append(fields("newest")).unwrap();
        assert!(store.delete(&newest).unwrap());
        now.set(10);
        let next = store.append(fields("next")).unwrap();

        let doc = store.get(&next).unwrap().unwrap();
        assert_eq!(doc.get(FIELD_CREATED_AT), Some(&json!(9_000)));
    }

    #[test]
    fn append_rejects_non_string_text() {
        let conn = open_db_in_memory().unwrap();
        let store = SqliteNoteStore::try_new(&conn).unwrap();
        let mut map = Map::new();
        map.insert(FIELD_TEXT.to_string(), json!(42));

        let err = store.append(map).unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
    }

    #[test]
    fn query_filters_by_owner() {
        let conn = open_db_in_memory().unwrap();
        let store = SqliteNoteStore::try_new(&conn).unwrap();
        let mut mine = fields("mine");
        mine.insert(FIELD_OWNER_ID.to_string(), json!("alice"));
        let mut theirs = fields("theirs");
        theirs.insert(FIELD_OWNER_ID.to_string(), json!("bob"));
        store.append(mine).unwrap();
        store.append(theirs).unwrap();

        let filter = DocumentFilter {
            owner_id: Some("alice".to_string()),
        };
        let docs = store.query(&filter, DocumentOrder::CreatedAtDesc).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].get(FIELD_TEXT), Some(&json!("mine")));
    }

    #[test]
    fn subscription_receives_initial_and_follow_up_snapshots() {
        let conn = open_db_in_memory().unwrap();
        let store = SqliteNoteStore::try_new(&conn).unwrap();
        let subscription = store
            .subscribe(DocumentFilter::default(), DocumentOrder::CreatedAtDesc)
            .unwrap();

        let initial = subscription.events.try_recv().unwrap().unwrap();
        assert!(initial.is_empty());

        store.append(fields("hello")).unwrap();
        let after_append = subscription.events.try_recv().unwrap().unwrap();
        assert_eq!(after_append.len(), 1);
        assert!(subscription.events.try_recv().is_err());
    }

    #[test]
    fn dropped_and_cancelled_subscriptions_are_released() {
        let conn = open_db_in_memory().unwrap();
        let store = SqliteNoteStore::try_new(&conn).unwrap();
        let kept = store
            .subscribe(DocumentFilter::default(), DocumentOrder::CreatedAtDesc)
            .unwrap();
        let dropped = store
            .subscribe(DocumentFilter::default(), DocumentOrder::CreatedAtDesc)
            .unwrap();
        assert_eq!(store.active_subscriptions(), 2);

        drop(dropped);
        store.append(fields("prune")).unwrap();
        assert_eq!(store.active_subscriptions(), 1);

        store.unsubscribe(kept.id);
        assert_eq!(store.active_subscriptions(), 0);
    }

    #[test]
    fn delete_of_missing_document_reports_false() {
        let conn = open_db_in_memory().unwrap();
        let store = SqliteNoteStore::try_new(&conn).unwrap();
        assert!(!store.delete("missing").unwrap());
    }

    #[test]
    fn store_rejects_unmigrated_connection() {
        let conn = Connection::open_in_memory().unwrap();
        let result = SqliteNoteStore::try_new(&conn);
        assert!(matches!(
            result,
            Err(StoreError::UninitializedConnection {
                actual_version: 0,
                ..
            })
        ));
    }
}
