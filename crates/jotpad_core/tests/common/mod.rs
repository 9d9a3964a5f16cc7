#![allow(dead_code)]

use jotpad_core::store::{
    Clock, DocumentFilter, DocumentOrder, NoteDocument, NoteStore, StoreError, StoreEvent,
    StoreResult, StoreSubscription, SubscriptionId,
};
use jotpad_core::SqliteNoteStore;
use rusqlite::Connection;
use serde_json::{Map, Value};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::mpsc::{self, Sender};

/// Clock the test advances by hand.
#[derive(Clone)]
pub struct ManualClock(pub Rc<Cell<i64>>);

impl ManualClock {
    pub fn starting_at(epoch_ms: i64) -> Self {
        Self(Rc::new(Cell::new(epoch_ms)))
    }

    pub fn advance(&self, millis: i64) {
        self.0.set(self.0.get() + millis);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.0.get()
    }
}

/// SQLite store wrapper that counts calls and can be told to fail.
pub struct FlakyStore<'conn> {
    inner: SqliteNoteStore<'conn>,
    pub appends: Cell<usize>,
    pub deletes: Cell<usize>,
    pub fail_appends: Cell<bool>,
    pub fail_deletes: Cell<bool>,
}

impl<'conn> FlakyStore<'conn> {
    pub fn new(conn: &'conn Connection, clock: ManualClock) -> Self {
        Self {
            inner: SqliteNoteStore::with_clock(conn, Box::new(clock)).unwrap(),
            appends: Cell::new(0),
            deletes: Cell::new(0),
            fail_appends: Cell::new(false),
            fail_deletes: Cell::new(false),
        }
    }

    pub fn active_subscriptions(&self) -> usize {
        self.inner.active_subscriptions()
    }
}

impl NoteStore for FlakyStore<'_> {
    fn append(&self, fields: Map<String, Value>) -> StoreResult<String> {
        self.appends.set(self.appends.get() + 1);
        if self.fail_appends.get() {
            return Err(StoreError::Backend("simulated append outage".to_string()));
        }
        self.inner.append(fields)
    }

    fn get(&self, id: &str) -> StoreResult<Option<NoteDocument>> {
        self.inner.get(id)
    }

    fn query(
        &self,
        filter: &DocumentFilter,
        order: DocumentOrder,
    ) -> StoreResult<Vec<NoteDocument>> {
        self.inner.query(filter, order)
    }

    fn subscribe(
        &self,
        filter: DocumentFilter,
        order: DocumentOrder,
    ) -> StoreResult<StoreSubscription> {
        self.inner.subscribe(filter, order)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.inner.unsubscribe(id)
    }

    fn delete(&self, id: &str) -> StoreResult<bool> {
        self.deletes.set(self.deletes.get() + 1);
        if self.fail_deletes.get() {
            return Err(StoreError::Backend("simulated delete outage".to_string()));
        }
        self.inner.delete(id)
    }
}

/// Store whose subscription feed is driven by the test.
///
/// Filters are ignored: `query` returns `documents` as-is.
#[derive(Default)]
pub struct ScriptedStore {
    senders: RefCell<Vec<(SubscriptionId, Sender<StoreEvent>)>>,
    pub unsubscribed: RefCell<Vec<SubscriptionId>>,
    pub documents: RefCell<Vec<NoteDocument>>,
}

impl ScriptedStore {
    pub fn push(&self, event: impl Fn() -> StoreEvent) {
        for (_, sender) in self.senders.borrow().iter() {
            let _ = sender.send(event());
        }
    }
}

impl NoteStore for ScriptedStore {
    fn append(&self, _fields: Map<String, Value>) -> StoreResult<String> {
        Err(StoreError::Backend("read-only".to_string()))
    }

    fn get(&self, _id: &str) -> StoreResult<Option<NoteDocument>> {
        Ok(None)
    }

    fn query(
        &self,
        _filter: &DocumentFilter,
        _order: DocumentOrder,
    ) -> StoreResult<Vec<NoteDocument>> {
        Ok(self.documents.borrow().clone())
    }

    fn subscribe(
        &self,
        _filter: DocumentFilter,
        _order: DocumentOrder,
    ) -> StoreResult<StoreSubscription> {
        let (sender, events) = mpsc::channel();
        let id = self.senders.borrow().len() as SubscriptionId + 1;
        self.senders.borrow_mut().push((id, sender));
        Ok(StoreSubscription { id, events })
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.senders.borrow_mut().retain(|(current, _)| *current != id);
        self.unsubscribed.borrow_mut().push(id);
    }

    fn delete(&self, _id: &str) -> StoreResult<bool> {
        Ok(false)
    }
}

/// Builds a raw document the way a remote store would hand it over.
pub fn raw_document(id: &str, fields: Value) -> NoteDocument {
    match fields {
        Value::Object(map) => NoteDocument::new(id, map),
        other => panic!("document fields must be an object, got {other}"),
    }
}
