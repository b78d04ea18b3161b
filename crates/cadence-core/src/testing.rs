//! In-memory store fake for exercising the adapter and poller.
//!
//! Available when compiling tests or when the `test-util` feature is enabled.
//! Records can be scheduled to appear or disappear after a latency measured
//! on tokio's clock, so paused-time tests observe exact stage boundaries.

use crate::error::{Error, Result};
use crate::predicate::FieldValue;
use crate::record::{Collection, Record};
use crate::store::{ContentStore, Cursor, StoreQuery};
use std::cmp::Ordering;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use std::vec::IntoIter;
use tokio::time::Instant;

/// A record with its visibility window.
#[derive(Debug, Clone)]
struct StoredRecord {
    record: Record,
    visible_from: Instant,
    removed_at: Option<Instant>,
}

impl StoredRecord {
    fn is_visible(&self, now: Instant) -> bool {
        self.visible_from <= now && self.removed_at.is_none_or(|removed| now < removed)
    }
}

/// Open/close counters shared between the store and its cursors.
#[derive(Debug, Default)]
struct CursorCounters {
    opened: AtomicUsize,
    closed: AtomicUsize,
}

/// Eventually-consistent in-memory store with failure injection.
#[derive(Debug, Default)]
pub struct FakeStore {
    records: Mutex<Vec<StoredRecord>>,
    counters: Arc<CursorCounters>,
    queries: AtomicUsize,
    unavailable: AtomicBool,
    fail_read_at: Mutex<Option<usize>>,
}

impl FakeStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record visible immediately.
    pub fn insert(&self, record: Record) {
        self.insert_after(record, Duration::ZERO);
    }

    /// Insert a record that becomes visible after `latency`.
    pub fn insert_after(&self, record: Record, latency: Duration) {
        let entry = StoredRecord {
            record,
            visible_from: Instant::now() + latency,
            removed_at: None,
        };
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }

    /// Remove every record of `collection` named `name` after `latency`.
    pub fn remove_after(&self, collection: Collection, name: &str, latency: Duration) {
        let removed_at = Instant::now() + latency;
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        for entry in records.iter_mut().filter(|entry| {
            entry.record.collection() == collection && entry.record.name() == name
        }) {
            entry.removed_at = Some(removed_at);
        }
    }

    /// Make subsequent `open` calls fail with [`Error::StoreUnavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, AtomicOrdering::SeqCst);
    }

    /// Make the next cursors fail when reading row `row` (0-based).
    pub fn fail_read_at(&self, row: Option<usize>) {
        *self
            .fail_read_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = row;
    }

    /// Number of `open` calls, including failed ones.
    pub fn query_count(&self) -> usize {
        self.queries.load(AtomicOrdering::SeqCst)
    }

    /// Cursors handed out.
    pub fn opened_cursors(&self) -> usize {
        self.counters.opened.load(AtomicOrdering::SeqCst)
    }

    /// Cursors released.
    pub fn closed_cursors(&self) -> usize {
        self.counters.closed.load(AtomicOrdering::SeqCst)
    }

    fn visible_matches(&self, query: &StoreQuery) -> Vec<Record> {
        let now = Instant::now();
        let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        let mut matches: Vec<Record> = records
            .iter()
            .filter(|entry| entry.is_visible(now))
            .map(|entry| &entry.record)
            .filter(|record| {
                record.collection() == query.collection && query.predicate.matches(record)
            })
            .cloned()
            .collect();
        drop(records);

        if let Some(field) = query.order_by {
            matches.sort_by(|left, right| compare_field(left.get(field), right.get(field)));
        }
        matches
    }
}

/// Byte-order comparison with unset values first, as SQL sorts NULLs.
fn compare_field(left: Option<&FieldValue>, right: Option<&FieldValue>) -> Ordering {
    match (left, right) {
        (Some(FieldValue::Text(left)), Some(FieldValue::Text(right))) => {
            left.as_bytes().cmp(right.as_bytes())
        }
        (left, right) => left.cmp(&right),
    }
}

impl ContentStore for FakeStore {
    fn open(&self, query: &StoreQuery) -> Result<Box<dyn Cursor + '_>> {
        self.queries.fetch_add(1, AtomicOrdering::SeqCst);
        if self.unavailable.load(AtomicOrdering::SeqCst) {
            return Err(Error::StoreUnavailable(
                "fake store is offline".to_owned(),
            ));
        }

        let names: Vec<String> = self
            .visible_matches(query)
            .iter()
            .map(|record| record.name().to_owned())
            .collect();
        let fail_at = *self
            .fail_read_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        self.counters.opened.fetch_add(1, AtomicOrdering::SeqCst);
        Ok(Box::new(FakeCursor {
            rows: names.into_iter(),
            position: 0,
            fail_at,
            counters: Arc::clone(&self.counters),
        }))
    }
}

/// Cursor over a snapshot of matching names.
struct FakeCursor {
    rows: IntoIter<String>,
    position: usize,
    fail_at: Option<usize>,
    counters: Arc<CursorCounters>,
}

impl Cursor for FakeCursor {
    fn next_name(&mut self) -> Result<Option<String>> {
        if self.fail_at == Some(self.position) {
            return Err(Error::StoreRead(format!(
                "injected failure at row {}",
                self.position
            )));
        }
        self.position += 1;
        Ok(self.rows.next())
    }
}

impl Drop for FakeCursor {
    fn drop(&mut self) {
        self.counters.closed.fetch_add(1, AtomicOrdering::SeqCst);
    }
}
