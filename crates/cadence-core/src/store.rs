//! Store query adapter: the only point of contact with the backing store.

use crate::error::Result;
use crate::predicate::{Field, Predicate};
use crate::record::{Collection, ObservationResult};
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

/// A read issued against one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreQuery {
    /// Collection to read from
    pub collection: Collection,
    /// Filter over the collection's records
    pub predicate: Predicate,
    /// Sort column, ascending in the store's natural order
    pub order_by: Option<Field>,
}

/// Open read over a store.
///
/// Implementations release their connection when dropped, so ownership
/// guarantees exactly one release on every exit path.
pub trait Cursor {
    /// Name column of the next matching row, or `None` when exhausted.
    ///
    /// # Errors
    /// Returns [`crate::Error::StoreRead`] if the row cannot be read
    fn next_name(&mut self) -> Result<Option<String>>;
}

/// A content store the suite can read from.
pub trait ContentStore: Send + Sync {
    /// Open a cursor over the rows matching `query`.
    ///
    /// # Errors
    /// Returns [`crate::Error::StoreUnavailable`] if no connection can be obtained
    fn open(&self, query: &StoreQuery) -> Result<Box<dyn Cursor + '_>>;
}

/// Reads one collection of a [`ContentStore`] into [`ObservationResult`]s.
#[derive(Clone)]
pub struct StoreQueryAdapter {
    store: Arc<dyn ContentStore>,
    collection: Collection,
}

impl StoreQueryAdapter {
    /// Create an adapter over `collection` of `store`.
    #[must_use]
    pub fn new(store: Arc<dyn ContentStore>, collection: Collection) -> Self {
        Self { store, collection }
    }

    /// Collection this adapter reads.
    pub fn collection(&self) -> Collection {
        self.collection
    }

    /// Materialize the names of all records matching `predicate`.
    ///
    /// The cursor is released before returning, whether the read succeeded,
    /// matched nothing or failed part-way. Failures are reported, not retried.
    ///
    /// # Errors
    /// Returns [`crate::Error::StoreUnavailable`] if the store cannot be reached
    /// and [`crate::Error::StoreRead`] if a row fails to materialize
    pub fn query(
        &self,
        predicate: &Predicate,
        order_by: Option<Field>,
    ) -> Result<ObservationResult> {
        let query = StoreQuery {
            collection: self.collection,
            predicate: predicate.clone(),
            order_by,
        };

        let names = {
            let mut cursor = self.store.open(&query)?;
            let mut names = Vec::new();
            while let Some(name) = cursor.next_name()? {
                names.push(name);
            }
            names
        };

        tracing::debug!(
            "query {} where {} -> {} match(es)",
            self.collection,
            predicate,
            names.len()
        );
        Ok(ObservationResult::new(names))
    }
}

impl Debug for StoreQueryAdapter {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreQueryAdapter")
            .field("collection", &self.collection)
            .finish_non_exhaustive()
    }
}
