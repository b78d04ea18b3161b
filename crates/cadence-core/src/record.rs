//! Store records, collections and query observations.

use crate::predicate::{Field, FieldValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

/// A queryable collection in the content store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    /// User playlists
    Playlists,
    /// Audio tracks on external storage
    Audio,
}

impl Collection {
    /// Field that identifies a record by name in this collection.
    pub const fn name_field(self) -> Field {
        match self {
            Self::Playlists => Field::Name,
            Self::Audio => Field::Title,
        }
    }
}

impl Display for Collection {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Playlists => f.write_str("playlists"),
            Self::Audio => f.write_str("audio"),
        }
    }
}

/// One store entity, identified by exact name within its collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    collection: Collection,
    fields: BTreeMap<Field, FieldValue>,
}

impl Record {
    /// Create a record carrying only its name field.
    pub fn new(collection: Collection, name: impl Into<String>) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(collection.name_field(), FieldValue::Text(name.into()));
        Self { collection, fields }
    }

    /// Set an additional field.
    #[must_use]
    pub fn with(mut self, field: Field, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(field, value.into());
        self
    }

    /// Collection this record belongs to.
    pub fn collection(&self) -> Collection {
        self.collection
    }

    /// Value of the name field.
    pub fn name(&self) -> &str {
        match self.fields.get(&self.collection.name_field()) {
            Some(FieldValue::Text(name)) => name,
            _ => "",
        }
    }

    /// Value of `field`, if set.
    pub fn get(&self, field: Field) -> Option<&FieldValue> {
        self.fields.get(&field)
    }
}

/// Names matched by one store query, in the store's order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservationResult {
    matched_names: Vec<String>,
}

impl ObservationResult {
    /// Wrap the names read from a cursor.
    pub fn new(matched_names: Vec<String>) -> Self {
        Self { matched_names }
    }

    /// Number of matching records.
    pub fn matched_count(&self) -> usize {
        self.matched_names.len()
    }

    /// Matching names, ordered as the store returned them.
    pub fn matched_names(&self) -> &[String] {
        &self.matched_names
    }

    /// Whether no record matched.
    pub fn is_empty(&self) -> bool {
        self.matched_names.is_empty()
    }

    /// Whether `name` is among the matches.
    pub fn contains(&self, name: &str) -> bool {
        self.matched_names.iter().any(|matched| matched == name)
    }

    /// Consume into the ordered names.
    pub fn into_names(self) -> Vec<String> {
        self.matched_names
    }
}
