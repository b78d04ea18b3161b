//! Structured record filters.
//!
//! A [`Predicate`] is a conjunction of `(field, operator, value)` clauses.
//! Values are never spliced into query text; each backing store binds them
//! as parameters in its own query language.

use crate::record::Record;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Record fields a predicate can test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    /// Playlist name
    Name,
    /// Track title
    Title,
    /// Track file name as shown to the user
    DisplayName,
    /// Absolute path of the track file
    Data,
    /// Whether the track is the phone ringtone (0 or 1)
    IsRingtone,
}

impl Field {
    /// Column name used by the content store.
    pub const fn column(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Title => "title",
            Self::DisplayName => "_display_name",
            Self::Data => "_data",
            Self::IsRingtone => "is_ringtone",
        }
    }
}

/// Comparison applied by a clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    /// Field equals the value
    Eq,
    /// Field is set and differs from the value
    Ne,
    /// Field is set and not the empty string
    NonEmpty,
}

/// A literal a field is compared against.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Integer column value
    Int(i64),
    /// Text column value
    Text(String),
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Int(i64::from(value))
    }
}

impl Display for FieldValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Text(value) => write!(f, "{value:?}"),
        }
    }
}

/// A single `(field, operator, value)` test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clause {
    /// Field under test
    pub field: Field,
    /// Comparison
    #[serde(rename = "op")]
    pub operator: Operator,
    /// Comparison value, absent for [`Operator::NonEmpty`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<FieldValue>,
}

impl Clause {
    /// Evaluate against a record, with SQL semantics for unset fields:
    /// an unset field never satisfies any operator.
    pub fn matches(&self, record: &Record) -> bool {
        let Some(actual) = record.get(self.field) else {
            return false;
        };

        match (self.operator, &self.value) {
            (Operator::Eq, Some(expected)) => actual == expected,
            (Operator::Ne, Some(expected)) => actual != expected,
            (Operator::NonEmpty, _) => match actual {
                FieldValue::Text(text) => !text.is_empty(),
                FieldValue::Int(_) => true,
            },
            (Operator::Eq | Operator::Ne, None) => false,
        }
    }
}

impl Display for Clause {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let column = self.field.column();
        match (self.operator, &self.value) {
            (Operator::Eq, Some(value)) => write!(f, "{column} = {value}"),
            (Operator::Ne, Some(value)) => write!(f, "{column} != {value}"),
            (Operator::NonEmpty, _) => write!(f, "{column} <> ''"),
            (Operator::Eq | Operator::Ne, None) => write!(f, "{column} ? <missing>"),
        }
    }
}

/// Conjunction of clauses. An empty predicate matches every record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Predicate {
    clauses: Vec<Clause>,
}

impl Predicate {
    /// Predicate matching every record.
    pub fn all() -> Self {
        Self::default()
    }

    /// `field == value`
    pub fn eq(field: Field, value: impl Into<FieldValue>) -> Self {
        Self::single(field, Operator::Eq, Some(value.into()))
    }

    /// `field != value`
    pub fn ne(field: Field, value: impl Into<FieldValue>) -> Self {
        Self::single(field, Operator::Ne, Some(value.into()))
    }

    /// `field` is set and non-empty
    pub fn non_empty(field: Field) -> Self {
        Self::single(field, Operator::NonEmpty, None)
    }

    fn single(field: Field, operator: Operator, value: Option<FieldValue>) -> Self {
        Self {
            clauses: vec![Clause {
                field,
                operator,
                value,
            }],
        }
    }

    /// Conjunction of `self` and `other`.
    #[must_use]
    pub fn and(mut self, other: Self) -> Self {
        self.clauses.extend(other.clauses);
        self
    }

    /// The clauses of this conjunction.
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// Whether every clause holds for `record`.
    pub fn matches(&self, record: &Record) -> bool {
        self.clauses.iter().all(|clause| clause.matches(record))
    }
}

impl Display for Predicate {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.clauses.is_empty() {
            return f.write_str("<all>");
        }
        for (index, clause) in self.clauses.iter().enumerate() {
            if index > 0 {
                f.write_str(" AND ")?;
            }
            write!(f, "{clause}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Collection;

    fn track(title: &str, ringtone: bool) -> Record {
        Record::new(Collection::Audio, title).with(Field::IsRingtone, ringtone)
    }

    #[test]
    fn test_eq_matches_exact_name_only() {
        let predicate = Predicate::eq(Field::Name, "Original_playlist_name");
        assert!(predicate.matches(&Record::new(
            Collection::Playlists,
            "Original_playlist_name"
        )));
        assert!(!predicate.matches(&Record::new(
            Collection::Playlists,
            "Rename_playlist_name"
        )));
        assert!(!predicate.matches(&Record::new(
            Collection::Playlists,
            "original_playlist_name"
        )));
    }

    #[test]
    fn test_ne_skips_unset_fields() {
        let predicate = Predicate::ne(Field::Title, "GOLDEN");
        assert!(predicate.matches(&track("aaaToBeDeleted", false)));
        assert!(!predicate.matches(&track("GOLDEN", false)));
        assert!(!predicate.matches(&Record::new(Collection::Playlists, "x")));
    }

    #[test]
    fn test_non_empty() {
        let predicate = Predicate::non_empty(Field::Name);
        assert!(predicate.matches(&Record::new(Collection::Playlists, "x")));
        assert!(!predicate.matches(&Record::new(Collection::Playlists, "")));
    }

    #[test]
    fn test_conjunction() {
        let predicate =
            Predicate::eq(Field::Title, "aaaToBeDeleted").and(Predicate::eq(Field::IsRingtone, 1));
        assert!(predicate.matches(&track("aaaToBeDeleted", true)));
        assert!(!predicate.matches(&track("aaaToBeDeleted", false)));
        assert!(Predicate::all().matches(&track("anything", false)));
    }

    #[test]
    fn test_quotes_are_values_not_syntax() {
        let name = "**1E?:|}{[]~~.,;'";
        let predicate = Predicate::eq(Field::Name, name);
        assert!(predicate.matches(&Record::new(Collection::Playlists, name)));
        assert_eq!(predicate.to_string(), format!("name = {name:?}"));
    }

    #[test]
    fn test_deserialize_from_fixture_json() {
        let json = r#"[{"field":"title","op":"eq","value":"x"},{"field":"is_ringtone","op":"eq","value":1},{"field":"name","op":"non_empty"}]"#;
        let predicate: Predicate = serde_json::from_str(json).unwrap();
        assert_eq!(predicate.clauses().len(), 3);
        assert_eq!(predicate.clauses()[1].value, Some(FieldValue::Int(1)));
        assert_eq!(predicate.clauses()[2].operator, Operator::NonEmpty);
    }
}
