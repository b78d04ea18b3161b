//! Table layout of the media database.

use cadence_core::{Collection, Field};

/// Statements creating the media tables.
pub(crate) const CREATE_TABLES: &str = "
CREATE TABLE IF NOT EXISTS playlists (
    _id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    date_added INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
);
CREATE TABLE IF NOT EXISTS audio (
    _id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    _display_name TEXT,
    _data TEXT NOT NULL UNIQUE,
    is_ringtone INTEGER NOT NULL DEFAULT 0
);
";

/// Table backing a collection.
pub(crate) const fn table(collection: Collection) -> &'static str {
    match collection {
        Collection::Playlists => "playlists",
        Collection::Audio => "audio",
    }
}

/// Whether `collection`'s table has a column for `field`.
pub(crate) const fn has_column(collection: Collection, field: Field) -> bool {
    match collection {
        Collection::Playlists => matches!(field, Field::Name),
        Collection::Audio => matches!(
            field,
            Field::Title | Field::DisplayName | Field::Data | Field::IsRingtone
        ),
    }
}
