//! SQLite content store.
//!
//! Reads open a fresh read-only connection per query and hold it until the
//! cursor is dropped. Writes go through [`MediaStore::apply`], normally from
//! the [`crate::DeferredWriter`] worker.

use crate::error::Result;
use crate::filter::{delete_matching, select_names};
use crate::schema::CREATE_TABLES;
use cadence_core::{
    Collection, ContentStore, Cursor, Error as CoreError, Predicate, Result as CoreResult,
    StoreQuery,
};
use rusqlite::{Connection, OpenFlags, params, params_from_iter};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::vec::IntoIter;

const BUSY_TIMEOUT: Duration = Duration::from_secs(1);

/// An audio file known to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    /// Title shown in track lists
    pub title: String,
    /// File name shown to the user
    pub display_name: String,
    /// Absolute path of the file
    pub data: String,
}

impl Track {
    /// Describe the file at `path`, titled after its file stem.
    pub fn from_path(path: &Path) -> Self {
        let title = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let display_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            title,
            display_name,
            data: path.display().to_string(),
        }
    }
}

/// How long a mutation takes to become visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    /// New rows
    Insert,
    /// Changed rows
    Update,
    /// Removed rows
    Delete,
}

/// A change to the media database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Create an empty playlist.
    InsertPlaylist {
        /// New playlist name
        name: String,
    },
    /// Rename every playlist called `from`.
    RenamePlaylist {
        /// Current name
        from: String,
        /// New name
        to: String,
    },
    /// Register an audio file; a path already registered is left alone.
    InsertTrack(Track),
    /// Make the track titled `title` the only ringtone.
    SetRingtone {
        /// Track title
        title: String,
    },
    /// Remove every row of `collection` matching `predicate`.
    Delete {
        /// Target collection
        collection: Collection,
        /// Rows to remove
        predicate: Predicate,
    },
}

impl Mutation {
    /// Latency class of this mutation.
    pub const fn kind(&self) -> WriteKind {
        match self {
            Self::InsertPlaylist { .. } | Self::InsertTrack(_) => WriteKind::Insert,
            Self::RenamePlaylist { .. } | Self::SetRingtone { .. } => WriteKind::Update,
            Self::Delete { .. } => WriteKind::Delete,
        }
    }
}

/// Media database at a file path.
#[derive(Debug, Clone)]
pub struct MediaStore {
    path: PathBuf,
}

impl MediaStore {
    /// Create the database file and tables if missing.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created or the schema applied
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let store = Self::at(path);
        if let Some(parent) = store.path.parent() {
            fs::create_dir_all(parent)?;
        }
        store.connect_write()?.execute_batch(CREATE_TABLES)?;
        tracing::debug!("media store ready at {}", store.path.display());
        Ok(store)
    }

    /// Refer to a database without touching it. Queries fail with
    /// [`CoreError::StoreUnavailable`] until the file exists.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Database file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply one mutation in its own transaction.
    ///
    /// Returns the number of rows changed.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or the write fails
    pub fn apply(&self, mutation: &Mutation) -> Result<usize> {
        let mut connection = self.connect_write()?;
        let transaction = connection.transaction()?;
        let changed = match mutation {
            Mutation::InsertPlaylist { name } => {
                transaction.execute("INSERT INTO playlists (name) VALUES (?1)", params![name])?
            }
            Mutation::RenamePlaylist { from, to } => transaction.execute(
                "UPDATE playlists SET name = ?2 WHERE name = ?1",
                params![from, to],
            )?,
            Mutation::InsertTrack(track) => transaction.execute(
                "INSERT OR IGNORE INTO audio (title, _display_name, _data) VALUES (?1, ?2, ?3)",
                params![track.title, track.display_name, track.data],
            )?,
            Mutation::SetRingtone { title } => {
                transaction.execute(
                    "UPDATE audio SET is_ringtone = 0 WHERE is_ringtone != 0",
                    [],
                )?;
                transaction.execute(
                    "UPDATE audio SET is_ringtone = 1 WHERE title = ?1",
                    params![title],
                )?
            }
            Mutation::Delete {
                collection,
                predicate,
            } => {
                let (sql, bound) = delete_matching(*collection, predicate);
                transaction.execute(&sql, params_from_iter(bound.iter()))?
            }
        };
        transaction.commit()?;
        Ok(changed)
    }

    fn connect_write(&self) -> Result<Connection> {
        let connection = Connection::open(&self.path)?;
        connection.busy_timeout(BUSY_TIMEOUT)?;
        Ok(connection)
    }

    fn connect_read(&self) -> CoreResult<Connection> {
        let unavailable = |error: rusqlite::Error| {
            CoreError::StoreUnavailable(format!("{}: {error}", self.path.display()))
        };
        let connection = Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(unavailable)?;
        connection.busy_timeout(BUSY_TIMEOUT).map_err(unavailable)?;
        Ok(connection)
    }
}

fn read_error(error: rusqlite::Error) -> CoreError {
    CoreError::StoreRead(error.to_string())
}

impl ContentStore for MediaStore {
    fn open(&self, query: &StoreQuery) -> CoreResult<Box<dyn Cursor + '_>> {
        let connection = self.connect_read()?;
        let (sql, bound) = select_names(query.collection, &query.predicate, query.order_by);

        let rows = {
            let mut statement = connection.prepare(&sql).map_err(read_error)?;
            let mapped = statement
                .query_map(params_from_iter(bound.iter()), |row| row.get::<_, String>(0))
                .map_err(read_error)?;
            mapped.collect::<Vec<_>>()
        };

        Ok(Box::new(SqliteCursor {
            rows: rows.into_iter(),
            connection,
        }))
    }
}

/// Rows of one query, keeping its connection open until dropped.
struct SqliteCursor {
    rows: IntoIter<rusqlite::Result<String>>,
    connection: Connection,
}

impl Cursor for SqliteCursor {
    fn next_name(&mut self) -> CoreResult<Option<String>> {
        self.rows.next().transpose().map_err(read_error)
    }
}

impl Drop for SqliteCursor {
    fn drop(&mut self) {
        tracing::trace!(
            "closing cursor on {}",
            self.connection.path().unwrap_or("<memory>")
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::{Field, StoreQueryAdapter};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> MediaStore {
        MediaStore::create(dir.path().join("media.db")).unwrap()
    }

    fn playlists(store: &MediaStore) -> StoreQueryAdapter {
        StoreQueryAdapter::new(Arc::new(store.clone()), Collection::Playlists)
    }

    #[test]
    fn test_track_from_path() {
        let track = Track::from_path(Path::new("/sdcard/media_api/music/GOLDEN.mp3"));
        assert_eq!(track.title, "GOLDEN");
        assert_eq!(track.display_name, "GOLDEN.mp3");
        assert_eq!(track.data, "/sdcard/media_api/music/GOLDEN.mp3");
    }

    #[test]
    fn test_rename_playlist() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store
            .apply(&Mutation::InsertPlaylist {
                name: "Original_playlist_name".to_owned(),
            })
            .unwrap();

        let changed = store
            .apply(&Mutation::RenamePlaylist {
                from: "Original_playlist_name".to_owned(),
                to: "Rename_playlist_name".to_owned(),
            })
            .unwrap();
        assert_eq!(changed, 1);

        let all = playlists(&store).query(&Predicate::all(), None).unwrap();
        assert_eq!(all.matched_names(), ["Rename_playlist_name"]);
    }

    #[test]
    fn test_set_ringtone_is_exclusive() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        for title in ["first", "second"] {
            store
                .apply(&Mutation::InsertTrack(Track::from_path(
                    &dir.path().join(format!("{title}.mp3")),
                )))
                .unwrap();
        }

        for title in ["first", "second"] {
            store
                .apply(&Mutation::SetRingtone {
                    title: title.to_owned(),
                })
                .unwrap();
        }

        let audio = StoreQueryAdapter::new(Arc::new(store), Collection::Audio);
        let ringtones = audio
            .query(&Predicate::eq(Field::IsRingtone, true), None)
            .unwrap();
        assert_eq!(ringtones.matched_names(), ["second"]);
    }

    #[test]
    fn test_insert_track_ignores_known_path() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let track = Track::from_path(&dir.path().join("GOLDEN.mp3"));

        assert_eq!(store.apply(&Mutation::InsertTrack(track.clone())).unwrap(), 1);
        assert_eq!(store.apply(&Mutation::InsertTrack(track)).unwrap(), 0);
    }

    #[test]
    fn test_missing_database_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let adapter = playlists(&MediaStore::at(dir.path().join("absent.db")));

        let error = adapter.query(&Predicate::all(), None).unwrap_err();
        assert!(matches!(error, CoreError::StoreUnavailable(_)));
    }
}
