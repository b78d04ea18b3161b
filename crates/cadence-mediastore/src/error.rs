//! Errors raised on the write and scan side of the media store.

use core::result::Result as CoreResult;
use std::io::Error as IoError;

use cadence_core::Error as CoreError;
use rusqlite::Error as SqliteError;
use thiserror::Error;
use walkdir::Error as WalkError;

/// Result type for media store operations.
pub type Result<T> = CoreResult<T, MediaStoreError>;

/// Errors raised while writing to the media store or scanning media.
#[derive(Debug, Error)]
pub enum MediaStoreError {
    /// A SQLite call failed.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] SqliteError),

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// Walking the media directory failed.
    #[error("Media scan failed: {0}")]
    Walk(#[from] WalkError),

    /// The background writer is no longer running.
    #[error("Deferred writer stopped: {0}")]
    WriterClosed(String),
}

/// Read failures never pass through here: queries report
/// [`CoreError::StoreUnavailable`] and [`CoreError::StoreRead`] directly.
impl From<MediaStoreError> for CoreError {
    fn from(error: MediaStoreError) -> Self {
        match error {
            MediaStoreError::Io(io) => Self::Io(io),
            MediaStoreError::Walk(walk) => Self::Io(walk.into()),
            other @ (MediaStoreError::Sqlite(_) | MediaStoreError::WriterClosed(_)) => {
                Self::StoreWrite(other.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;
    use std::fs;
    use std::io::ErrorKind;
    use tempfile::TempDir;
    use walkdir::WalkDir;

    #[test]
    fn test_writer_closed_is_a_write_failure() {
        let error = CoreError::from(MediaStoreError::WriterClosed("channel closed".to_owned()));
        assert!(matches!(error, CoreError::StoreWrite(_)));
        assert!(error.is_store_failure());
        assert!(error.to_string().contains("channel closed"));
    }

    #[test]
    fn test_constraint_violation_is_a_write_failure() {
        let connection = Connection::open_in_memory().unwrap();
        connection
            .execute_batch(
                "CREATE TABLE audio (_data TEXT UNIQUE); INSERT INTO audio VALUES ('a');",
            )
            .unwrap();
        let sqlite = connection
            .execute("INSERT INTO audio VALUES ('a')", [])
            .unwrap_err();

        let error = CoreError::from(MediaStoreError::Sqlite(sqlite));
        assert!(matches!(error, CoreError::StoreWrite(_)));
    }

    #[test]
    fn test_walk_failure_is_io_not_unavailable() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("not-a-directory");
        fs::write(&file, b"id3").unwrap();

        let walk = WalkDir::new(file.join("child"))
            .into_iter()
            .find_map(|entry| entry.err())
            .unwrap();
        let error = CoreError::from(MediaStoreError::Walk(walk));
        assert!(matches!(error, CoreError::Io(_)));
        assert!(!error.is_store_failure());
    }

    #[test]
    fn test_io_stays_io() {
        let error = CoreError::from(MediaStoreError::Io(IoError::from(ErrorKind::NotFound)));
        assert!(matches!(error, CoreError::Io(_)));
    }
}
