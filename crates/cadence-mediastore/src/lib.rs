//! SQLite-backed media content store.
//!
//! [`MediaStore`] implements [`cadence_core::ContentStore`] over a media
//! database with `playlists` and `audio` tables. Writes are normally routed
//! through a [`DeferredWriter`] so they land after a delay, and
//! [`MediaScanner`] registers audio files found on external storage.

#![cfg_attr(
    test,
    allow(
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::missing_panics_doc,
        clippy::missing_errors_doc,
        reason = "Allow for tests"
    )
)]

pub mod error;
mod filter;
pub mod scanner;
mod schema;
pub mod store;
pub mod writer;

pub use error::{MediaStoreError, Result};
pub use scanner::{MediaScanner, ScanReport, discover_tracks};
pub use store::{MediaStore, Mutation, Track, WriteKind};
pub use writer::{DeferredWriter, WriteLatency};
