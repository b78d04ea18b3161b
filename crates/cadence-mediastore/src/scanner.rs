//! Simulated media scanner.
//!
//! A "media mounted" broadcast makes the scanner walk the external storage
//! root after a delay, register every audio file it finds and then announce
//! that it finished.

use crate::error::Result;
use crate::store::{Mutation, Track};
use crate::writer::DeferredWriter;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::sleep;
use tracing::{info, warn};
use walkdir::WalkDir;

/// Extensions treated as audio.
const AUDIO_EXTENSIONS: &[&str] = &["mp3"];

/// Outcome of one completed scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    /// Directory that was scanned
    pub root: PathBuf,
    /// Audio files registered
    pub tracks: usize,
}

/// Scans external storage on request and reports completion.
#[derive(Debug, Clone)]
pub struct MediaScanner {
    root: PathBuf,
    writer: DeferredWriter,
    scan_delay: Duration,
    finished: broadcast::Sender<ScanReport>,
}

impl MediaScanner {
    /// Scanner over `root` that starts scanning `scan_delay` after a mount.
    pub fn new(root: impl Into<PathBuf>, writer: DeferredWriter, scan_delay: Duration) -> Self {
        let (finished, _) = broadcast::channel(8);
        Self {
            root: root.into(),
            writer,
            scan_delay,
            finished,
        }
    }

    /// Storage root being scanned.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Receive a [`ScanReport`] for every scan that finishes after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanReport> {
        self.finished.subscribe()
    }

    /// Announce that external storage was mounted; the scan runs in the
    /// background and its records are committed before it reports.
    pub fn broadcast_mounted(&self) {
        let scanner = self.clone();
        tokio::spawn(async move {
            sleep(scanner.scan_delay).await;
            match scanner.scan().await {
                Ok(report) => {
                    info!(
                        "media scan of {} found {} track(s)",
                        report.root.display(),
                        report.tracks
                    );
                    drop(scanner.finished.send(report));
                }
                Err(error) => warn!("media scan of {} failed: {error}", scanner.root.display()),
            }
        });
    }

    async fn scan(&self) -> Result<ScanReport> {
        let tracks = discover_tracks(&self.root)?;
        let count = tracks.len();
        for track in tracks {
            self.writer.submit(Mutation::InsertTrack(track))?;
        }
        self.writer.flush().await?;
        Ok(ScanReport {
            root: self.root.clone(),
            tracks: count,
        })
    }
}

/// Every audio file under `root`, in path order. A missing root has none.
///
/// # Errors
/// Returns an error if a directory under `root` cannot be read
pub fn discover_tracks(root: &Path) -> Result<Vec<Track>> {
    if !root.exists() {
        return Ok(Vec::new());
    }
    let mut tracks = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() && is_audio(entry.path()) {
            tracks.push(Track::from_path(entry.path()));
        }
    }
    Ok(tracks)
}

fn is_audio(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| {
            AUDIO_EXTENSIONS
                .iter()
                .any(|known| extension.eq_ignore_ascii_case(known))
        })
}
