//! Per-scenario test environment.
//!
//! Each environment owns a temporary directory holding the media database
//! and the simulated external storage, plus the writer and scanner that
//! make changes visible on their own schedule.

use crate::app::{LaunchScreen, SimulatedMusicApp};
use anyhow::{Context as _, Result};
use cadence_core::{
    CadenceConfig, Clock, Collection, ContentStore, ConvergencePoller, StoreQueryAdapter,
};
use cadence_mediastore::{DeferredWriter, MediaScanner, MediaStore, WriteLatency};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Name of the external storage directory inside the environment.
pub const EXTERNAL_STORAGE: &str = "sdcard";

/// A file to create before the scenario runs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StorageFile {
    /// Path relative to external storage
    pub path: String,
    /// File content
    pub content: String,
}

/// Store, storage and timing shared by one scenario.
#[derive(Debug)]
pub struct TestEnvironment {
    dir: TempDir,
    config: CadenceConfig,
    clock: Clock,
    store: Arc<MediaStore>,
    writer: DeferredWriter,
    scanner: MediaScanner,
}

impl TestEnvironment {
    /// Create a fresh environment. Must run inside a tokio runtime, which
    /// hosts the deferred writer.
    ///
    /// # Errors
    /// Returns error if the directory or database cannot be created
    pub fn new(config: CadenceConfig) -> Result<Self> {
        let dir = TempDir::new().context("Failed to create temp environment")?;
        let external = dir.path().join(EXTERNAL_STORAGE);
        fs::create_dir_all(&external)
            .with_context(|| format!("Failed to create {}", external.display()))?;

        let store = Arc::new(
            MediaStore::create(dir.path().join("databases").join("external.db"))
                .context("Failed to create media store")?,
        );
        let tiers = config.tiers();
        let writer = DeferredWriter::spawn(Arc::clone(&store), WriteLatency::from_tiers(&tiers));
        let scanner = MediaScanner::new(external, writer.clone(), tiers.short);

        Ok(Self {
            dir,
            clock: config.clock(),
            config,
            store,
            writer,
            scanner,
        })
    }

    /// Active configuration.
    pub fn config(&self) -> &CadenceConfig {
        &self.config
    }

    /// Clock shared by the driver and the pollers.
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// The media database.
    pub fn store(&self) -> &Arc<MediaStore> {
        &self.store
    }

    /// Queue for delayed store writes.
    pub fn writer(&self) -> &DeferredWriter {
        &self.writer
    }

    /// Media scanner over external storage.
    pub fn scanner(&self) -> &MediaScanner {
        &self.scanner
    }

    /// Root of the simulated external storage.
    pub fn external_storage(&self) -> PathBuf {
        self.dir.path().join(EXTERNAL_STORAGE)
    }

    /// Absolute path of `relative` under external storage.
    pub fn resolve(&self, relative: &str) -> PathBuf {
        self.external_storage().join(relative)
    }

    /// The store as the read-only contract the core consumes.
    pub fn content_store(&self) -> Arc<dyn ContentStore> {
        Arc::<MediaStore>::clone(&self.store)
    }

    /// Poller over `collection` using the configured policy.
    ///
    /// # Errors
    /// Returns error if the convergence configuration is invalid
    pub fn poller(&self, collection: Collection) -> Result<ConvergencePoller> {
        let policy = self.config.policy().context("Invalid convergence policy")?;
        Ok(ConvergencePoller::new(
            StoreQueryAdapter::new(self.content_store(), collection),
            self.clock.clone(),
            policy,
        ))
    }

    /// Launch the simulated app against this environment.
    pub fn launch_app(&self, screen: LaunchScreen) -> SimulatedMusicApp {
        SimulatedMusicApp::launch(
            screen,
            &self.content_store(),
            self.writer.clone(),
            self.external_storage(),
        )
    }

    /// Create files under external storage.
    ///
    /// # Errors
    /// Returns error if file creation fails
    pub fn create_files(&self, files: &[StorageFile]) -> Result<()> {
        for file in files {
            create_file_with_dirs(&self.resolve(&file.path), file.content.as_bytes())?;
        }
        Ok(())
    }
}

/// Create a file with all necessary parent directories
///
/// # Errors
/// Returns error if directory or file creation fails
pub fn create_file_with_dirs(file_path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::write(file_path, content)
        .with_context(|| format!("Failed to write file: {}", file_path.display()))?;
    Ok(())
}
