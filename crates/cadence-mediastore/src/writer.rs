//! Background writer that makes mutations visible after a delay.
//!
//! Mutations are applied one at a time in submission order, each no earlier
//! than its due time. This is the eventual consistency the convergence
//! poller has to absorb: the UI returns as soon as a mutation is queued.

use crate::error::{MediaStoreError, Result};
use crate::store::{MediaStore, Mutation, WriteKind};
use cadence_core::WaitTiers;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, warn};

/// Visibility delay per mutation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteLatency {
    /// Delay for new rows
    pub insert: Duration,
    /// Delay for changed rows
    pub update: Duration,
    /// Delay for removed rows
    pub delete: Duration,
}

impl WriteLatency {
    /// No delay at all.
    pub const fn immediate() -> Self {
        Self {
            insert: Duration::ZERO,
            update: Duration::ZERO,
            delete: Duration::ZERO,
        }
    }

    /// Inserts and updates land within a short wait; deletes take longer
    /// than a long wait, so only the extended absence budget catches them.
    pub fn from_tiers(tiers: &WaitTiers) -> Self {
        Self {
            insert: tiers.short,
            update: tiers.short,
            delete: tiers.long + tiers.short,
        }
    }

    /// Delay for `kind`.
    pub const fn for_kind(&self, kind: WriteKind) -> Duration {
        match kind {
            WriteKind::Insert => self.insert,
            WriteKind::Update => self.update,
            WriteKind::Delete => self.delete,
        }
    }
}

enum Command {
    Apply { mutation: Mutation, due: Instant },
    Flush(oneshot::Sender<()>),
}

/// Handle to the writer task. Clones share the same queue.
#[derive(Debug, Clone)]
pub struct DeferredWriter {
    sender: mpsc::UnboundedSender<Command>,
    latency: WriteLatency,
}

impl DeferredWriter {
    /// Start the writer task on the current tokio runtime.
    ///
    /// The task stops once every handle is dropped and the queue drains.
    pub fn spawn(store: Arc<MediaStore>, latency: WriteLatency) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        tokio::spawn(run_writer(store, receiver));
        Self { sender, latency }
    }

    /// Delays in effect.
    pub fn latency(&self) -> WriteLatency {
        self.latency
    }

    /// Queue a mutation; it becomes visible after its kind's delay.
    ///
    /// # Errors
    /// Returns [`MediaStoreError::WriterClosed`] if the task has stopped
    pub fn submit(&self, mutation: Mutation) -> Result<()> {
        let due = Instant::now() + self.latency.for_kind(mutation.kind());
        debug!("queued {mutation:?}");
        self.sender
            .send(Command::Apply { mutation, due })
            .map_err(|_| MediaStoreError::WriterClosed("submit after shutdown".to_owned()))
    }

    /// Wait until every mutation queued so far has been applied.
    ///
    /// # Errors
    /// Returns [`MediaStoreError::WriterClosed`] if the task has stopped
    pub async fn flush(&self) -> Result<()> {
        let (done, finished) = oneshot::channel();
        self.sender
            .send(Command::Flush(done))
            .map_err(|_| MediaStoreError::WriterClosed("flush after shutdown".to_owned()))?;
        finished
            .await
            .map_err(|_| MediaStoreError::WriterClosed("writer dropped flush".to_owned()))
    }
}

async fn run_writer(store: Arc<MediaStore>, mut receiver: mpsc::UnboundedReceiver<Command>) {
    while let Some(command) = receiver.recv().await {
        match command {
            Command::Apply { mutation, due } => {
                sleep_until(due).await;
                match store.apply(&mutation) {
                    Ok(changed) => debug!("applied {mutation:?} ({changed} row(s))"),
                    Err(error) => warn!("failed to apply {mutation:?}: {error}"),
                }
            }
            Command::Flush(done) => drop(done.send(())),
        }
    }
    debug!("deferred writer stopped");
}
