//! Shared work queue between discovery and the ingestion workers.
//!
//! Bounded mpsc channel whose receiving end is shared by all workers behind
//! a mutex, so each item is taken by exactly one worker. `take` returns
//! `None` once the producer is done and the queue is drained; that is the
//! workers' signal to exit.

use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

pub type WorkSender = mpsc::Sender<PathBuf>;

pub struct WorkQueue {
    rx: Mutex<mpsc::Receiver<PathBuf>>,
}

/// Create a queue holding at most `capacity` pending items.
pub fn work_queue(capacity: usize) -> (WorkSender, Arc<WorkQueue>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (tx, Arc::new(WorkQueue { rx: Mutex::new(rx) }))
}

impl WorkQueue {
    /// Claim the next item, waiting while the producer is still running.
    pub async fn take(&self) -> Option<PathBuf> {
        self.rx.lock().await.recv().await
    }
}
