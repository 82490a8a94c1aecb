//! Batch ingestion scheduler.
//!
//! Orchestrates one run over a filesystem tree:
//!   1. Validate the root path (`NotFound` aborts before any work starts)
//!   2. Stream discovered paths into a bounded work queue
//!   3. `concurrency` workers drain the queue; per file:
//!      progress notice → provenance lookup → read → extract → store records
//!   4. Join every worker and return an `IngestionReport`
//!
//! A failing file is logged and counted, never fatal. Only cancellation
//! (external signal or `sources::Cancelled` from an extractor) stops the
//! batch before the queue is drained. Workers observe cancellation between
//! files only: a file already in flight is written completely, so a partly
//! indexed file is never left behind for the next run to skip.

use anyhow::{anyhow, Context};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use medindex_common::{MedindexError, Record, Result, SourceFormat};
use medindex_db::DocumentGateway;

use crate::discovery::Discovery;
use crate::queue::{work_queue, WorkQueue};
use crate::sources::{Cancelled, RecordExtractor};

pub const DEFAULT_CONCURRENCY: usize = 4;
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

// ── Job config ────────────────────────────────────────────────────────────────

/// Parameters for a single ingestion run.
#[derive(Debug, Clone, Serialize)]
pub struct IngestionJob {
    pub root: PathBuf,
    pub format: SourceFormat,
    /// Target collection. Defaults to the format's own collection name.
    pub collection: String,
    /// Number of concurrent workers (at least one is always started).
    pub concurrency: usize,
    /// Discovered paths buffered ahead of the workers.
    pub queue_capacity: usize,
}

impl IngestionJob {
    pub fn new(root: impl Into<PathBuf>, format: SourceFormat) -> Self {
        Self {
            root: root.into(),
            format,
            collection: format.collection().to_string(),
            concurrency: DEFAULT_CONCURRENCY,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }
}

// ── Progress events ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStage {
    Started,
    Skipped,
    Stored,
    Failed,
}

/// Per-file progress event (cloneable for broadcast).
#[derive(Debug, Clone, Serialize)]
pub struct IngestionProgress {
    pub run_id: Uuid,
    pub path: PathBuf,
    pub stage: FileStage,
    pub records_written: usize,
    pub records_failed: usize,
    pub error: Option<String>,
}

// ── Result summary ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct IngestionReport {
    pub run_id: Uuid,
    pub collection: String,
    pub started_at: DateTime<Utc>,
    pub files_discovered: usize,
    /// Files read and extracted (including those yielding no records).
    pub files_processed: usize,
    /// Files already present in the store.
    pub files_skipped: usize,
    pub files_failed: usize,
    pub records_written: usize,
    pub records_failed: usize,
    pub errors: Vec<String>,
    pub duration_ms: u64,
}

impl IngestionReport {
    fn new(run_id: Uuid, collection: &str) -> Self {
        Self {
            run_id,
            collection: collection.to_string(),
            started_at: Utc::now(),
            files_discovered: 0,
            files_processed: 0,
            files_skipped: 0,
            files_failed: 0,
            records_written: 0,
            records_failed: 0,
            errors: Vec::new(),
            duration_ms: 0,
        }
    }

    fn absorb(&mut self, tally: WorkerTally) {
        self.files_processed += tally.processed;
        self.files_skipped += tally.skipped;
        self.files_failed += tally.failed;
        self.records_written += tally.records_written;
        self.records_failed += tally.records_failed;
        self.errors.extend(tally.errors);
    }

    pub fn has_failures(&self) -> bool {
        self.files_failed > 0 || self.records_failed > 0
    }
}

/// Counters owned by one worker, merged into the report after join.
#[derive(Debug, Default)]
struct WorkerTally {
    processed: usize,
    skipped: usize,
    failed: usize,
    records_written: usize,
    records_failed: usize,
    errors: Vec<String>,
    /// Stopped before the queue was drained.
    cancelled: bool,
}

enum FileOutcome {
    Skipped,
    Stored { written: usize, failed: usize, errors: Vec<String> },
}

enum ItemError {
    Cancelled,
    Failed(anyhow::Error),
}

// ── Scheduler ─────────────────────────────────────────────────────────────────

pub struct IngestionScheduler {
    extractor: Arc<dyn RecordExtractor>,
    gateway: DocumentGateway,
    progress_tx: Option<broadcast::Sender<IngestionProgress>>,
    cancel: Option<watch::Receiver<bool>>,
}

impl IngestionScheduler {
    pub fn new(extractor: Arc<dyn RecordExtractor>, gateway: DocumentGateway) -> Self {
        Self { extractor, gateway, progress_tx: None, cancel: None }
    }

    /// Emit an `IngestionProgress` event for every file stage.
    pub fn with_progress(mut self, tx: broadcast::Sender<IngestionProgress>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    /// Stop the batch once the watched value turns `true`.
    pub fn with_cancellation(mut self, rx: watch::Receiver<bool>) -> Self {
        self.cancel = Some(rx);
        self
    }

    /// Run the batch. Returns once the queue is drained and every worker has exited.
    #[instrument(skip(self, job), fields(root = %job.root.display(), format = %job.format))]
    pub async fn run(&self, job: &IngestionJob) -> Result<IngestionReport> {
        let run_id = Uuid::new_v4();
        let t0 = std::time::Instant::now();

        let discovery = Discovery::new(&job.root, self.extractor.extension())?;
        self.gateway.prepare(&job.collection).await?;
        let concurrency = job.concurrency.max(1);
        info!(
            run_id = %run_id,
            collection = %job.collection,
            extension = self.extractor.extension(),
            concurrency,
            "Starting ingestion run"
        );

        let (tx, queue) = work_queue(job.queue_capacity);
        let producer = tokio::task::spawn_blocking(move || {
            let mut discovered = 0usize;
            for path in discovery.into_paths() {
                // Receiver gone means the workers were stopped.
                if tx.blocking_send(path).is_err() {
                    break;
                }
                discovered += 1;
            }
            discovered
        });

        let processor = Arc::new(FileProcessor {
            run_id,
            collection: job.collection.clone(),
            extractor: self.extractor.clone(),
            gateway: self.gateway.clone(),
            progress_tx: self.progress_tx.clone(),
        });

        // Run-local stop flag: set by the external signal or by any worker
        // whose extractor raised `Cancelled`.
        let (stop_tx, _) = watch::channel(false);
        let stop = Arc::new(stop_tx);
        if self.cancel.as_ref().is_some_and(|rx| *rx.borrow()) {
            stop.send_replace(true);
        }
        let forwarder = self.cancel.clone().map(|mut external| {
            let stop = stop.clone();
            tokio::spawn(async move {
                cancelled(&mut external).await;
                stop.send_replace(true);
            })
        });

        let mut workers = JoinSet::new();
        for worker_id in 0..concurrency {
            workers.spawn(run_worker(worker_id, queue.clone(), processor.clone(), stop.clone()));
        }
        drop(queue);

        let mut report = IngestionReport::new(run_id, &job.collection);
        let mut was_cancelled = false;

        // Workers are never aborted; each finishes its current file first.
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(tally) => {
                    was_cancelled |= tally.cancelled;
                    report.absorb(tally);
                }
                Err(join_err) => {
                    error!(run_id = %run_id, error = %join_err, "Worker panicked");
                    report.errors.push(format!("worker panicked: {join_err}"));
                }
            }
        }
        if let Some(forwarder) = forwarder {
            forwarder.abort();
        }

        let discovered = producer.await;
        if was_cancelled {
            warn!(
                run_id          = %run_id,
                files_processed = report.files_processed,
                records_written = report.records_written,
                "Ingestion run cancelled"
            );
            return Err(MedindexError::Cancelled);
        }
        report.files_discovered =
            discovered.map_err(|e| MedindexError::Other(anyhow!("file discovery task failed: {e}")))?;
        report.duration_ms = t0.elapsed().as_millis() as u64;

        info!(
            run_id          = %run_id,
            collection      = %report.collection,
            files_found     = report.files_discovered,
            files_processed = report.files_processed,
            files_skipped   = report.files_skipped,
            files_failed    = report.files_failed,
            records_written = report.records_written,
            records_failed  = report.records_failed,
            duration_ms     = report.duration_ms,
            "Ingestion run complete"
        );

        Ok(report)
    }
}

/// Run one batch with default settings (no progress channel, no cancellation).
pub async fn run_ingestion(
    job: &IngestionJob,
    extractor: Arc<dyn RecordExtractor>,
    gateway: DocumentGateway,
) -> Result<IngestionReport> {
    IngestionScheduler::new(extractor, gateway).run(job).await
}

// ── Worker ────────────────────────────────────────────────────────────────────

async fn run_worker(
    worker_id: usize,
    queue: Arc<WorkQueue>,
    processor: Arc<FileProcessor>,
    stop: Arc<watch::Sender<bool>>,
) -> WorkerTally {
    let mut tally = WorkerTally::default();
    let mut cancel = stop.subscribe();

    loop {
        let path = tokio::select! {
            biased;
            _ = cancelled(&mut cancel) => {
                debug!(worker = worker_id, "Cancellation observed, worker exiting");
                tally.cancelled = true;
                break;
            }
            item = queue.take() => match item {
                Some(path) => path,
                None => break,
            },
        };

        match processor.process(&path).await {
            Ok(FileOutcome::Skipped) => tally.skipped += 1,
            Ok(FileOutcome::Stored { written, failed, errors }) => {
                tally.processed += 1;
                tally.records_written += written;
                tally.records_failed += failed;
                tally.errors.extend(errors);
            }
            Err(ItemError::Cancelled) => {
                warn!(worker = worker_id, path = %path.display(), "Extraction cancelled");
                stop.send_replace(true);
                tally.cancelled = true;
                break;
            }
            Err(ItemError::Failed(e)) => {
                error!(worker = worker_id, path = %path.display(), error = ?e, "Failed to ingest file");
                processor.emit(&path, FileStage::Failed, 0, 0, Some(format!("{e:#}")));
                tally.failed += 1;
                tally.errors.push(format!("{}: {e:#}", path.display()));
            }
        }
    }

    if !tally.cancelled {
        debug!(worker = worker_id, "Queue drained, worker exiting");
    }
    tally
}

/// Resolves once the watched flag is `true`. Never resolves if the sender is gone.
async fn cancelled(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

// ── Per-file processing ───────────────────────────────────────────────────────

struct FileProcessor {
    run_id: Uuid,
    collection: String,
    extractor: Arc<dyn RecordExtractor>,
    gateway: DocumentGateway,
    progress_tx: Option<broadcast::Sender<IngestionProgress>>,
}

impl FileProcessor {
    fn emit(
        &self,
        path: &Path,
        stage: FileStage,
        records_written: usize,
        records_failed: usize,
        error: Option<String>,
    ) {
        if let Some(ref tx) = self.progress_tx {
            let _ = tx.send(IngestionProgress {
                run_id: self.run_id,
                path: path.to_path_buf(),
                stage,
                records_written,
                records_failed,
                error,
            });
        }
    }

    async fn process(&self, path: &Path) -> std::result::Result<FileOutcome, ItemError> {
        let key = path.to_string_lossy();
        info!(path = %key, "Processing file");
        self.emit(path, FileStage::Started, 0, 0, None);

        let seen = self
            .gateway
            .exists(&self.collection, &key)
            .await
            .map_err(|e| ItemError::Failed(anyhow::Error::new(e).context("provenance lookup failed")))?;
        if seen {
            info!(path = %key, "Already indexed, skipping");
            self.emit(path, FileStage::Skipped, 0, 0, None);
            return Ok(FileOutcome::Skipped);
        }

        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {key}"))
            .map_err(ItemError::Failed)?;
        let content = match String::from_utf8(bytes) {
            Ok(s) => s,
            Err(e) => {
                warn!(path = %key, "File is not valid UTF-8, decoding lossily");
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }
        };

        let records = self.extract(content).await?;
        debug!(path = %key, n = records.len(), "Records extracted");

        let mut written = 0;
        let mut failed = 0;
        let mut errors = Vec::new();
        for mut record in records {
            record.attach_provenance(path);
            match self.gateway.write(&self.collection, &record).await {
                Ok(_) => written += 1,
                Err(e) => {
                    warn!(path = %key, error = %e, "Record not stored");
                    failed += 1;
                    errors.push(format!("{key}: {e}"));
                }
            }
        }

        if written == 0 && failed > 0 {
            self.emit(path, FileStage::Failed, 0, failed, errors.last().cloned());
        } else {
            self.emit(path, FileStage::Stored, written, failed, None);
        }
        Ok(FileOutcome::Stored { written, failed, errors })
    }

    /// Run the extractor on the blocking pool; a panic counts as a failed file.
    async fn extract(&self, content: String) -> std::result::Result<Vec<Record>, ItemError> {
        let extractor = self.extractor.clone();
        match tokio::task::spawn_blocking(move || extractor.parse(&content)).await {
            Ok(Ok(records)) => Ok(records),
            Ok(Err(e)) if e.chain().any(|cause| cause.is::<Cancelled>()) => Err(ItemError::Cancelled),
            Ok(Err(e)) => Err(ItemError::Failed(e.context("extraction failed"))),
            Err(join_err) if join_err.is_panic() => {
                let payload = join_err.into_panic();
                let msg = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                Err(ItemError::Failed(anyhow!("extractor panicked: {msg}")))
            }
            Err(_) => Err(ItemError::Cancelled),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalise::TextNormaliser;
    use crate::sources::extractor_for;
    use medindex_db::{InMemoryStore, RetryPolicy};
    use std::fs;
    use tempfile::TempDir;

    fn scheduler(format: SourceFormat, store: Arc<InMemoryStore>) -> IngestionScheduler {
        let extractor = extractor_for(format, Arc::new(TextNormaliser::english()));
        IngestionScheduler::new(extractor, DocumentGateway::new(store, RetryPolicy::immediate(5)))
    }

    #[test]
    fn test_job_defaults() {
        let job = IngestionJob::new("/data", SourceFormat::ClinicalTrials);
        assert_eq!(job.collection, "clinical-trials");
        assert_eq!(job.concurrency, DEFAULT_CONCURRENCY);
        assert_eq!(job.with_concurrency(8).concurrency, 8);
    }

    #[tokio::test]
    async fn test_missing_root_fails_before_any_work() {
        let store = Arc::new(InMemoryStore::new());
        let dir = TempDir::new().unwrap();
        let job = IngestionJob::new(dir.path().join("missing"), SourceFormat::Literature);
        let err = scheduler(SourceFormat::Literature, store.clone()).run(&job).await.unwrap_err();
        assert!(matches!(err, MedindexError::NotFound(_)));
        assert_eq!(store.index_calls(), 0);
    }

    #[tokio::test]
    async fn test_progress_events_per_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "Title: A\nBody of a").unwrap();
        fs::write(dir.path().join("b.txt"), "Body of b").unwrap();

        let store = Arc::new(InMemoryStore::new());
        let (tx, mut rx) = broadcast::channel(64);
        let job = IngestionJob::new(dir.path(), SourceFormat::SupplementaryAbstracts);
        let report = scheduler(SourceFormat::SupplementaryAbstracts, store)
            .with_progress(tx)
            .run(&job)
            .await
            .unwrap();
        assert_eq!(report.records_written, 2);

        let mut started = 0;
        let mut stored = 0;
        while let Ok(ev) = rx.try_recv() {
            assert_eq!(ev.run_id, report.run_id);
            match ev.stage {
                FileStage::Started => started += 1,
                FileStage::Stored => stored += 1,
                other => panic!("unexpected stage {other:?}"),
            }
        }
        assert_eq!((started, stored), (2, 2));
    }

    #[tokio::test]
    async fn test_pre_cancelled_run_stops() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "Body").unwrap();
        let store = Arc::new(InMemoryStore::new());
        let (cancel_tx, cancel_rx) = watch::channel(true);
        let job = IngestionJob::new(dir.path(), SourceFormat::SupplementaryAbstracts);
        let err = scheduler(SourceFormat::SupplementaryAbstracts, store.clone())
            .with_cancellation(cancel_rx)
            .run(&job)
            .await
            .unwrap_err();
        drop(cancel_tx);
        assert!(matches!(err, MedindexError::Cancelled));
        assert_eq!(store.index_calls(), 0);
    }
}
